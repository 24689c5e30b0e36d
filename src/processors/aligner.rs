//! Timestamp conversion between two recording systems using sync pulses.
//!
//! An [`Aligner`] is built once from the sync-pulse times recorded by each
//! system (A and B). Construction works out which pulses correspond by
//! matching short chunks of A's inter-pulse intervals against B, classifying
//! the matches, and recording the corresponding times. Afterwards, times
//! from either system can be converted into the other's reference frame by
//! linear interpolation between matched pulses.
//!
//! Both sequences must use the same time units; this is not checked.
//!
//! # Example
//!
//! ```no_run
//! use rsync_aligner::processors::aligner::make_aligner;
//!
//! # let pulses_a: Vec<f64> = Vec::new();
//! # let pulses_b: Vec<f64> = Vec::new();
//! let aligner = make_aligner(&pulses_a, &pulses_b, 5)?;
//! let t_b = aligner.a_to_b(12_345.0);
//! # Ok::<(), rsync_aligner::AlignError>(())
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::config::AlignerConfig;
use crate::core::transforms::{intervals, paired_differences, Interpolant, TransformError};

use super::classifier::{classify_chunks, Classification, MatchClass};
use super::correspondence::{build_correspondence, CorrespondenceMap};
use super::matching::{match_chunks, ChunkMatch};
use super::mixture::{GaussianMixture, MixtureError};

/// Errors that can occur while building an aligner.
#[derive(Debug, Error)]
pub enum AlignError {
    #[error("need at least 2 pulses to compute intervals, got {0}")]
    TooFewPulses(usize),

    #[error("chunk size must be at least 2, got {0}")]
    InvalidChunkSize(usize),

    #[error("sequence {sequence} has {intervals} inter-pulse intervals, need at least {required}")]
    InsufficientData {
        sequence: char,
        intervals: usize,
        required: usize,
    },

    #[error("cannot separate matching from non-matching chunks: {0}")]
    DegenerateClassification(#[from] MixtureError),
}

impl From<TransformError> for AlignError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::TooFewPulses(n) => AlignError::TooFewPulses(n),
        }
    }
}

/// Summary statistics of a built aligner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentSummary {
    pub n_pulses_a: usize,
    pub n_pulses_b: usize,
    pub chunk_size: usize,
    pub n_chunks: usize,
    pub n_matched: usize,
    pub n_excluded: usize,
    /// Matched chunks over all chunks.
    pub match_fraction: f64,
    /// A pulses with a corresponding B time.
    pub matched_pulses_a: usize,
    /// B pulses with a corresponding A time.
    pub matched_pulses_b: usize,
}

/// Converts timestamps between the reference frames of systems A and B.
///
/// Immutable after construction; safe to share across threads.
#[derive(Debug, Clone)]
pub struct Aligner {
    pulse_times_a: Vec<f64>,
    pulse_times_b: Vec<f64>,
    chunk_size: usize,
    matches: Vec<ChunkMatch>,
    classification: Classification,
    correspondence: CorrespondenceMap,
    a_to_b: Interpolant,
    b_to_a: Interpolant,
}

impl Aligner {
    /// Build an aligner from the pulse times recorded by each system.
    ///
    /// # Errors
    ///
    /// - [`AlignError::InvalidChunkSize`] if `config.chunk_size < 2`
    /// - [`AlignError::InsufficientData`] if either sequence has fewer than
    ///   `chunk_size` intervals
    /// - [`AlignError::DegenerateClassification`] if the log-MSE values
    ///   cannot be split into two components
    pub fn new(
        pulse_times_a: &[f64],
        pulse_times_b: &[f64],
        config: &AlignerConfig,
    ) -> Result<Self, AlignError> {
        let chunk_size = config.chunk_size;
        if chunk_size < 2 {
            return Err(AlignError::InvalidChunkSize(chunk_size));
        }
        for (sequence, times) in [('A', pulse_times_a), ('B', pulse_times_b)] {
            if times.len() <= chunk_size {
                return Err(AlignError::InsufficientData {
                    sequence,
                    intervals: times.len().saturating_sub(1),
                    required: chunk_size,
                });
            }
        }

        let intervals_a = intervals(pulse_times_a)?;
        let intervals_b = intervals(pulse_times_b)?;

        let matches = match_chunks(&intervals_a, &intervals_b, chunk_size)?;
        let classification = classify_chunks(&matches, &config.mixture)?;
        let correspondence = build_correspondence(
            pulse_times_a,
            pulse_times_b,
            &matches,
            &classification.classes,
            chunk_size,
        );

        let a_to_b = Interpolant::from_sparse(pulse_times_a, &correspondence.cor_times_b);
        let b_to_a = Interpolant::from_sparse(pulse_times_b, &correspondence.cor_times_a);
        if a_to_b.len() < 2 || b_to_a.len() < 2 {
            log::warn!(
                "fewer than 2 corresponding pulses ({} A, {} B); conversions will return no value",
                a_to_b.len(),
                b_to_a.len()
            );
        }

        let aligner = Self {
            pulse_times_a: pulse_times_a.to_vec(),
            pulse_times_b: pulse_times_b.to_vec(),
            chunk_size,
            matches,
            classification,
            correspondence,
            a_to_b,
            b_to_a,
        };

        let summary = aligner.summary();
        log::info!(
            "matched {} of {} chunks ({:.1}%), {} of {} A pulses aligned",
            summary.n_matched,
            summary.n_chunks,
            100.0 * summary.match_fraction,
            summary.matched_pulses_a,
            summary.n_pulses_a
        );

        Ok(aligner)
    }

    /// Convert a time in A's reference frame to B's.
    ///
    /// Returns `None` outside the span of matched pulses.
    #[inline]
    pub fn a_to_b(&self, time_a: f64) -> Option<f64> {
        self.a_to_b.eval(time_a)
    }

    /// Convert a time in B's reference frame to A's.
    ///
    /// Returns `None` outside the span of matched pulses.
    #[inline]
    pub fn b_to_a(&self, time_b: f64) -> Option<f64> {
        self.b_to_a.eval(time_b)
    }

    /// Element-wise [`Aligner::a_to_b`].
    pub fn a_to_b_many(&self, times_a: &[f64]) -> Vec<Option<f64>> {
        times_a.iter().map(|&t| self.a_to_b(t)).collect()
    }

    /// Element-wise [`Aligner::b_to_a`].
    pub fn b_to_a_many(&self, times_b: &[f64]) -> Vec<Option<f64>> {
        times_b.iter().map(|&t| self.b_to_a(t)).collect()
    }

    pub fn pulse_times_a(&self) -> &[f64] {
        &self.pulse_times_a
    }

    pub fn pulse_times_b(&self) -> &[f64] {
        &self.pulse_times_b
    }

    /// A time corresponding to each B pulse.
    pub fn cor_times_a(&self) -> &[Option<f64>] {
        &self.correspondence.cor_times_a
    }

    /// B time corresponding to each A pulse.
    pub fn cor_times_b(&self) -> &[Option<f64>] {
        &self.correspondence.cor_times_b
    }

    pub fn correspondence(&self) -> &CorrespondenceMap {
        &self.correspondence
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_matches(&self) -> &[ChunkMatch] {
        &self.matches
    }

    pub fn classifications(&self) -> &[MatchClass] {
        &self.classification.classes
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn mixture(&self) -> &GaussianMixture {
        &self.classification.mixture
    }

    /// Span of A times that can be converted, if any.
    pub fn span_a(&self) -> Option<(f64, f64)> {
        self.a_to_b.span()
    }

    /// Span of B times that can be converted, if any.
    pub fn span_b(&self) -> Option<(f64, f64)> {
        self.b_to_a.span()
    }

    /// Differences between consecutive matched intervals as seen through the
    /// correspondence and as recorded on B: `diff(cor_times_a) - diff(pulse_times_b)`.
    pub fn timing_errors(&self) -> Vec<f64> {
        paired_differences(&self.correspondence.cor_times_a, &self.pulse_times_b)
    }

    pub fn summary(&self) -> AlignmentSummary {
        let n_chunks = self.matches.len();
        let n_matched = self.classification.n_matched();
        let n_excluded = self
            .classification
            .classes
            .iter()
            .filter(|c| **c == MatchClass::Excluded)
            .count();

        AlignmentSummary {
            n_pulses_a: self.pulse_times_a.len(),
            n_pulses_b: self.pulse_times_b.len(),
            chunk_size: self.chunk_size,
            n_chunks,
            n_matched,
            n_excluded,
            match_fraction: if n_chunks > 0 {
                n_matched as f64 / n_chunks as f64
            } else {
                0.0
            },
            matched_pulses_a: self.correspondence.matched_a(),
            matched_pulses_b: self.correspondence.matched_b(),
        }
    }
}

/// Build an [`Aligner`] with the default configuration and the given chunk size.
pub fn make_aligner(
    pulse_times_a: &[f64],
    pulse_times_b: &[f64],
    chunk_size: usize,
) -> Result<Aligner, AlignError> {
    Aligner::new(
        pulse_times_a,
        pulse_times_b,
        &AlignerConfig::with_chunk_size(chunk_size),
    )
}
