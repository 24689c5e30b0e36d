//! Classification of chunk matches into true and spurious alignments.
//!
//! True alignments produce systematically smaller MSE than the best fit of a
//! chunk among unrelated intervals, so the pooled log-MSE of every chunk's
//! best and second-best alignment is bimodal. A two-component Gaussian
//! mixture separates the modes; a chunk is a match when its best log-MSE is
//! assigned to the lower-mean component.
//!
//! Known limitation: when the pooled values are unimodal (very short
//! sequences, or no genuine overlap between A and B) the mixture still
//! splits them, and the resulting classification is unreliable.

use crate::config::MixtureConfig;

use super::matching::ChunkMatch;
use super::mixture::{GaussianMixture, MixtureError};

/// Outcome of classifying one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchClass {
    /// Best alignment is a true correspondence.
    Match,
    /// Best alignment is a spurious fit.
    NonMatch,
    /// Chunk lacked a best or second-best score and was not classified.
    Excluded,
}

impl MatchClass {
    #[inline]
    pub fn is_match(self) -> bool {
        self == MatchClass::Match
    }
}

/// Per-chunk classes together with the fitted mixture.
#[derive(Debug, Clone)]
pub struct Classification {
    /// One entry per chunk, in chunk order.
    pub classes: Vec<MatchClass>,
    /// Mixture fitted to `pooled_log_mse`.
    pub mixture: GaussianMixture,
    /// Finite log-MSE values (best and second best) the mixture was fitted to.
    pub pooled_log_mse: Vec<f64>,
}

impl Classification {
    /// Number of chunks classified as [`MatchClass::Match`].
    pub fn n_matched(&self) -> usize {
        self.classes.iter().filter(|c| c.is_match()).count()
    }

    /// Whether a log-MSE value falls in the match component.
    pub fn is_match_value(&self, log_mse: f64) -> bool {
        self.mixture.predict(log_mse) == self.mixture.lower_component()
    }
}

/// Finite `ln(min_mse)` and `ln(second_mse)` values of all classifiable chunks.
pub fn pooled_log_mse(matches: &[ChunkMatch]) -> Vec<f64> {
    matches
        .iter()
        .filter(|m| m.is_classifiable())
        .flat_map(|m| [m.min_mse.ln(), m.second_mse.ln()])
        .filter(|v| v.is_finite())
        .collect()
}

/// Classify every chunk as a true or spurious match.
///
/// A chunk whose best MSE is exactly zero is a match without consulting the
/// mixture. Chunks with a NaN score are [`MatchClass::Excluded`].
///
/// # Errors
///
/// Propagates the [`MixtureError`] when the pooled values cannot support a
/// two-component fit.
pub fn classify_chunks(
    matches: &[ChunkMatch],
    config: &MixtureConfig,
) -> Result<Classification, MixtureError> {
    let pooled = pooled_log_mse(matches);
    let mixture = GaussianMixture::fit(&pooled, config)?;
    let match_component = mixture.lower_component();

    log::debug!(
        "log-MSE mixture: match mean {:.3}, non-match mean {:.3} ({} values, {} iterations)",
        mixture.means[match_component],
        mixture.means[1 - match_component],
        pooled.len(),
        mixture.n_iter
    );

    let classes = matches
        .iter()
        .map(|m| {
            if !m.is_classifiable() {
                return MatchClass::Excluded;
            }
            if m.min_mse == 0.0 {
                return MatchClass::Match;
            }
            let log_min = m.min_mse.ln();
            if log_min.is_finite() && mixture.predict(log_min) == match_component {
                MatchClass::Match
            } else {
                MatchClass::NonMatch
            }
        })
        .collect();

    Ok(Classification {
        classes,
        mixture,
        pooled_log_mse: pooled,
    })
}
