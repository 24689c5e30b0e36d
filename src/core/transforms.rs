//! Numeric transforms on pulse-time sequences.
//!
//! This module provides the building blocks shared by the aligner:
//! - Inter-pulse interval profiling (consecutive differences)
//! - Piecewise-linear interpolation over sparse sample points
//! - Differences between defined neighbouring entries of a sparse sequence

use thiserror::Error;

/// Errors from sequence transforms.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    #[error("need at least 2 pulses to compute intervals, got {0}")]
    TooFewPulses(usize),
}

/// Convert a pulse-time sequence into its inter-pulse intervals.
///
/// `intervals[i] = times[i + 1] - times[i]`, so the output is one element
/// shorter than the input. Non-finite timestamps propagate into the
/// intervals unchanged.
///
/// # Errors
///
/// Returns [`TransformError::TooFewPulses`] if fewer than two pulses are given.
pub fn intervals(times: &[f64]) -> Result<Vec<f64>, TransformError> {
    if times.len() < 2 {
        return Err(TransformError::TooFewPulses(times.len()));
    }

    Ok(times.windows(2).map(|w| w[1] - w[0]).collect())
}

/// Sample points for piecewise-linear interpolation.
///
/// Holds the `(x, y)` pairs of a sparse mapping where `y` is defined, with
/// `x` assumed to be increasing.
#[derive(Debug, Clone, Default)]
pub struct Interpolant {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Interpolant {
    /// Build an interpolant from `xs` and a parallel sparse `ys`.
    ///
    /// Entries whose `y` is `None` or whose `x`/`y` are not finite are
    /// skipped; extra entries in the longer slice are ignored.
    pub fn from_sparse(xs: &[f64], ys: &[Option<f64>]) -> Self {
        let mut px = Vec::new();
        let mut py = Vec::new();
        for (&x, y) in xs.iter().zip(ys) {
            if let Some(y) = *y {
                if x.is_finite() && y.is_finite() {
                    px.push(x);
                    py.push(y);
                }
            }
        }
        Self { xs: px, ys: py }
    }

    /// Number of sample points.
    #[inline]
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Returns true if there are no sample points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// The `[first, last]` x-span covered by the sample points.
    pub fn span(&self) -> Option<(f64, f64)> {
        match (self.xs.first(), self.xs.last()) {
            (Some(&lo), Some(&hi)) if self.xs.len() >= 2 => Some((lo, hi)),
            _ => None,
        }
    }

    /// Interpolate at `t`.
    ///
    /// Returns `None` when `t` is NaN, lies outside the sample span, or
    /// fewer than two sample points exist. No extrapolation is performed.
    pub fn eval(&self, t: f64) -> Option<f64> {
        let (lo, hi) = self.span()?;
        if t.is_nan() || t < lo || t > hi {
            return None;
        }

        // First sample point strictly greater than t
        let upper = self.xs.partition_point(|&x| x <= t);
        if upper == 0 {
            return None;
        }
        let i = upper - 1;
        if i + 1 >= self.xs.len() {
            // t equals the last sample point
            return Some(self.ys[i]);
        }

        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        if x1 <= x0 {
            return Some(y0);
        }
        let f = (t - x0) / (x1 - x0);
        Some(y0 + (y1 - y0) * f)
    }
}

/// Differences between neighbouring entries of a sparse sequence and a
/// reference sequence: `(cor[i+1] - cor[i]) - (reference[i+1] - reference[i])`
/// for every `i` where both `cor` entries are defined.
pub fn paired_differences(cor: &[Option<f64>], reference: &[f64]) -> Vec<f64> {
    let n = cor.len().min(reference.len());
    let mut out = Vec::new();
    for i in 1..n {
        if let (Some(c0), Some(c1)) = (cor[i - 1], cor[i]) {
            out.push((c1 - c0) - (reference[i] - reference[i - 1]));
        }
    }
    out
}
