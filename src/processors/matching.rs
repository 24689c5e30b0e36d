//! Chunk matching of inter-pulse intervals.
//!
//! Sequence A's intervals are cut into non-overlapping chunks of
//! `chunk_size` intervals. Each chunk is slid along every window of
//! sequence B's intervals and scored by mean squared error:
//!
//! ```text
//! MSE(k) = mean_j (IA[c + j] - IB[k + j])^2
//!        = (Σ IB[k+j]² + Σ IA[c+j]² − 2 Σ IA[c+j]·IB[k+j]) / chunk_size
//! ```
//!
//! The windowed error is evaluated directly, so an exact copy of a chunk
//! scores exactly `0.0`. Chunks are independent and are scored in parallel
//! with `rayon`; results are returned in chunk order.

use rayon::prelude::*;

use super::aligner::AlignError;

/// Best alignment of one chunk of sequence A against sequence B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkMatch {
    /// Index of the chunk's first interval (and first pulse) in sequence A.
    pub start_a: usize,
    /// Offset into sequence B's intervals with the lowest MSE. First
    /// occurrence wins ties; `0` if every candidate scored NaN.
    pub start_b: usize,
    /// MSE at `start_b`. NaN if no candidate had a comparable score.
    pub min_mse: f64,
    /// Second-lowest MSE over all candidate offsets. NaN if the profile has
    /// fewer than two comparable entries.
    pub second_mse: f64,
}

impl ChunkMatch {
    /// Whether this chunk has both scores needed for classification.
    #[inline]
    pub fn is_classifiable(&self) -> bool {
        !self.min_mse.is_nan() && !self.second_mse.is_nan()
    }
}

/// Start indices of the chunks of an interval sequence of length `n`.
///
/// Chunks start at `0, chunk_size, 2 * chunk_size, ...` while the whole chunk
/// fits; a trailing remainder shorter than `chunk_size` is dropped.
pub fn chunk_starts(n: usize, chunk_size: usize) -> Vec<usize> {
    if chunk_size == 0 || n < chunk_size {
        return Vec::new();
    }
    (0..=n - chunk_size).step_by(chunk_size).collect()
}

/// Mean squared error of `chunk` against every full-length window of `target`.
///
/// Returns one value per offset `k` in `0..=target.len() - chunk.len()`, or an
/// empty vector if `target` is shorter than `chunk` or `chunk` is empty.
pub fn mse_profile(chunk: &[f64], target: &[f64]) -> Vec<f64> {
    let m = chunk.len();
    if m == 0 || target.len() < m {
        return Vec::new();
    }
    let scale = 1.0 / m as f64;

    target
        .windows(m)
        .map(|window| {
            let sse: f64 = chunk
                .iter()
                .zip(window)
                .map(|(a, b)| {
                    let d = a - b;
                    d * d
                })
                .sum();
            sse * scale
        })
        .collect()
}

/// Lowest and second-lowest entries of an MSE profile.
///
/// Returns `(argmin, min, second)`. NaN entries are never selected. The
/// second value comes from a different offset than the minimum.
pub fn best_two(profile: &[f64]) -> (usize, f64, f64) {
    let mut best: Option<(usize, f64)> = None;
    let mut second = f64::NAN;

    for (k, &v) in profile.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            None => best = Some((k, v)),
            Some((_, b)) if v < b => {
                second = b;
                best = Some((k, v));
            }
            Some(_) => {
                if second.is_nan() || v < second {
                    second = v;
                }
            }
        }
    }

    match best {
        Some((k, v)) => (k, v, second),
        None => (0, f64::NAN, f64::NAN),
    }
}

/// Find the best alignment in `intervals_b` for every chunk of `intervals_a`.
///
/// # Errors
///
/// - [`AlignError::InvalidChunkSize`] if `chunk_size < 2`
/// - [`AlignError::InsufficientData`] if either interval sequence is shorter
///   than `chunk_size`
pub fn match_chunks(
    intervals_a: &[f64],
    intervals_b: &[f64],
    chunk_size: usize,
) -> Result<Vec<ChunkMatch>, AlignError> {
    if chunk_size < 2 {
        return Err(AlignError::InvalidChunkSize(chunk_size));
    }
    for (sequence, intervals) in [('A', intervals_a), ('B', intervals_b)] {
        if intervals.len() < chunk_size {
            return Err(AlignError::InsufficientData {
                sequence,
                intervals: intervals.len(),
                required: chunk_size,
            });
        }
    }

    let starts = chunk_starts(intervals_a.len(), chunk_size);
    let n_offsets = intervals_b.len() - chunk_size + 1;
    log::debug!(
        "matching {} chunks of {} intervals against {} offsets",
        starts.len(),
        chunk_size,
        n_offsets
    );

    let matches = starts
        .par_iter()
        .map(|&start_a| {
            let chunk = &intervals_a[start_a..start_a + chunk_size];
            let profile = mse_profile(chunk, intervals_b);
            let (start_b, min_mse, second_mse) = best_two(&profile);
            ChunkMatch {
                start_a,
                start_b,
                min_mse,
                second_mse,
            }
        })
        .collect();

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// MSE via the sum-of-squares expansion.
    fn expanded_mse(chunk: &[f64], target: &[f64], k: usize) -> f64 {
        let m = chunk.len();
        let sum_b2: f64 = target[k..k + m].iter().map(|b| b * b).sum();
        let sum_a2: f64 = chunk.iter().map(|a| a * a).sum();
        let cross: f64 = chunk.iter().zip(&target[k..k + m]).map(|(a, b)| a * b).sum();
        (sum_b2 + sum_a2 - 2.0 * cross) / m as f64
    }

    #[test]
    fn test_chunk_starts() {
        assert_eq!(chunk_starts(10, 5), vec![0, 5]);
        assert_eq!(chunk_starts(14, 5), vec![0, 5]);
        assert_eq!(chunk_starts(15, 5), vec![0, 5, 10]);
        assert_eq!(chunk_starts(4, 5), Vec::<usize>::new());
        assert_eq!(chunk_starts(4, 0), Vec::<usize>::new());
    }

    #[test]
    fn test_mse_profile_matches_expansion() {
        let chunk = vec![3.0, 7.0, 2.0];
        let target = vec![1.0, 3.0, 7.0, 2.0, 9.0, 4.0];
        let profile = mse_profile(&chunk, &target);

        assert_eq!(profile.len(), 4);
        for (k, &v) in profile.iter().enumerate() {
            assert!((v - expanded_mse(&chunk, &target, k)).abs() < 1e-9);
        }
        assert_eq!(profile[1], 0.0);
    }

    #[test]
    fn test_mse_profile_short_target() {
        assert!(mse_profile(&[1.0, 2.0, 3.0], &[1.0, 2.0]).is_empty());
        assert!(mse_profile(&[], &[1.0]).is_empty());
    }

    #[test]
    fn test_best_two() {
        let (k, min, second) = best_two(&[5.0, 1.0, 3.0, 1.0, 0.5, 2.0]);
        assert_eq!(k, 4);
        assert_eq!(min, 0.5);
        assert_eq!(second, 1.0);
    }

    #[test]
    fn test_best_two_ties_first_wins() {
        let (k, min, second) = best_two(&[2.0, 1.0, 1.0]);
        assert_eq!(k, 1);
        assert_eq!(min, 1.0);
        assert_eq!(second, 1.0);
    }

    #[test]
    fn test_best_two_nan_handling() {
        let (k, min, second) = best_two(&[f64::NAN, 4.0, f64::NAN, 2.0]);
        assert_eq!(k, 3);
        assert_eq!(min, 2.0);
        assert_eq!(second, 4.0);

        let (_, min, second) = best_two(&[f64::NAN, f64::NAN]);
        assert!(min.is_nan());
        assert!(second.is_nan());

        let (k, min, second) = best_two(&[3.0]);
        assert_eq!(k, 0);
        assert_eq!(min, 3.0);
        assert!(second.is_nan());
    }

    #[test]
    fn test_match_chunks_finds_offset() {
        let intervals_a = vec![10.0, 40.0, 25.0, 70.0, 15.0, 55.0];
        let mut intervals_b = vec![33.0, 61.0, 12.0];
        intervals_b.extend_from_slice(&intervals_a);
        intervals_b.push(48.0);

        let matches = match_chunks(&intervals_a, &intervals_b, 3).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].start_a, 0);
        assert_eq!(matches[0].start_b, 3);
        assert_eq!(matches[0].min_mse, 0.0);
        assert!(matches[0].second_mse > 0.0);
        assert_eq!(matches[1].start_a, 3);
        assert_eq!(matches[1].start_b, 6);
        assert!(matches.iter().all(ChunkMatch::is_classifiable));
    }

    #[test]
    fn test_match_chunks_single_offset_not_classifiable() {
        let matches = match_chunks(&[1.0, 2.0, 3.0], &[1.0, 2.0], 2).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].min_mse, 0.0);
        assert!(matches[0].second_mse.is_nan());
        assert!(!matches[0].is_classifiable());
    }

    #[test]
    fn test_match_chunks_errors() {
        assert!(matches!(
            match_chunks(&[1.0; 10], &[1.0; 10], 1),
            Err(AlignError::InvalidChunkSize(1))
        ));
        assert!(matches!(
            match_chunks(&[1.0; 3], &[1.0; 10], 5),
            Err(AlignError::InsufficientData { sequence: 'A', intervals: 3, required: 5 })
        ));
        assert!(matches!(
            match_chunks(&[1.0; 10], &[1.0; 4], 5),
            Err(AlignError::InsufficientData { sequence: 'B', intervals: 4, required: 5 })
        ));
    }

    #[test]
    fn test_match_chunks_nan_does_not_panic() {
        let intervals_a = vec![1.0, f64::NAN, 3.0, 4.0];
        let intervals_b = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let matches = match_chunks(&intervals_a, &intervals_b, 2).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches[0].min_mse.is_nan());
        assert_eq!(matches[1].start_b, 2);
        assert_eq!(matches[1].min_mse, 0.0);
    }
}
