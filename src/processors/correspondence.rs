//! Sparse pointwise correspondence between two pulse sequences.

use super::classifier::MatchClass;
use super::matching::ChunkMatch;

/// Corresponding times between pulse sequences A and B.
///
/// `cor_times_a[i]` is the A time matched to B pulse `i`, and `cor_times_b[i]`
/// the B time matched to A pulse `i`. Unmatched pulses hold `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrespondenceMap {
    /// One entry per B pulse.
    pub cor_times_a: Vec<Option<f64>>,
    /// One entry per A pulse.
    pub cor_times_b: Vec<Option<f64>>,
}

impl CorrespondenceMap {
    /// Number of A pulses with a corresponding B time.
    pub fn matched_a(&self) -> usize {
        self.cor_times_b.iter().filter(|c| c.is_some()).count()
    }

    /// Number of B pulses with a corresponding A time.
    pub fn matched_b(&self) -> usize {
        self.cor_times_a.iter().filter(|c| c.is_some()).count()
    }
}

/// Build the correspondence map from the chunks classified as matches.
///
/// Each matching chunk copies its `chunk_size` pulse times from A into
/// `cor_times_a` at the matched B positions, and the matched B pulse times
/// into `cor_times_b`. Where the B windows of two chunks overlap, the chunk
/// processed later overwrites the earlier one.
pub fn build_correspondence(
    pulse_times_a: &[f64],
    pulse_times_b: &[f64],
    matches: &[ChunkMatch],
    classes: &[MatchClass],
    chunk_size: usize,
) -> CorrespondenceMap {
    let mut cor_times_a = vec![None; pulse_times_b.len()];
    let mut cor_times_b = vec![None; pulse_times_a.len()];

    for (m, class) in matches.iter().zip(classes) {
        if !class.is_match() {
            continue;
        }

        let src_a = pulse_times_a.iter().skip(m.start_a).take(chunk_size);
        for (dst, &t) in cor_times_a.iter_mut().skip(m.start_b).zip(src_a) {
            *dst = Some(t);
        }

        let src_b = pulse_times_b.iter().skip(m.start_b).take(chunk_size);
        for (dst, &t) in cor_times_b.iter_mut().skip(m.start_a).zip(src_b) {
            *dst = Some(t);
        }
    }

    CorrespondenceMap {
        cor_times_a,
        cor_times_b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(start_a: usize, start_b: usize) -> ChunkMatch {
        ChunkMatch {
            start_a,
            start_b,
            min_mse: 1.0,
            second_mse: 100.0,
        }
    }

    #[test]
    fn test_build_correspondence_matched_only() {
        let a: Vec<f64> = (0..9).map(|i| i as f64 * 10.0).collect();
        let b: Vec<f64> = (0..10).map(|i| 1000.0 + i as f64 * 10.0).collect();
        let matches = vec![chunk(0, 1), chunk(4, 5)];
        let classes = vec![MatchClass::Match, MatchClass::NonMatch];

        let cor = build_correspondence(&a, &b, &matches, &classes, 4);

        assert_eq!(cor.cor_times_a.len(), 10);
        assert_eq!(cor.cor_times_b.len(), 9);
        assert_eq!(cor.cor_times_a[0], None);
        assert_eq!(cor.cor_times_a[1], Some(0.0));
        assert_eq!(cor.cor_times_a[4], Some(30.0));
        assert_eq!(cor.cor_times_a[5], None);
        assert_eq!(cor.cor_times_b[0], Some(1010.0));
        assert_eq!(cor.cor_times_b[3], Some(1040.0));
        assert_eq!(cor.cor_times_b[4], None);
        assert_eq!(cor.matched_a(), 4);
        assert_eq!(cor.matched_b(), 4);
    }

    #[test]
    fn test_overlapping_windows_later_chunk_wins() {
        let a: Vec<f64> = (0..7).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..6).map(|i| 100.0 + i as f64).collect();
        let matches = vec![chunk(0, 1), chunk(3, 2)];
        let classes = vec![MatchClass::Match, MatchClass::Match];

        let cor = build_correspondence(&a, &b, &matches, &classes, 3);

        // B pulses 2 and 3 were claimed by both chunks; the second wins
        assert_eq!(cor.cor_times_a[1], Some(0.0));
        assert_eq!(cor.cor_times_a[2], Some(3.0));
        assert_eq!(cor.cor_times_a[3], Some(4.0));
        assert_eq!(cor.cor_times_a[4], Some(5.0));
        assert_eq!(cor.cor_times_b[0], Some(101.0));
        assert_eq!(cor.cor_times_b[3], Some(102.0));
    }

    #[test]
    fn test_no_matches_all_none() {
        let cor = build_correspondence(
            &[1.0, 2.0, 3.0],
            &[1.0, 2.0, 3.0],
            &[chunk(0, 0)],
            &[MatchClass::Excluded],
            2,
        );
        assert!(cor.cor_times_a.iter().all(Option::is_none));
        assert!(cor.cor_times_b.iter().all(Option::is_none));
    }
}
