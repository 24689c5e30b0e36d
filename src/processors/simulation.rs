//! Synthetic sync-pulse trains for testing the aligner.
//!
//! Generates a base pulse train with random integer inter-pulse intervals
//! (sequence A) and a copy with accumulated Gaussian timing jitter
//! (sequence B), which models two clocks that drift apart. Optionally
//! removes a different block of pulses from each sequence.

use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;
use thiserror::Error;

use crate::config::SimulationConfig;

/// Errors that can occur when configuring a simulation.
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("interval range [{lo}, {hi}) is empty")]
    InvalidIntervalRange { lo: u64, hi: u64 },

    #[error("noise standard deviation must be finite and non-negative, got {0}")]
    InvalidNoise(f64),

    #[error("need at least 2 pulses, got {0}")]
    TooFewPulses(usize),
}

/// A simulated pair of pulse sequences with ground truth.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPulses {
    /// Pulse times recorded by system A.
    pub times_a: Vec<f64>,
    /// Pulse times recorded by system B.
    pub times_b: Vec<f64>,
    /// Index of each A pulse in the undropped pulse train.
    pub ids_a: Vec<usize>,
    /// Index of each B pulse in the undropped pulse train.
    pub ids_b: Vec<usize>,
}

impl SimulatedPulses {
    /// Position in `times_b` of the pulse recorded as `times_a[i]`, if B
    /// recorded it.
    pub fn true_match_a(&self, i: usize) -> Option<usize> {
        let id = *self.ids_a.get(i)?;
        self.ids_b.binary_search(&id).ok()
    }

    /// Position in `times_a` of the pulse recorded as `times_b[i]`, if A
    /// recorded it.
    pub fn true_match_b(&self, i: usize) -> Option<usize> {
        let id = *self.ids_b.get(i)?;
        self.ids_a.binary_search(&id).ok()
    }
}

/// Index ranges kept in each sequence when pulses are dropped, as
/// percentages of the undropped pulse count.
const KEEP_A: [(usize, usize); 2] = [(5, 21), (33, 100)];
const KEEP_B: [(usize, usize); 2] = [(0, 74), (85, 95)];

fn kept_ids(n: usize, keep: &[(usize, usize)]) -> Vec<usize> {
    keep.iter()
        .flat_map(|&(lo, hi)| (n * lo / 100)..(n * hi / 100))
        .collect()
}

/// Simulate a pair of pulse trains with drift between their timings.
///
/// # Errors
///
/// Returns an error if the interval range is empty, the noise is negative or
/// non-finite, or fewer than 2 pulses are requested.
pub fn simulate_pulses(config: &SimulationConfig) -> Result<SimulatedPulses, SimulationError> {
    let [lo, hi] = config.interval_range;
    if lo >= hi {
        return Err(SimulationError::InvalidIntervalRange { lo, hi });
    }
    if !config.noise_sd.is_finite() || config.noise_sd < 0.0 {
        return Err(SimulationError::InvalidNoise(config.noise_sd));
    }
    let n = config.n_pulses;
    if n < 2 {
        return Err(SimulationError::TooFewPulses(n));
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);

    let mut base = Vec::with_capacity(n);
    let mut t = 0.0f64;
    for _ in 0..n {
        t += rng.random_range(lo..hi) as f64;
        base.push(t);
    }

    let mut jittered = Vec::with_capacity(n);
    let mut drift = 0.0f64;
    for &t in &base {
        let z: f64 = StandardNormal.sample(&mut rng);
        drift += config.noise_sd * z;
        jittered.push(t + drift);
    }

    let (ids_a, ids_b): (Vec<usize>, Vec<usize>) = if config.drop_pulses {
        (kept_ids(n, &KEEP_A), kept_ids(n, &KEEP_B))
    } else {
        ((0..n).collect(), (0..n).collect())
    };

    log::debug!(
        "simulated {} pulses: {} kept in A, {} kept in B",
        n,
        ids_a.len(),
        ids_b.len()
    );

    Ok(SimulatedPulses {
        times_a: ids_a.iter().map(|&i| base[i]).collect(),
        times_b: ids_b.iter().map(|&i| jittered[i]).collect(),
        ids_a,
        ids_b,
    })
}
