//! Alignment stages and the synthetic pulse generator.

pub mod aligner;
pub mod classifier;
pub mod correspondence;
pub mod matching;
pub mod mixture;
pub mod simulation;

// Re-export key types for convenience
pub use aligner::{make_aligner, AlignError, Aligner, AlignmentSummary};
pub use classifier::{classify_chunks, Classification, MatchClass};
pub use correspondence::{build_correspondence, CorrespondenceMap};
pub use matching::{match_chunks, mse_profile, ChunkMatch};
pub use mixture::{GaussianMixture, MixtureError};
pub use simulation::{simulate_pulses, SimulatedPulses, SimulationError};
