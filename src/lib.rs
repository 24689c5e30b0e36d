//! Timestamp alignment between two recording systems using sync pulses.
//!
//! Two systems (e.g. a behavioural controller and an electrophysiology
//! recorder) each timestamp the same train of sync pulses with random
//! inter-pulse intervals. This crate works out which pulses correspond and
//! converts times between the two reference frames, tolerating clock drift,
//! timing jitter and pulses missing from either recording.
//!
//! This crate provides tools for:
//! - Loading pulse times from CSV files and writing correspondences
//! - Chunk-wise interval matching and Gaussian-mixture match classification
//! - Bidirectional time conversion by interpolation between matched pulses
//! - Simulating drifting pulse trains with missing pulses
//! - Diagnostic plots of the alignment quality
//!
//! # Example
//!
//! ```no_run
//! use rsync_aligner::{core::loaders::load_pulse_times, make_aligner};
//!
//! let pulses_a = load_pulse_times("pulses_a.csv", None).unwrap();
//! let pulses_b = load_pulse_times("pulses_b.csv", None).unwrap();
//! let aligner = make_aligner(&pulses_a, &pulses_b, 5).unwrap();
//! let t_b = aligner.a_to_b(pulses_a[10]);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{AlignerConfig, DiagnosticsConfig, MixtureConfig, PipelineConfig, SimulationConfig};
pub use processors::{make_aligner, simulate_pulses, AlignError, Aligner, AlignmentSummary};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
