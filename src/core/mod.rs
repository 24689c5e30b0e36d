//! Core numeric transforms and I/O operations.

pub mod loaders;
pub mod transforms;
pub mod writers;

pub use loaders::{load_pulse_times, LoaderError};
pub use transforms::{intervals, Interpolant, TransformError};
pub use writers::{write_converted_csv, write_correspondence_csv, write_pulse_times, WriteError};
