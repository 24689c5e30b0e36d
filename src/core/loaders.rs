//! Data loaders for sync-pulse timestamp files.
//!
//! Pulse times are read from CSV (or plain one-value-per-line text) files.
//! Either a named column or the first column is used, and a non-numeric
//! first row is treated as a header.

use std::cmp::Ordering;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use thiserror::Error;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Missing required column '{column}' in {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("Parse error on line {line}: '{value}' is not a number")]
    ParseError { line: u64, value: String },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Load a sequence of pulse times from a CSV file.
///
/// # Arguments
///
/// * `path` - Path to the CSV file
/// * `column` - Column name to read (case-insensitive). If `None`, the first
///   column is used and a first row that does not parse as a number is
///   skipped as a header.
///
/// # Returns
///
/// Pulse times in file order. Rows with an empty cell are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the named column does not
/// exist, a cell is not numeric, or no pulse times were found.
pub fn load_pulse_times<P: AsRef<Path>>(path: P, column: Option<&str>) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(BufReader::new(file));

    let mut records = reader.records();
    let mut times = Vec::with_capacity(4096);

    let first = match records.next() {
        Some(record) => record?,
        None => return Err(LoaderError::EmptyFile(path.to_path_buf())),
    };

    let col_idx = match column {
        Some(name) => first
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| LoaderError::MissingColumn {
                column: name.to_string(),
                path: path.to_path_buf(),
            })?,
        None => {
            // Headerless file: the first row is data
            if let Some(value) = first.get(0).and_then(|s| s.parse::<f64>().ok()) {
                times.push(value);
            }
            0
        }
    };

    for result in records {
        let record = result?;
        let cell = match record.get(col_idx) {
            Some(cell) if !cell.is_empty() => cell,
            _ => continue,
        };
        let value: f64 = cell.parse().map_err(|_| LoaderError::ParseError {
            line: record.position().map_or(0, |p| p.line()),
            value: cell.to_string(),
        })?;
        times.push(value);
    }

    if times.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    if let Some(idx) = first_non_increasing(&times) {
        log::warn!(
            "{}: pulse times are not strictly increasing at index {} ({} -> {})",
            path.display(),
            idx,
            times[idx - 1],
            times[idx]
        );
    }

    Ok(times)
}

/// Index of the first timestamp that does not exceed its predecessor.
pub fn first_non_increasing(times: &[f64]) -> Option<usize> {
    times
        .windows(2)
        .position(|w| w[1].partial_cmp(&w[0]) != Some(Ordering::Greater))
        .map(|i| i + 1)
}
