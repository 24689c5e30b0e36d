//! CSV writers for pulse times, correspondences and converted timestamps.
//!
//! Every writer creates missing parent directories. Undefined values
//! ("no corresponding time") are written as empty cells, never as zero.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use thiserror::Error;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to flush data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Mismatched column lengths.
    #[error("column length mismatch: {left_len} values vs {right_len} values")]
    LengthMismatch { left_len: usize, right_len: usize },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Write a header and rows to a CSV file.
fn write_rows<I>(path: &Path, header: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    ensure_parent_dirs(path)?;

    let path_str = path.display().to_string();
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path_str.clone(),
        source: e,
    })?;
    let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));

    csv_writer
        .write_record(header)
        .map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;

    for row in rows {
        csv_writer
            .write_record(&row)
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write pulse times to a single-column CSV with a `time` header.
///
/// # Example
///
/// ```no_run
/// use rsync_aligner::core::writers::write_pulse_times;
/// use std::path::Path;
///
/// write_pulse_times(Path::new("pulses_a.csv"), &[100.0, 1300.0, 2150.0]).unwrap();
/// ```
pub fn write_pulse_times(path: &Path, times: &[f64]) -> Result<()> {
    write_rows(path, &["time"], times.iter().map(|t| vec![t.to_string()]))
}

/// Write one system's pulse times alongside their corresponding times on
/// the other system.
///
/// Columns: `index,pulse_time,corresponding_time`. Pulses without a
/// correspondence get an empty `corresponding_time` cell.
///
/// # Errors
///
/// Returns an error if the slices differ in length or the file cannot be
/// written.
pub fn write_correspondence_csv(
    path: &Path,
    pulse_times: &[f64],
    cor_times: &[Option<f64>],
) -> Result<()> {
    if pulse_times.len() != cor_times.len() {
        return Err(WriteError::LengthMismatch {
            left_len: pulse_times.len(),
            right_len: cor_times.len(),
        });
    }

    write_rows(
        path,
        &["index", "pulse_time", "corresponding_time"],
        pulse_times
            .iter()
            .zip(cor_times)
            .enumerate()
            .map(|(i, (t, c))| vec![i.to_string(), t.to_string(), format_optional(*c)]),
    )
}

/// Write query times and their converted values.
///
/// Columns: `time,converted`. Times outside the matched span get an empty
/// `converted` cell.
pub fn write_converted_csv(path: &Path, times: &[f64], converted: &[Option<f64>]) -> Result<()> {
    if times.len() != converted.len() {
        return Err(WriteError::LengthMismatch {
            left_len: times.len(),
            right_len: converted.len(),
        });
    }

    write_rows(
        path,
        &["time", "converted"],
        times
            .iter()
            .zip(converted)
            .map(|(t, c)| vec![t.to_string(), format_optional(*c)]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_pulse_times() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pulses.csv");

        write_pulse_times(&path, &[1.5, 20.0]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["time", "1.5", "20"]);
    }

    #[test]
    fn test_write_correspondence_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cor.csv");

        write_correspondence_csv(&path, &[10.0, 20.0, 30.0], &[Some(11.0), None, Some(31.5)])
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "index,pulse_time,corresponding_time");
        assert_eq!(lines[1], "0,10,11");
        assert_eq!(lines[2], "1,20,");
        assert_eq!(lines[3], "2,30,31.5");
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.csv");

        write_converted_csv(&path, &[1.0], &[None]).unwrap();

        assert!(path.exists());
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().nth(1), Some("1,"));
    }

    #[test]
    fn test_write_length_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cor.csv");

        let result = write_correspondence_csv(&path, &[1.0, 2.0], &[None]);

        match result.unwrap_err() {
            WriteError::LengthMismatch {
                left_len,
                right_len,
            } => {
                assert_eq!(left_len, 2);
                assert_eq!(right_len, 1);
            }
            _ => panic!("Expected LengthMismatch error"),
        }
        assert!(!path.exists());
    }
}
