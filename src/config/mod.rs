//! Configuration types for the pulse aligner.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for the two-component Gaussian mixture used to separate matched
/// chunks from spurious best fits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixtureConfig {
    /// Maximum number of EM iterations
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Convergence threshold on the change in mean log-likelihood
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Non-negative regularisation added to each component variance
    #[serde(default = "default_reg_variance")]
    pub reg_variance: f64,
}

fn default_max_iter() -> usize {
    100
}

fn default_tolerance() -> f64 {
    1e-3
}

fn default_reg_variance() -> f64 {
    1e-6
}

impl Default for MixtureConfig {
    fn default() -> Self {
        Self {
            max_iter: default_max_iter(),
            tolerance: default_tolerance(),
            reg_variance: default_reg_variance(),
        }
    }
}

/// Configuration for building an aligner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignerConfig {
    /// Number of inter-pulse intervals per chunk of sequence A
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default)]
    pub mixture: MixtureConfig,
}

fn default_chunk_size() -> usize {
    5
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            mixture: MixtureConfig::default(),
        }
    }
}

impl AlignerConfig {
    /// Default configuration with a different chunk size.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            ..Self::default()
        }
    }
}

/// Configuration for the synthetic pulse-train generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of pulses before any are dropped
    #[serde(default = "default_n_pulses")]
    pub n_pulses: usize,

    /// Half-open range `[lo, hi)` of integer inter-pulse intervals
    #[serde(default = "default_interval_range")]
    pub interval_range: [u64; 2],

    /// Standard deviation of the per-pulse jitter accumulated into sequence B
    #[serde(default = "default_noise_sd")]
    pub noise_sd: f64,

    /// Remove a different block of pulses from each sequence
    #[serde(default)]
    pub drop_pulses: bool,

    /// RNG seed
    #[serde(default)]
    pub seed: u64,
}

fn default_n_pulses() -> usize {
    1000
}

fn default_interval_range() -> [u64; 2] {
    [100, 1900]
}

fn default_noise_sd() -> f64 {
    3.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_pulses: default_n_pulses(),
            interval_range: default_interval_range(),
            noise_sd: default_noise_sd(),
            drop_pulses: false,
            seed: 0,
        }
    }
}

/// Configuration for diagnostic plots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Image width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Image height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Number of histogram bins
    #[serde(default = "default_bins")]
    pub bins: usize,
}

fn default_width() -> u32 {
    1000
}

fn default_height() -> u32 {
    1200
}

fn default_bins() -> usize {
    20
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            bins: default_bins(),
        }
    }
}

/// Main configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub aligner: AlignerConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_aligner_config() {
        let config = AlignerConfig::default();
        assert_eq!(config.chunk_size, 5);
        assert_eq!(config.mixture.max_iter, 100);
    }

    #[test]
    fn test_default_simulation_config() {
        let config = SimulationConfig::default();
        assert_eq!(config.n_pulses, 1000);
        assert_eq!(config.interval_range, [100, 1900]);
        assert!(!config.drop_pulses);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "aligner:\n  chunk_size: 8\nsimulation:\n  noise_sd: 1.5\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.aligner.chunk_size, 8);
        assert_eq!(config.aligner.mixture.tolerance, 1e-3);
        assert_eq!(config.simulation.noise_sd, 1.5);
        assert_eq!(config.simulation.n_pulses, 1000);
        assert_eq!(config.diagnostics.bins, 20);
    }

    #[test]
    fn test_yaml_roundtrip_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");

        let mut config = PipelineConfig::default();
        config.aligner.chunk_size = 7;
        config.simulation.seed = 42;
        config.to_yaml(&path).unwrap();

        let loaded = PipelineConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded.aligner.chunk_size, 7);
        assert_eq!(loaded.simulation.seed, 42);
    }
}
