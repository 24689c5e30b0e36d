//! Command-line interface for sync-pulse alignment.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::core::{load_pulse_times, write_converted_csv, write_correspondence_csv, write_pulse_times};
use crate::processors::aligner::Aligner;
use crate::processors::simulation::simulate_pulses;
use crate::visualization::plot_diagnostics;
use crate::{AlignerConfig, PipelineConfig};

#[derive(Parser)]
#[command(name = "rsync-aligner")]
#[command(about = "Align timestamps between two systems using random-interval sync pulses", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match pulses between two recordings and report alignment quality
    Align {
        /// CSV file with pulse times recorded by system A
        pulses_a: PathBuf,
        /// CSV file with pulse times recorded by system B
        pulses_b: PathBuf,
        /// Column holding the pulse times in file A
        #[arg(long)]
        column_a: Option<String>,
        /// Column holding the pulse times in file B
        #[arg(long)]
        column_b: Option<String>,
        /// Number of intervals per matched chunk
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Write correspondence CSVs to this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Write a diagnostics PNG to this path
        #[arg(long)]
        plot: Option<PathBuf>,
    },

    /// Convert event times from one system's reference frame to the other's
    Convert {
        /// CSV file with pulse times recorded by system A
        pulses_a: PathBuf,
        /// CSV file with pulse times recorded by system B
        pulses_b: PathBuf,
        /// CSV file with the times to convert
        times: PathBuf,
        /// Output CSV file
        output: PathBuf,
        /// Conversion direction
        #[arg(short, long, value_enum, default_value_t = Direction::AToB)]
        direction: Direction,
        /// Column holding the pulse times in file A
        #[arg(long)]
        column_a: Option<String>,
        /// Column holding the pulse times in file B
        #[arg(long)]
        column_b: Option<String>,
        /// Column holding the times to convert
        #[arg(long)]
        column: Option<String>,
        /// Number of intervals per matched chunk
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Generate a pair of drifting pulse trains for testing
    Simulate {
        /// Output directory for pulses_a.csv and pulses_b.csv
        output_dir: PathBuf,
        /// Number of pulses before any are dropped
        #[arg(long)]
        n_pulses: Option<usize>,
        /// Standard deviation of the per-pulse timing jitter
        #[arg(long)]
        noise_sd: Option<f64>,
        /// Remove a block of pulses from each sequence
        #[arg(long)]
        drop_pulses: bool,
        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Direction {
    /// From A's reference frame to B's
    AToB,
    /// From B's reference frame to A's
    BToA,
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<60} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 37 {
            format!("{}...", value.chars().take(34).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<37} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    let result = match cli.command {
        Commands::Align { pulses_a, pulses_b, column_a, column_b, chunk_size, output_dir, plot } => {
            cmd_align(
                &pulses_a,
                &pulses_b,
                column_a.as_deref(),
                column_b.as_deref(),
                chunk_size,
                output_dir.as_deref(),
                plot.as_deref(),
                &config,
            )
        }
        Commands::Convert {
            pulses_a,
            pulses_b,
            times,
            output,
            direction,
            column_a,
            column_b,
            column,
            chunk_size,
        } => {
            cmd_convert(
                &pulses_a,
                &pulses_b,
                &times,
                &output,
                direction,
                column_a.as_deref(),
                column_b.as_deref(),
                column.as_deref(),
                chunk_size,
                &config,
            )
        }
        Commands::Simulate { output_dir, n_pulses, noise_sd, drop_pulses, seed } => {
            cmd_simulate(&output_dir, n_pulses, noise_sd, drop_pulses, seed, &config)
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// CLI chunk size overrides the config file.
fn aligner_config(chunk_size: Option<usize>, config: &PipelineConfig) -> AlignerConfig {
    let mut aligner = config.aligner.clone();
    if let Some(cs) = chunk_size {
        aligner.chunk_size = cs;
    }
    aligner
}

/// Load both pulse files and build an aligner behind a spinner.
fn build_aligner(
    pulses_a: &Path,
    pulses_b: &Path,
    column_a: Option<&str>,
    column_b: Option<&str>,
    config: &AlignerConfig,
) -> Result<Aligner> {
    let times_a = load_pulse_times(pulses_a, column_a)
        .with_context(|| format!("Failed to load pulses from {}", pulses_a.display()))?;
    let times_b = load_pulse_times(pulses_b, column_b)
        .with_context(|| format!("Failed to load pulses from {}", pulses_b.display()))?;
    info!("Loaded {} pulses from A, {} pulses from B", times_a.len(), times_b.len());

    let spinner = create_spinner("Matching pulse chunks...");
    let aligner = Aligner::new(&times_a, &times_b, config);
    spinner.finish_and_clear();

    aligner.context("Alignment failed")
}

#[allow(clippy::too_many_arguments)]
fn cmd_align(
    pulses_a: &Path,
    pulses_b: &Path,
    column_a: Option<&str>,
    column_b: Option<&str>,
    chunk_size: Option<usize>,
    output_dir: Option<&Path>,
    plot: Option<&Path>,
    config: &PipelineConfig,
) -> Result<()> {
    let start = Instant::now();

    let aligner_config = aligner_config(chunk_size, config);
    let aligner = build_aligner(pulses_a, pulses_b, column_a, column_b, &aligner_config)?;
    let summary = aligner.summary();

    let mut items = vec![
        ("Pulses A", summary.n_pulses_a.to_string()),
        ("Pulses B", summary.n_pulses_b.to_string()),
        ("Chunk size", summary.chunk_size.to_string()),
        ("Chunks", summary.n_chunks.to_string()),
        ("Matched chunks", summary.n_matched.to_string()),
        ("Excluded chunks", summary.n_excluded.to_string()),
        ("Match fraction", format!("{:.1}%", summary.match_fraction * 100.0)),
        ("Matched pulses A", summary.matched_pulses_a.to_string()),
        ("Matched pulses B", summary.matched_pulses_b.to_string()),
    ];

    if let Some(dir) = output_dir {
        let cor_a_path = dir.join("cor_times_a.csv");
        let cor_b_path = dir.join("cor_times_b.csv");
        write_correspondence_csv(&cor_a_path, aligner.pulse_times_b(), aligner.cor_times_a())
            .with_context(|| format!("Failed to write {}", cor_a_path.display()))?;
        write_correspondence_csv(&cor_b_path, aligner.pulse_times_a(), aligner.cor_times_b())
            .with_context(|| format!("Failed to write {}", cor_b_path.display()))?;
        items.push(("Output directory", dir.display().to_string()));
    }

    if let Some(path) = plot {
        let spinner = create_spinner("Rendering diagnostics...");
        let plotted = plot_diagnostics(path, &aligner, &config.diagnostics);
        spinner.finish_and_clear();
        plotted.with_context(|| format!("Failed to plot diagnostics to {}", path.display()))?;
        items.push(("Diagnostics", path.display().to_string()));
    }

    items.push(("Duration", format!("{:.2?}", start.elapsed())));
    print_summary("Alignment Complete", &items);

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_convert(
    pulses_a: &Path,
    pulses_b: &Path,
    times: &Path,
    output: &Path,
    direction: Direction,
    column_a: Option<&str>,
    column_b: Option<&str>,
    column: Option<&str>,
    chunk_size: Option<usize>,
    config: &PipelineConfig,
) -> Result<()> {
    let start = Instant::now();

    let aligner_config = aligner_config(chunk_size, config);
    let aligner = build_aligner(pulses_a, pulses_b, column_a, column_b, &aligner_config)?;

    let queries = load_pulse_times(times, column)
        .with_context(|| format!("Failed to load times from {}", times.display()))?;
    let converted = match direction {
        Direction::AToB => aligner.a_to_b_many(&queries),
        Direction::BToA => aligner.b_to_a_many(&queries),
    };
    let n_converted = converted.iter().filter(|t| t.is_some()).count();
    if n_converted < queries.len() {
        warn!(
            "{} of {} times fall outside the matched span and were left empty",
            queries.len() - n_converted,
            queries.len()
        );
    }

    write_converted_csv(output, &queries, &converted)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    print_summary(
        "Conversion Complete",
        &[
            ("Direction", format!("{:?}", direction)),
            ("Input times", queries.len().to_string()),
            ("Converted", n_converted.to_string()),
            ("Output file", output.display().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

fn cmd_simulate(
    output_dir: &Path,
    n_pulses: Option<usize>,
    noise_sd: Option<f64>,
    drop_pulses: bool,
    seed: Option<u64>,
    config: &PipelineConfig,
) -> Result<()> {
    let mut sim_config = config.simulation.clone();
    if let Some(n) = n_pulses {
        sim_config.n_pulses = n;
    }
    if let Some(sd) = noise_sd {
        sim_config.noise_sd = sd;
    }
    if let Some(s) = seed {
        sim_config.seed = s;
    }
    sim_config.drop_pulses |= drop_pulses;

    let sim = simulate_pulses(&sim_config).context("Invalid simulation settings")?;

    let path_a = output_dir.join("pulses_a.csv");
    let path_b = output_dir.join("pulses_b.csv");
    write_pulse_times(&path_a, &sim.times_a)
        .with_context(|| format!("Failed to write {}", path_a.display()))?;
    write_pulse_times(&path_b, &sim.times_b)
        .with_context(|| format!("Failed to write {}", path_b.display()))?;

    print_summary(
        "Simulation Complete",
        &[
            ("Output directory", output_dir.display().to_string()),
            ("Pulses A", sim.times_a.len().to_string()),
            ("Pulses B", sim.times_b.len().to_string()),
            ("Noise SD", sim_config.noise_sd.to_string()),
            ("Dropped pulses", sim_config.drop_pulses.to_string()),
            ("Seed", sim_config.seed.to_string()),
        ],
    );

    Ok(())
}
