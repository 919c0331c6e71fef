//! Command-line arguments

use crate::config::Settings;
use alprbench_core::host::OperatingSystem;
use alprbench_core::{BenchResult, BenchmarkConfig, parse_resolutions};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "alprbench", version)]
#[command(
    about = "Measure ALPR throughput and CPU utilisation across concurrent video streams",
    long_about = None
)]
pub struct Cli {
    /// CSV file to append results to
    pub output: Option<PathBuf>,

    /// Use GPU acceleration (single-threaded batch processing)
    #[arg(short, long)]
    pub gpu: bool,

    /// Print only the final results table
    #[arg(short, long)]
    pub quiet: bool,

    /// Resolutions to test: vga, 720p, 1080p, 4k, a comma list, or all
    #[arg(short, long, default_value = "all")]
    pub resolution: String,

    /// Starting number of camera streams to simulate
    #[arg(short, long, default_value_t = 1)]
    pub streams: usize,

    /// Target for lowest average CPU utilization (0 runs a single experiment)
    #[arg(short, long, default_value_t = 0.0)]
    pub thres: f64,

    /// Number of streams to add each time thres is not achieved
    #[arg(long, default_value_t = 1)]
    pub step: usize,

    /// Frames per batch in GPU mode
    #[arg(long, default_value_t = 10)]
    pub batch_size: usize,

    /// Recognizer configuration file (defaults to the platform install)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Recognizer runtime data directory (defaults to the platform install)
    #[arg(long)]
    pub runtime: Option<PathBuf>,

    /// Worker threads per resolution (defaults to logical CPUs)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Stop growing the stream count past this value
    #[arg(long)]
    pub max_streams: Option<usize>,

    /// Settings file layered over the built-in defaults
    #[arg(long, env = "ALPRBENCH_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Default filter directive for the log subscriber.
    #[must_use]
    pub fn log_directive(&self) -> &str {
        if self.quiet { "warn" } else { &self.log_level }
    }

    /// Resolve flags over settings over platform defaults.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::InvalidResolution` or `BenchError::InvalidConfig`.
    pub fn benchmark_config(
        &self,
        os: OperatingSystem,
        settings: &Settings,
    ) -> BenchResult<BenchmarkConfig> {
        let mut config = BenchmarkConfig {
            start_streams: self.streams,
            step: self.step,
            resolutions: parse_resolutions(&self.resolution)?,
            cpu_threshold: self.thres,
            gpu: self.gpu,
            gpu_batch_size: self.batch_size,
            config_path: self
                .config
                .clone()
                .unwrap_or_else(|| os.default_config_path()),
            runtime_path: self
                .runtime
                .clone()
                .unwrap_or_else(|| os.default_runtime_path()),
            quiet: self.quiet,
            ..BenchmarkConfig::default()
        };
        settings.harness.apply(&mut config);
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(ceiling) = self.max_streams {
            config.stream_ceiling = ceiling;
        }
        config.validate()?;
        Ok(config)
    }
}
