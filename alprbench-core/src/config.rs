//! Benchmark configuration: resolution tiers and the immutable run settings.

use crate::engine::EngineSettings;
use crate::error::{BenchError, BenchResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Named video quality tier used as the benchmarking dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "vga")]
    Vga,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "4k")]
    Uhd4k,
}

impl Resolution {
    /// Every tier, in the order they are benchmarked.
    pub const ALL: [Self; 4] = [Self::Vga, Self::Hd720, Self::Hd1080, Self::Uhd4k];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vga => "vga",
            Self::Hd720 => "720p",
            Self::Hd1080 => "1080p",
            Self::Uhd4k => "4k",
        }
    }

    /// Name of the benchmark video for this tier on the asset endpoint.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.mp4", self.name())
    }

    /// Frame width and height in pixels.
    #[must_use]
    pub const fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Vga => (640, 480),
            Self::Hd720 => (1280, 720),
            Self::Hd1080 => (1920, 1080),
            Self::Uhd4k => (3840, 2160),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resolution {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|res| res.name() == needle)
            .ok_or_else(|| BenchError::InvalidResolution(s.to_string()))
    }
}

/// Parse a resolution argument: `all`, a single tier, or a comma-separated list.
///
/// The result is deduplicated and kept in benchmark order regardless of the
/// order the tiers were named in.
///
/// # Errors
///
/// Returns `BenchError::InvalidResolution` for any unknown tier or an empty list.
pub fn parse_resolutions(arg: &str) -> BenchResult<Vec<Resolution>> {
    if arg.trim().eq_ignore_ascii_case("all") {
        return Ok(Resolution::ALL.to_vec());
    }

    let mut requested = arg
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(Resolution::from_str)
        .collect::<BenchResult<Vec<_>>>()?;

    if requested.is_empty() {
        return Err(BenchError::InvalidResolution(arg.to_string()));
    }

    requested.sort_unstable();
    requested.dedup();
    Ok(requested)
}

/// Immutable configuration for one benchmark run.
///
/// Built once at startup and only read afterwards.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Stream count for the first experiment
    pub start_streams: usize,
    /// Streams added each time the CPU threshold is not reached
    pub step: usize,
    /// Tiers to benchmark, processed sequentially
    pub resolutions: Vec<Resolution>,
    /// Target lowest average CPU utilisation (percent); 0 disables growth
    pub cpu_threshold: f64,
    /// Run the single-threaded batch loop instead of the worker pool
    pub gpu: bool,
    /// Frames per batch in GPU mode
    pub gpu_batch_size: usize,
    /// Recognizer region
    pub country: String,
    /// Recognizer configuration file
    pub config_path: PathBuf,
    /// Recognizer runtime data directory
    pub runtime_path: PathBuf,
    /// Suppress everything but the final results
    pub quiet: bool,
    /// Worker threads per resolution pass
    pub workers: usize,
    /// Bounded frame queue depth per stream
    pub queue_capacity: usize,
    /// Sleep when the drawn stream has nothing queued
    pub poll_interval: Duration,
    /// Sample CPU utilisation whenever the frame counter is a multiple of this
    pub cpu_sample_every: u64,
    /// Upper bound on stream count growth during adaptive search
    pub stream_ceiling: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            start_streams: 1,
            step: 1,
            resolutions: Resolution::ALL.to_vec(),
            cpu_threshold: 0.0,
            gpu: false,
            gpu_batch_size: 10,
            country: "us".to_string(),
            config_path: PathBuf::from("/usr/share/openalpr/config/openalpr.defaults.conf"),
            runtime_path: PathBuf::from("/usr/share/openalpr/runtime_data"),
            quiet: false,
            workers: num_cpus::get(),
            queue_capacity: 10,
            poll_interval: Duration::from_millis(100),
            cpu_sample_every: 10,
            stream_ceiling: 256,
        }
    }
}

impl BenchmarkConfig {
    /// Check value ranges before any experiment is started.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> BenchResult<()> {
        let invalid = |msg: String| Err(BenchError::InvalidConfig(msg));

        if self.resolutions.is_empty() {
            return invalid("at least one resolution is required".to_string());
        }
        if self.start_streams == 0 {
            return invalid("starting stream count must be at least 1".to_string());
        }
        if self.step == 0 {
            return invalid("step must be at least 1".to_string());
        }
        if self.workers == 0 {
            return invalid("worker count must be at least 1".to_string());
        }
        if self.gpu_batch_size == 0 {
            return invalid("GPU batch size must be at least 1".to_string());
        }
        if self.queue_capacity == 0 {
            return invalid("stream queue capacity must be at least 1".to_string());
        }
        if self.cpu_sample_every == 0 {
            return invalid("CPU sample cadence must be at least 1".to_string());
        }
        if !self.cpu_threshold.is_finite() || self.cpu_threshold < 0.0 {
            return invalid(format!(
                "CPU threshold must be a non-negative percentage, got {}",
                self.cpu_threshold
            ));
        }
        if self.stream_ceiling < self.start_streams {
            return invalid(format!(
                "stream ceiling {} is below the starting stream count {}",
                self.stream_ceiling, self.start_streams
            ));
        }
        Ok(())
    }

    /// Whether the adaptive stream growth loop is enabled.
    #[must_use]
    pub fn is_adaptive(&self) -> bool {
        self.cpu_threshold > 0.0
    }

    /// Batch size the shared counter advances by per valid result.
    #[must_use]
    pub const fn frames_per_result(&self) -> u64 {
        if self.gpu { self.gpu_batch_size as u64 } else { 1 }
    }

    /// Collaborator construction parameters derived from this configuration.
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            country: self.country.clone(),
            config_path: self.config_path.clone(),
            runtime_path: self.runtime_path.clone(),
            gpu: self.gpu,
            batch_size: self.gpu_batch_size,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn all_expands_to_every_tier() {
        assert_eq!(parse_resolutions("all").unwrap(), Resolution::ALL.to_vec());
        assert_eq!(parse_resolutions("ALL").unwrap(), Resolution::ALL.to_vec());
    }

    #[test]
    fn comma_list_is_trimmed_and_ordered() {
        let parsed = parse_resolutions("4k, vga,720p,vga").unwrap();
        assert_eq!(
            parsed,
            vec![Resolution::Vga, Resolution::Hd720, Resolution::Uhd4k]
        );
    }

    #[test]
    fn unknown_resolution_is_rejected() {
        let err = parse_resolutions("vga,8k").unwrap_err();
        assert!(matches!(err, BenchError::InvalidResolution(ref r) if r == "8k"));
        assert!(parse_resolutions(" , ").is_err());
    }

    #[test]
    fn file_names_match_endpoint_layout() {
        assert_eq!(Resolution::Hd1080.file_name(), "1080p.mp4");
        assert_eq!(Resolution::Uhd4k.to_string(), "4k");
    }

    #[test]
    fn default_config_is_valid() {
        let config = BenchmarkConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_adaptive());
        assert_eq!(config.frames_per_result(), 1);
    }

    #[test]
    fn zero_step_is_rejected() {
        let config = BenchmarkConfig {
            step: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BenchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn ceiling_below_start_is_rejected() {
        let config = BenchmarkConfig {
            start_streams: 8,
            stream_ceiling: 4,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn gpu_mode_counts_whole_batches() {
        let config = BenchmarkConfig {
            gpu: true,
            gpu_batch_size: 16,
            ..Default::default()
        };
        assert_eq!(config.frames_per_result(), 16);
        assert!(config.engine_settings().gpu);
    }
}
