//! Error types for benchmark runs

use std::path::PathBuf;
use thiserror::Error;

/// Exit status used when GPU acceleration is requested but the bound
/// recognizer cannot process batches.
pub const EXIT_BATCH_UNSUPPORTED: u8 = 3;

/// Errors that can occur while configuring or running a benchmark
#[derive(Error, Debug)]
pub enum BenchError {
    /// Resolution argument did not name a known video tier
    #[error("Unknown resolution '{0}', expected one of vga, 720p, 1080p, 4k or all")]
    InvalidResolution(String),

    /// Host operating system has no known recognizer install layout
    #[error("Detected OS other than Linux or Windows: {0}")]
    UnsupportedOs(String),

    /// GPU mode requires batch processing from the recognizer binding
    #[error("GPU acceleration requested but recognizer {version} does not support batch processing")]
    BatchUnsupported {
        /// Version string reported by the recognizer
        version: String,
    },

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Recognizer, classifier or stream collaborator failed
    #[error("Engine error: {0}")]
    Engine(String),

    /// Benchmark asset could not be fetched
    #[error("Failed to download {url} to {}: {reason}", path.display())]
    Download {
        /// Remote location of the asset
        url: String,
        /// Local destination
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BenchError {
    /// Whether this error stems from how the run was configured rather than
    /// from something that went wrong while it was running.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidResolution(_)
                | Self::UnsupportedOs(_)
                | Self::BatchUnsupported { .. }
                | Self::InvalidConfig(_)
        )
    }

    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::BatchUnsupported { .. } => EXIT_BATCH_UNSUPPORTED,
            _ => 1,
        }
    }
}

/// Result type for benchmark operations
pub type BenchResult<T> = Result<T, BenchError>;
