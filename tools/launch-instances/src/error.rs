//! Error types for instance provisioning

use thiserror::Error;

/// Errors that can occur while launching benchmark instances
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Setup script selector other than GA or latest
    #[error("Version must be GA or latest, received {0}")]
    UnknownVersion(String),

    /// Instance type missing from the benchmark catalog
    #[error("Instance type {0} is not in the benchmark catalog")]
    UnknownInstanceType(String),

    /// Cloud CLI could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Cloud CLI exited unsuccessfully
    #[error("Command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    /// Cloud CLI output did not contain an instance id
    #[error("Unexpected run-instances response: {0}")]
    MalformedResponse(String),

    /// JSON deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LaunchError {
    /// Whether the error comes from the arguments rather than from a launch.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownVersion(_) | Self::UnknownInstanceType(_)
        )
    }
}

/// Result type for provisioning operations
pub type LaunchResult<T> = Result<T, LaunchError>;
