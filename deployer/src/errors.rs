//! Error types for the deployer
//!
//! Every variant is fatal: the pipeline never retries, the error travels up to
//! `main` which reports it and terminates the run.

use thiserror::Error;

/// Main error type for the deployer
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Pattern error: {0}")]
    PatternError(#[from] regex::Error),

    /// A required file, directory or environment variable is missing
    #[error("{0}")]
    Precondition(String),

    /// The manifest matched no known packaging, or a guarded one without override
    #[error("{0}")]
    Classification(String),

    /// The build command exited non-zero or was killed by a signal
    #[error("Unable to build ({status})")]
    BuildFailed { status: String, tail: Vec<String> },

    /// Installed toolchain is older than the manifest requires
    #[error("Java {installed} is installed but the project requires Java {required}")]
    ToolchainMismatch { installed: u32, required: u32 },

    #[error("No war found in {0}")]
    NoArtifact(String),

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DeployError {
    /// Trailing build output worth showing before the error message
    pub fn diagnostics(&self) -> &[String] {
        match self {
            DeployError::BuildFailed { tail, .. } => tail,
            _ => &[],
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        1
    }
}
