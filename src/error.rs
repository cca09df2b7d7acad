//! Error types for the dump orchestrator.

use std::time::Duration;
use thiserror::Error;

/// Stage of a dump run that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    Filesystem,
    Execution,
    Config,
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::Filesystem => "filesystem precondition",
            Stage::Execution => "execution",
            Stage::Config => "configuration",
            Stage::Report => "report",
        };
        f.write_str(name)
    }
}

/// Main error type for dump operations.
#[derive(Error, Debug)]
pub enum DumpError {
    /// Malformed or contradictory options bag
    #[error("{0}")]
    Validation(String),

    /// Output directory or defaults file is missing
    #[error("{0}")]
    Filesystem(String),

    /// The shell pipeline exited non-zero. Carries the captured stderr verbatim.
    #[error("{0}")]
    Execution(String),

    /// The shell could not be started
    #[error("Failed to start shell: {0}")]
    Spawn(#[source] std::io::Error),

    /// The pipeline ran past its time limit and was killed
    #[error("The process exceeded the timeout of {} seconds.", .0.as_secs_f64())]
    Timeout(Duration),

    /// Job file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (artifact inspection, report writing)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DumpError {
    /// Stage in which the error was raised.
    pub fn stage(&self) -> Stage {
        match self {
            DumpError::Validation(_) => Stage::Validation,
            DumpError::Filesystem(_) => Stage::Filesystem,
            DumpError::Execution(_) | DumpError::Spawn(_) | DumpError::Timeout(_) => {
                Stage::Execution
            }
            DumpError::Config(_) => Stage::Config,
            DumpError::Io(_) | DumpError::Json(_) => Stage::Report,
        }
    }

    /// True when the error was raised before any process was spawned.
    pub fn is_precondition(&self) -> bool {
        matches!(self.stage(), Stage::Validation | Stage::Filesystem)
    }
}

/// Result type alias for dump operations.
pub type Result<T> = std::result::Result<T, DumpError>;
