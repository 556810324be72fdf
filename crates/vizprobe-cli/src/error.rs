//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// A scenario file could not be loaded
    #[error("Invalid scenario {path}: {message}")]
    InvalidScenario {
        /// Scenario file
        path: String,
        /// Error message
        message: String,
    },

    /// One or more scenarios failed
    #[error("{failed} of {total} scenario(s) failed")]
    ScenariosFailed {
        /// Failed scenarios
        failed: usize,
        /// Scenarios run
        total: usize,
    },

    /// Built without a browser backend
    #[error("Browser support not enabled. Rebuild with --features browser")]
    BrowserUnavailable,

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Harness library error
    #[error("{0}")]
    Harness(#[from] vizprobe::HarnessError),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create an invalid scenario error
    #[must_use]
    pub fn invalid_scenario(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidScenario {
            path: path.into(),
            message: message.into(),
        }
    }
}
