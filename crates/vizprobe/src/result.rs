//! Result and error types for vizprobe.

use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while driving a page
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Target locator did not resolve within the action timeout
    #[error("Element not found: {selector} (waited {timeout_ms}ms)")]
    ElementNotFound {
        /// Selector that failed to resolve
        selector: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Target resolved but stayed hidden or disabled
    #[error("Element not interactable: {selector} ({reason})")]
    ElementNotInteractable {
        /// Selector of the element
        selector: String,
        /// Why the element could not be used
        reason: String,
    },

    /// A wait condition never became true
    #[error("Timed out after {timeout_ms}ms waiting for {condition}")]
    Timeout {
        /// Description of the unmet condition
        condition: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// A dialog appeared while no interceptor was armed
    #[error("Unexpected {dialog_type} dialog: {message:?}")]
    UnexpectedDialog {
        /// Dialog type (alert, confirm, prompt, beforeunload)
        dialog_type: String,
        /// Dialog message
        message: String,
    },

    /// Error-severity diagnostics that no allowlist entry matched
    #[error("{count} unexpected error diagnostic(s): {}", entries.join("; "))]
    UnexpectedDiagnostic {
        /// Number of offending entries
        count: usize,
        /// Rendered offending entries
        entries: Vec<String>,
    },

    /// A dialog was required but none appeared
    #[error("No dialog seen within {timeout_ms}ms")]
    DialogNotSeen {
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// The underlying automation engine reported a failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid or failing scenario
    #[error("Scenario error: {message}")]
    Scenario {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HarnessError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a scenario error
    #[must_use]
    pub fn scenario(message: impl Into<String>) -> Self {
        Self::Scenario {
            message: message.into(),
        }
    }

    /// Whether this error came from a bounded wait expiring
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::ElementNotFound { .. } | Self::DialogNotSeen { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_names_condition() {
        let err = HarnessError::Timeout {
            condition: "text of #setContents equals \"apple\"".to_string(),
            timeout_ms: 2000,
        };
        let msg = err.to_string();
        assert!(msg.contains("2000ms"));
        assert!(msg.contains("#setContents"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_unexpected_diagnostic_lists_entries() {
        let err = HarnessError::UnexpectedDiagnostic {
            count: 2,
            entries: vec!["[error] boom".to_string(), "[pageerror] x".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "2 unexpected error diagnostic(s): [error] boom; [pageerror] x"
        );
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: HarnessError = io.into();
        assert!(matches!(err, HarnessError::Io(_)));
    }
}
