//! Error types for the import pipeline and flag updater.

use std::time::Duration;

/// Errors that can occur while talking to HAL or Zotero.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed (network, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote service returned an error status code.
    #[error("Upstream error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    /// Malformed caller request.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Item does not exist in the Zotero library.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Zotero answered a read without a version stamp.
    #[error("Missing version for item {0}")]
    MissingVersion(String),

    /// The item changed since it was read.
    #[error("Version conflict on item {key} (expected version {version})")]
    VersionConflict { key: String, version: u64 },

    /// A write was refused or could not be delivered.
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Rate limited by the remote service (HTTP 429).
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Failed to parse a response body.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Message recorded in an import error descriptor.
    ///
    /// Upstream failures keep their status so the report stays useful
    /// without the logs.
    pub fn stage_message(&self) -> String {
        match self {
            Error::Upstream { status, message } if message.is_empty() => {
                format!("HTTP {}", status)
            }
            Error::Upstream { status, message } => format!("HTTP {}: {}", status, message),
            other => other.to_string(),
        }
    }
}

/// Convenience alias for Results using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_message_includes_status() {
        let err = Error::Upstream {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.stage_message(), "HTTP 502: bad gateway");

        let err = Error::Upstream {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.stage_message(), "HTTP 500");
    }

    #[test]
    fn test_stage_message_falls_back_to_display() {
        let err = Error::Parse("truncated".to_string());
        assert_eq!(err.stage_message(), "Failed to parse response: truncated");
    }
}
