//! Crate-wide error types.
//!
//! Errors are data at the core boundary: scan-level failures carry a kind
//! the caller can dispatch on, opportunity-level rejections never surface
//! here (they live on the opportunity's validation trail).

use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required field or environment variable is missing.
    #[error("missing configuration: {field}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field value is present but invalid.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed as TOML.
    #[error("failed to parse configuration file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors produced by the scanner core.
#[derive(Error, Debug)]
pub enum Error {
    /// Venue data unreachable after all retries. Fatal for the scan.
    #[error("market source unavailable after {attempts} attempts: {reason}")]
    SourceUnavailable {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Description of the last failure.
        reason: String,
    },

    /// A page or field from the venue could not be decoded. The offending
    /// record is skipped and a warning recorded; the scan continues.
    #[error("malformed market source data: {0}")]
    SourceFormat(String),

    /// The per-scan LLM call budget is spent; remaining pairs are skipped.
    #[error("analyzer call budget exhausted")]
    AnalyzerBudgetExhausted,

    /// Scan canceled by the caller. Opportunities accepted before the
    /// cancel signal remain valid.
    #[error("scan canceled")]
    Canceled,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connection-level failure (non-HTTP transport detail).
    #[error("connection error: {0}")]
    Connection(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encode/decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error (snapshot cache).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Free-form parse failure on a venue or LLM payload.
    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// True when the error is worth retrying under backoff.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            Self::Connection(_) => true,
            _ => false,
        }
    }
}

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_unavailable_mentions_attempts() {
        let err = Error::SourceUnavailable {
            attempts: 3,
            reason: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn config_missing_field_names_the_field() {
        let err = Error::Config(ConfigError::MissingField {
            field: "LLM_API_KEY",
        });
        assert!(err.to_string().contains("LLM_API_KEY"));
    }

    #[test]
    fn connection_errors_are_transient() {
        assert!(Error::Connection("reset".into()).is_transient());
        assert!(!Error::Canceled.is_transient());
        assert!(!Error::SourceFormat("bad json".into()).is_transient());
    }
}
