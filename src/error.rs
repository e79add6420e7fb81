//! Error types for Heimdallr.
//!
//! Errors are strongly typed using thiserror. They surface only where the
//! caller can act on them: client construction, option parsing and
//! transports. Once a client is live the pipeline logs and swallows failures.

use thiserror::Error;

/// Errors raised while binding options into a client context.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing app in options")]
    MissingApp,

    #[error("Missing dsn host in options")]
    MissingHost,

    #[error("Failed to parse options: {message}")]
    Parse {
        message: String,
    },
}

/// Errors that prevent a client from becoming live.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Client does not match the environment")]
    EnvironmentMismatch,

    #[error("Invalid options: {0}")]
    InvalidOptions(#[from] ConfigError),
}

/// Transport errors raised while delivering a report.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Failed to serialize report: {message}")]
    Serialization {
        message: String,
    },

    #[error("Failed to send report to {url}: {message}")]
    SendFailed {
        url: String,
        message: String,
    },

    #[error("Report queue is full (capacity {capacity})")]
    QueueFull {
        capacity: usize,
    },

    #[error("Report queue is disconnected")]
    Disconnected,
}

/// Top-level error type for Heimdallr.
///
/// Returned by entry points that both read and bind options, such as
/// `Client::from_json`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeimdallrError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

impl HeimdallrError {
    /// Returns true if the caller's options are at fault.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Client(ClientError::InvalidOptions(_))
        )
    }
}

/// Result type alias for Heimdallr operations.
pub type HeimdallrResult<T> = Result<T, HeimdallrError>;
