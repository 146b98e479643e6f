//! Error types for the upgrade orchestrator
//!
//! Provides error handling for:
//! - Transport failures reported by any remote call
//! - Upgrade submission failures (missing credential, rejected command)
//! - Configuration loading

use std::path::PathBuf;

/// Failure talking to the remote API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Request could not be sent or no response was received
    #[error("request failed: {0}")]
    Request(String),

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Server answered with a non-success status
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Create status error
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// HTTP status code, if the server responded
    #[inline]
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the next poll may reasonably succeed
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

/// Main orchestrator error type
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// No private key in local credential storage
    #[error("Private key not found")]
    MissingCredential,

    /// Remote call failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Upgrade command was not accepted by the server
    #[error("upgrade request failed: {0}")]
    UpgradeRejected(#[source] TransportError),

    /// Controller was unmounted before the operation finished
    #[error("controller is not mounted")]
    NotMounted,
}

impl OrchestratorError {
    /// Whether a notification was already shown to the user for this error
    ///
    /// Missing credentials and rejected upgrade submissions notify directly;
    /// status query failures are left to the caller.
    #[inline]
    #[must_use]
    pub fn is_user_notified(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::UpgradeRejected(_))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error during file read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Value failed validation
    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    /// Create invalid value error
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Result type alias for orchestrator operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_display_matches_notification_text() {
        assert_eq!(
            OrchestratorError::MissingCredential.to_string(),
            "Private key not found"
        );
    }

    #[test]
    fn transport_status_display() {
        let err = TransportError::status(403, "forbidden");
        assert_eq!(err.to_string(), "server returned 403: forbidden");
        assert_eq!(err.status_code(), Some(403));
    }

    #[test]
    fn transient_classification() {
        assert!(TransportError::Timeout.is_transient());
        assert!(TransportError::status(503, "").is_transient());
        assert!(!TransportError::status(400, "").is_transient());
        assert!(!TransportError::Decode("eof".into()).is_transient());
    }

    #[test]
    fn error_conversions() {
        let err: OrchestratorError = TransportError::Timeout.into();
        assert!(matches!(err, OrchestratorError::Transport(_)));
        assert!(!err.is_user_notified());
        assert!(OrchestratorError::UpgradeRejected(TransportError::Timeout).is_user_notified());
    }
}
