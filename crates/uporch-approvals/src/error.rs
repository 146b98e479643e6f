//! Error types for approval policy operations

use uporch_core::TransportError;

/// Approval policy operation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Remote call failed; nothing was invalidated
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl PolicyError {
    /// HTTP status code, if the server responded
    #[inline]
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport(err) => err.status_code(),
        }
    }
}

/// Result type alias for policy operations
pub type PolicyResult<T> = Result<T, PolicyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_conversion_keeps_status() {
        let err: PolicyError = TransportError::status(404, "missing").into();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "transport error: server returned 404: missing");
    }
}
