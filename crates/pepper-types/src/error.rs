//! Relay error taxonomy.

use thiserror::Error;

/// Coarse classification of a relay failure, kept on [`crate::SpeakResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Timeout,
    Backend,
    Protocol,
    CapabilityUnavailable,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The endpoint could not be reached at the network level.
    #[error("connection error: {0}")]
    Connection(String),

    /// The call exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// A reachable endpoint answered with a non-success status.
    #[error("backend returned HTTP {status}")]
    Backend { status: u16 },

    /// The endpoint answered with a body of unexpected shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The legacy SDK is not available in this process.
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connection,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Backend { .. } => ErrorKind::Backend,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::CapabilityUnavailable(_) => ErrorKind::CapabilityUnavailable,
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RelayError::Timeout(e.to_string())
        } else if e.is_decode() {
            RelayError::Protocol(e.to_string())
        } else if let Some(status) = e.status() {
            RelayError::Backend {
                status: status.as_u16(),
            }
        } else {
            RelayError::Connection(e.to_string())
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::Protocol(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(RelayError::Backend { status: 503 }.kind(), ErrorKind::Backend);
        assert_eq!(
            RelayError::CapabilityUnavailable("no sdk".into()).kind(),
            ErrorKind::CapabilityUnavailable
        );
        assert_eq!(RelayError::Timeout("t".into()).kind(), ErrorKind::Timeout);
    }

    #[test]
    fn backend_error_message_carries_status() {
        let err = RelayError::Backend { status: 404 };
        assert_eq!(err.to_string(), "backend returned HTTP 404");
    }

    #[test]
    fn json_errors_are_protocol_errors() {
        let err: RelayError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
