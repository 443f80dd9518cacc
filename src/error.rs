//! Error types and handling.

use thiserror::Error;

use crate::net::types::Status;

/// Library-wide error type.
#[derive(Error, Debug)]
pub enum SaneError {
    /// Underlying transport failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TCP connection could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Timed out waiting for the daemon.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Violation of wire-format expectations (bad pointer, truncated value,
    /// unknown enumeration where none is allowed).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The daemon answered an RPC with a non-GOOD status word.
    #[error("{operation} failed: {status}")]
    Status {
        /// RPC that produced the status.
        operation: &'static str,
        status: Status,
    },

    /// Missing or insufficient credentials for an authorization resource.
    #[error("Authorization failed: {0}")]
    Auth(String),

    /// API misuse caught before any bytes were written.
    #[error("Precondition violated: {0}")]
    Precondition(String),
}

/// Result type alias for SaneError
pub type Result<T> = std::result::Result<T, SaneError>;

impl SaneError {
    /// Create a protocol error with message
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a precondition error with message
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create an authorization error with message
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub(crate) fn from_status(operation: &'static str, status: Status) -> Self {
        Self::Status { operation, status }
    }

    /// The daemon status carried by this error, if it is a status error.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
