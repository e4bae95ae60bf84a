use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error object carried in a JSON-RPC response.
///
/// Returned to the caller (wrapped in [`RpcError::Remote`]) when the server
/// reports an RPC-level failure. It never affects the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    /// JSON-RPC error code (e.g. `-32601` for "Method not found").
    pub code: i64,

    /// Human readable message. Empty when the server left it out.
    #[serde(default)]
    pub message: String,

    /// Optional structured details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote error: {} (code {})", self.message, self.code)
    }
}

impl std::error::Error for RemoteError {}

/// Errors that can occur during RPC operations
#[derive(Error, Debug)]
pub enum RpcError {
    /// The connection dropped while the call was waiting for its response.
    #[error("disconnected while waiting for response")]
    Disconnected,

    /// The client has been closed; no I/O was attempted.
    #[error("client has been closed")]
    Closed,

    /// The caller's deadline elapsed before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a JSON-RPC error object.
    #[error("{0}")]
    Remote(RemoteError),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Dial, read or write failure on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An inbound line could not be decoded. Returned to a caller only when
    /// the line carried that call's id.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// An inbound line exceeded the configured maximum length.
    #[error("inbound line exceeds {0} bytes")]
    FrameTooLarge(usize),

    /// `connect()` was called on a client that is already running.
    #[error("client is already connected or connecting")]
    AlreadyConnected,

    /// The server accepted a call but echoed back something other than what was asked for.
    #[error("unexpected result: {0}")]
    UnexpectedResult(String),
}

impl RpcError {
    // ---

    /// JSON-RPC error code when this is a [`RpcError::Remote`].
    pub fn remote_code(&self) -> Option<i64> {
        // ---
        match self {
            RpcError::Remote(err) => Some(err.code),
            _ => None,
        }
    }

    /// True for failures of the connection itself (as opposed to a
    /// particular call).
    pub fn is_transport(&self) -> bool {
        // ---
        matches!(
            self,
            RpcError::Disconnected | RpcError::Io(_) | RpcError::FrameTooLarge(_)
        )
    }
}

impl From<RemoteError> for RpcError {
    fn from(err: RemoteError) -> Self {
        RpcError::Remote(err)
    }
}

/// Result type alias for RPC operations
pub type Result<T> = std::result::Result<T, RpcError>;

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_remote_error_display() {
        // ---
        let err = RpcError::from(RemoteError {
            code: -32601,
            message: "Method not found".to_string(),
            data: None,
        });

        assert_eq!(err.to_string(), "remote error: Method not found (code -32601)");
        assert_eq!(err.remote_code(), Some(-32601));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_classification() {
        // ---
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(RpcError::from(io).is_transport());
        assert!(RpcError::Disconnected.is_transport());
        assert!(!RpcError::Closed.is_transport());
        assert!(!RpcError::Timeout.is_transport());
        assert_eq!(RpcError::Timeout.remote_code(), None);
    }
}
