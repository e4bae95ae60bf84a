use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{RemoteError, RequestId};

/// Value of the `jsonrpc` member on every message.
pub const PROTOCOL_VERSION: &str = "2.0";

fn protocol_version() -> String {
    PROTOCOL_VERSION.to_string()
}

/// A method call sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "protocol_version")]
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,

    /// Omitted from the wire when `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    // ---

    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        // ---
        Self {
            jsonrpc: protocol_version(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// The server's answer to a [`Request`].
///
/// A missing `jsonrpc` member is tolerated on input; some servers leave it
/// out of their replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default = "protocol_version")]
    pub jsonrpc: String,
    pub id: RequestId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl Response {
    // ---

    /// Build a success response.
    pub fn success(id: RequestId, result: Value) -> Self {
        // ---
        Self {
            jsonrpc: protocol_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    pub fn failure(id: RequestId, error: RemoteError) -> Self {
        // ---
        Self {
            jsonrpc: protocol_version(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Split into the result payload or the remote error.
    ///
    /// An error object wins over a result. A response carrying neither
    /// yields `null`.
    pub fn into_result(self) -> std::result::Result<Value, RemoteError> {
        // ---
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A server-initiated message that expects no reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default = "protocol_version")]
    pub jsonrpc: String,
    pub method: String,

    #[serde(default)]
    pub params: Value,
}

impl Notification {
    // ---

    pub fn new(method: impl Into<String>, params: Value) -> Self {
        // ---
        Self {
            jsonrpc: protocol_version(),
            method: method.into(),
            params,
        }
    }
}

/// Classification of one inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Carries both `id` and `method`: a call made by the server.
    Request(Request),

    /// Carries `id` but no `method`.
    Response(Response),

    /// Carries `method` but no `id`.
    Notification(Notification),

    /// Carries a numeric `id` but the rest of the response did not decode.
    /// The call waiting on that id is failed rather than left to time out.
    InvalidResponse(RequestId, String),

    /// Anything else. The string says why.
    Malformed(String),
}
