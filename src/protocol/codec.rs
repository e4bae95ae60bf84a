use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use super::message::{Inbound, Notification, Request, Response};
use crate::{Result, RpcError};

/// Line terminator appended to every outbound frame.
const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Encode one message as a single terminated line.
///
/// # Errors
///
/// Returns `RpcError::Serialization` if the message cannot be represented as
/// JSON.
pub fn encode<T: Serialize>(message: &T) -> Result<Bytes> {
    // ---
    let json = serde_json::to_vec(message)?;

    let mut frame = BytesMut::with_capacity(json.len() + LINE_TERMINATOR.len());
    frame.put_slice(&json);
    frame.put_slice(LINE_TERMINATOR);

    Ok(frame.freeze())
}

/// Classify one inbound line.
///
/// Decoding is best effort and never fails: anything that is not a JSON
/// object with a recognisable combination of `id` and `method` comes back as
/// [`Inbound::Malformed`]. A `null` id counts as absent.
pub fn decode(line: &[u8]) -> Inbound {
    // ---
    let value: Value = match serde_json::from_slice(line.trim_ascii()) {
        Ok(value) => value,
        Err(err) => return Inbound::Malformed(format!("invalid JSON: {err}")),
    };

    let Value::Object(object) = value else {
        return Inbound::Malformed("not a JSON object".to_string());
    };

    let has_id = object.get("id").is_some_and(|id| !id.is_null());
    let has_method = object.contains_key("method");

    match (has_id, has_method) {
        (true, false) => {
            let id = object.get("id").cloned();
            match classify::<Response>(object, "response") {
                Ok(response) => Inbound::Response(response),
                Err(reason) => match id.and_then(|id| serde_json::from_value(id).ok()) {
                    Some(id) => Inbound::InvalidResponse(id, reason),
                    None => Inbound::Malformed(reason),
                },
            }
        }
        (false, true) => classify::<Notification>(object, "notification")
            .map_or_else(Inbound::Malformed, Inbound::Notification),
        (true, true) => {
            classify::<Request>(object, "request").map_or_else(Inbound::Malformed, Inbound::Request)
        }
        (false, false) => Inbound::Malformed("message has neither id nor method".to_string()),
    }
}

fn classify<T>(object: Map<String, Value>, kind: &str) -> std::result::Result<T, String>
where
    T: serde::de::DeserializeOwned,
{
    // ---
    serde_json::from_value(Value::Object(object)).map_err(|err| format!("invalid {kind}: {err}"))
}

/// Splits a byte stream into `\n`-terminated lines with a length cap.
///
/// The cap protects against a peer that never sends a line break. Once it is
/// exceeded the stream cannot be re-synchronised, so the error is terminal for
/// the connection.
pub(crate) struct LineReader<R> {
    // ---
    inner: BufReader<R>,
    line: Vec<u8>,
    max_len: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    // ---

    pub(crate) fn new(reader: R, max_len: usize) -> Self {
        // ---
        Self {
            inner: BufReader::new(reader),
            line: Vec::new(),
            max_len,
        }
    }

    /// Read the next line, terminator included.
    ///
    /// Returns `Ok(None)` at end of stream. A trailing fragment without a
    /// line break is discarded.
    pub(crate) async fn next_line(&mut self) -> Result<Option<&[u8]>> {
        // ---
        self.line.clear();

        loop {
            let available = self.inner.fill_buf().await?;

            if available.is_empty() {
                if !self.line.is_empty() {
                    crate::log_debug!(
                        "discarding {} trailing bytes without line break",
                        self.line.len()
                    );
                }
                return Ok(None);
            }

            let (complete, used) = match available.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    self.line.extend_from_slice(&available[..=pos]);
                    (true, pos + 1)
                }
                None => {
                    self.line.extend_from_slice(available);
                    (false, available.len())
                }
            };
            self.inner.consume(used);

            if self.line.len() > self.max_len {
                return Err(RpcError::FrameTooLarge(self.max_len));
            }

            if complete {
                return Ok(Some(&self.line));
            }
        }
    }
}
