//! JSON-RPC 2.0 wire types and line framing.
//!
//! Every message travels as one JSON document terminated by a line break.
//! Outbound frames end in `\r\n`; inbound frames are split on `\n` and any
//! trailing `\r` or whitespace is ignored.
mod codec;
mod message;

pub use codec::{decode, encode};
pub(crate) use codec::LineReader;
pub use message::{Inbound, Notification, Request, Response, PROTOCOL_VERSION};
