//! Snapcast control layer.
//!
//! A thin, typed wrapper over [`RpcClient`](crate::RpcClient) for the
//! Snapserver JSON-RPC control API (protocol v2). Method names and payload
//! shapes follow the server's documented API; only the calls needed to
//! inspect groups and streams and to switch a group's stream are wrapped.
//! Anything else is reachable through [`SnapcastClient::rpc`].

mod client;
mod messages;
pub mod methods;

pub use client::SnapcastClient;
pub use messages::{Group, RpcVersion, Speaker, Stream, StreamId, Volume};

/// Default TCP port of the Snapserver control API.
pub const DEFAULT_PORT: u16 = 1705;
