//! Reconnecting JSON-RPC 2.0 client over line-framed byte streams
//!
//! This library provides a small, resilient JSON-RPC client: one outbound
//! connection, newline-delimited JSON framing, request/response correlation
//! by numeric id, keyed notification handlers and transparent reconnection
//! with a fixed (or exponential) delay. The [`snapcast`] module builds a
//! typed Snapserver control client on top of it.
//!
//! ```no_run
//! use serde_json::Value;
//! use snapcast_rpc::RpcClientBuilder;
//!
//! # async fn example() -> snapcast_rpc::Result<()> {
//! let client = RpcClientBuilder::new("127.0.0.1:1705")
//!     .on_disconnect(|cause| async move { eprintln!("lost connection: {cause:?}") })
//!     .connect()?;
//!
//! let status: Value = client.call("Server.GetStatus", ()).await?;
//! println!("{status}");
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

// Import all sub modules once...
mod macros;

mod client;
mod client_builder;
mod domain;
mod transport;

mod correlation;
mod error;
mod retry;
mod rpc_config;

pub mod protocol;
pub mod snapcast;

#[allow(unused_imports)]
pub(crate) use macros::{
    // ---
    log_debug,
    log_error,
    log_info,
    log_trace,
    log_warn,
};

// Re-export main types
pub use client::{ConnectionState, RpcClient};
pub use client_builder::RpcClientBuilder;

pub use retry::{ReconnectPolicy, DEFAULT_RECONNECT_DELAY};
pub use rpc_config::{
    // ---
    RpcConfig,
    DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_MAX_LINE_LEN,
    DEFAULT_QUEUE_CAPACITY,
    DEFAULT_REQUEST_TIMEOUT,
};

pub use correlation::RequestId;
pub use error::{RemoteError, Result, RpcError};

pub use transport::{MemoryDialer, MemoryListener, TcpDialer};

// --- public re-exports
pub use domain::{
    //
    BoxedStream,
    ByteStream,
    Dialer,
    DialerPtr,
};
