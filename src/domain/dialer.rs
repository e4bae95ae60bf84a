// src/domain/dialer.rs

//! Dialer domain abstraction.
//!
//! The connector needs exactly one thing from the outside world: a fresh,
//! bidirectional byte stream to the peer every time it (re)connects. This
//! module defines that contract without reference to sockets, addresses or
//! any particular runtime type.
//!
//! Framing, correlation and reconnect policy are handled by the client core;
//! a dialer knows nothing about JSON-RPC.
//!
//! Concrete implementations live under `src/transport/`.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream the client can own for one connection.
pub trait ByteStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> ByteStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Type-erased stream handed from a [`Dialer`] to the connector.
pub type BoxedStream = Box<dyn ByteStream>;

/// Source of connections to a single peer.
///
/// Implementations must ensure that:
/// - every successful `dial()` returns an independent stream; the connector
///   drops the previous one before dialing again,
/// - a failed `dial()` leaves the dialer usable for the next attempt,
/// - `dial()` does not retry internally; backoff is the connector's job.
///
/// # Notes
///
/// This trait uses `async_trait`; treat `dial` as a normal `async fn`.
#[async_trait::async_trait]
pub trait Dialer: Send + Sync {
    // ---
    /// Human readable peer description, used for logging.
    fn peer(&self) -> &str;

    /// Establish a new connection.
    async fn dial(&self) -> std::io::Result<BoxedStream>;
}

/// Shared dialer pointer.
///
/// `.clone()` only bumps a reference count; the connector keeps one for the
/// lifetime of the client.
pub type DialerPtr = Arc<dyn Dialer>;
