//! In-memory dialer.
//!
//! Connects the client to an in-process peer over `tokio::io::duplex` pipes.
//! Every successful dial hands the server end of a fresh pipe to the paired
//! [`MemoryListener`], so a test harness can script the peer's side of each
//! connection independently.
//!
//! ## Semantics
//!
//! - `dial()` fails with `ConnectionRefused` while the dialer is refusing or
//!   once the listener has been dropped.
//! - Dropping the server end of a pipe looks like the peer closing the
//!   connection: the client sees end-of-stream.
//! - Delivery is deterministic within a single process.
//!
//! ## Non-Goals
//!
//! - Latency, partial-write or packet-loss simulation.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use crate::{
    // ---
    BoxedStream,
    Dialer,
    DialerPtr,
};

/// Per-direction buffer size of each in-memory pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Client side of an in-memory connection pair.
///
/// Cheap to clone; all clones feed the same listener.
#[derive(Clone)]
pub struct MemoryDialer {
    // ---
    peer: Arc<str>,
    accept_tx: mpsc::UnboundedSender<DuplexStream>,
    refusing: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
}

/// Server side of an in-memory connection pair.
pub struct MemoryListener {
    // ---
    accept_rx: mpsc::UnboundedReceiver<DuplexStream>,
}

impl MemoryDialer {
    // ---

    /// Create a connected dialer/listener pair.
    pub fn pair(peer: impl Into<Arc<str>>) -> (Self, MemoryListener) {
        // ---
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();

        let dialer = Self {
            peer: peer.into(),
            accept_tx,
            refusing: Arc::new(AtomicBool::new(false)),
            attempts: Arc::new(AtomicUsize::new(0)),
        };

        (dialer, MemoryListener { accept_rx })
    }

    /// Make subsequent dials fail (`true`) or succeed again (`false`).
    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }

    /// Number of dial attempts so far, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Erase the concrete type.
    pub fn into_ptr(self) -> DialerPtr {
        Arc::new(self)
    }
}

#[async_trait::async_trait]
impl Dialer for MemoryDialer {
    // ---

    fn peer(&self) -> &str {
        &self.peer
    }

    async fn dial(&self) -> io::Result<BoxedStream> {
        // ---
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.refusing.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{} is refusing connections", self.peer),
            ));
        }

        let (client, server) = tokio::io::duplex(PIPE_CAPACITY);

        self.accept_tx.send(server).map_err(|_| {
            io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{} has no listener", self.peer),
            )
        })?;

        Ok(Box::new(client))
    }
}

impl MemoryListener {
    // ---

    /// Wait for the next connection.
    ///
    /// Returns `None` once every dialer clone has been dropped.
    pub async fn accept(&mut self) -> Option<DuplexStream> {
        self.accept_rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_dial_delivers_server_end() {
        // ---
        let (dialer, mut listener) = MemoryDialer::pair("memory-peer");

        let mut client = dialer.dial().await.unwrap();
        let mut server = listener.accept().await.unwrap();

        client.write_all(b"hello\n").await.unwrap();
        let mut buf = [0u8; 6];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello\n");
        assert_eq!(dialer.attempts(), 1);
    }

    #[tokio::test]
    async fn test_refusing_and_dropped_listener() {
        // ---
        let (dialer, listener) = MemoryDialer::pair("memory-peer");

        dialer.set_refusing(true);
        let err = dialer.dial().await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);

        dialer.set_refusing(false);
        drop(listener);
        let err = dialer.dial().await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);

        assert_eq!(dialer.attempts(), 2);
    }
}
