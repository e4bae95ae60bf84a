//! TCP dialer.
//!
//! Connects to a resolved `host:port` string. Name resolution is whatever
//! `tokio::net::TcpStream::connect` does; service discovery happens outside
//! this crate.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::{
    // ---
    BoxedStream,
    Dialer,
    DialerPtr,
};

/// Dials a fixed TCP address.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    // ---
    addr: String,
    connect_timeout: Option<Duration>,
}

impl TcpDialer {
    // ---

    /// Create a dialer for `addr` (e.g. `"snapserver.local:1705"`).
    pub fn new(addr: impl Into<String>) -> Self {
        // ---
        Self {
            addr: addr.into(),
            connect_timeout: None,
        }
    }

    /// Abort a dial attempt that takes longer than `timeout`.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Erase the concrete type.
    pub fn into_ptr(self) -> DialerPtr {
        Arc::new(self)
    }

    async fn connect(&self) -> io::Result<TcpStream> {
        // ---
        match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, TcpStream::connect(&self.addr))
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connect to {} timed out after {limit:?}", self.addr),
                    )
                })?,
            None => TcpStream::connect(&self.addr).await,
        }
    }
}

#[async_trait::async_trait]
impl Dialer for TcpDialer {
    // ---

    fn peer(&self) -> &str {
        &self.addr
    }

    async fn dial(&self) -> io::Result<BoxedStream> {
        // ---
        let stream = self.connect().await?;

        // Requests are small and latency bound.
        if let Err(_err) = stream.set_nodelay(true) {
            crate::log_debug!("{}: could not set TCP_NODELAY: {_err}", self.addr);
        }

        Ok(Box::new(stream))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_dial_reaches_listener() {
        // ---
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let dialer = TcpDialer::new(addr.clone()).with_connect_timeout(Duration::from_secs(2));
        assert_eq!(dialer.peer(), addr);

        let (accepted, dialed) = tokio::join!(listener.accept(), dialer.dial());
        let (mut server, _) = accepted.unwrap();
        let mut client = dialed.unwrap();

        client.write_all(b"ping\n").await.unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping\n");
    }

    #[tokio::test]
    async fn test_dial_refused() {
        // ---
        // Bind then drop to get a port with nothing listening on it.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = TcpDialer::new(addr).dial().await;
        assert!(result.is_err());
    }
}
