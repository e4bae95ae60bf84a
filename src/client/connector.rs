//! Connection supervisor.
//!
//! A single task owns the byte stream to the peer. It dials, runs the read
//! and write loops until either fails, tears the connection down, waits
//! out the reconnect delay and dials again. Nothing else touches the
//! stream.
//!
//! # Teardown
//!
//! Every connection ends the same way: the stream is dropped, all pending
//! calls are failed with a disconnection signal, the state moves to
//! `Disconnected` and the disconnect handler is spawned. Only then does the
//! supervisor decide whether to reconnect or stop.

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, watch};

use super::dispatch::EventHandlers;
use super::pending::PendingCalls;
use crate::protocol::{self, Inbound, LineReader};
use crate::retry::Backoff;
use crate::{
    // ---
    log_debug,
    log_info,
    log_trace,
    log_warn,
    BoxedStream,
    DialerPtr,
    RequestId,
    RpcError,
};

/// Lifecycle of a client's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// `connect()` has not been called yet.
    Idle,
    /// Dialing, or waiting to dial again after a failure.
    Connecting,
    /// Read and write loops are running.
    Connected,
    /// The last connection ended; a new attempt follows after the delay.
    Disconnected,
    /// Terminal; reached only through `close()`.
    Closed,
}

/// State shared between the client handle and the supervisor task.
pub(crate) struct Shared {
    // ---
    pub(crate) pending: Arc<PendingCalls>,
    pub(crate) events: EventHandlers,
    pub(crate) state: watch::Sender<ConnectionState>,
}

impl Shared {
    // ---

    pub(crate) fn new() -> Self {
        // ---
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            pending: Arc::new(PendingCalls::new()),
            events: EventHandlers::default(),
            state,
        }
    }

    pub(crate) fn set_state(&self, next: ConnectionState) {
        // ---
        let prev = self.state.send_replace(next);
        if prev != next {
            log_trace!("connection state {prev:?} -> {next:?}");
        }
    }
}

/// An encoded request waiting for the writer.
pub(crate) struct OutboundFrame {
    // ---
    pub(crate) id: RequestId,
    pub(crate) bytes: Bytes,
}

/// Reconnecting supervisor; consumed by [`Connector::run`].
pub(crate) struct Connector {
    // ---
    dialer: DialerPtr,
    backoff: Backoff,
    max_line_len: usize,
    shared: Arc<Shared>,
    outbound: mpsc::Receiver<OutboundFrame>,
    shutdown: watch::Receiver<bool>,
}

impl Connector {
    // ---

    pub(crate) fn new(
        dialer: DialerPtr,
        backoff: Backoff,
        max_line_len: usize,
        shared: Arc<Shared>,
        outbound: mpsc::Receiver<OutboundFrame>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        // ---
        Self {
            dialer,
            backoff,
            max_line_len,
            shared,
            outbound,
            shutdown,
        }
    }

    /// Connect, serve and reconnect until shut down.
    pub(crate) async fn run(mut self) {
        // ---
        let dialer = self.dialer.clone();
        let peer = dialer.peer().to_string();

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            self.shared.set_state(ConnectionState::Connecting);

            let dialed = tokio::select! {
                biased;
                _ = wait_shutdown(&mut self.shutdown) => break,
                dialed = dialer.dial() => dialed,
            };

            match dialed {
                Ok(stream) => {
                    self.backoff.reset();
                    self.shared.set_state(ConnectionState::Connected);
                    log_info!("{peer}: connected");
                    self.shared.events.fire_connect();

                    let cause = self.serve(stream).await;

                    let _purged = self.shared.pending.purge_all();
                    self.shared.set_state(ConnectionState::Disconnected);

                    match &cause {
                        Some(_err) => {
                            log_warn!("{peer}: disconnected: {_err} ({_purged} pending calls failed)")
                        }
                        None => log_info!("{peer}: disconnected ({_purged} pending calls failed)"),
                    }

                    let stop = cause.is_none();
                    self.shared.events.fire_disconnect(cause.map(Arc::new));
                    if stop {
                        break;
                    }
                }
                Err(_err) => {
                    log_warn!("{peer}: connect failed: {_err}");
                }
            }

            let delay = self.backoff.next_delay();
            log_info!(
                "{peer}: reconnecting in {delay:?} (attempt {})",
                self.backoff.failures()
            );

            tokio::select! {
                biased;
                _ = wait_shutdown(&mut self.shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        // Calls that slipped in after the last teardown.
        self.shared.pending.purge_all();
        self.shared.set_state(ConnectionState::Closed);
        log_debug!("{peer}: connector stopped");
    }

    /// Run one connection to completion.
    ///
    /// Returns the error that ended it, or `None` when the client is
    /// shutting down.
    async fn serve(&mut self, stream: BoxedStream) -> Option<RpcError> {
        // ---
        let (reader, writer) = tokio::io::split(stream);

        let read = read_loop(reader, self.max_line_len, &self.shared);
        let write = write_loop(writer, &mut self.outbound, &self.shared.pending);

        tokio::select! {
            _ = wait_shutdown(&mut self.shutdown) => None,
            err = read => Some(err),
            err = write => err,
        }
    }
}

/// Decode inbound lines until the stream fails.
async fn read_loop(reader: ReadHalf<BoxedStream>, max_len: usize, shared: &Shared) -> RpcError {
    // ---
    let mut lines = LineReader::new(reader, max_len);

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                return RpcError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by peer",
                ))
            }
            Err(err) => return err,
        };

        if line.trim_ascii().is_empty() {
            continue;
        }

        match protocol::decode(line) {
            Inbound::Response(response) => {
                shared.pending.resolve(response);
            }
            Inbound::Notification(notification) => {
                shared
                    .events
                    .notifications
                    .dispatch(notification.method, notification.params);
            }
            Inbound::Request(_request) => {
                log_warn!(
                    "ignoring server request {} (id {})",
                    _request.method,
                    _request.id
                );
            }
            Inbound::InvalidResponse(id, reason) => {
                log_warn!(
                    "failing request {id} on undecodable response ({reason}): {}",
                    String::from_utf8_lossy(line).trim_end()
                );
                if !shared.pending.reject(id, reason) {
                    log_debug!("no pending request {id} for undecodable response");
                }
            }
            Inbound::Malformed(reason) => {
                let _err = RpcError::Malformed(reason);
                log_warn!(
                    "dropping line ({_err}): {}",
                    String::from_utf8_lossy(line).trim_end()
                );
            }
        }
    }
}

/// Write queued requests in order until the stream fails.
///
/// Returns `None` when the queue is closed, which only happens when the
/// client itself is gone.
async fn write_loop(
    mut writer: WriteHalf<BoxedStream>,
    outbound: &mut mpsc::Receiver<OutboundFrame>,
    pending: &PendingCalls,
) -> Option<RpcError> {
    // ---
    while let Some(frame) = outbound.recv().await {
        // Timed out, cancelled or purged while queued.
        if !pending.contains(frame.id) {
            log_trace!("skipping request {}: no longer pending", frame.id);
            continue;
        }

        if let Err(err) = write_frame(&mut writer, &frame.bytes).await {
            return Some(RpcError::Io(err));
        }
    }

    None
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    // ---
    writer.write_all(bytes).await?;
    writer.flush().await
}

/// Resolves once shutdown is requested or the client handle is gone.
async fn wait_shutdown(shutdown: &mut watch::Receiver<bool>) {
    // ---
    let _ = shutdown.wait_for(|closed| *closed).await;
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::client::pending::Completion;
    use crate::protocol::{Request, Response};
    use crate::{MemoryDialer, MemoryListener, ReconnectPolicy};
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};

    struct Harness {
        shared: Arc<Shared>,
        outbound: mpsc::Sender<OutboundFrame>,
        shutdown: watch::Sender<bool>,
        listener: MemoryListener,
        dialer: MemoryDialer,
        task: tokio::task::JoinHandle<()>,
    }

    fn start(policy: ReconnectPolicy) -> Harness {
        // ---
        let (dialer, listener) = MemoryDialer::pair("connector-test");
        let shared = Arc::new(Shared::new());
        let (outbound, outbound_rx) = mpsc::channel(8);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let connector = Connector::new(
            dialer.clone().into_ptr(),
            Backoff::new(policy),
            1024,
            shared.clone(),
            outbound_rx,
            shutdown_rx,
        );
        let task = tokio::spawn(connector.run());

        Harness {
            shared,
            outbound,
            shutdown,
            listener,
            dialer,
            task,
        }
    }

    async fn wait_state(shared: &Shared, want: ConnectionState) {
        let mut rx = shared.state.subscribe();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| *s == want))
            .await
            .expect("state not reached")
            .expect("state channel closed");
    }

    #[tokio::test]
    async fn test_write_loop_skips_requests_no_longer_pending() {
        // ---
        let mut h = start(ReconnectPolicy::fixed(Duration::from_millis(10)));
        let server = h.listener.accept().await.unwrap();
        let mut server = BufReader::new(server);

        let (cancelled, _rx1) = h.shared.pending.register_next().unwrap();
        let (live, _rx2) = h.shared.pending.register_next().unwrap();
        h.shared.pending.remove(cancelled);

        for id in [cancelled, live] {
            let bytes = protocol::encode(&Request::new(id, "Server.GetStatus", None)).unwrap();
            h.outbound.send(OutboundFrame { id, bytes }).await.unwrap();
        }

        let mut line = String::new();
        server.read_line(&mut line).await.unwrap();
        let sent: Request = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(sent.id, live);

        h.shutdown.send_replace(true);
        h.task.await.unwrap();
        assert_eq!(*h.shared.state.borrow(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_peer_eof_purges_and_reconnects() {
        // ---
        let mut h = start(ReconnectPolicy::fixed(Duration::from_millis(10)));
        let server = h.listener.accept().await.unwrap();
        wait_state(&h.shared, ConnectionState::Connected).await;

        let (_id, waiter) = h.shared.pending.register_next().unwrap();
        drop(server);

        let completion = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(completion, Completion::Disconnected));

        let _second = tokio::time::timeout(Duration::from_secs(2), h.listener.accept())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(h.dialer.attempts(), 2);

        h.shutdown.send_replace(true);
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_line_ends_connection() {
        // ---
        let mut h = start(ReconnectPolicy::fixed(Duration::from_secs(60)));
        let mut server = h.listener.accept().await.unwrap();
        wait_state(&h.shared, ConnectionState::Connected).await;

        let (id, waiter) = h.shared.pending.register_next().unwrap();
        let huge = json!({ "blob": "x".repeat(4096) });
        let mut bytes = protocol::encode(&Response::success(id, huge)).unwrap().to_vec();
        bytes.truncate(2048);
        server.write_all(&bytes).await.unwrap();

        let completion = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(completion, Completion::Disconnected));
        wait_state(&h.shared, ConnectionState::Disconnected).await;

        // Shutdown interrupts the reconnect delay.
        h.shutdown.send_replace(true);
        tokio::time::timeout(Duration::from_secs(2), h.task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_refused_dial_retries_until_shutdown() {
        // ---
        let (dialer, _listener) = MemoryDialer::pair("refusing");
        dialer.set_refusing(true);

        let shared = Arc::new(Shared::new());
        let (_outbound, outbound_rx) = mpsc::channel(1);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let connector = Connector::new(
            dialer.clone().into_ptr(),
            Backoff::new(ReconnectPolicy::fixed(Duration::from_millis(5))),
            1024,
            shared.clone(),
            outbound_rx,
            shutdown_rx,
        );
        let task = tokio::spawn(connector.run());

        tokio::time::timeout(Duration::from_secs(2), async {
            while dialer.attempts() < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_ne!(*shared.state.borrow(), ConnectionState::Connected);

        shutdown.send_replace(true);
        task.await.unwrap();
        assert_eq!(*shared.state.borrow(), ConnectionState::Closed);
    }
}
