// src/client/mod.rs
//! JSON-RPC client implementation.
//!
//! This module contains the core [`RpcClient`] type which sends requests to
//! the peer and receives responses and notifications over a single,
//! automatically re-established connection.
//!
//! # Architecture
//!
//! A background supervisor task (see `connector.rs`) owns the byte stream.
//! Calls never touch the stream directly: each call registers a oneshot
//! waiter in the pending table, queues its encoded frame on a bounded
//! channel, and waits. The supervisor's write loop drains the queue in
//! order; its read loop matches responses to waiters by id and hands
//! notifications to the dispatcher.
//!
//! # Concurrency
//!
//! Multiple calls can be in flight simultaneously. The pending table is
//! protected by a mutex but lock contention is minimal since operations
//! are just HashMap insert/remove.

mod connector;
mod dispatch;
mod pending;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub use connector::ConnectionState;

pub(crate) use connector::{Connector, OutboundFrame, Shared};
pub(crate) use dispatch::{
    // ---
    wrap_connect,
    wrap_disconnect,
    wrap_fallback,
    wrap_notification,
    ConnectFn,
    DisconnectFn,
    FallbackFn,
    NotificationFn,
};

use crate::protocol::{self, Request};
use crate::retry::Backoff;
use crate::{
    // ---
    log_debug,
    DialerPtr,
    Result,
    RpcConfig,
    RpcError,
};
use pending::{Completion, PendingGuard};

/// Acquire a mutex guard, intentionally ignoring poisoning.
///
/// Mutex poisoning indicates that another task panicked while holding the lock.
/// Every mutex in this module guards a map or a handler slot with no
/// invariants spanning multiple fields; the worst outcome of ignoring
/// poisoning is a dropped or unmatched message.
///
/// This avoids propagating non-`Send` poison errors across async boundaries.
pub(crate) fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // ---
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Deadline used when a timeout cannot be represented.
fn far_future() -> Instant {
    // Roughly 30 years, same as tokio's own "no deadline" sentinel.
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}

/// Running JSON-RPC client instance.
///
/// Cheap to clone (internally `Arc`-backed). All clones share one
/// connection, one pending table and one set of handlers.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    shared: Arc<Shared>,
    config: RpcConfig,
    peer: String,
    outbound_tx: mpsc::Sender<OutboundFrame>,
    shutdown_tx: watch::Sender<bool>,

    /// Parked until `connect()` spawns it.
    connector: Mutex<Option<Connector>>,

    /// Supervisor task handle; taken by the first `close()`.
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RpcClient {
    // ---

    /// Create a client that connects through `dialer`.
    ///
    /// Nothing happens on the network until [`connect`](Self::connect) is
    /// called. Most callers go through [`RpcClientBuilder`](crate::RpcClientBuilder).
    pub fn with_dialer(config: RpcConfig, dialer: DialerPtr) -> Self {
        // ---
        let shared = Arc::new(Shared::new());
        let (outbound_tx, outbound_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let peer = dialer.peer().to_string();
        let connector = Connector::new(
            dialer,
            Backoff::new(config.reconnect.clone()),
            config.max_line_len,
            shared.clone(),
            outbound_rx,
            shutdown_rx,
        );

        Self {
            inner: Arc::new(Inner {
                shared,
                config,
                peer,
                outbound_tx,
                shutdown_tx,
                connector: Mutex::new(Some(connector)),
                task: Mutex::new(None),
            }),
        }
    }

    /// Start the connection supervisor.
    ///
    /// Returns immediately; the first dial happens in the background and
    /// is retried forever until [`close`](Self::close). Observe progress
    /// through [`state`](Self::state) or the connect handler. Must be
    /// called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `RpcError::Closed` if the client has been closed
    /// - `RpcError::AlreadyConnected` if `connect()` was already called
    pub fn connect(&self) -> Result<()> {
        // ---
        if self.is_closed() {
            return Err(RpcError::Closed);
        }

        let connector = lock_ignore_poison(&self.inner.connector)
            .take()
            .ok_or(RpcError::AlreadyConnected)?;

        log_debug!("{}: starting connector", self.inner.peer);
        let handle = tokio::spawn(connector.run());
        *lock_ignore_poison(&self.inner.task) = Some(handle);

        Ok(())
    }

    /// Call `method` and wait for its result, using the configured request
    /// timeout.
    ///
    /// `params` is serialized to JSON; a value that serializes to `null`
    /// (such as `()`) is left off the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `RpcError::Serialization` - params encoding or result decoding fails
    /// - `RpcError::Remote` - the server answered with an error object
    /// - `RpcError::Timeout` - no response before the deadline
    /// - `RpcError::Malformed` - the response to this call could not be decoded
    /// - `RpcError::Disconnected` - the connection dropped, or the client was
    ///   closed, while waiting (including while waiting for queue space)
    /// - `RpcError::Closed` - the client was closed before the call was made
    ///
    /// # Example
    ///
    /// ```no_run
    /// use serde_json::Value;
    ///
    /// # async fn example(client: snapcast_rpc::RpcClient) -> snapcast_rpc::Result<()> {
    /// let status: Value = client.call("Server.GetStatus", ()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        // ---
        self.call_with_timeout(method, params, self.inner.config.request_timeout)
            .await
    }

    /// Like [`call`](Self::call) with an explicit timeout.
    pub async fn call_with_timeout<P, R>(
        &self,
        method: &str,
        params: P,
        timeout: Duration,
    ) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        // ---
        let deadline = Instant::now().checked_add(timeout).unwrap_or_else(far_future);
        self.call_with_deadline(method, params, deadline).await
    }

    /// Like [`call`](Self::call) with an absolute deadline.
    pub async fn call_with_deadline<P, R>(
        &self,
        method: &str,
        params: P,
        deadline: Instant,
    ) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        // ---
        let params = serde_json::to_value(params)?;
        let params = (!params.is_null()).then_some(params);

        let result = self.call_raw(method, params, deadline).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Untyped call: send `params` as given and return the raw `result`.
    ///
    /// A response without `result` yields `Value::Null`. The pending entry
    /// is removed when this future completes, times out or is dropped, so a
    /// late response is discarded.
    pub async fn call_raw(
        &self,
        method: &str,
        params: Option<Value>,
        deadline: Instant,
    ) -> Result<Value> {
        // ---
        let pending = &self.inner.shared.pending;
        let (id, waiter) = pending.register_next()?;
        let _guard = PendingGuard::new(pending.clone(), id);

        let bytes = protocol::encode(&Request::new(id, method, params))?;

        let exchange = async {
            // ---
            self.inner
                .outbound_tx
                .send(OutboundFrame { id, bytes })
                .await
                .map_err(|_| {
                    // An entry purged by close() reports like any other
                    // in-flight call.
                    if pending.contains(id) {
                        RpcError::Closed
                    } else {
                        RpcError::Disconnected
                    }
                })?;

            match waiter.await {
                Ok(Completion::Response(response)) => Ok(response.into_result()?),
                Ok(Completion::Invalid(reason)) => Err(RpcError::Malformed(reason)),
                Ok(Completion::Disconnected) | Err(_) => Err(RpcError::Disconnected),
            }
        };

        match tokio::time::timeout_at(deadline, exchange).await {
            Ok(result) => result,
            Err(_) => {
                log_debug!("{}: request {id} ({method}) timed out", self.inner.peer);
                Err(RpcError::Timeout)
            }
        }
    }

    /// Run `handler` after every successful connect.
    ///
    /// Replaces any previous connect handler. The handler runs on its own
    /// task and may issue calls.
    pub fn set_connect_handler<F, Fut>(&self, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.set_connect_fn(Some(wrap_connect(handler)));
    }

    pub fn clear_connect_handler(&self) {
        self.set_connect_fn(None);
    }

    /// Run `handler` after every disconnect.
    ///
    /// The handler receives the error that ended the connection, or `None`
    /// when the client was closed. Replaces any previous disconnect handler.
    pub fn set_disconnect_handler<F, Fut>(&self, handler: F)
    where
        F: Fn(Option<Arc<RpcError>>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.set_disconnect_fn(Some(wrap_disconnect(handler)));
    }

    pub fn clear_disconnect_handler(&self) {
        self.set_disconnect_fn(None);
    }

    /// Run `handler` with the params of every `method` notification.
    ///
    /// The last registration for a method wins. Each notification gets its
    /// own task, so handlers do not block the connection or each other and
    /// their relative order is not guaranteed.
    pub fn set_notification_handler<F, Fut>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.set_notification_fn(method, Some(wrap_notification(handler)));
    }

    /// Stop handling `method` notifications; later ones are dropped (or go
    /// to the fallback handler).
    pub fn clear_notification_handler(&self, method: &str) {
        self.set_notification_fn(method, None);
    }

    /// Handle every notification that has no method-specific handler.
    ///
    /// The handler receives `(method, params)`.
    pub fn set_fallback_handler<F, Fut>(&self, handler: F)
    where
        F: Fn(String, Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.set_fallback_fn(Some(wrap_fallback(handler)));
    }

    pub fn clear_fallback_handler(&self) {
        self.set_fallback_fn(None);
    }

    pub(crate) fn set_connect_fn(&self, handler: Option<ConnectFn>) {
        self.inner.shared.events.set_connect(handler);
    }

    pub(crate) fn set_disconnect_fn(&self, handler: Option<DisconnectFn>) {
        self.inner.shared.events.set_disconnect(handler);
    }

    pub(crate) fn set_notification_fn(
        &self,
        method: impl Into<String>,
        handler: Option<NotificationFn>,
    ) {
        self.inner
            .shared
            .events
            .notifications
            .set_handler(method, handler);
    }

    pub(crate) fn set_fallback_fn(&self, handler: Option<FallbackFn>) {
        self.inner.shared.events.notifications.set_fallback(handler);
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.shared.state.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.shared.state.subscribe()
    }

    /// Number of calls waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.inner.shared.pending.len()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.shared.pending.is_closed()
    }

    /// Peer description from the dialer.
    pub fn peer(&self) -> &str {
        &self.inner.peer
    }

    /// Configuration this client was built with.
    pub fn config(&self) -> &RpcConfig {
        &self.inner.config
    }

    /// Shut the client down.
    ///
    /// Calls already made fail with `RpcError::Disconnected`, whether they
    /// were waiting for a response or for room in the request queue. Later
    /// calls fail with `RpcError::Closed`. The connection is dropped, no reconnect is
    /// attempted and the disconnect handler runs with `None`. Returns once
    /// the supervisor has stopped. Idempotent and safe to call from any
    /// clone.
    pub async fn close(&self) {
        // ---
        let _purged = self.inner.shared.pending.close();
        self.inner.shutdown_tx.send_replace(true);

        // Never connected: nothing to wait for.
        if lock_ignore_poison(&self.inner.connector).take().is_some() {
            self.inner.shared.set_state(ConnectionState::Closed);
            log_debug!("{}: closed before connect", self.inner.peer);
            return;
        }

        let task = lock_ignore_poison(&self.inner.task).take();
        match task {
            Some(task) => {
                if let Err(_err) = task.await {
                    crate::log_error!("{}: connector task failed: {_err}", self.inner.peer);
                }
                self.inner.shared.set_state(ConnectionState::Closed);
                log_debug!("{}: closed ({_purged} pending calls failed)", self.inner.peer);
            }
            None => {
                // Another close() owns the task handle, or connect() is
                // between spawning and storing it.
                let mut state = self.watch_state();
                let _ = state.wait_for(|s| *s == ConnectionState::Closed).await;
            }
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("peer", &self.inner.peer)
            .field("state", &self.state())
            .field("pending_calls", &self.pending_calls())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::MemoryDialer;
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn client_pair() -> (RpcClient, crate::MemoryListener) {
        // ---
        let (dialer, listener) = MemoryDialer::pair("client-test");
        let config = RpcConfig::new("client-test").with_reconnect_delay(Duration::from_millis(10));
        (RpcClient::with_dialer(config, dialer.into_ptr()), listener)
    }

    #[tokio::test]
    async fn test_call_roundtrip_omits_null_params() {
        // ---
        let (client, mut listener) = client_pair();
        client.connect().unwrap();

        let server = listener.accept().await.unwrap();
        let (read, mut write) = tokio::io::split(server);
        let mut read = BufReader::new(read);

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.call::<_, Value>("Server.GetRPCVersion", ()).await }
        });

        let mut line = String::new();
        read.read_line(&mut line).await.unwrap();
        assert!(line.ends_with("\r\n"));
        let request: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(
            request,
            json!({"jsonrpc": "2.0", "id": 0, "method": "Server.GetRPCVersion"})
        );

        write
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":0,\"result\":{\"major\":2}}\n")
            .await
            .unwrap();

        assert_eq!(call.await.unwrap().unwrap(), json!({"major": 2}));
        assert_eq!(client.pending_calls(), 0);

        client.close().await;
    }

    #[tokio::test]
    async fn test_connect_twice_and_after_close() {
        // ---
        let (client, _listener) = client_pair();
        client.connect().unwrap();
        assert!(matches!(client.connect(), Err(RpcError::AlreadyConnected)));

        client.close().await;
        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(matches!(client.connect(), Err(RpcError::Closed)));
    }

    #[tokio::test]
    async fn test_close_before_connect() {
        // ---
        let (client, _listener) = client_pair();
        assert_eq!(client.state(), ConnectionState::Idle);

        client.close().await;
        client.close().await;

        assert_eq!(client.state(), ConnectionState::Closed);
        let err = client.call::<_, Value>("Server.GetStatus", ()).await.unwrap_err();
        assert!(matches!(err, RpcError::Closed));
    }

    #[tokio::test]
    async fn test_close_fails_calls_waiting_for_queue_space() {
        // ---
        let (dialer, _listener) = MemoryDialer::pair("full-queue");
        let config = RpcConfig::new("full-queue").with_queue_capacity(1);
        let client = RpcClient::with_dialer(config, dialer.into_ptr());

        // Never connected: one request fills the queue, the rest block on it.
        let calls: Vec<_> = (0..3)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.call::<_, Value>("Server.GetStatus", ()).await })
            })
            .collect();

        while client.pending_calls() < 3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        client.close().await;

        for call in calls {
            let err = call.await.unwrap().unwrap_err();
            assert!(matches!(err, RpcError::Disconnected), "got {err:?}");
        }
    }

    #[tokio::test]
    async fn test_timeout_removes_pending_entry() {
        // ---
        let (client, mut listener) = client_pair();
        client.connect().unwrap();
        let _server = listener.accept().await.unwrap();

        let err = client
            .call_with_timeout::<_, Value>("Server.GetStatus", (), Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::Timeout));
        assert_eq!(client.pending_calls(), 0);

        client.close().await;
    }

    #[tokio::test]
    async fn test_dropped_call_future_removes_pending_entry() {
        // ---
        let (client, _listener) = client_pair();

        let call = client.call::<_, Value>("Server.GetStatus", ());
        let _ = tokio::time::timeout(Duration::from_millis(10), call).await;

        assert_eq!(client.pending_calls(), 0);
        client.close().await;
    }
}
