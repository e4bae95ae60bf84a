//! RPC client builder.
//!
//! Provides a fluent builder API for configuring [`RpcClient`] instances
//! with timeouts, reconnect policy and event handlers before the first
//! connection attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::client::{
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
use crate::{
    // ---
    DialerPtr,
    ReconnectPolicy,
    RpcClient,
    RpcConfig,
    RpcError,
    TcpDialer,
};

/// Builder for creating RPC client instances.
///
/// Handlers registered here are installed before the supervisor starts, so
/// no connect event or early notification can be missed.
///
/// # Examples
///
/// ## Client with handlers
/// ```no_run
/// use snapcast_rpc::RpcClientBuilder;
/// use std::time::Duration;
///
/// # async fn example() -> snapcast_rpc::Result<()> {
/// let client = RpcClientBuilder::new("127.0.0.1:1705")
///     .request_timeout(Duration::from_secs(5))
///     .reconnect_delay(Duration::from_secs(2))
///     .on_connect(|| async { println!("connected") })
///     .on_notification("Group.OnStreamChanged", |params| async move {
///         println!("stream changed: {params}");
///     })
///     .connect()?;
/// # Ok(())
/// # }
/// ```
///
/// ## Custom dialer
/// ```no_run
/// use snapcast_rpc::{MemoryDialer, RpcClientBuilder};
///
/// # async fn example() -> snapcast_rpc::Result<()> {
/// let (dialer, _listener) = MemoryDialer::pair("in-process");
/// let client = RpcClientBuilder::new("in-process")
///     .dialer(dialer.into_ptr())
///     .build();
/// # Ok(())
/// # }
/// ```
pub struct RpcClientBuilder {
    // ---
    config: RpcConfig,
    dialer: Option<DialerPtr>,

    on_connect: Option<ConnectFn>,
    on_disconnect: Option<DisconnectFn>,
    notifications: Vec<(String, NotificationFn)>,
    fallback: Option<FallbackFn>,
}

impl RpcClientBuilder {
    /// Create a builder for the peer at `addr` (`host:port`).
    pub fn new(addr: impl Into<String>) -> Self {
        // ---
        Self::from_config(RpcConfig::new(addr))
    }

    /// Start from an existing configuration.
    pub fn from_config(config: RpcConfig) -> Self {
        // ---
        Self {
            config,
            dialer: None,
            on_connect: None,
            on_disconnect: None,
            notifications: Vec::new(),
            fallback: None,
        }
    }

    /// Connect through a custom dialer instead of TCP to `addr`.
    pub fn dialer(mut self, dialer: DialerPtr) -> Self {
        self.dialer = Some(dialer);
        self
    }

    /// Set the timeout used by [`RpcClient::call`].
    ///
    /// Default: 30s.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the limit for each TCP dial attempt.
    ///
    /// Default: 10s. Ignored with a custom dialer.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Wait a fixed `delay` between connection attempts.
    ///
    /// Default: 5s.
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect = ReconnectPolicy::fixed(delay);
        self
    }

    /// Replace the reconnect policy.
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.config.reconnect = policy;
        self
    }

    /// Set the outbound queue capacity.
    ///
    /// Default: 64.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.with_queue_capacity(capacity);
        self
    }

    /// Set the longest accepted inbound line.
    ///
    /// Default: 16 MiB.
    pub fn max_line_len(mut self, len: usize) -> Self {
        self.config.max_line_len = len;
        self
    }

    /// Run `handler` after every successful connect.
    pub fn on_connect<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_connect = Some(wrap_connect(handler));
        self
    }

    /// Run `handler` after every disconnect.
    pub fn on_disconnect<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Option<Arc<RpcError>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_disconnect = Some(wrap_disconnect(handler));
        self
    }

    /// Handle notifications for `method`.
    pub fn on_notification<F, Fut>(mut self, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.notifications
            .push((method.into(), wrap_notification(handler)));
        self
    }

    /// Handle notifications that have no method-specific handler.
    pub fn on_any_notification<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(String, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.fallback = Some(wrap_fallback(handler));
        self
    }

    /// Build the client (consumes self). Does not connect.
    pub fn build(self) -> RpcClient {
        // ---
        let dialer = self.dialer.unwrap_or_else(|| {
            TcpDialer::new(self.config.addr.clone())
                .with_connect_timeout(self.config.connect_timeout)
                .into_ptr()
        });

        let client = RpcClient::with_dialer(self.config, dialer);

        client.set_connect_fn(self.on_connect);
        client.set_disconnect_fn(self.on_disconnect);
        for (method, handler) in self.notifications {
            client.set_notification_fn(method, Some(handler));
        }
        client.set_fallback_fn(self.fallback);

        client
    }

    /// Build the client and start connecting.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::connect`].
    pub fn connect(self) -> crate::Result<RpcClient> {
        // ---
        let client = self.build();
        client.connect()?;
        Ok(client)
    }
}
