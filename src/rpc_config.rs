//! Public client configuration.
//!
//! This type contains no handler state; callbacks are registered on the
//! client or through [`RpcClientBuilder`](crate::RpcClientBuilder).

use std::time::Duration;

use crate::ReconnectPolicy;

/// Default per-call timeout used by [`RpcClient::call`](crate::RpcClient::call).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default limit for a single dial attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default capacity of the outbound request queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Default upper bound for one inbound line.
pub const DEFAULT_MAX_LINE_LEN: usize = 16 * 1024 * 1024;

/// Connection and call parameters.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    // ---
    /// Peer address as `host:port`.
    ///
    /// Used by the default TCP dialer and in log messages.
    pub addr: String,

    /// Timeout for calls made without an explicit deadline.
    ///
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Limit for each dial attempt.
    ///
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Delay between connection attempts.
    ///
    /// Default: fixed 5 seconds
    pub reconnect: ReconnectPolicy,

    /// Requests that may wait for the writer before `call` suspends.
    ///
    /// Default: 64
    pub queue_capacity: usize,

    /// Longest accepted inbound line in bytes.
    ///
    /// A longer line drops the connection. Default: 16 MiB
    pub max_line_len: usize,
}

impl RpcConfig {
    /// Create a config for `addr` with default settings.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }

    /// Set the timeout used by `call`.
    ///
    /// # Example
    ///
    /// ```
    /// use snapcast_rpc::RpcConfig;
    /// use std::time::Duration;
    ///
    /// let config = RpcConfig::new("127.0.0.1:1705")
    ///     .with_request_timeout(Duration::from_secs(10));
    /// assert_eq!(config.request_timeout, Duration::from_secs(10));
    /// ```
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the limit for a single dial attempt.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Replace the reconnect policy.
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Use a fixed delay between connection attempts.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect = ReconnectPolicy::fixed(delay);
        self
    }

    /// Set the outbound queue capacity (at least 1).
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the longest accepted inbound line.
    pub fn with_max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_defaults() {
        // ---
        let config = RpcConfig::new("localhost:1705");

        assert_eq!(config.addr, "localhost:1705");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.reconnect, ReconnectPolicy::fixed(Duration::from_secs(5)));
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.max_line_len, 16 * 1024 * 1024);
    }

    #[test]
    fn test_queue_capacity_is_never_zero() {
        // ---
        let config = RpcConfig::new("localhost:1705").with_queue_capacity(0);
        assert_eq!(config.queue_capacity, 1);
    }
}
