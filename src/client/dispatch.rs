//! Handler registry for notifications and connection events.
//!
//! Handlers are stored type-erased behind `Arc` so they can be cloned out of
//! the lock and run on their own task. The read loop never waits for a
//! handler to finish.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::lock_ignore_poison;
use crate::RpcError;

pub(crate) type BoxFuture<'a, T> = std::pin::Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handler for notifications of one method; receives the `params` value.
pub(crate) type NotificationFn = Arc<dyn Fn(Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Catch-all handler; receives `(method, params)`.
pub(crate) type FallbackFn = Arc<dyn Fn(String, Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Runs after every successful connect.
pub(crate) type ConnectFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Runs after every disconnect; `None` when the client was closed.
pub(crate) type DisconnectFn =
    Arc<dyn Fn(Option<Arc<RpcError>>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap a typed async closure into a [`NotificationFn`].
pub(crate) fn wrap_notification<F, Fut>(handler: F) -> NotificationFn
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    // ---
    Arc::new(move |params| Box::pin(handler(params)) as BoxFuture<'static, ()>)
}

pub(crate) fn wrap_fallback<F, Fut>(handler: F) -> FallbackFn
where
    F: Fn(String, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    // ---
    Arc::new(move |method, params| Box::pin(handler(method, params)) as BoxFuture<'static, ()>)
}

pub(crate) fn wrap_connect<F, Fut>(handler: F) -> ConnectFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    // ---
    Arc::new(move || Box::pin(handler()) as BoxFuture<'static, ()>)
}

pub(crate) fn wrap_disconnect<F, Fut>(handler: F) -> DisconnectFn
where
    F: Fn(Option<Arc<RpcError>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    // ---
    Arc::new(move |cause| Box::pin(handler(cause)) as BoxFuture<'static, ()>)
}

#[derive(Default)]
struct Routes {
    // ---
    by_method: HashMap<String, NotificationFn>,
    fallback: Option<FallbackFn>,
}

/// Routes notifications to handlers keyed by method name.
///
/// The last registration for a method wins. A method without a keyed
/// handler goes to the fallback, if any, and is otherwise dropped.
#[derive(Default)]
pub(crate) struct NotificationDispatcher {
    // ---
    routes: Mutex<Routes>,
}

impl NotificationDispatcher {
    // ---

    /// Install (`Some`) or clear (`None`) the handler for `method`.
    pub(crate) fn set_handler(&self, method: impl Into<String>, handler: Option<NotificationFn>) {
        // ---
        let method = method.into();
        let mut routes = lock_ignore_poison(&self.routes);
        match handler {
            Some(handler) => {
                routes.by_method.insert(method, handler);
            }
            None => {
                routes.by_method.remove(&method);
            }
        }
    }

    /// Install or clear the catch-all handler.
    pub(crate) fn set_fallback(&self, handler: Option<FallbackFn>) {
        lock_ignore_poison(&self.routes).fallback = handler;
    }

    /// Run the matching handler on a new task.
    ///
    /// Returns `true` if a handler was found. Must be called from within a
    /// tokio runtime.
    pub(crate) fn dispatch(&self, method: String, params: Value) -> bool {
        // ---
        let (keyed, fallback) = {
            let routes = lock_ignore_poison(&self.routes);
            match routes.by_method.get(&method) {
                Some(handler) => (Some(handler.clone()), None),
                None => (None, routes.fallback.clone()),
            }
        };

        if let Some(handler) = keyed {
            tokio::spawn(handler(params));
            return true;
        }

        if let Some(handler) = fallback {
            tokio::spawn(handler(method, params));
            return true;
        }

        crate::log_trace!("no handler for notification {method}");
        false
    }
}

/// Every callback the connector may fire.
#[derive(Default)]
pub(crate) struct EventHandlers {
    // ---
    pub(crate) notifications: NotificationDispatcher,
    on_connect: Mutex<Option<ConnectFn>>,
    on_disconnect: Mutex<Option<DisconnectFn>>,
}

impl EventHandlers {
    // ---

    pub(crate) fn set_connect(&self, handler: Option<ConnectFn>) {
        *lock_ignore_poison(&self.on_connect) = handler;
    }

    pub(crate) fn set_disconnect(&self, handler: Option<DisconnectFn>) {
        *lock_ignore_poison(&self.on_disconnect) = handler;
    }

    /// Spawn the connect handler, if one is set.
    pub(crate) fn fire_connect(&self) {
        // ---
        let handler = lock_ignore_poison(&self.on_connect).clone();
        if let Some(handler) = handler {
            tokio::spawn(handler());
        }
    }

    /// Spawn the disconnect handler, if one is set.
    pub(crate) fn fire_disconnect(&self, cause: Option<Arc<RpcError>>) {
        // ---
        let handler = lock_ignore_poison(&self.on_disconnect).clone();
        if let Some(handler) = handler {
            tokio::spawn(handler(cause));
        }
    }
}
