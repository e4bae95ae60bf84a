use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use super::lock_ignore_poison;
use crate::protocol::Response;
use crate::{
    // ---
    RequestId,
    Result,
    RpcError,
};

/// Outcome delivered to a waiting call.
#[derive(Debug)]
pub(crate) enum Completion {
    /// The peer answered.
    Response(Response),
    /// The peer answered with a response that could not be decoded.
    Invalid(String),
    /// The connection dropped or the client closed first.
    Disconnected,
}

pub(crate) type Waiter = oneshot::Receiver<Completion>;

struct Table {
    // ---
    next_id: RequestId,
    waiters: HashMap<RequestId, oneshot::Sender<Completion>>,
    closed: bool,
}

/// Tracks calls waiting for responses.
///
/// Maps request ids to oneshot channels. The id counter lives under the same
/// lock so allocating and registering an id is atomic. Channels are always
/// completed outside the lock.
pub(crate) struct PendingCalls {
    // ---
    table: Mutex<Table>,
}

impl PendingCalls {
    // ---

    /// Create an empty table whose first id is 0.
    pub(crate) fn new() -> Self {
        // ---
        Self {
            table: Mutex::new(Table {
                next_id: RequestId::new(0),
                waiters: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// Allocate an id without registering it.
    pub(crate) fn next_id(&self) -> RequestId {
        // ---
        let mut table = lock_ignore_poison(&self.table);
        let id = table.next_id;
        table.next_id = id.successor();
        id
    }

    /// Register a waiter for `id`.
    ///
    /// Fails with [`RpcError::Closed`] once the table has been closed.
    pub(crate) fn register(&self, id: RequestId) -> Result<Waiter> {
        // ---
        let mut table = lock_ignore_poison(&self.table);
        if table.closed {
            return Err(RpcError::Closed);
        }

        let (tx, rx) = oneshot::channel();
        table.waiters.insert(id, tx);
        Ok(rx)
    }

    /// Allocate a fresh id and register a waiter for it.
    ///
    /// An id burned by a refused registration is never handed out again.
    pub(crate) fn register_next(&self) -> Result<(RequestId, Waiter)> {
        // ---
        let id = self.next_id();
        let waiter = self.register(id)?;
        Ok((id, waiter))
    }

    /// Deliver a response to its waiter.
    ///
    /// Returns `true` if the id was pending. Unknown or stale ids are dropped.
    pub(crate) fn resolve(&self, response: Response) -> bool {
        // ---
        let id = response.id;
        let waiter = lock_ignore_poison(&self.table).waiters.remove(&id);

        match waiter {
            Some(tx) => {
                // The caller may have given up between lookup and send.
                let _ = tx.send(Completion::Response(response));
                true
            }
            None => {
                crate::log_debug!("dropping response for unknown request id {id}");
                false
            }
        }
    }

    /// Fail the waiter for `id` with an undecodable response.
    ///
    /// Returns `true` if the id was pending.
    pub(crate) fn reject(&self, id: RequestId, reason: String) -> bool {
        // ---
        let waiter = lock_ignore_poison(&self.table).waiters.remove(&id);

        match waiter {
            Some(tx) => {
                let _ = tx.send(Completion::Invalid(reason));
                true
            }
            None => false,
        }
    }

    /// Remove a waiter without delivering anything.
    ///
    /// Idempotent; returns `true` if the id was still pending.
    pub(crate) fn remove(&self, id: RequestId) -> bool {
        // ---
        lock_ignore_poison(&self.table).waiters.remove(&id).is_some()
    }

    /// Whether `id` is still waiting for a response.
    pub(crate) fn contains(&self, id: RequestId) -> bool {
        // ---
        lock_ignore_poison(&self.table).waiters.contains_key(&id)
    }

    /// Fail every waiter with [`Completion::Disconnected`].
    ///
    /// Returns how many calls were purged.
    pub(crate) fn purge_all(&self) -> usize {
        // ---
        let drained: Vec<_> = lock_ignore_poison(&self.table)
            .waiters
            .drain()
            .map(|(_, tx)| tx)
            .collect();

        let count = drained.len();
        for tx in drained {
            let _ = tx.send(Completion::Disconnected);
        }
        count
    }

    /// Refuse further registrations and purge everything pending.
    pub(crate) fn close(&self) -> usize {
        // ---
        lock_ignore_poison(&self.table).closed = true;
        self.purge_all()
    }

    pub(crate) fn is_closed(&self) -> bool {
        lock_ignore_poison(&self.table).closed
    }

    /// Number of calls currently waiting.
    pub(crate) fn len(&self) -> usize {
        // ---
        lock_ignore_poison(&self.table).waiters.len()
    }
}

/// Removes a pending entry when the owning call finishes or is dropped.
pub(crate) struct PendingGuard {
    // ---
    pending: Arc<PendingCalls>,
    id: RequestId,
}

impl PendingGuard {
    pub(crate) fn new(pending: Arc<PendingCalls>, id: RequestId) -> Self {
        Self { pending, id }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_start_at_zero_and_increase() {
        // ---
        let pending = PendingCalls::new();

        assert_eq!(pending.next_id(), RequestId::new(0));
        let (id, _rx) = pending.register_next().unwrap();
        assert_eq!(id, RequestId::new(1));
        assert_eq!(pending.next_id(), RequestId::new(2));
    }

    #[test]
    fn test_register_and_resolve() {
        // ---
        let pending = PendingCalls::new();
        let (id, rx) = pending.register_next().unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending.contains(id));

        assert!(pending.resolve(Response::success(id, json!("ok"))));

        // Should be removed after completion
        assert_eq!(pending.len(), 0);

        match rx.blocking_recv().unwrap() {
            Completion::Response(response) => {
                assert_eq!(response.into_result().unwrap(), json!("ok"));
            }
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[test]
    fn test_reject_fails_waiter() {
        // ---
        let pending = PendingCalls::new();
        let (id, rx) = pending.register_next().unwrap();

        assert!(pending.reject(id, "invalid response".to_string()));
        assert!(!pending.reject(id, "again".to_string()));
        assert_eq!(pending.len(), 0);

        match rx.blocking_recv().unwrap() {
            Completion::Invalid(reason) => assert_eq!(reason, "invalid response"),
            other => panic!("expected an invalid completion, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_unknown_id() {
        // ---
        let pending = PendingCalls::new();
        let (_id, _rx) = pending.register_next().unwrap();

        assert!(!pending.resolve(Response::success(RequestId::new(99), json!(null))));
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        // ---
        let pending = PendingCalls::new();
        let (id, _rx) = pending.register_next().unwrap();

        assert!(pending.remove(id));
        assert!(!pending.remove(id));
        assert!(!pending.resolve(Response::success(id, json!(1))));
    }

    #[test]
    fn test_purge_all_signals_every_waiter() {
        // ---
        let pending = PendingCalls::new();
        let (_, rx1) = pending.register_next().unwrap();
        let (_, rx2) = pending.register_next().unwrap();

        assert_eq!(pending.purge_all(), 2);
        assert_eq!(pending.len(), 0);

        assert!(matches!(rx1.blocking_recv(), Ok(Completion::Disconnected)));
        assert!(matches!(rx2.blocking_recv(), Ok(Completion::Disconnected)));

        // Still usable after a purge.
        assert!(pending.register_next().is_ok());
    }

    #[test]
    fn test_close_refuses_registration() {
        // ---
        let pending = PendingCalls::new();
        let (_, rx) = pending.register_next().unwrap();

        assert_eq!(pending.close(), 1);
        assert!(pending.is_closed());
        assert!(matches!(rx.blocking_recv(), Ok(Completion::Disconnected)));
        assert!(matches!(pending.register_next(), Err(RpcError::Closed)));
        assert!(matches!(
            pending.register(RequestId::new(7)),
            Err(RpcError::Closed)
        ));
    }

    #[test]
    fn test_guard_removes_entry_on_drop() {
        // ---
        let pending = Arc::new(PendingCalls::new());
        let (id, _rx) = pending.register_next().unwrap();

        {
            let _guard = PendingGuard::new(pending.clone(), id);
            assert!(pending.contains(id));
        }

        assert!(!pending.contains(id));
    }
}
