//! Pending-call registry: correlates call results with waiting callers.
//!
//! Each outgoing call registers a one-shot slot under its identifier before the
//! request is written. The dispatch loop resolves the slot when the matching
//! result frame arrives. Resolution removes the entry, so a slot is completed
//! at most once and late or duplicate results find nothing and are dropped.
//!
//! The lock is held for single map operations only, never across an await.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use frames::CallResult;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// What a waiting caller receives: result values or the server's error text.
pub type CallOutcome = Result<Vec<Value>, String>;

#[derive(Debug, Default)]
pub struct PendingCalls {
    slots: Mutex<HashMap<String, oneshot::Sender<CallOutcome>>>,
}

impl PendingCalls {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a completion slot for `id` and return the receiving half.
    pub fn register(&self, id: &str) -> oneshot::Receiver<CallOutcome> {
        let (tx, rx) = oneshot::channel();
        let mut slots = self.slots();
        if slots.insert(id.to_owned(), tx).is_some() {
            // Identifiers come from a monotonic counter; a clash means the
            // previous caller will now observe its call as abandoned.
            warn!(id, "pending: identifier registered twice");
        }
        debug!(id, pending = slots.len(), "pending: registered");
        rx
    }

    /// Deliver a result to its waiting caller.
    ///
    /// Returns `false` when no caller is waiting on that identifier.
    pub fn resolve(&self, result: CallResult) -> bool {
        let slot = self.slots().remove(&result.id);
        let Some(tx) = slot else {
            debug!(id = %result.id, "pending: no waiter for result; dropped");
            return false;
        };
        // The receiver may already be gone if the caller stopped waiting.
        let delivered = tx.send(result.outcome).is_ok();
        debug!(id = %result.id, delivered, "pending: resolved");
        true
    }

    /// Remove a slot without resolving it.
    pub fn forget(&self, id: &str) -> bool {
        self.slots().remove(id).is_some()
    }

    /// Drop every slot; each waiting caller observes a closed channel.
    ///
    /// Returns the number of calls failed.
    pub fn fail_all(&self) -> usize {
        let drained = std::mem::take(&mut *self.slots());
        drained.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<CallOutcome>>> {
        // Every critical section is one map operation, so a poisoned map is
        // still consistent.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a call's slot when the waiting future is dropped.
///
/// After a normal resolution the slot is already gone and this is a no-op.
pub(crate) struct PendingGuard<'a> {
    pending: &'a PendingCalls,
    id: &'a str,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn new(pending: &'a PendingCalls, id: &'a str) -> Self {
        Self { pending, id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.pending.forget(self.id) {
            debug!(id = self.id, "pending: call dropped before resolution");
        }
    }
}

#[cfg(test)]
#[path = "pending_test.rs"]
mod tests;
