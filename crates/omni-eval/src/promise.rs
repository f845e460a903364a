//! The Promise substrate: an identity with `pending|resolved|rejected`
//! state and a FIFO-ish waiter list, backed by `tokio::sync::Notify` so
//! `await` can block the calling evaluator thread without busy-polling.
//!
//! Promise identities are `uuid`-backed rather than a sequential counter:
//! promise handles here cross intrinsic call boundaries and get reused
//! across test runs, where a small counter would be ambiguous.

use std::fmt;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::value::RtResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromiseId(Uuid);

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum PromiseState {
    Pending,
    Resolved(RtResult),
    Rejected(String),
}

struct PromiseInner {
    state: Mutex<PromiseState>,
    notify: Notify,
}

/// Process-wide table of live promises, keyed by [`PromiseId`].
///
/// Uses `dashmap` rather than a `Mutex<HashMap<_>>` so resolving one
/// promise never blocks a concurrent task resolving another.
#[derive(Default)]
pub struct PromiseTable {
    promises: DashMap<PromiseId, Arc<PromiseInner>>,
}

impl PromiseTable {
    pub fn new() -> Self {
        PromiseTable::default()
    }

    /// Registers a fresh pending promise and returns its id.
    pub fn create(&self) -> PromiseId {
        let id = PromiseId(Uuid::new_v4());
        self.promises.insert(
            id,
            Arc::new(PromiseInner {
                state: Mutex::new(PromiseState::Pending),
                notify: Notify::new(),
            }),
        );
        id
    }

    /// Resolves a promise with a successful value, waking every waiter.
    pub fn resolve(&self, id: PromiseId, result: RtResult) {
        if let Some(entry) = self.promises.get(&id) {
            *entry.state.lock().expect("promise mutex poisoned") = PromiseState::Resolved(result);
            entry.notify.notify_waiters();
        }
    }

    /// Rejects a promise with an error message, waking every waiter.
    pub fn reject(&self, id: PromiseId, error: impl Into<String>) {
        if let Some(entry) = self.promises.get(&id) {
            *entry.state.lock().expect("promise mutex poisoned") = PromiseState::Rejected(error.into());
            entry.notify.notify_waiters();
        }
    }

    /// Blocks (cooperatively, via the owning runtime) until `id` completes,
    /// then returns its resolved value or rejection message. Returns
    /// immediately if already complete.
    pub async fn await_promise(&self, id: PromiseId) -> Result<RtResult, String> {
        let inner = match self.promises.get(&id) {
            Some(entry) => Arc::clone(&entry),
            None => return Err(format!("unknown promise {id}")),
        };
        loop {
            {
                let state = inner.state.lock().expect("promise mutex poisoned");
                match &*state {
                    PromiseState::Resolved(result) => return Ok(result.clone()),
                    PromiseState::Rejected(err) => return Err(err.clone()),
                    PromiseState::Pending => {}
                }
            }
            inner.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omni_mir::TypeTag;

    #[tokio::test]
    async fn resolve_wakes_awaiter() {
        let table = Arc::new(PromiseTable::new());
        let id = table.create();
        let awaiter_table = Arc::clone(&table);
        let handle = tokio::spawn(async move { awaiter_table.await_promise(id).await });

        tokio::task::yield_now().await;
        table.resolve(id, RtResult::new(TypeTag::Int, crate::value::RuntimeValue::Int(42)));

        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.value, crate::value::RuntimeValue::Int(42));
    }

    #[tokio::test]
    async fn already_resolved_returns_immediately() {
        let table = PromiseTable::new();
        let id = table.create();
        table.resolve(id, RtResult::new(TypeTag::Bool, crate::value::RuntimeValue::Bool(true)));
        let result = table.await_promise(id).await.unwrap();
        assert_eq!(result.value, crate::value::RuntimeValue::Bool(true));
    }

    #[tokio::test]
    async fn rejection_surfaces_as_err() {
        let table = PromiseTable::new();
        let id = table.create();
        table.reject(id, "boom");
        let err = table.await_promise(id).await.unwrap_err();
        assert_eq!(err, "boom");
    }
}
