// SPDX-License-Identifier: BUSL-1.1

//! Disposable subscriptions for event handlers (interrupt, overflow,
//! capacity warning, state change). Multiple subscribers are supported;
//! each disposer removes only its own handler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

type HandlerId = u64;

/// A registry of boxed callbacks of type `F`, each identified so it can be
/// individually disposed.
pub struct HandlerSet<F: ?Sized> {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(HandlerId, Arc<F>)>>,
}

impl<F: ?Sized> Default for HandlerSet<F> {
    fn default() -> Self {
        Self { next_id: AtomicU64::new(0), handlers: RwLock::new(Vec::new()) }
    }
}

impl<F: ?Sized> HandlerSet<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, returning a disposable handle.
    pub fn register(self: &Arc<Self>, handler: Arc<F>) -> Disposer<F> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.write().push((id, handler));
        Disposer { id, set: Arc::downgrade(self) }
    }

    /// Snapshot of currently registered handlers, for invocation.
    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.handlers.read().iter().map(|(_, h)| Arc::clone(h)).collect()
    }

    fn remove(&self, id: HandlerId) {
        self.handlers.write().retain(|(hid, _)| *hid != id);
    }
}

/// A handle that removes its associated handler when disposed. Disposal is
/// idempotent and independent of other subscribers.
pub struct Disposer<F: ?Sized> {
    id: HandlerId,
    set: std::sync::Weak<HandlerSet<F>>,
}

impl<F: ?Sized> Disposer<F> {
    pub fn dispose(self) {
        if let Some(set) = self.set.upgrade() {
            set.remove(self.id);
        }
    }
}

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
