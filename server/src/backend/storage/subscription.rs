//! Change-listener registry shared by the store backends.

use log::debug;
use std::sync::{Arc, Mutex, Weak};

use super::traits::ChangeListener;
use crate::backend::domain::models::LedgerSnapshot;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, ChangeListener)>,
}

/// Listeners registered against one store
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: ChangeListener) -> Subscription {
        let mut registry = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push((id, listener));
        debug!("Registered ledger change listener {}", id);
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `snapshot` to every listener.
    ///
    /// Listeners are called outside the registry lock so they may subscribe
    /// or unsubscribe from inside the callback.
    pub fn notify(&self, snapshot: &LedgerSnapshot) {
        let listeners: Vec<ChangeListener> = match self.inner.lock() {
            Ok(guard) => guard.listeners.iter().map(|(_, l)| l.clone()).collect(),
            Err(poisoned) => poisoned.into_inner().listeners.iter().map(|(_, l)| l.clone()).collect(),
        };
        for listener in listeners {
            listener(snapshot);
        }
    }

    pub fn listener_count(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.listeners.len(),
            Err(poisoned) => poisoned.into_inner().listeners.len(),
        }
    }
}

/// Handle for a registered listener
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Explicitly unregister; equivalent to dropping the handle
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            let mut registry = match inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            registry.listeners.retain(|(id, _)| *id != self.id);
            debug!("Removed ledger change listener {}", self.id);
        }
    }
}
