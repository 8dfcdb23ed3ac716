//! Live subscriptions on store paths.
//!
//! A [`Subscription`] is an owned handle; it stays registered until
//! [`Subscription::unsubscribe`] is called or the handle is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::Value;

use super::paths;
use crate::errors::AppError;

pub type ChangeCallback = Arc<dyn Fn(Option<Value>) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(AppError) + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Listener {
    pub path: String,
    pub on_change: ChangeCallback,
    pub on_error: ErrorCallback,
}

/// Registered listeners, keyed by subscription id.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, Listener>>,
}

impl ListenerRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Listener>> {
        // A panicking callback never runs under this lock, so the map is intact.
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, listener: Listener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.lock().insert(id, listener);
        id
    }

    pub fn remove(&self, id: u64) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Listeners whose watched path overlaps `changed`, cloned out of the lock.
    pub fn matching(&self, changed: &str) -> Vec<Listener> {
        self.lock()
            .values()
            .filter(|l| paths::overlaps(&l.path, changed))
            .cloned()
            .collect()
    }
}

/// Handle for a live subscription.
pub struct Subscription {
    id: u64,
    path: String,
    registry: Weak<ListenerRegistry>,
    released: bool,
}

impl Subscription {
    pub(crate) fn new(id: u64, path: String, registry: &Arc<ListenerRegistry>) -> Self {
        Self {
            id,
            path,
            registry: Arc::downgrade(registry),
            released: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Release the subscription. Returns `false` if the store is already gone.
    pub fn unsubscribe(mut self) -> bool {
        self.release()
    }

    fn release(&mut self) -> bool {
        self.released = true;
        match self.registry.upgrade() {
            Some(registry) => {
                let removed = registry.remove(self.id);
                tracing::debug!(id = self.id, path = %self.path, "Subscription released");
                removed
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(
                id = self.id,
                path = %self.path,
                "Subscription dropped without unsubscribe; releasing"
            );
            self.release();
        }
    }
}
