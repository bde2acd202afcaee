//! Typed observer hubs
//!
//! One hub per event type. Subscribing returns a [`SubscriptionHandle`] that
//! detaches the callback explicitly; handles hold only a weak reference, so
//! a handle outliving its hub is harmless.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

/// Observer callback type
pub type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

struct ObserverSet<T> {
    callbacks: DashMap<u32, Callback<T>>,
    next_id: AtomicU32,
}

trait Detach: Send + Sync {
    fn detach(&self, id: u32) -> bool;
}

impl<T: 'static> Detach for ObserverSet<T> {
    fn detach(&self, id: u32) -> bool {
        self.callbacks.remove(&id).is_some()
    }
}

/// A set of callbacks for one event type
///
/// Callbacks run on the emitting task and must not subscribe to the same hub
/// from inside the callback.
pub struct Observers<T> {
    inner: Arc<ObserverSet<T>>,
}

impl<T: 'static> Observers<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ObserverSet {
                callbacks: DashMap::new(),
                next_id: AtomicU32::new(1),
            }),
        }
    }

    /// Register a callback
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.callbacks.insert(id, Box::new(callback));

        let set: Arc<dyn Detach> = self.inner.clone();
        SubscriptionHandle {
            id,
            set: Arc::downgrade(&set),
        }
    }

    /// Deliver `value` to every callback
    pub fn emit(&self, value: &T) {
        for entry in self.inner.callbacks.iter() {
            (entry.value())(value);
        }
    }

    /// Number of attached callbacks
    pub fn len(&self) -> usize {
        self.inner.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.callbacks.is_empty()
    }

    /// Detach every callback
    pub fn clear(&self) {
        self.inner.callbacks.clear();
    }
}

impl<T: 'static> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Observers<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Handle to one registered callback
pub struct SubscriptionHandle {
    id: u32,
    set: Weak<dyn Detach>,
}

impl SubscriptionHandle {
    /// Subscription ID (unique per hub)
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Remove the callback; returns false if it was already gone
    pub fn detach(self) -> bool {
        match self.set.upgrade() {
            Some(set) => set.detach(self.id),
            None => false,
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle").field("id", &self.id).finish()
    }
}
