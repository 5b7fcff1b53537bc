//! Single named store handle.
//!
//! # Responsibility
//! - Hold one shared state value behind an `Arc`.
//! - Notify listeners synchronously after every successful write.
//!
//! # Invariants
//! - `update` writes only when the updater returns a different `Arc`.
//! - Listeners run after the state lock is released, so they may read or
//!   update any store (including this one) without deadlocking.

use log::debug;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

/// Stable id returned by `subscribe`, used to detach a listener later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

struct StoreInner<T> {
    name: String,
    state: RwLock<Arc<T>>,
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
    next_subscription: AtomicU64,
}

/// Cheap-clone handle to one named store.
///
/// Clones share the same state and listener list.
pub struct Store<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Non-owning handle, for listeners that read back the store they observe.
pub(crate) struct WeakStore<T> {
    inner: Weak<StoreInner<T>>,
}

impl<T> WeakStore<T> {
    pub(crate) fn upgrade(&self) -> Option<Store<T>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

impl<T> Debug for Store<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.name)
            .field("listeners", &lock(&self.inner.listeners).len())
            .finish()
    }
}

impl<T> Store<T> {
    pub(crate) fn new(name: impl Into<String>, initial: T) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                name: name.into(),
                state: RwLock::new(Arc::new(initial)),
                listeners: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakStore<T> {
        WeakStore {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Store name as registered in its hub.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the current state snapshot.
    pub fn get(&self) -> Arc<T> {
        let guard = self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replaces state unconditionally and notifies listeners.
    pub fn set(&self, value: T) {
        let next = Arc::new(value);
        {
            let mut guard = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *guard = Arc::clone(&next);
        }
        self.notify(&next);
    }

    /// Applies `updater` to the current state.
    ///
    /// The updater must hand back the exact input `Arc` to signal "no change";
    /// in that case nothing is written and no listener runs. Returns whether
    /// a write happened.
    ///
    /// The updater runs while the state lock is held and must not touch this
    /// store.
    pub fn update<F>(&self, updater: F) -> bool
    where
        F: FnOnce(&Arc<T>) -> Arc<T>,
    {
        let next = {
            let mut guard = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let current = Arc::clone(&guard);
            let next = updater(&current);
            if Arc::ptr_eq(&current, &next) {
                return false;
            }
            *guard = Arc::clone(&next);
            next
        };

        self.notify(&next);
        true
    }

    /// Registers a listener invoked synchronously on every write.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(
            self.inner
                .next_subscription
                .fetch_add(1, Ordering::Relaxed),
        );
        let listener: Listener<T> = Arc::new(listener);
        lock(&self.inner.listeners).push((id, listener));
        debug!(
            "event=store_subscribe module=store status=ok store={} subscription={}",
            self.inner.name, id.0
        );
        id
    }

    /// Removes one listener. Returns `false` when the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = lock(&self.inner.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn notify(&self, state: &Arc<T>) {
        // Snapshot so listeners may subscribe/unsubscribe reentrantly.
        let listeners: Vec<Listener<T>> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(state);
        }
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
