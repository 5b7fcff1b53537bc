//! Named store container.
//!
//! # Responsibility
//! - Hand out at most one `Store<T>` per name.
//! - Offer name-based update/subscribe for callers without a handle.
//!
//! # Invariants
//! - A name is bound to exactly one store for the hub lifetime.
//! - Duplicate creation returns the existing store; the new initial state is
//!   discarded.
//! - Name-based operations against unknown names are logged no-ops.
//! - A store carries at most one companion binding, attached once under the
//!   hub lock.

use crate::store::keyed::{Store, SubscriptionId};
use log::{error, warn};
use once_cell::sync::Lazy;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static GLOBAL_HUB: Lazy<StoreHub> = Lazy::new(StoreHub::new);

type Erased = Arc<dyn Any + Send + Sync>;

struct HubEntry {
    store: Erased,
    binding: Option<Erased>,
}

impl HubEntry {
    fn new<T: Send + Sync + 'static>(store: Store<T>) -> Self {
        Self {
            store: Arc::new(store),
            binding: None,
        }
    }
}

/// Store lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(String),
    TypeMismatch {
        name: String,
        expected: &'static str,
    },
    /// A binding already exists on `name` with settings that differ from
    /// the requested ones.
    ConfigMismatch(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "store does not exist: {name}"),
            Self::TypeMismatch { name, expected } => {
                write!(f, "store `{name}` does not hold `{expected}`")
            }
            Self::ConfigMismatch(name) => {
                write!(f, "store `{name}` is already bound with a different configuration")
            }
        }
    }
}

impl Error for StoreError {}

/// Container of named, type-erased stores.
#[derive(Default)]
pub struct StoreHub {
    stores: Mutex<HashMap<String, HubEntry>>,
}

impl Debug for StoreHub {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.lock_stores().keys().cloned().collect();
        names.sort();
        f.debug_struct("StoreHub").field("stores", &names).finish()
    }
}

impl StoreHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide hub. Lives until process exit.
    pub fn global() -> &'static StoreHub {
        &GLOBAL_HUB
    }

    /// Creates a new named store.
    ///
    /// When `name` is taken, logs a warning and returns the existing store.
    pub fn create<T>(&self, name: &str, initial: T) -> Result<Store<T>, StoreError>
    where
        T: Send + Sync + 'static,
    {
        let (store, created) = self.entry(name, || initial)?;
        if !created {
            warn!("event=store_create module=store status=exists store={name}");
        }
        Ok(store)
    }

    /// Returns the existing store or creates it with `initial`.
    pub fn get_or_create<T>(&self, name: &str, initial: T) -> Result<Store<T>, StoreError>
    where
        T: Send + Sync + 'static,
    {
        self.entry(name, || initial).map(|(store, _)| store)
    }

    /// Returns an existing store by name.
    pub fn get<T>(&self, name: &str) -> Result<Store<T>, StoreError>
    where
        T: Send + Sync + 'static,
    {
        let stores = self.lock_stores();
        let erased = stores
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        downcast(name, &erased.store)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock_stores().contains_key(name)
    }

    /// Name-based `Store::update`.
    ///
    /// Unknown names (or a type mismatch) are reported and treated as no-op.
    pub fn update<T, F>(&self, name: &str, updater: F) -> bool
    where
        T: Send + Sync + 'static,
        F: FnOnce(&Arc<T>) -> Arc<T>,
    {
        match self.get::<T>(name) {
            Ok(store) => store.update(updater),
            Err(err) => {
                error!("event=store_update module=store status=error store={name} error={err}");
                false
            }
        }
    }

    /// Name-based `Store::subscribe`. Returns `None` for unknown names.
    pub fn subscribe<T, F>(&self, name: &str, listener: F) -> Option<SubscriptionId>
    where
        T: Send + Sync + 'static,
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        match self.get::<T>(name) {
            Ok(store) => Some(store.subscribe(listener)),
            Err(err) => {
                error!("event=store_subscribe module=store status=error store={name} error={err}");
                None
            }
        }
    }

    /// Returns the store for `name` plus whether this call created it.
    pub(crate) fn entry<T, I>(&self, name: &str, initial: I) -> Result<(Store<T>, bool), StoreError>
    where
        T: Send + Sync + 'static,
        I: FnOnce() -> T,
    {
        let mut stores = self.lock_stores();
        if let Some(existing) = stores.get(name) {
            return downcast(name, &existing.store).map(|store| (store, false));
        }

        let store = Store::new(name, initial());
        stores.insert(name.to_string(), HubEntry::new(store.clone()));
        Ok((store, true))
    }

    /// Returns the store for `name` and its companion binding, creating
    /// either one when missing.
    ///
    /// `attach` runs at most once per name while the hub lock is held, so it
    /// must not call back into this hub.
    pub(crate) fn bind<T, B, I, A>(
        &self,
        name: &str,
        initial: I,
        attach: A,
    ) -> Result<(Store<T>, Arc<B>), StoreError>
    where
        T: Send + Sync + 'static,
        B: Send + Sync + 'static,
        I: FnOnce() -> T,
        A: FnOnce(&Store<T>) -> Arc<B>,
    {
        let mut stores = self.lock_stores();
        let entry = stores
            .entry(name.to_string())
            .or_insert_with(|| HubEntry::new(Store::new(name, initial())));
        let store = downcast::<T>(name, &entry.store)?;

        let binding = match &entry.binding {
            Some(existing) => Arc::clone(existing).downcast::<B>().map_err(|_| {
                StoreError::TypeMismatch {
                    name: name.to_string(),
                    expected: type_name::<B>(),
                }
            })?,
            None => {
                let binding = attach(&store);
                let erased: Erased = binding.clone();
                entry.binding = Some(erased);
                binding
            }
        };
        Ok((store, binding))
    }

    fn lock_stores(&self) -> MutexGuard<'_, HashMap<String, HubEntry>> {
        self.stores.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn downcast<T>(name: &str, erased: &Erased) -> Result<Store<T>, StoreError>
where
    T: Send + Sync + 'static,
{
    erased
        .downcast_ref::<Store<T>>()
        .cloned()
        .ok_or_else(|| StoreError::TypeMismatch {
            name: name.to_string(),
            expected: type_name::<T>(),
        })
}
