//! Extension/slot registry over two named stores.
//!
//! # Responsibility
//! - Own the internal source-of-truth store and expose its mutators.
//! - Keep the public store in sync with the projection of internal state.
//!
//! # Invariants
//! - Mutators never panic and never return errors; rejections are logged and
//!   leave the internal state `Arc` untouched.
//! - Only the path from root to the changed slot/extension is replaced.
//! - The public store is written only when the projection differs by value.
//! - Exactly one bridge per internal store, attached by the first handle
//!   that binds it; every handle on that store shares its `RegistryConfig`.
//! - After a mutator returns, the public store reflects at least that write,
//!   whichever thread ends up publishing it.

use crate::config::RegistryConfig;
use crate::extension::model::{
    AssignedExtension, Component, ExtensionInfo, ExtensionRegistration, InternalState,
    PublishedState, SlotInfo, SlotState,
};
use crate::extension::outcome::{MutationOutcome, RejectReason};
use crate::extension::projection::{project_slot, project_with};
use crate::store::{Store, StoreError, StoreHub, SubscriptionId, WeakStore};
use log::{debug, warn};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// Live view of one slot for a rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotView<C> {
    /// Display-ordered extensions assigned to the slot.
    pub extensions: Vec<AssignedExtension<C>>,
    pub slot_name: String,
    /// Module the consumer renders the slot for.
    pub module_name: String,
    /// Context passed by the consumer, else the slot's registered state.
    pub state: Option<SlotState>,
}

/// Handle to the extension registry bound to one `StoreHub`.
///
/// Handles are cheap to clone; all handles on the same hub and store names
/// share the same state.
#[derive(Debug, Clone)]
pub struct ExtensionRegistry<C: Component> {
    internal: Store<InternalState<C>>,
    public: Store<PublishedState<C>>,
    config: Arc<RegistryConfig>,
}

impl<C: Component> ExtensionRegistry<C> {
    /// Binds to `hub` with default store names.
    pub fn new(hub: &StoreHub) -> Result<Self, StoreError> {
        Self::with_config(hub, RegistryConfig::default())
    }

    /// Binds to the process-wide hub.
    pub fn global() -> Result<Self, StoreError> {
        Self::new(StoreHub::global())
    }

    /// Binds to `hub` using the store names and ordering rules in `config`.
    ///
    /// # Errors
    /// - `StoreError::TypeMismatch` when a configured store name already holds
    ///   a different component type.
    /// - `StoreError::ConfigMismatch` when the internal store is already bound
    ///   with a different `RegistryConfig`.
    pub fn with_config(hub: &StoreHub, config: RegistryConfig) -> Result<Self, StoreError> {
        let config = Arc::new(config);
        // Public first: a failed bind must not leave an unbridged internal store.
        let public = hub.get_or_create(&config.public_store, PublishedState::default())?;
        let (internal, bridge) = hub.bind(
            &config.internal_store,
            InternalState::default,
            |internal| Bridge::install(internal, public.clone(), Arc::clone(&config)),
        )?;

        if bridge.config != config {
            warn!(
                "event=registry_bind module=registry status=rejected internal={} reason=config_mismatch",
                config.internal_store
            );
            return Err(StoreError::ConfigMismatch(config.internal_store.clone()));
        }

        bridge.request();
        debug!(
            "event=registry_bind module=registry status=ok internal={} public={}",
            config.internal_store, config.public_store
        );

        Ok(Self {
            internal,
            public,
            config,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Inserts or overwrites an extension (last write wins, no merge).
    ///
    /// Callers are responsible for a non-empty name; nothing is validated.
    pub fn register_extension(&self, registration: ExtensionRegistration<C>) -> MutationOutcome {
        let name = registration.name.clone();
        self.mutate("extension_register", &name, |current| {
            Ok(current.with_extension(ExtensionInfo::new(registration)))
        })
    }

    /// Creates a slot or refreshes its state and owner.
    ///
    /// Rejected when the slot is already owned by a different module.
    pub fn register_extension_slot(
        &self,
        module_name: &str,
        slot_name: &str,
        state: Option<SlotState>,
    ) -> MutationOutcome {
        self.mutate("slot_register", slot_name, |current| {
            let slot = match current.slot(slot_name) {
                Some(existing) => {
                    if let Some(owner) = existing.owner() {
                        if owner != module_name {
                            return Err(RejectReason::OwnershipConflict {
                                slot: slot_name.to_string(),
                                owner: owner.to_string(),
                                requested: module_name.to_string(),
                            });
                        }
                    }
                    SlotInfo {
                        module_name: Some(module_name.to_string()),
                        state,
                        ..SlotInfo::clone(existing)
                    }
                }
                None => SlotInfo::new(slot_name, Some(module_name.to_string()), state),
            };
            Ok(current.with_slot(slot))
        })
    }

    /// Replaces the state of an existing slot. Owner and attachments are kept.
    pub fn update_extension_slot(&self, slot_name: &str, state: SlotState) -> MutationOutcome {
        self.mutate("slot_update", slot_name, |current| {
            let existing = current
                .slot(slot_name)
                .ok_or_else(|| RejectReason::SlotNotFound(slot_name.to_string()))?;
            Ok(current.with_slot(SlotInfo {
                state: Some(state),
                ..SlotInfo::clone(existing)
            }))
        })
    }

    /// Appends `instance_id` to a slot, creating the slot when unknown.
    ///
    /// `module_name` only applies to a newly created slot.
    pub fn attach(
        &self,
        slot_name: &str,
        instance_id: &str,
        module_name: Option<&str>,
    ) -> MutationOutcome {
        self.mutate("slot_attach", slot_name, |current| {
            let slot = match current.slot(slot_name) {
                Some(existing) => {
                    if existing.is_attached(instance_id) {
                        return Err(RejectReason::AlreadyAttached {
                            slot: slot_name.to_string(),
                            instance_id: instance_id.to_string(),
                        });
                    }
                    let mut slot = SlotInfo::clone(existing);
                    slot.attached_ids.push(instance_id.to_string());
                    slot
                }
                None => {
                    let mut slot =
                        SlotInfo::new(slot_name, module_name.map(str::to_string), None);
                    slot.attached_ids.push(instance_id.to_string());
                    slot
                }
            };
            Ok(current.with_slot(slot))
        })
    }

    /// Removes `instance_id` from a slot, keeping the order of the rest.
    pub fn detach(&self, slot_name: &str, instance_id: &str) -> MutationOutcome {
        self.mutate("slot_detach", slot_name, |current| {
            let existing = current
                .slot(slot_name)
                .ok_or_else(|| RejectReason::SlotNotFound(slot_name.to_string()))?;
            if !existing.is_attached(instance_id) {
                return Err(RejectReason::NotAttached {
                    slot: slot_name.to_string(),
                    instance_id: instance_id.to_string(),
                });
            }

            let mut slot = SlotInfo::clone(existing);
            slot.attached_ids.retain(|id| id != instance_id);
            Ok(current.with_slot(slot))
        })
    }

    /// Current internal state snapshot.
    pub fn internal_state(&self) -> Arc<InternalState<C>> {
        self.internal.get()
    }

    /// Current published read-model.
    pub fn published(&self) -> Arc<PublishedState<C>> {
        self.public.get()
    }

    /// Projects one slot straight from internal state, bypassing the public
    /// store. Unknown slots yield an empty list.
    pub fn assigned_extensions(&self, slot_name: &str) -> Vec<AssignedExtension<C>> {
        let state = self.internal.get();
        state
            .slot(slot_name)
            .map(|slot| project_slot(slot, &*state.extensions, &self.config))
            .unwrap_or_default()
    }

    /// Published extensions of one slot. Unknown slots yield an empty list.
    pub fn published_extensions(&self, slot_name: &str) -> Vec<AssignedExtension<C>> {
        self.public
            .get()
            .slot(slot_name)
            .map(|snapshot| snapshot.assigned_extensions.clone())
            .unwrap_or_default()
    }

    /// Slot consumption primitive for rendering layers.
    ///
    /// Read-only; call again after a public-store notification to refresh.
    pub fn use_extension_slot(
        &self,
        module_name: &str,
        slot_name: &str,
        state: Option<SlotState>,
    ) -> SlotView<C> {
        let published = self.public.get();
        let snapshot = published.slot(slot_name);

        SlotView {
            extensions: snapshot
                .map(|slot| slot.assigned_extensions.clone())
                .unwrap_or_default(),
            slot_name: slot_name.to_string(),
            module_name: module_name.to_string(),
            state: state.or_else(|| snapshot.and_then(|slot| slot.state.clone())),
        }
    }

    /// Subscribes to published read-model changes.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Arc<PublishedState<C>>) + Send + Sync + 'static,
    {
        self.public.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.public.unsubscribe(id)
    }

    fn mutate<F>(&self, event: &str, subject: &str, change: F) -> MutationOutcome
    where
        F: FnOnce(&InternalState<C>) -> Result<InternalState<C>, RejectReason>,
    {
        let mut outcome = MutationOutcome::Applied;
        self.internal.update(|current| match change(&**current) {
            Ok(next) => Arc::new(next),
            Err(reason) => {
                outcome = MutationOutcome::Rejected(reason);
                Arc::clone(current)
            }
        });

        match &outcome {
            MutationOutcome::Applied => {
                debug!("event={event} module=registry status=ok subject={subject}");
            }
            MutationOutcome::Rejected(reason) => {
                warn!("event={event} module=registry status=rejected subject={subject} reason={reason}");
            }
        }
        outcome
    }
}

#[derive(Default)]
struct PublishQueue {
    owner: Option<ThreadId>,
    pending: bool,
}

/// Copies the projection of the internal store into the public store.
///
/// One pass runs at a time and always projects the latest internal state,
/// so concurrent writers can never publish out of order.
struct Bridge<C: Component> {
    internal: WeakStore<InternalState<C>>,
    public: Store<PublishedState<C>>,
    config: Arc<RegistryConfig>,
    queue: Mutex<PublishQueue>,
    idle: Condvar,
}

impl<C: Component> Bridge<C> {
    fn install(
        internal: &Store<InternalState<C>>,
        public: Store<PublishedState<C>>,
        config: Arc<RegistryConfig>,
    ) -> Arc<Self> {
        let bridge = Arc::new(Self {
            internal: internal.downgrade(),
            public,
            config,
            queue: Mutex::new(PublishQueue::default()),
            idle: Condvar::new(),
        });
        let listener = Arc::clone(&bridge);
        internal.subscribe(move |_| listener.request());
        debug!(
            "event=bridge_install module=registry status=ok internal={}",
            internal.name()
        );
        bridge
    }

    /// Returns once the public store reflects at least every internal write
    /// made before the call.
    ///
    /// A request raised by a public listener on the publishing thread is
    /// folded into the running pass instead of blocking on it.
    fn request(&self) {
        let current = thread::current().id();
        let mut queue = lock(&self.queue);
        queue.pending = true;
        loop {
            let owner = queue.owner;
            match owner {
                Some(owner) if owner == current => return,
                Some(_) => {
                    queue = self
                        .idle
                        .wait(queue)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                None => break,
            }
        }
        if !queue.pending {
            // Another thread's pass already covered this write.
            return;
        }
        queue.owner = Some(current);
        drop(queue);

        let _release = ReleaseOnDrop(self);
        while self.take_pending() {
            let Some(internal) = self.internal.upgrade() else {
                break;
            };
            publish(&self.public, &*internal.get(), &self.config);
        }
    }

    fn take_pending(&self) -> bool {
        std::mem::take(&mut lock(&self.queue).pending)
    }
}

/// Hands the bridge back to waiting threads, also when a listener panics.
struct ReleaseOnDrop<'a, C: Component>(&'a Bridge<C>);

impl<C: Component> Drop for ReleaseOnDrop<'_, C> {
    fn drop(&mut self) {
        lock(&self.0.queue).owner = None;
        self.0.idle.notify_all();
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn publish<C: Component>(
    public: &Store<PublishedState<C>>,
    state: &InternalState<C>,
    config: &RegistryConfig,
) -> bool {
    let projected = project_with(state, config);
    let written = public.update(|current| {
        if **current == projected {
            Arc::clone(current)
        } else {
            Arc::new(projected)
        }
    });
    debug!(
        "event=projection_publish module=registry status={} slots={}",
        if written { "written" } else { "unchanged" },
        state.slots.len()
    );
    written
}
