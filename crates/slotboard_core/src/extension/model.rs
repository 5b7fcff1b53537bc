//! Extension registry data model.
//!
//! # Responsibility
//! - Define registration input, internal source-of-truth state, and the
//!   projected read-model published to consumers.
//!
//! # Invariants
//! - `InternalState` is never mutated in place; changes build a new value that
//!   shares every untouched subtree `Arc` with the previous one.
//! - Component handles are opaque: the registry only clones and compares them.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Free-form extension annotations, interpreted only by consumers.
pub type Meta = BTreeMap<String, Value>;

/// Consumer-supplied context attached to a slot.
pub type SlotState = BTreeMap<String, Value>;

/// Render capability carried by an extension.
///
/// Implemented for every cloneable, comparable, thread-safe type; the host
/// picks the concrete handle (widget key, boxed renderer, ...).
pub trait Component: Clone + PartialEq + Debug + Send + Sync + 'static {}

impl<T> Component for T where T: Clone + PartialEq + Debug + Send + Sync + 'static {}

/// Shared render handle compared by identity, not by value.
///
/// Useful for renderers that cannot implement `PartialEq` (closures, trait
/// objects).
pub struct ComponentHandle<T: ?Sized>(Arc<T>);

impl<T> ComponentHandle<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl<T: ?Sized> ComponentHandle<T> {
    pub fn from_arc(value: Arc<T>) -> Self {
        Self(value)
    }

    pub fn as_arc(&self) -> &Arc<T> {
        &self.0
    }
}

impl<T: ?Sized> std::ops::Deref for ComponentHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> Clone for ComponentHandle<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> PartialEq for ComponentHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl<T: ?Sized> Eq for ComponentHandle<T> {}

impl<T: ?Sized> Debug for ComponentHandle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentHandle({:p})", Arc::as_ptr(&self.0))
    }
}

/// Registration input for one named extension.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionRegistration<C> {
    /// Unique key; re-registration under the same name overwrites.
    pub name: String,
    pub component: C,
    /// Module that declared the extension.
    pub module_name: String,
    pub meta: Meta,
    /// Ascending display priority. `None` sorts last.
    pub order: Option<i64>,
}

impl<C> ExtensionRegistration<C> {
    pub fn new(name: impl Into<String>, component: C, module_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component,
            module_name: module_name.into(),
            meta: Meta::new(),
            order: None,
        }
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }
}

/// One placement of an extension into a slot.
///
/// Registration clears `ExtensionInfo::instances` and `attach` does not fill
/// it; slot `attached_ids` are the authoritative placement list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionInstance {
    pub id: String,
    pub slot_name: String,
    pub slot_module_name: String,
}

/// Registered extension as held by the internal store.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionInfo<C> {
    pub registration: ExtensionRegistration<C>,
    /// Reset to empty on every (re-)registration.
    pub instances: Vec<ExtensionInstance>,
}

impl<C> ExtensionInfo<C> {
    pub fn new(registration: ExtensionRegistration<C>) -> Self {
        Self {
            registration,
            instances: Vec::new(),
        }
    }
}

/// Slot metadata and its attachment list.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotInfo {
    pub name: String,
    /// Owning module; the first non-empty owner is locked in.
    pub module_name: Option<String>,
    pub state: Option<SlotState>,
    /// Instance ids in attach order (not display order).
    pub attached_ids: Vec<String>,
}

impl SlotInfo {
    pub fn new(
        name: impl Into<String>,
        module_name: Option<String>,
        state: Option<SlotState>,
    ) -> Self {
        Self {
            name: name.into(),
            module_name,
            state,
            attached_ids: Vec::new(),
        }
    }

    /// Returns the owning module when it is set and non-empty.
    pub fn owner(&self) -> Option<&str> {
        self.module_name.as_deref().filter(|owner| !owner.is_empty())
    }

    pub fn is_attached(&self, instance_id: &str) -> bool {
        self.attached_ids.iter().any(|id| id == instance_id)
    }
}

pub type SlotMap = BTreeMap<String, Arc<SlotInfo>>;
pub type ExtensionMap<C> = BTreeMap<String, Arc<ExtensionInfo<C>>>;

/// Internal source-of-truth registry state.
#[derive(Debug, Clone)]
pub struct InternalState<C> {
    pub slots: Arc<SlotMap>,
    pub extensions: Arc<ExtensionMap<C>>,
}

impl<C> Default for InternalState<C> {
    fn default() -> Self {
        Self {
            slots: Arc::new(SlotMap::new()),
            extensions: Arc::new(ExtensionMap::new()),
        }
    }
}

impl<C> InternalState<C> {
    pub fn slot(&self, name: &str) -> Option<&Arc<SlotInfo>> {
        self.slots.get(name)
    }

    pub fn extension(&self, name: &str) -> Option<&Arc<ExtensionInfo<C>>> {
        self.extensions.get(name)
    }

    /// Copy with one slot replaced; the extensions map is shared.
    pub(crate) fn with_slot(&self, slot: SlotInfo) -> Self {
        let mut slots = SlotMap::clone(&self.slots);
        slots.insert(slot.name.clone(), Arc::new(slot));
        Self {
            slots: Arc::new(slots),
            extensions: Arc::clone(&self.extensions),
        }
    }

    /// Copy with one extension replaced; the slots map is shared.
    pub(crate) fn with_extension(&self, info: ExtensionInfo<C>) -> Self {
        let mut extensions = ExtensionMap::clone(&self.extensions);
        extensions.insert(info.registration.name.clone(), Arc::new(info));
        Self {
            slots: Arc::clone(&self.slots),
            extensions: Arc::new(extensions),
        }
    }
}

/// Extension as projected into one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound(serialize = ""))]
pub struct AssignedExtension<C> {
    /// Instance id from the slot's attachment list.
    pub id: String,
    pub name: String,
    #[serde(skip)]
    pub component: C,
    pub meta: Meta,
    pub module_name: String,
}

/// Published state of one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound(serialize = ""))]
pub struct SlotSnapshot<C> {
    pub module_name: Option<String>,
    pub state: Option<SlotState>,
    /// Sorted by display order.
    pub assigned_extensions: Vec<AssignedExtension<C>>,
}

/// Read-model published to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound(serialize = ""))]
pub struct PublishedState<C> {
    pub slots: BTreeMap<String, SlotSnapshot<C>>,
}

impl<C> Default for PublishedState<C> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<C> PublishedState<C> {
    pub fn slot(&self, name: &str) -> Option<&SlotSnapshot<C>> {
        self.slots.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{ComponentHandle, ExtensionRegistration, InternalState, SlotInfo};
    use std::sync::Arc;

    #[test]
    fn component_handles_compare_by_identity() {
        let first = ComponentHandle::new("banner".to_string());
        let same = first.clone();
        let lookalike = ComponentHandle::new("banner".to_string());

        assert_eq!(first, same);
        assert_ne!(first, lookalike);
        assert_eq!(first.as_str(), "banner");
    }

    #[test]
    fn trait_object_handles_are_supported() {
        let render: Arc<dyn Fn() -> String + Send + Sync> = Arc::new(|| "ok".to_string());
        let handle = ComponentHandle::from_arc(render);
        assert_eq!(handle.clone(), handle);
        let render_fn: &(dyn Fn() -> String + Send + Sync) = &*handle;
        assert_eq!(render_fn(), "ok");
    }

    #[test]
    fn with_slot_shares_untouched_extensions_map() {
        let state = InternalState::<u8>::default()
            .with_extension(super::ExtensionInfo::new(ExtensionRegistration::new("a", 1, "m")));
        let next = state.with_slot(SlotInfo::new("s", Some("m".to_string()), None));

        assert!(Arc::ptr_eq(&state.extensions, &next.extensions));
        assert!(!Arc::ptr_eq(&state.slots, &next.slots));
        assert!(next.slot("s").is_some());
    }

    #[test]
    fn owner_ignores_empty_module_name() {
        let unowned = SlotInfo::new("s", Some(String::new()), None);
        assert_eq!(unowned.owner(), None);
        let owned = SlotInfo::new("s", Some("app".to_string()), None);
        assert_eq!(owned.owner(), Some("app"));
    }
}
