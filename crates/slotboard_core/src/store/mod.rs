//! Named process-wide state containers.
//!
//! # Responsibility
//! - Provide get/set/subscribe stores keyed by name.
//! - Guarantee at most one store instance per name within a hub.
//!
//! # Invariants
//! - Writes and listener notification are synchronous on the calling thread.
//! - No-change detection is by `Arc` identity, never by value.

mod hub;
mod keyed;

pub use hub::{StoreError, StoreHub};
pub use keyed::{Store, SubscriptionId};
pub(crate) use keyed::WeakStore;
