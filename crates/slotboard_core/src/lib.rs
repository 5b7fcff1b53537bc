//! Core extension/slot registry for slotboard.
//! This crate is the single source of truth for registry invariants.

pub mod bootstrap;
pub mod config;
pub mod extension;
pub mod logging;
pub mod store;

pub use bootstrap::{register_app, BootstrapReport, DefinitionError, ExtensionDefinition};
pub use config::{LoggingConfig, RegistryConfig, TieBreak};
pub use extension::instance::{extension_name_from_id, instance_id, new_instance_id};
pub use extension::model::{
    AssignedExtension, Component, ComponentHandle, ExtensionInfo, ExtensionInstance,
    ExtensionRegistration, InternalState, Meta, PublishedState, SlotInfo, SlotSnapshot,
    SlotState,
};
pub use extension::outcome::{MutationOutcome, RejectReason};
pub use extension::projection::{project, project_with};
pub use extension::registry::{ExtensionRegistry, SlotView};
pub use logging::{default_log_level, init_logging, init_logging_with, logging_status};
pub use store::{Store, StoreError, StoreHub, SubscriptionId};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
