//! Extension/slot registry.
//!
//! # Responsibility
//! - Hold extension registrations and slot attachment lists (internal store).
//! - Project them into ordered per-slot extension lists (public store).
//!
//! # Invariants
//! - Registry operations are soft: anomalies are logged, never raised.
//! - Consumers read only the published model; it is never written directly.

pub mod instance;
pub mod model;
pub mod outcome;
pub mod projection;
pub mod registry;
