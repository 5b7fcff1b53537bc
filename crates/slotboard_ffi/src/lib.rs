//! Flutter-facing bindings for the slotboard extension registry.

pub mod api;
