//! Registry and logging configuration.
//!
//! # Responsibility
//! - Name the two stores a registry binds to.
//! - Hold projection ordering rules and logging bootstrap settings.
//!
//! # Invariants
//! - `RegistryConfig::default()` matches the store names and fallback order
//!   that existing hosts already rely on.

use crate::logging::default_log_level;
use serde::Deserialize;

/// Default internal store name.
pub const INTERNAL_STORE_NAME: &str = "extensionsInternal";
/// Default public (projected) store name.
pub const PUBLIC_STORE_NAME: &str = "extensions";
/// Order assumed for extensions registered without one.
pub const MISSING_ORDER: i64 = 999;

/// Tie-break rule for extensions sharing the same effective order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep attach order (stable sort).
    #[default]
    AttachOrder,
    /// Lexical order of instance ids.
    InstanceId,
}

/// Registry wiring and projection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub internal_store: String,
    pub public_store: String,
    pub missing_order: i64,
    pub tie_break: TieBreak,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            internal_store: INTERNAL_STORE_NAME.to_string(),
            public_store: PUBLIC_STORE_NAME.to_string(),
            missing_order: MISSING_ORDER,
            tie_break: TieBreak::AttachOrder,
        }
    }
}

/// Logging bootstrap settings consumed by `init_logging_with`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: String,
}

impl LoggingConfig {
    /// Uses the build-mode default level.
    pub fn new(log_dir: impl Into<String>) -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: log_dir.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LoggingConfig, RegistryConfig, TieBreak, MISSING_ORDER};

    #[test]
    fn default_config_uses_well_known_store_names() {
        let config = RegistryConfig::default();
        assert_eq!(config.internal_store, "extensionsInternal");
        assert_eq!(config.public_store, "extensions");
        assert_eq!(config.missing_order, MISSING_ORDER);
        assert_eq!(config.tie_break, TieBreak::AttachOrder);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{"public_store":"ui_slots","tie_break":"instance_id"}"#)
                .expect("config should parse");
        assert_eq!(config.internal_store, "extensionsInternal");
        assert_eq!(config.public_store, "ui_slots");
        assert_eq!(config.tie_break, TieBreak::InstanceId);
    }

    #[test]
    fn logging_config_uses_build_default_level() {
        let config = LoggingConfig::new("/tmp/slotboard");
        assert!(config.level == "debug" || config.level == "info");
    }
}
