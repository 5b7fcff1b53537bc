//! FFI use-case API for a Flutter rendering facade.
//!
//! # Responsibility
//! - Expose registry mutators and the slot consumption view to Dart via FRB.
//! - Carry components as widget keys (`String`); Dart maps keys to widgets.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Metadata and slot state cross the boundary as JSON object strings.

use log::error;
use once_cell::sync::OnceCell;
use slotboard_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    register_app, AssignedExtension, ExtensionDefinition, ExtensionRegistry, Meta,
    MutationOutcome, SlotState,
};

static REGISTRY: OnceCell<ExtensionRegistry<String>> = OnceCell::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action response envelope for registry mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotActionResponse {
    /// Whether the registry state changed as requested.
    pub ok: bool,
    /// Empty on success, otherwise the rejection reason.
    pub message: String,
}

impl SlotActionResponse {
    fn success() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

impl From<MutationOutcome> for SlotActionResponse {
    fn from(outcome: MutationOutcome) -> Self {
        match outcome {
            MutationOutcome::Applied => Self::success(),
            MutationOutcome::Rejected(reason) => Self::failure(reason.to_string()),
        }
    }
}

/// One extension as rendered into a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotExtensionItem {
    pub id: String,
    pub name: String,
    /// Widget key registered for the extension.
    pub component: String,
    pub module_name: String,
    /// Extension metadata as a JSON object string.
    pub meta_json: String,
}

/// Slot consumption response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotViewResponse {
    pub slot_name: String,
    pub module_name: String,
    /// Display-ordered extensions.
    pub items: Vec<SlotExtensionItem>,
    /// Effective slot state as a JSON object string, if any.
    pub state_json: Option<String>,
    /// Empty on success, otherwise a diagnostic message.
    pub message: String,
}

/// Registers one extension for `module_name` and attaches it to `slots`.
///
/// # FFI contract
/// - Rejects blank `name` or `component` without touching registry state.
/// - `meta_json` must be a JSON object when provided.
#[flutter_rust_bridge::frb(sync)]
pub fn register_extension(
    name: String,
    component: String,
    module_name: String,
    meta_json: Option<String>,
    order: Option<i64>,
    slots: Vec<String>,
) -> SlotActionResponse {
    let meta = match parse_json_object(meta_json.as_deref()) {
        Ok(meta) => meta,
        Err(err) => return SlotActionResponse::failure(format!("register_extension failed: {err}")),
    };
    let component = Some(component).filter(|value| !value.trim().is_empty());
    let definition = ExtensionDefinition {
        name,
        component,
        slot: None,
        slots: Some(slots),
        order,
        meta,
    };

    with_registry(|registry| {
        let report = register_app(registry, module_name.as_str(), [definition]);
        match report.skipped.first() {
            Some(err) => SlotActionResponse::failure(format!("register_extension failed: {err}")),
            None => SlotActionResponse::success(),
        }
    })
}

/// Registers (or re-registers) a slot for `module_name`.
#[flutter_rust_bridge::frb(sync)]
pub fn register_extension_slot(
    module_name: String,
    slot_name: String,
    state_json: Option<String>,
) -> SlotActionResponse {
    let state = match parse_json_object(state_json.as_deref()) {
        Ok(state) => state,
        Err(err) => {
            return SlotActionResponse::failure(format!("register_extension_slot failed: {err}"))
        }
    };
    with_registry(|registry| {
        registry
            .register_extension_slot(module_name.as_str(), slot_name.as_str(), state)
            .into()
    })
}

/// Replaces the state of an existing slot.
#[flutter_rust_bridge::frb(sync)]
pub fn update_extension_slot(slot_name: String, state_json: String) -> SlotActionResponse {
    let state = match parse_json_object(Some(state_json.as_str())) {
        Ok(state) => state.unwrap_or_default(),
        Err(err) => {
            return SlotActionResponse::failure(format!("update_extension_slot failed: {err}"))
        }
    };
    with_registry(|registry| {
        registry
            .update_extension_slot(slot_name.as_str(), state)
            .into()
    })
}

/// Attaches an extension instance id to a slot.
#[flutter_rust_bridge::frb(sync)]
pub fn attach(
    slot_name: String,
    extension_id: String,
    module_name: Option<String>,
) -> SlotActionResponse {
    with_registry(|registry| {
        registry
            .attach(
                slot_name.as_str(),
                extension_id.as_str(),
                module_name.as_deref(),
            )
            .into()
    })
}

/// Detaches an extension instance id from a slot.
#[flutter_rust_bridge::frb(sync)]
pub fn detach(slot_name: String, extension_id: String) -> SlotActionResponse {
    with_registry(|registry| {
        registry
            .detach(slot_name.as_str(), extension_id.as_str())
            .into()
    })
}

/// Returns the display-ordered extensions of one slot.
///
/// # FFI contract
/// - Read-only; Dart re-queries after registry changes.
/// - Unknown slots return an empty item list.
#[flutter_rust_bridge::frb(sync)]
pub fn extension_slot(
    module_name: String,
    slot_name: String,
    state_json: Option<String>,
) -> SlotViewResponse {
    let context = match parse_json_object(state_json.as_deref()) {
        Ok(context) => context,
        Err(err) => {
            return SlotViewResponse {
                slot_name,
                module_name,
                items: Vec::new(),
                state_json: None,
                message: format!("extension_slot failed: {err}"),
            }
        }
    };

    let registry = match registry() {
        Ok(registry) => registry,
        Err(err) => {
            return SlotViewResponse {
                slot_name,
                module_name,
                items: Vec::new(),
                state_json: None,
                message: err,
            }
        }
    };

    let view = registry.use_extension_slot(module_name.as_str(), slot_name.as_str(), context);
    SlotViewResponse {
        slot_name: view.slot_name,
        module_name: view.module_name,
        items: view.extensions.into_iter().map(to_slot_item).collect(),
        state_json: view.state.as_ref().map(to_json_string),
        message: String::new(),
    }
}

fn registry() -> Result<&'static ExtensionRegistry<String>, String> {
    REGISTRY
        .get_or_try_init(ExtensionRegistry::global)
        .map_err(|err| {
            error!("event=ffi_registry_bind module=ffi status=error error={err}");
            format!("extension registry unavailable: {err}")
        })
}

fn with_registry(
    f: impl FnOnce(&ExtensionRegistry<String>) -> SlotActionResponse,
) -> SlotActionResponse {
    match registry() {
        Ok(registry) => f(registry),
        Err(err) => SlotActionResponse::failure(err),
    }
}

fn parse_json_object(raw: Option<&str>) -> Result<Option<Meta>, String> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    serde_json::from_str::<SlotState>(raw)
        .map(Some)
        .map_err(|err| format!("expected a JSON object: {err}"))
}

fn to_json_string(value: &Meta) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

fn to_slot_item(extension: AssignedExtension<String>) -> SlotExtensionItem {
    SlotExtensionItem {
        meta_json: to_json_string(&extension.meta),
        id: extension.id,
        name: extension.name,
        component: extension.component,
        module_name: extension.module_name,
    }
}
