//! Declarative extension bootstrap for one app module.
//!
//! # Responsibility
//! - Validate declared extension definitions before they reach the registry.
//! - Register each valid definition and attach it to its default slots.
//!
//! # Invariants
//! - Invalid definitions are skipped and reported, never registered.
//! - When both `slot` and `slots` are declared, `slots` wins.

use crate::extension::model::{Component, ExtensionRegistration, Meta};
use crate::extension::registry::ExtensionRegistry;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Extension as declared by an app at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionDefinition<C> {
    pub name: String,
    pub component: Option<C>,
    /// Default slot, ignored when `slots` is present.
    pub slot: Option<String>,
    pub slots: Option<Vec<String>>,
    pub order: Option<i64>,
    pub meta: Option<Meta>,
}

impl<C> ExtensionDefinition<C> {
    pub fn new(name: impl Into<String>, component: C) -> Self {
        Self {
            name: name.into(),
            component: Some(component),
            slot: None,
            slots: None,
            order: None,
            meta: None,
        }
    }

    pub fn in_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    pub fn in_slots<I, S>(mut self, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.slots = Some(slots.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    fn target_slots(&self) -> Vec<String> {
        match (&self.slots, &self.slot) {
            (Some(slots), _) => slots.clone(),
            (None, Some(slot)) => vec![slot.clone()],
            (None, None) => Vec::new(),
        }
    }
}

/// Reasons a definition is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// Blank name; carries the definition's position in the input.
    MissingName { index: usize },
    MissingComponent { name: String },
}

impl Display for DefinitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName { index } => {
                write!(f, "extension definition #{index} has no name")
            }
            Self::MissingComponent { name } => {
                write!(f, "extension `{name}` has no component")
            }
        }
    }
}

impl Error for DefinitionError {}

/// Summary of one `register_app` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Names registered, in input order.
    pub registered: Vec<String>,
    pub skipped: Vec<DefinitionError>,
}

/// Registers every valid definition for `app_name` and attaches it to its
/// default slots.
pub fn register_app<C, I>(
    registry: &ExtensionRegistry<C>,
    app_name: &str,
    definitions: I,
) -> BootstrapReport
where
    C: Component,
    I: IntoIterator<Item = ExtensionDefinition<C>>,
{
    let mut report = BootstrapReport::default();

    for (index, definition) in definitions.into_iter().enumerate() {
        match register_definition(registry, app_name, index, definition) {
            Ok(name) => report.registered.push(name),
            Err(err) => {
                error!("event=extension_bootstrap module=bootstrap status=skipped app={app_name} error={err}");
                report.skipped.push(err);
            }
        }
    }

    info!(
        "event=extension_bootstrap module=bootstrap status=ok app={} registered={} skipped={}",
        app_name,
        report.registered.len(),
        report.skipped.len()
    );
    report
}

fn register_definition<C: Component>(
    registry: &ExtensionRegistry<C>,
    app_name: &str,
    index: usize,
    definition: ExtensionDefinition<C>,
) -> Result<String, DefinitionError> {
    let name = definition.name.clone();
    if name.trim().is_empty() {
        return Err(DefinitionError::MissingName { index });
    }

    if definition.slot.is_some() && definition.slots.as_ref().is_some_and(|s| !s.is_empty()) {
        warn!(
            "event=extension_bootstrap module=bootstrap status=warn app={app_name} extension={name} detail=slot_and_slots_declared"
        );
    }
    let slots = definition.target_slots();

    let ExtensionDefinition {
        component,
        order,
        meta,
        ..
    } = definition;
    let component = component.ok_or_else(|| DefinitionError::MissingComponent {
        name: name.clone(),
    })?;

    registry.register_extension(ExtensionRegistration {
        name: name.clone(),
        component,
        module_name: app_name.to_string(),
        meta: meta.unwrap_or_default(),
        order,
    });

    for slot in &slots {
        registry.attach(slot, &name, Some(app_name));
    }

    Ok(name)
}
