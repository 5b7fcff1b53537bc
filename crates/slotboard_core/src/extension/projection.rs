//! Projection from internal registry state to the published read-model.
//!
//! # Responsibility
//! - Resolve each slot's attachment list into ordered extension records.
//!
//! # Invariants
//! - Pure: input is never mutated and every call returns fresh maps.
//! - Dangling ids (no matching registration) are dropped silently.
//! - Sort key is `order` ascending, missing order = `missing_order`; ties
//!   follow the configured `TieBreak`.

use crate::config::{RegistryConfig, TieBreak};
use crate::extension::instance::extension_name_from_id;
use crate::extension::model::{
    AssignedExtension, ExtensionMap, InternalState, PublishedState, SlotInfo, SlotSnapshot,
};
use std::collections::BTreeMap;

/// Projects internal state with default ordering rules.
pub fn project<C: Clone>(state: &InternalState<C>) -> PublishedState<C> {
    project_with(state, &RegistryConfig::default())
}

/// Projects internal state using `config` ordering rules.
pub fn project_with<C: Clone>(state: &InternalState<C>, config: &RegistryConfig) -> PublishedState<C> {
    let slots = state
        .slots
        .iter()
        .map(|(name, slot)| {
            let snapshot = SlotSnapshot {
                module_name: slot.module_name.clone(),
                state: slot.state.clone(),
                assigned_extensions: project_slot(slot, &*state.extensions, config),
            };
            (name.clone(), snapshot)
        })
        .collect::<BTreeMap<_, _>>();

    PublishedState { slots }
}

/// Resolves and orders the extensions attached to one slot.
pub fn project_slot<C: Clone>(
    slot: &SlotInfo,
    extensions: &ExtensionMap<C>,
    config: &RegistryConfig,
) -> Vec<AssignedExtension<C>> {
    let mut resolved = slot
        .attached_ids
        .iter()
        .filter_map(|id| {
            let info = extensions.get(extension_name_from_id(id))?;
            let registration = &info.registration;
            let order = registration.order.unwrap_or(config.missing_order);
            let assigned = AssignedExtension {
                id: id.clone(),
                name: registration.name.clone(),
                component: registration.component.clone(),
                meta: registration.meta.clone(),
                module_name: registration.module_name.clone(),
            };
            Some((order, assigned))
        })
        .collect::<Vec<_>>();

    // `sort_by` is stable, so equal orders keep attach order.
    match config.tie_break {
        TieBreak::AttachOrder => resolved.sort_by(|(a, _), (b, _)| a.cmp(b)),
        TieBreak::InstanceId => {
            resolved.sort_by(|(a, left), (b, right)| a.cmp(b).then_with(|| left.id.cmp(&right.id)))
        }
    }

    resolved.into_iter().map(|(_, assigned)| assigned).collect()
}

#[cfg(test)]
mod tests {
    use super::{project, project_with};
    use crate::config::{RegistryConfig, TieBreak};
    use crate::extension::model::{
        ExtensionInfo, ExtensionRegistration, InternalState, SlotInfo,
    };

    fn state_with(
        registrations: &[(&str, Option<i64>)],
        slot: &str,
        attached: &[&str],
    ) -> InternalState<&'static str> {
        let mut state = InternalState::default();
        for (name, order) in registrations {
            let mut registration = ExtensionRegistration::new(*name, "component", "app");
            registration.order = *order;
            state = state.with_extension(ExtensionInfo::new(registration));
        }
        let mut info = SlotInfo::new(slot, Some("app".to_string()), None);
        info.attached_ids = attached.iter().map(|id| id.to_string()).collect();
        state.with_slot(info)
    }

    fn ids(state: &InternalState<&'static str>, slot: &str, config: &RegistryConfig) -> Vec<String> {
        project_with(state, config)
            .slot(slot)
            .expect("slot projected")
            .assigned_extensions
            .iter()
            .map(|extension| extension.id.clone())
            .collect()
    }

    #[test]
    fn sorts_by_order_independent_of_attach_order() {
        let state = state_with(&[("a", Some(3)), ("b", Some(1)), ("c", Some(2))], "s", &["a", "b", "c"]);
        assert_eq!(ids(&state, "s", &RegistryConfig::default()), vec!["b", "c", "a"]);
    }

    #[test]
    fn missing_order_sorts_after_explicit_orders() {
        let state = state_with(&[("late", None), ("early", Some(1000)), ("first", Some(0))], "s", &["late", "early", "first"]);
        assert_eq!(
            ids(&state, "s", &RegistryConfig::default()),
            vec!["first", "late", "early"]
        );
    }

    #[test]
    fn drops_dangling_ids() {
        let state = state_with(&[("known", Some(1))], "s", &["ghost#1", "known#1"]);
        assert_eq!(ids(&state, "s", &RegistryConfig::default()), vec!["known#1"]);
    }

    #[test]
    fn equal_orders_keep_attach_order_or_sort_by_id() {
        let state = state_with(&[("zeta", Some(5)), ("alpha", Some(5))], "s", &["zeta#1", "alpha#1"]);
        assert_eq!(
            ids(&state, "s", &RegistryConfig::default()),
            vec!["zeta#1", "alpha#1"]
        );

        let by_id = RegistryConfig {
            tie_break: TieBreak::InstanceId,
            ..RegistryConfig::default()
        };
        assert_eq!(ids(&state, "s", &by_id), vec!["alpha#1", "zeta#1"]);
    }

    #[test]
    fn projection_is_deterministic_and_fresh() {
        let state = state_with(&[("a", Some(1))], "s", &["a"]);
        let first = project(&state);
        let second = project(&state);
        assert_eq!(first, second);
        assert_eq!(first.slot("s").expect("slot").module_name.as_deref(), Some("app"));
    }

    #[test]
    fn carries_slot_metadata_without_attachments() {
        let mut slot_state = crate::extension::model::SlotState::new();
        slot_state.insert("count".to_string(), serde_json::json!(42));
        let state = InternalState::<&'static str>::default().with_slot(SlotInfo::new(
            "empty",
            None,
            Some(slot_state.clone()),
        ));

        let projected = project(&state);
        let snapshot = projected.slot("empty").expect("slot");
        assert!(snapshot.assigned_extensions.is_empty());
        assert_eq!(snapshot.module_name, None);
        assert_eq!(snapshot.state, Some(slot_state));
    }
}
