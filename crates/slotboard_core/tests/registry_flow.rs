use slotboard_core::{
    instance_id, project, register_app, ExtensionDefinition, ExtensionRegistration,
    ExtensionRegistry, PublishedState, SlotState, StoreHub,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

fn new_registry(hub: &StoreHub) -> ExtensionRegistry<&'static str> {
    ExtensionRegistry::new(hub).expect("registry should bind")
}

fn published_ids(registry: &ExtensionRegistry<&'static str>, slot: &str) -> Vec<String> {
    registry
        .published_extensions(slot)
        .into_iter()
        .map(|extension| extension.id)
        .collect()
}

#[test]
fn attach_order_does_not_decide_display_order() {
    let hub = StoreHub::new();
    let registry = new_registry(&hub);
    registry.register_extension(ExtensionRegistration::new("a", "A", "app").with_order(3));
    registry.register_extension(ExtensionRegistration::new("b", "B", "app").with_order(1));
    registry.register_extension(ExtensionRegistration::new("c", "C", "app").with_order(2));

    for id in ["a#1", "b#1", "c#1"] {
        registry.attach("s", id, None);
    }

    assert_eq!(published_ids(&registry, "s"), vec!["b#1", "c#1", "a#1"]);
    assert_eq!(
        registry
            .internal_state()
            .slot("s")
            .expect("slot")
            .attached_ids,
        vec!["a#1", "b#1", "c#1"]
    );
}

#[test]
fn welcome_banner_renders_before_stats_widget() {
    let hub = StoreHub::new();
    let registry = new_registry(&hub);
    registry.register_extension(
        ExtensionRegistration::new("welcome-banner", "banner", "app").with_order(1),
    );
    registry.register_extension(
        ExtensionRegistration::new("stats-widget", "stats", "app").with_order(2),
    );

    registry.attach("content-slot", "stats-widget", Some("app"));
    registry.attach("content-slot", "welcome-banner", Some("app"));

    let view = registry.use_extension_slot("app", "content-slot", None);
    let names: Vec<&str> = view.extensions.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["welcome-banner", "stats-widget"]);
    assert_eq!(view.slot_name, "content-slot");
    assert_eq!(view.module_name, "app");
    assert_eq!(view.extensions[0].component, "banner");
}

#[test]
fn dangling_attachment_is_dropped_without_error() {
    let hub = StoreHub::new();
    let registry = new_registry(&hub);
    registry.register_extension(ExtensionRegistration::new("known", "K", "app"));

    assert!(registry.attach("s", "never-registered#1", None).is_applied());
    assert!(registry.attach("s", "known#1", None).is_applied());

    assert_eq!(published_ids(&registry, "s"), vec!["known#1"]);
    assert_eq!(
        registry
            .assigned_extensions("s")
            .iter()
            .map(|e| e.id.as_str())
            .collect::<Vec<_>>(),
        vec!["known#1"]
    );
}

#[test]
fn late_registration_resolves_earlier_attachment() {
    let hub = StoreHub::new();
    let registry = new_registry(&hub);
    registry.attach("s", "late#1", Some("app"));
    assert!(published_ids(&registry, "s").is_empty());

    registry.register_extension(ExtensionRegistration::new("late", "L", "app"));
    assert_eq!(published_ids(&registry, "s"), vec!["late#1"]);
}

#[test]
fn same_extension_can_be_attached_under_several_instance_ids() {
    let hub = StoreHub::new();
    let registry = new_registry(&hub);
    registry.register_extension(ExtensionRegistration::new("card", "C", "app"));

    registry.attach("grid", &instance_id("card", "left"), None);
    registry.attach("grid", &instance_id("card", "right"), None);
    assert!(!registry.attach("grid", "card#left", None).is_applied());

    let published = registry.published_extensions("grid");
    assert_eq!(published.len(), 2);
    assert!(published.iter().all(|extension| extension.name == "card"));
}

#[test]
fn public_listeners_skip_mutations_that_do_not_change_projection() {
    let hub = StoreHub::new();
    let registry = new_registry(&hub);
    registry.register_extension_slot("app", "s", None);

    let notifications = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notifications);
    registry.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let before = registry.internal_state();
    assert!(registry.register_extension_slot("app", "s", None).is_applied());
    assert!(!Arc::ptr_eq(&before, &registry.internal_state()));
    assert_eq!(notifications.load(Ordering::SeqCst), 0);

    registry.attach("s", "ghost#1", None);
    assert_eq!(notifications.load(Ordering::SeqCst), 0);

    let mut state = SlotState::new();
    state.insert("count".to_string(), serde_json::json!(43));
    registry.update_extension_slot("s", state);
    assert_eq!(notifications.load(Ordering::SeqCst), 1);
}

#[test]
fn public_listener_observes_update_before_mutator_returns() {
    let hub = StoreHub::new();
    let registry = new_registry(&hub);
    registry.register_extension(ExtensionRegistration::new("a", "A", "app"));

    let seen: Arc<Mutex<Vec<Arc<PublishedState<&'static str>>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = registry.subscribe(move |state| sink.lock().unwrap().push(Arc::clone(state)));

    registry.attach("s", "a#1", None);
    {
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].slot("s").expect("slot").assigned_extensions.len(), 1);
    }

    assert!(registry.unsubscribe(id));
    registry.detach("s", "a#1");
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert!(registry.published_extensions("s").is_empty());
}

#[test]
fn listener_may_mutate_registry_reentrantly() {
    let hub = StoreHub::new();
    let registry = new_registry(&hub);
    registry.register_extension(ExtensionRegistration::new("a", "A", "app"));
    registry.register_extension(ExtensionRegistration::new("echo", "E", "app"));

    let follower = registry.clone();
    registry.subscribe(move |state| {
        let has_a = state
            .slot("primary")
            .is_some_and(|slot| !slot.assigned_extensions.is_empty());
        if has_a {
            follower.attach("secondary", "echo#1", None);
        }
    });

    registry.attach("primary", "a#1", None);
    assert_eq!(published_ids(&registry, "secondary"), vec!["echo#1"]);
}

#[test]
fn handles_on_same_hub_share_state_and_single_bridge() {
    let hub = StoreHub::new();
    let first = new_registry(&hub);
    let second = new_registry(&hub);

    let notifications = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notifications);
    second.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    first.register_extension(ExtensionRegistration::new("a", "A", "app"));
    first.attach("s", "a#1", Some("app"));

    assert_eq!(published_ids(&second, "s"), vec!["a#1"]);
    assert_eq!(notifications.load(Ordering::SeqCst), 1);
}

#[test]
fn slot_view_prefers_consumer_state_over_registered_state() {
    let hub = StoreHub::new();
    let registry = new_registry(&hub);
    let mut registered = SlotState::new();
    registered.insert("count".to_string(), serde_json::json!(1));
    registry.register_extension_slot("app", "s", Some(registered.clone()));

    let view = registry.use_extension_slot("app", "s", None);
    assert_eq!(view.state, Some(registered));

    let mut context = SlotState::new();
    context.insert("count".to_string(), serde_json::json!(42));
    let view = registry.use_extension_slot("app", "s", Some(context.clone()));
    assert_eq!(view.state, Some(context));

    let unknown = registry.use_extension_slot("app", "missing", None);
    assert!(unknown.extensions.is_empty());
    assert_eq!(unknown.state, None);
}

#[test]
fn bootstrap_demo_app_populates_header_and_content_slots() {
    let hub = StoreHub::new();
    let registry = new_registry(&hub);
    let report = register_app(
        &registry,
        "app",
        [
            ExtensionDefinition::new("welcome-banner", "banner")
                .with_order(1)
                .in_slot("header-slot"),
            ExtensionDefinition::new("stats-widget", "stats")
                .with_order(2)
                .in_slot("content-slot"),
        ],
    );

    assert_eq!(report.registered, vec!["welcome-banner", "stats-widget"]);
    assert!(report.skipped.is_empty());
    assert_eq!(published_ids(&registry, "header-slot"), vec!["welcome-banner"]);
    assert_eq!(published_ids(&registry, "content-slot"), vec!["stats-widget"]);

    let published = registry.published();
    let content = published.slot("content-slot").expect("content slot");
    assert_eq!(content.module_name.as_deref(), Some("app"));
}

#[test]
fn concurrent_attaches_publish_the_latest_projection() {
    const NAMES: [&str; 4] = ["alpha", "beta", "gamma", "delta"];
    let hub = StoreHub::new();
    let registry = new_registry(&hub);
    for (order, name) in NAMES.iter().enumerate() {
        registry.register_extension(ExtensionRegistration::new(*name, "X", "app").with_order(order as i64));
    }

    for round in 0..20 {
        let slot = format!("slot-{round}");
        thread::scope(|scope| {
            for worker in 0..8 {
                let registry = &registry;
                let slot = slot.as_str();
                scope.spawn(move || {
                    for step in 0..25 {
                        let name = NAMES[(worker + step) % NAMES.len()];
                        let id = instance_id(name, &format!("{worker}-{step}"));
                        assert!(registry.attach(slot, &id, None).is_applied());
                        assert!(
                            registry
                                .published_extensions(slot)
                                .iter()
                                .any(|extension| extension.id == id),
                            "own attach must be published before attach returns"
                        );
                    }
                });
            }
        });

        assert_eq!(
            project(&registry.internal_state()),
            *registry.published(),
            "round {round}"
        );
        assert_eq!(registry.published_extensions(&slot).len(), 200);
    }
}
