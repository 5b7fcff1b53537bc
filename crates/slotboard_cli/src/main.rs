//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `slotboard_core` linkage.
//! - Bootstrap the demo app and print the published slots as JSON.

use slotboard_core::{register_app, ExtensionDefinition, ExtensionRegistry, SlotState};
use std::error::Error;

const APP_NAME: &str = "app";

fn demo_definitions() -> Vec<ExtensionDefinition<&'static str>> {
    vec![
        ExtensionDefinition::new("welcome-banner", "Welcome!")
            .with_order(1)
            .in_slot("header-slot"),
        ExtensionDefinition::new("stats-widget", "Stats: {count}")
            .with_order(2)
            .in_slot("content-slot"),
    ]
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("slotboard_core ping={}", slotboard_core::ping());
    println!("slotboard_core version={}", slotboard_core::core_version());

    let registry = ExtensionRegistry::<&'static str>::global()?;
    let report = register_app(&registry, APP_NAME, demo_definitions());
    for skipped in &report.skipped {
        eprintln!("skipped: {skipped}");
    }

    let mut content_state = SlotState::new();
    content_state.insert("count".to_string(), serde_json::json!(42));
    registry.register_extension_slot(APP_NAME, "header-slot", None);
    registry.register_extension_slot(APP_NAME, "content-slot", Some(content_state));

    for slot in ["header-slot", "content-slot"] {
        let view = registry.use_extension_slot(APP_NAME, slot, None);
        let rendered: Vec<&str> = view.extensions.iter().map(|e| e.component).collect();
        println!("{slot}: {}", rendered.join(" | "));
    }

    println!("{}", serde_json::to_string_pretty(&*registry.published())?);
    Ok(())
}
