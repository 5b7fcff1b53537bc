//! Extension instance ids (`<name>#<suffix>`).

use uuid::Uuid;

/// Separator between extension name and instance suffix.
pub const INSTANCE_SEPARATOR: char = '#';

/// Returns the extension name an instance id refers to.
///
/// A bare name (no separator) refers to itself.
pub fn extension_name_from_id(instance_id: &str) -> &str {
    instance_id
        .split_once(INSTANCE_SEPARATOR)
        .map_or(instance_id, |(name, _)| name)
}

/// Builds `<name>#<suffix>`.
pub fn instance_id(name: &str, suffix: &str) -> String {
    format!("{name}{INSTANCE_SEPARATOR}{suffix}")
}

/// Builds an instance id with a fresh random suffix.
pub fn new_instance_id(name: &str) -> String {
    instance_id(name, &Uuid::new_v4().simple().to_string())
}
