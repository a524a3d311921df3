//! Class names and attributes emitted on highlight wrapper elements.
//!
//! Wrappers are identified by the [`ID_ATTR`] attribute, never by class
//! name, so documents that happen to use these class names in their own
//! content cannot confuse the engine.

/// Base class present on every wrapper element.
pub const HIGHLIGHT: &str = "hh-highlight";

/// Class toggled on wrappers belonging to a disabled query set.
pub const DISABLED: &str = "hh-disabled";

/// Attribute carrying the numeric highlight id.
pub const ID_ATTR: &str = "data-hh-id";

/// Group class selecting one of the rotating CSS variants.
pub fn group_class(id_highlight: u32) -> String {
    format!("hh-highlight-id-{id_highlight}")
}

/// Optional per-query class derived from the query set name.
pub fn query_class(name: &str) -> String {
    format!("hh-highlight-{name}")
}
