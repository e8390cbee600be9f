//! Individual tool implementations (§4.3). Each module owns one or two
//! closely related tools; `registry::ToolRegistry::with_defaults` is the
//! only place that wires them together.

pub mod character;
pub mod faction;
pub mod location;
pub mod memory_search;
pub mod name;
pub mod relationship;

/// Split a full name like `"Elena Thorne"` into `(first, family)`. A
/// single-word name gets an empty family name rather than failing —
/// generator tools should not halt a tick over a terse LLM name.
pub fn split_name(full: &str) -> (String, String) {
    let mut parts = full.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let family = parts.collect::<Vec<_>>().join(" ");
    (first, family)
}
