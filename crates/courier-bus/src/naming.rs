//! # Queue and Routing-Key Naming
//!
//! Queue names and routing keys are pure functions of the processor and
//! message type names. They must stay bit-exact with earlier deployments:
//!
//! ```text
//! queue name  = "courier.queue:"   + lower_first(segment) joined by "."
//! routing key = "courier.message:" + lower_first(segment) joined by "."
//! ```
//!
//! Segments are separated by `::` (Rust paths) or `\` (names produced by
//! earlier deployments). Results are memoized process-wide.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Namespace prefix keeping bus queues apart from user queues.
pub const NAME_PREFIX: &str = "courier";

type NameCache = OnceLock<Mutex<HashMap<String, String>>>;

static QUEUE_NAMES: NameCache = OnceLock::new();
static ROUTING_KEYS: NameCache = OnceLock::new();

/// Queue name for a processor type.
#[must_use]
pub fn queue_name(processor_type: &str) -> String {
    memoized(&QUEUE_NAMES, "queue", processor_type)
}

/// Routing key for a message type.
#[must_use]
pub fn routing_key(message_type: &str) -> String {
    memoized(&ROUTING_KEYS, "message", message_type)
}

/// Non-empty path segments of a type name.
pub fn type_segments(type_name: &str) -> impl Iterator<Item = &str> {
    type_name
        .split("::")
        .flat_map(|segment| segment.split('\\'))
        .filter(|segment| !segment.is_empty())
}

/// Last path segment of a type name (`billing::ChargeCard` -> `ChargeCard`).
#[must_use]
pub fn short_name(type_name: &str) -> &str {
    type_segments(type_name).last().unwrap_or(type_name)
}

/// Lower-case the first character, leave the rest untouched.
#[must_use]
pub fn lower_first(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Upper-case the first character, leave the rest untouched.
#[must_use]
pub fn upper_first(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn memoized(cache: &NameCache, kind: &str, type_name: &str) -> String {
    let mut names = cache.get_or_init(Default::default).lock();
    names
        .entry(type_name.to_string())
        .or_insert_with(|| derive_name(kind, type_name))
        .clone()
}

fn derive_name(kind: &str, type_name: &str) -> String {
    let path = type_segments(type_name)
        .map(lower_first)
        .collect::<Vec<_>>()
        .join(".");
    format!("{NAME_PREFIX}.{kind}:{path}")
}
