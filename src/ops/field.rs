//! Key projection over dynamic JSON-valued streams.

use serde_json::Value;

use crate::flux::Flux;
use crate::ops::link;

/// What to do when an incoming object lacks the key.
#[derive(Debug, Clone, Default)]
pub enum MissingField {
    /// Emit nothing for that object.
    #[default]
    Skip,
    /// Emit this value in its place.
    Substitute(Value),
}

#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    pub missing: MissingField,
}

/// Pluck `key` out of every incoming object.
pub fn field(upstream: &Flux<Value>, key: &str, options: FieldOptions) -> Flux<Value> {
    let key = key.to_string();
    link(upstream, false, move |value, out| match value.get(&key) {
        Some(found) => out.set(found.clone()),
        None => match &options.missing {
            MissingField::Skip => {}
            MissingField::Substitute(substitute) => out.set(substitute.clone()),
        },
    })
}
