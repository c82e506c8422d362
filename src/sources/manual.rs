//! Caller-driven stream: the owner pushes values with [`crate::Flux::set`].

use crate::flux::{Flux, FluxOptions, Lazy};

/// Settings for a manual stream.
#[derive(Debug, Clone)]
pub struct ManualOptions {
    /// Retain the most recent value for late readers and combinator seeding.
    pub keep_last: bool,
    pub lazy: Lazy,
}

impl Default for ManualOptions {
    fn default() -> Self {
        Self {
            keep_last: true,
            lazy: Lazy::Initial,
        }
    }
}

/// A stream with no producer of its own; the caller drives it.
pub fn manual<V>() -> Flux<V>
where
    V: Clone + Send + 'static,
{
    manual_with(ManualOptions::default())
}

pub fn manual_with<V>(options: ManualOptions) -> Flux<V>
where
    V: Clone + Send + 'static,
{
    Flux::with_options(FluxOptions {
        lazy: options.lazy,
        keep_last: options.keep_last,
    })
}
