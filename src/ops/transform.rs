//! Value mapping.

use crate::flux::Flux;
use crate::ops::link;

/// Forward `map(value)` for every upstream value; signals pass through
/// unchanged.
pub fn transform<I, O, F>(upstream: &Flux<I>, mut map: F) -> Flux<O>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
    F: FnMut(&I) -> O + Send + 'static,
{
    link(upstream, false, move |value, out| out.set(map(value)))
}
