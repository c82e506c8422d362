//! Predicate gates.

use crate::flux::Flux;
use crate::ops::link;

/// Forward only values the predicate accepts.
pub fn filter<V, P>(upstream: &Flux<V>, mut predicate: P) -> Flux<V>
where
    V: Clone + Send + 'static,
    P: FnMut(&V) -> bool + Send + 'static,
{
    link(upstream, false, move |value, out| {
        if predicate(value) {
            out.set(value.clone());
        }
    })
}

/// Forward only values the predicate rejects; the mirror of [`filter`].
pub fn drop_if<V, P>(upstream: &Flux<V>, mut predicate: P) -> Flux<V>
where
    V: Clone + Send + 'static,
    P: FnMut(&V) -> bool + Send + 'static,
{
    link(upstream, false, move |value, out| {
        if !predicate(value) {
            out.set(value.clone());
        }
    })
}
