//! Combinators: merge a fixed set of input streams into one.
//!
//! Inputs are resolved once at construction into a uniform array of records;
//! plain vectors become finite streams (owned by the combinator, disposed
//! with it), live streams are borrowed and only unsubscribed.

pub mod latest;
pub mod sync;

use crate::flux::Flux;
use crate::sources::array::{from_array, FromArrayOptions};

pub use latest::{combine_latest, combine_latest_named, LatestOptions};
pub use sync::{synchronized, FinalValue, SyncOptions};

/// What an input stream's completion does to the combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Completion {
    /// Any input completing disposes the combinator immediately.
    #[default]
    Break,
    /// Keep going on the remaining live inputs; self-dispose only once
    /// every input has completed.
    Allow,
}

/// A combinator input: a borrowed live stream, or a plain vector resolved
/// into an owned finite stream.
pub struct FluxInput<V> {
    pub(crate) stream: Flux<V>,
    /// Owned inputs are disposed together with the combinator; borrowed
    /// ones are only unsubscribed.
    pub(crate) owned: bool,
}

impl<V> From<Flux<V>> for FluxInput<V> {
    fn from(stream: Flux<V>) -> Self {
        FluxInput {
            stream,
            owned: false,
        }
    }
}

impl<V> From<&Flux<V>> for FluxInput<V> {
    fn from(stream: &Flux<V>) -> Self {
        FluxInput {
            stream: stream.clone(),
            owned: false,
        }
    }
}

impl<V> From<Vec<V>> for FluxInput<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn from(items: Vec<V>) -> Self {
        FluxInput {
            stream: from_array(items, FromArrayOptions::default()),
            owned: true,
        }
    }
}
