//! Array-element projection: turn each incoming array into zero-or-more
//! output values.

use std::cmp::Ordering as CmpOrdering;

use rand::seq::SliceRandom;

use crate::error::BuildError;
use crate::flux::Flux;
use crate::ops::link;

/// Reordering applied to each incoming array before selection.
pub enum Order<V> {
    /// Keep the array as delivered.
    Original,
    /// Random shuffle.
    Shuffle,
    /// Sort with the supplied comparator.
    Sorted(Box<dyn FnMut(&V, &V) -> CmpOrdering + Send>),
}

impl<V> Default for Order<V> {
    fn default() -> Self {
        Order::Original
    }
}

/// Settings for [`single_from_array`]. Exactly one of `at` and `matching`
/// must be set.
pub struct ArrayPickOptions<V> {
    /// Fixed index; negative counts from the end.
    pub at: Option<i64>,
    /// Predicate; every matching element emits, in array order.
    pub matching: Option<Box<dyn FnMut(&V) -> bool + Send>>,
    pub order: Order<V>,
}

impl<V> Default for ArrayPickOptions<V> {
    fn default() -> Self {
        Self {
            at: None,
            matching: None,
            order: Order::Original,
        }
    }
}

enum Selection<V> {
    At(i64),
    Matching(Box<dyn FnMut(&V) -> bool + Send>),
}

/// Project elements out of an array-valued stream.
pub fn single_from_array<V>(
    upstream: &Flux<Vec<V>>,
    options: ArrayPickOptions<V>,
) -> Result<Flux<V>, BuildError>
where
    V: Clone + Send + 'static,
{
    let mut selection = match (options.at, options.matching) {
        (Some(_), Some(_)) => return Err(BuildError::AmbiguousSelection),
        (None, None) => return Err(BuildError::MissingSelection),
        (Some(at), None) => Selection::At(at),
        (None, Some(predicate)) => Selection::Matching(predicate),
    };
    let mut order = options.order;

    Ok(link(upstream, false, move |items: &Vec<V>, out| {
        let mut items = items.clone();
        match &mut order {
            Order::Original => {}
            Order::Shuffle => items.shuffle(&mut rand::thread_rng()),
            Order::Sorted(compare) => items.sort_by(|a, b| compare(a, b)),
        }
        match &mut selection {
            Selection::At(at) => {
                let len = items.len() as i64;
                let index = if *at < 0 { len + *at } else { *at };
                if (0..len).contains(&index) {
                    out.set(items[index as usize].clone());
                }
            }
            Selection::Matching(predicate) => {
                for item in &items {
                    if predicate(item) {
                        out.set(item.clone());
                    }
                }
            }
        }
    }))
}
