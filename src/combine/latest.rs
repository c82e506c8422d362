//! Latest-combination: emit the full record set on every input update.
//!
//! Pace is set by the fastest input; slower inputs contribute their
//! last-known value (or nothing, before their first).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::combine::{Completion, FluxInput};
use crate::error::BuildError;
use crate::flux::{lock, Flux, FluxOptions, Lazy};
use crate::message::Message;
use crate::ops::link;

/// Settings for [`combine_latest`].
#[derive(Debug, Clone, Default)]
pub struct LatestOptions {
    pub on_source_done: Completion,
}

struct LatestRecord<V> {
    value: Option<V>,
    done: bool,
}

/// Merge inputs by index: every update from any input emits the current
/// snapshot of all inputs.
///
/// Inputs are subscribed on the combinator's own first subscriber; records
/// are seeded from each input's retained value, so an already-active source
/// contributes immediately.
pub fn combine_latest<V>(
    inputs: Vec<FluxInput<V>>,
    options: LatestOptions,
) -> Result<Flux<Vec<Option<V>>>, BuildError>
where
    V: Clone + Send + 'static,
{
    if inputs.is_empty() {
        return Err(BuildError::NoInputs);
    }

    let out: Flux<Vec<Option<V>>> = Flux::with_options(FluxOptions {
        lazy: Lazy::Initial,
        keep_last: true,
    });
    let records: Arc<Mutex<Vec<LatestRecord<V>>>> = Arc::new(Mutex::new(
        inputs
            .iter()
            .map(|_| LatestRecord {
                value: None,
                done: false,
            })
            .collect(),
    ));
    let policy = options.on_source_done;

    let out_hook = out.clone();
    let mut pending = Some(inputs);
    out.set_on_activate(move || {
        let Some(inputs) = pending.take() else {
            return;
        };

        let mut subscriptions = Vec::with_capacity(inputs.len());
        let owned: Vec<Flux<V>> = inputs
            .iter()
            .filter(|input| input.owned)
            .map(|input| input.stream.clone())
            .collect();

        for (index, input) in inputs.iter().enumerate() {
            if let Some(seed) = input.stream.last() {
                lock(&records)[index].value = Some(seed);
            }

            let records = Arc::clone(&records);
            let out = out_hook.clone();
            subscriptions.push(input.stream.subscribe(move |message| match message {
                Message::Value(value) => {
                    let snapshot = {
                        let mut records = lock(&records);
                        if records[index].done {
                            return;
                        }
                        records[index].value = Some(value.clone());
                        records
                            .iter()
                            .map(|record| record.value.clone())
                            .collect::<Vec<_>>()
                    };
                    out.set(snapshot);
                }
                Message::Signal(signal) if signal.is_done() => {
                    let all_done = {
                        let mut records = lock(&records);
                        records[index].done = true;
                        records.iter().all(|record| record.done)
                    };
                    match policy {
                        Completion::Break => out.dispose("Source stream completed"),
                        Completion::Allow if all_done => {
                            out.dispose("All source streams completed")
                        }
                        Completion::Allow => {}
                    }
                }
                Message::Signal(_) => {}
            }));
        }

        out_hook.add_teardown(move || {
            for subscription in subscriptions {
                subscription.unsubscribe();
            }
            for stream in owned {
                stream.dispose("Combined stream disposed");
            }
        });
    });

    Ok(out)
}

/// Merge inputs by name; snapshots are keyed maps instead of vectors.
///
/// Same engine as [`combine_latest`]: the names are resolved once and zipped
/// back onto the indexed snapshots.
pub fn combine_latest_named<V>(
    inputs: Vec<(String, FluxInput<V>)>,
    options: LatestOptions,
) -> Result<Flux<HashMap<String, Option<V>>>, BuildError>
where
    V: Clone + Send + 'static,
{
    let (names, streams): (Vec<String>, Vec<FluxInput<V>>) = inputs.into_iter().unzip();
    let combined = combine_latest(streams, options)?;
    Ok(link(&combined, true, move |snapshot: &Vec<Option<V>>, out| {
        out.set(
            names
                .iter()
                .cloned()
                .zip(snapshot.iter().cloned())
                .collect(),
        );
    }))
}
