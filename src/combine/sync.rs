//! Synchronized-combination: a barrier over fresh values.
//!
//! Emission happens only once every still-live input has produced a value
//! since the last emission; records then reset. A watchdog bounds how long
//! one stalled input may block the others.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::combine::{Completion, FluxInput};
use crate::error::BuildError;
use crate::flux::{lock, Flux, FluxOptions, Lazy};
use crate::message::Message;

/// What a completed input contributes to emissions after its completion
/// (only relevant with [`Completion::Allow`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalValue {
    /// Nothing: the completed slot is empty in every later snapshot.
    #[default]
    Undefined,
    /// Its last value, repeated across resets.
    Last,
}

/// Settings for [`synchronized`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Dispose with a timeout reason if the barrier is not satisfied within
    /// this window of construction or of the previous emission. `None`
    /// disables the watchdog.
    pub maximum_wait: Option<Duration>,
    pub final_value: FinalValue,
    pub on_source_done: Completion,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            maximum_wait: Some(Duration::from_millis(2000)),
            final_value: FinalValue::Undefined,
            on_source_done: Completion::Break,
        }
    }
}

struct SyncRecord<V> {
    value: Option<V>,
    last: Option<V>,
    done: bool,
}

/// Take the barrier snapshot if every still-live input holds a fresh value,
/// resetting live records for the next round.
fn barrier_snapshot<V: Clone>(
    records: &mut [SyncRecord<V>],
    final_value: FinalValue,
) -> Option<Vec<Option<V>>> {
    if !records
        .iter()
        .all(|record| record.done || record.value.is_some())
    {
        return None;
    }
    let snapshot = records
        .iter()
        .map(|record| {
            if record.done {
                match final_value {
                    FinalValue::Last => record.last.clone(),
                    FinalValue::Undefined => None,
                }
            } else {
                record.value.clone()
            }
        })
        .collect();
    for record in records.iter_mut() {
        if !record.done {
            record.value = None;
        }
    }
    Some(snapshot)
}

struct Watchdog<V> {
    out: Flux<Vec<Option<V>>>,
    wait: Option<Duration>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<V> Watchdog<V>
where
    V: Clone + Send + 'static,
{
    fn arm(self: &Arc<Self>) {
        let Some(wait) = self.wait else {
            return;
        };
        let watchdog = Arc::clone(self);
        let mut task = lock(&self.task);
        if let Some(previous) = task.take() {
            previous.abort();
        }
        *task = Some(tokio::spawn(async move {
            sleep(wait).await;
            if watchdog.out.is_disposed() {
                return;
            }
            log::warn!("synchronization barrier not satisfied within {:?}", wait);
            watchdog
                .out
                .dispose(format!("Sync timed out after {:?}", wait));
        }));
    }

    fn stop(&self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

/// Merge inputs as a barrier: one snapshot per round of fresh values.
///
/// With [`Completion::Allow`] a completed input is permanently excluded from
/// the barrier; a late value from it is ignored.
pub fn synchronized<V>(
    inputs: Vec<FluxInput<V>>,
    options: SyncOptions,
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
    let records: Arc<Mutex<Vec<SyncRecord<V>>>> = Arc::new(Mutex::new(
        inputs
            .iter()
            .map(|_| SyncRecord {
                value: None,
                last: None,
                done: false,
            })
            .collect(),
    ));
    let final_value = options.final_value;
    let policy = options.on_source_done;

    let watchdog = Arc::new(Watchdog {
        out: out.clone(),
        wait: options.maximum_wait,
        task: Mutex::new(None),
    });
    watchdog.arm();
    {
        let watchdog = Arc::clone(&watchdog);
        out.add_teardown(move || watchdog.stop());
    }

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
            let records = Arc::clone(&records);
            let out = out_hook.clone();
            let watchdog = Arc::clone(&watchdog);
            subscriptions.push(input.stream.subscribe(move |message| match message {
                Message::Value(value) => {
                    let emission = {
                        let mut records = lock(&records);
                        let record = &mut records[index];
                        if record.done {
                            return;
                        }
                        record.value = Some(value.clone());
                        record.last = Some(value.clone());
                        barrier_snapshot(&mut records, final_value)
                    };
                    if let Some(snapshot) = emission {
                        out.set(snapshot);
                        watchdog.arm();
                    }
                }
                Message::Signal(signal) if signal.is_done() => match policy {
                    Completion::Break => out.dispose("Source stream completed"),
                    Completion::Allow => {
                        let (all_done, emission) = {
                            let mut records = lock(&records);
                            records[index].done = true;
                            let all_done = records.iter().all(|record| record.done);
                            let emission = if all_done {
                                None
                            } else {
                                // One fewer input gates the barrier now.
                                barrier_snapshot(&mut records, final_value)
                            };
                            (all_done, emission)
                        };
                        if all_done {
                            out.dispose("All source streams completed");
                            return;
                        }
                        if let Some(snapshot) = emission {
                            out.set(snapshot);
                            watchdog.arm();
                        }
                    }
                },
                Message::Signal(_) => {}
            }));
        }

        out_hook.add_teardown(move || {
            for subscription in subscriptions {
                subscription.unsubscribe();
            }
            for stream in owned {
                stream.dispose("Synchronized stream disposed");
            }
        });
    });

    Ok(out)
}
