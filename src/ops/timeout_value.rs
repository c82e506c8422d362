//! Fallback-on-timeout: inject a value when the upstream goes quiet.
//!
//! Every incoming value passes through and resets the timer; if the timer
//! fires first, the fallback is emitted instead. Disposal unconditionally
//! clears the pending timer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::error::BuildError;
use crate::flux::{lock, Flux, FluxOptions, Lazy};
use crate::message::Message;

/// Where the injected value comes from.
pub enum Fallback<V> {
    /// A constant, cloned at each firing.
    Value(V),
    /// A thunk evaluated at fire time.
    Compute(Box<dyn FnMut() -> V + Send>),
}

/// Settings for [`timeout_value`].
pub struct TimeoutValueOptions<V> {
    /// Required; a missing fallback is a construction error.
    pub fallback: Option<Fallback<V>>,
    /// Quiet window after which the fallback fires.
    pub interval: Duration,
    /// Start the timer at construction (`true`, default) or on the first
    /// value (`false`).
    pub immediate: bool,
    /// Re-arm after firing (`true`, default) or fire exactly once.
    pub repeat: bool,
}

impl<V> Default for TimeoutValueOptions<V> {
    fn default() -> Self {
        Self {
            fallback: None,
            interval: Duration::from_secs(1),
            immediate: true,
            repeat: true,
        }
    }
}

struct FallbackTimer<V> {
    fallback: Mutex<Fallback<V>>,
    interval: Duration,
    repeat: bool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<V> FallbackTimer<V>
where
    V: Clone + Send + 'static,
{
    fn arm(self: &Arc<Self>, out: &Flux<V>) {
        let timer = Arc::clone(self);
        let out = out.clone();
        let mut task = lock(&self.task);
        if let Some(previous) = task.take() {
            previous.abort();
        }
        *task = Some(tokio::spawn(async move {
            loop {
                sleep(timer.interval).await;
                if out.is_disposed() {
                    break;
                }
                let value = match &mut *lock(&timer.fallback) {
                    Fallback::Value(value) => value.clone(),
                    Fallback::Compute(thunk) => thunk(),
                };
                out.set(value);
                if !timer.repeat {
                    break;
                }
            }
        }));
    }

    fn stop(&self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

/// Pass values through, injecting a fallback whenever none arrives within
/// `interval` of the last reset.
pub fn timeout_value<V>(
    upstream: &Flux<V>,
    options: TimeoutValueOptions<V>,
) -> Result<Flux<V>, BuildError>
where
    V: Clone + Send + 'static,
{
    let Some(fallback) = options.fallback else {
        return Err(BuildError::MissingFallback);
    };

    let out: Flux<V> = Flux::with_options(FluxOptions {
        lazy: Lazy::Initial,
        keep_last: true,
    });
    let timer = Arc::new(FallbackTimer {
        fallback: Mutex::new(fallback),
        interval: options.interval,
        repeat: options.repeat,
        task: Mutex::new(None),
    });

    if options.immediate {
        timer.arm(&out);
    }
    {
        let timer = Arc::clone(&timer);
        out.add_teardown(move || timer.stop());
    }

    let out_hook = out.clone();
    let mut pending = Some(upstream.clone());
    let value_timer = Arc::clone(&timer);
    out.set_on_activate(move || {
        let Some(upstream) = pending.take() else {
            return;
        };
        let out = out_hook.clone();
        let timer = Arc::clone(&value_timer);
        let subscription = upstream.subscribe(move |message| match message {
            Message::Value(value) => {
                out.set(value.clone());
                timer.arm(&out);
            }
            Message::Signal(signal) if signal.is_done() => {
                out.dispose(
                    signal
                        .context
                        .clone()
                        .unwrap_or_else(|| "Upstream completed".to_string()),
                );
            }
            Message::Signal(signal) => out.signal(signal.clone()),
        });
        out_hook.add_teardown(move || subscription.unsubscribe());
    });

    Ok(out)
}
