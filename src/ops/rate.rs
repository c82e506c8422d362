//! Timing operators: debounce, throttle, elapsed.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::flux::{lock, Flux, FluxOptions, Lazy};
use crate::message::Message;
use crate::ops::link;

struct DebounceState<V> {
    pending: Mutex<Option<V>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<V> DebounceState<V>
where
    V: Clone + Send + 'static,
{
    fn arm(self: &Arc<Self>, out: &Flux<V>, period: Duration) {
        let state = Arc::clone(self);
        let out = out.clone();
        let mut task = lock(&self.task);
        if let Some(previous) = task.take() {
            previous.abort();
        }
        *task = Some(tokio::spawn(async move {
            sleep(period).await;
            if let Some(value) = lock(&state.pending).take() {
                out.set(value);
            }
        }));
    }

    fn stop(&self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

/// Trailing-edge debounce: a value is forwarded only once `period` passes
/// with no newer value replacing it. The pending value is flushed when the
/// upstream completes.
pub fn debounce<V>(upstream: &Flux<V>, period: Duration) -> Flux<V>
where
    V: Clone + Send + 'static,
{
    let out: Flux<V> = Flux::with_options(FluxOptions {
        lazy: Lazy::Initial,
        keep_last: true,
    });
    let state = Arc::new(DebounceState {
        pending: Mutex::new(None),
        task: Mutex::new(None),
    });

    {
        let state = Arc::clone(&state);
        out.add_teardown(move || state.stop());
    }

    let out_hook = out.clone();
    let mut pending_upstream = Some(upstream.clone());
    out.set_on_activate(move || {
        let Some(upstream) = pending_upstream.take() else {
            return;
        };
        let out = out_hook.clone();
        let state = Arc::clone(&state);
        let subscription = upstream.subscribe(move |message| match message {
            Message::Value(value) => {
                *lock(&state.pending) = Some(value.clone());
                state.arm(&out, period);
            }
            Message::Signal(signal) if signal.is_done() => {
                state.stop();
                if let Some(value) = lock(&state.pending).take() {
                    out.set(value);
                }
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

    out
}

/// Forward a value only when `period` has passed since the last forwarded
/// one; values inside the window are dropped.
pub fn throttle<V>(upstream: &Flux<V>, period: Duration) -> Flux<V>
where
    V: Clone + Send + 'static,
{
    let mut last_emit: Option<Instant> = None;
    link(upstream, false, move |value, out| {
        let now = Instant::now();
        let open = last_emit.map_or(true, |at| now.duration_since(at) >= period);
        if open {
            last_emit = Some(now);
            out.set(value.clone());
        }
    })
}

/// Milliseconds since the previous upstream value; the first value emits 0.
pub fn elapsed<V>(upstream: &Flux<V>) -> Flux<f64>
where
    V: Clone + Send + 'static,
{
    let mut previous: Option<Instant> = None;
    link(upstream, false, move |_value, out| {
        let now = Instant::now();
        let millis = previous
            .map(|at| now.duration_since(at).as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        previous = Some(now);
        out.set(millis);
    })
}
