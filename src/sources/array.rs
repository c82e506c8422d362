//! Finite array replayed as a stream, one element per tick.
//!
//! Disposal happens on the tick *after* the final element, so consumers
//! racing the same tick still observe the last value before the terminal
//! signal.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::flux::{lock, Flux, FluxOptions, Lazy};

/// Settings for [`from_array`].
#[derive(Debug, Clone)]
pub struct FromArrayOptions {
    /// Delay between elements, and before the first one.
    pub interval: Duration,
    pub lazy: Lazy,
}

impl Default for FromArrayOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5),
            lazy: Lazy::Initial,
        }
    }
}

struct ArrayCtl<V> {
    items: Vec<V>,
    cursor: AtomicUsize,
    interval: Duration,
    out: Flux<V>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<V> ArrayCtl<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn start(self: &Arc<Self>) {
        let ctl = Arc::clone(self);
        let mut task = lock(&self.task);
        if let Some(previous) = task.take() {
            previous.abort();
        }
        *task = Some(tokio::spawn(async move {
            loop {
                sleep(ctl.interval).await;
                if ctl.out.is_disposed() {
                    break;
                }
                let index = ctl.cursor.fetch_add(1, Ordering::AcqRel);
                match ctl.items.get(index) {
                    Some(item) => ctl.out.set(item.clone()),
                    None => {
                        ctl.out.dispose("Source array exhausted");
                        break;
                    }
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

/// Replay a vector as a stream, then dispose.
pub fn from_array<V>(items: Vec<V>, options: FromArrayOptions) -> Flux<V>
where
    V: Clone + Send + Sync + 'static,
{
    let out: Flux<V> = Flux::with_options(FluxOptions {
        lazy: options.lazy,
        keep_last: true,
    });
    let ctl = Arc::new(ArrayCtl {
        items,
        cursor: AtomicUsize::new(0),
        interval: options.interval,
        out: out.clone(),
        task: Mutex::new(None),
    });

    match options.lazy {
        Lazy::Never => ctl.start(),
        Lazy::Initial => {
            let starter = Arc::clone(&ctl);
            out.set_on_activate(move || starter.start());
        }
        Lazy::Very => {
            let starter = Arc::clone(&ctl);
            out.set_on_activate(move || starter.start());
            let pauser = Arc::clone(&ctl);
            out.set_on_idle(move || pauser.stop());
        }
    }

    let stopper = Arc::clone(&ctl);
    out.add_teardown(move || stopper.stop());

    out
}
