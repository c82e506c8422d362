//! Pollable function source: wraps a computation as a stream.
//!
//! The computation runs either on an interval loop or on demand via
//! [`FnStream::ping`]; the two triggers are mutually exclusive. Each
//! invocation emits one value, subject to a repeat cap, an error policy and
//! two abort paths (an external [`CancelToken`] and one handed to the
//! callback itself).

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::cancel::CancelToken;
use crate::error::{BuildError, FluxResult};
use crate::flux::{lock, Flux, FluxOptions, Lazy};
use crate::message::Signal;

/// Settings for [`from_fn`].
///
/// With `interval` set the callback loops, sleeping for `interval` between
/// the end of one invocation and the start of the next (a slow callback
/// pushes the next start out; this is not a fixed-rate clock). With `manual`
/// set the caller drives invocations through [`FnStream::ping`]. Setting
/// both is a construction error; setting neither means manual.
#[derive(Debug, Clone)]
pub struct FnSourceOptions {
    pub interval: Option<Duration>,
    pub manual: bool,
    /// Dispose after this many invocations. `None` means unbounded.
    pub maximum_repeats: Option<u64>,
    /// Sleep before the first invocation of the interval loop.
    pub predelay: Option<Duration>,
    /// `true`: a callback error disposes the stream with the error as the
    /// reason. `false`: it degrades to a warning signal and the loop keeps
    /// going.
    pub close_on_error: bool,
    /// External kill switch; aborting it stops the loop and disposes.
    pub signal: Option<CancelToken>,
    pub lazy: Lazy,
}

impl Default for FnSourceOptions {
    fn default() -> Self {
        Self {
            interval: None,
            manual: false,
            maximum_repeats: None,
            predelay: None,
            close_on_error: true,
            signal: None,
            lazy: Lazy::Very,
        }
    }
}

/// Stream handle returned by [`from_fn`]; derefs to the underlying
/// [`Flux`] and adds [`FnStream::ping`].
pub struct FnStream<V> {
    stream: Flux<V>,
    ctl: Arc<FnCtl<V>>,
}

impl<V> Deref for FnStream<V> {
    type Target = Flux<V>;

    fn deref(&self) -> &Flux<V> {
        &self.stream
    }
}

impl<V> FnStream<V>
where
    V: Clone + Send + 'static,
{
    /// A plain handle to the underlying stream.
    pub fn stream(&self) -> Flux<V> {
        self.stream.clone()
    }

    /// Run one invoke-and-emit cycle now. No-op once the stream is disposed
    /// (which includes having reached the repeat cap); returns `false` in
    /// that case.
    pub fn ping(&self) -> bool {
        if self.stream.is_disposed() {
            return false;
        }
        self.ctl.run_cycle();
        true
    }

    /// How many times the callback has been invoked.
    pub fn invocations(&self) -> u64 {
        self.ctl.invocations.load(Ordering::Acquire)
    }
}

type Producer<V> = Box<dyn FnMut(&CancelToken) -> FluxResult<V> + Send>;

struct FnCtl<V> {
    callback: Mutex<Producer<V>>,
    out: Flux<V>,
    /// Abort capability handed to the callback.
    abort: CancelToken,
    external: Option<CancelToken>,
    invocations: AtomicU64,
    maximum_repeats: Option<u64>,
    interval: Option<Duration>,
    predelay: Option<Duration>,
    close_on_error: bool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<V> FnCtl<V>
where
    V: Clone + Send + 'static,
{
    fn abort_reason(&self) -> Option<String> {
        if let Some(external) = &self.external {
            if external.is_aborted() {
                return Some(external.reason().unwrap_or_else(|| "Aborted".to_string()));
            }
        }
        if self.abort.is_aborted() {
            return Some(self.abort.reason().unwrap_or_else(|| "Aborted".to_string()));
        }
        None
    }

    /// One invoke-and-emit cycle. Returns `false` when the loop should stop.
    fn run_cycle(&self) -> bool {
        if self.out.is_disposed() {
            return false;
        }
        if let Some(reason) = self.abort_reason() {
            self.out.dispose(reason);
            return false;
        }

        let result = (*lock(&self.callback))(&self.abort);

        // An abort flagged during the invocation suppresses the value it
        // returned.
        if let Some(reason) = self.abort_reason() {
            self.out.dispose(reason);
            return false;
        }

        match result {
            Ok(value) => self.out.set(value),
            Err(error) => {
                if self.close_on_error {
                    self.out.dispose(error.to_string());
                    return false;
                }
                log::warn!("producer error degraded to warning: {}", error);
                self.out.signal(Signal::warning(error.to_string()));
            }
        }

        let invocations = self.invocations.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(cap) = self.maximum_repeats {
            if invocations >= cap {
                self.out
                    .dispose(format!("Maximum repeats reached ({})", invocations));
                return false;
            }
        }
        !self.out.is_disposed()
    }

    fn start_loop(self: &Arc<Self>) {
        let Some(interval) = self.interval else {
            return;
        };
        let ctl = Arc::clone(self);
        let mut task = lock(&self.task);
        if let Some(previous) = task.take() {
            previous.abort();
        }
        *task = Some(tokio::spawn(async move {
            if let Some(predelay) = ctl.predelay {
                if ctl.invocations.load(Ordering::Acquire) == 0 {
                    sleep(predelay).await;
                }
            }
            loop {
                if !ctl.run_cycle() {
                    break;
                }
                sleep(interval).await;
            }
        }));
    }

    fn stop_loop(&self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

/// Wrap a computation as a stream.
///
/// The callback receives a [`CancelToken`] it may abort to stop its own
/// loop. See [`FnSourceOptions`] for triggering, repeat, predelay and error
/// policy.
pub fn from_fn<V, F>(callback: F, options: FnSourceOptions) -> Result<FnStream<V>, BuildError>
where
    V: Clone + Send + 'static,
    F: FnMut(&CancelToken) -> FluxResult<V> + Send + 'static,
{
    if options.interval.is_some() && options.manual {
        return Err(BuildError::ConflictingTrigger);
    }

    let out: Flux<V> = Flux::with_options(FluxOptions {
        lazy: options.lazy,
        keep_last: true,
    });
    let ctl = Arc::new(FnCtl {
        callback: Mutex::new(Box::new(callback) as Producer<V>),
        out: out.clone(),
        abort: CancelToken::new(),
        external: options.signal,
        invocations: AtomicU64::new(0),
        maximum_repeats: options.maximum_repeats,
        interval: options.interval,
        predelay: options.predelay,
        close_on_error: options.close_on_error,
        task: Mutex::new(None),
    });

    if options.interval.is_some() {
        match options.lazy {
            Lazy::Never => ctl.start_loop(),
            Lazy::Initial => {
                let starter = Arc::clone(&ctl);
                out.set_on_activate(move || starter.start_loop());
            }
            Lazy::Very => {
                let starter = Arc::clone(&ctl);
                out.set_on_activate(move || starter.start_loop());
                let pauser = Arc::clone(&ctl);
                out.set_on_idle(move || {
                    log::debug!("no subscribers left, pausing interval loop");
                    pauser.stop_loop();
                });
            }
        }
    }

    let stopper = Arc::clone(&ctl);
    out.add_teardown(move || stopper.stop_loop());

    Ok(FnStream { stream: out, ctl })
}
