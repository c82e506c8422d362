//! Stream core: subscriber registry, disposal, laziness tiers.
//!
//! `Flux<V>` is the push-based primitive everything else builds on. A flux
//! is single-writer (the owning producer calls [`Flux::set`]) and
//! multi-reader (any number of subscriber callbacks). Delivery iterates a
//! snapshot of the registry, so subscribing or unsubscribing from inside a
//! callback never corrupts the round in progress.
//!
//! Re-entrant emission on the same stream (a subscriber calling `set` on the
//! stream that is currently delivering to it) is outside the single-writer
//! contract and is skipped rather than deadlocking.

use std::collections::HashSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::message::{Message, Signal};

/// Lock helper: user callbacks never run under these mutexes, so a poisoned
/// lock only means a panic we already logged. Recover the guard.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// When a stream's producer runs, relative to subscriber presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lazy {
    /// Producer starts at construction, whether or not anyone listens.
    Never,
    /// Producer starts on the first subscription ever, and keeps running
    /// after the subscriber count returns to zero.
    #[default]
    Initial,
    /// Producer runs only while at least one subscriber is attached; it is
    /// paused on the 1->0 edge and resumed on the next 0->1 edge.
    Very,
}

/// Construction-time settings for a stream.
#[derive(Debug, Clone)]
pub struct FluxOptions {
    pub lazy: Lazy,
    /// Retain the most recent value so late consumers (and combinators
    /// seeding their records) can read it via [`Flux::last`].
    pub keep_last: bool,
}

impl Default for FluxOptions {
    fn default() -> Self {
        Self {
            lazy: Lazy::Initial,
            keep_last: true,
        }
    }
}

type Callback<V> = Box<dyn FnMut(&Message<V>) + Send>;
type SharedCallback<V> = Arc<Mutex<Callback<V>>>;
type Hook = Box<dyn FnMut() + Send>;
type Teardown = Box<dyn FnOnce() + Send>;

/// A push-based stream of values over time.
///
/// Cheap to clone; clones share the same subscriber registry and disposal
/// state.
pub struct Flux<V> {
    inner: Arc<FluxInner<V>>,
}

impl<V> Clone for Flux<V> {
    fn clone(&self) -> Self {
        Flux {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct FluxInner<V> {
    subscribers: Mutex<Vec<(Uuid, SharedCallback<V>)>>,
    /// Ids unsubscribed while a delivery round holds a snapshot; honored
    /// mid-round, pruned afterwards.
    tombstones: Mutex<HashSet<Uuid>>,
    disposed: AtomicBool,
    reason: Mutex<Option<String>>,
    last: Mutex<Option<V>>,
    keep_last: bool,
    lazy: Lazy,
    activated: AtomicBool,
    on_activate: Mutex<Option<Hook>>,
    on_idle: Mutex<Option<Hook>>,
    teardowns: Mutex<Vec<Teardown>>,
}

impl<V> Flux<V>
where
    V: Clone + Send + 'static,
{
    pub(crate) fn with_options(options: FluxOptions) -> Self {
        Flux {
            inner: Arc::new(FluxInner {
                subscribers: Mutex::new(Vec::new()),
                tombstones: Mutex::new(HashSet::new()),
                disposed: AtomicBool::new(false),
                reason: Mutex::new(None),
                last: Mutex::new(None),
                keep_last: options.keep_last,
                lazy: options.lazy,
                activated: AtomicBool::new(false),
                on_activate: Mutex::new(None),
                on_idle: Mutex::new(None),
                teardowns: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a callback for every future message.
    ///
    /// On an already-disposed stream the callback fires once with the
    /// terminal signal and the returned subscription is inert.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&Message<V>) + Send + 'static,
    {
        if self.is_disposed() {
            let mut callback = callback;
            let context = lock(&self.inner.reason)
                .clone()
                .unwrap_or_else(|| "Disposed".to_string());
            callback(&Message::Signal(Signal::done(context)));
            return Subscription::inert();
        }

        let id = Uuid::new_v4();
        let was_empty = {
            let mut registry = lock(&self.inner.subscribers);
            let was_empty = registry.is_empty();
            registry.push((id, Arc::new(Mutex::new(Box::new(callback) as Callback<V>))));
            was_empty
        };
        if was_empty {
            self.activate();
        }

        let flux = self.clone();
        Subscription::new(move || flux.remove_subscriber(id))
    }

    /// Like [`Flux::subscribe`], but signal messages are swallowed.
    pub fn subscribe_values<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(&V) + Send + 'static,
    {
        self.subscribe(move |message| {
            if let Message::Value(value) = message {
                callback(value);
            }
        })
    }

    /// Producer side: emit a value to every subscriber.
    ///
    /// No-op once disposed, so a value can never follow the terminal signal.
    pub fn set(&self, value: V) {
        if self.is_disposed() {
            log::debug!("value dropped: stream already disposed");
            return;
        }
        if self.inner.keep_last {
            *lock(&self.inner.last) = Some(value.clone());
        }
        self.deliver(&Message::Value(value));
    }

    /// Producer side: broadcast a non-terminal signal.
    pub(crate) fn signal(&self, signal: Signal) {
        if self.is_disposed() || signal.is_done() {
            return;
        }
        self.deliver(&Message::Signal(signal));
    }

    /// Tear the stream down. Idempotent: the first call broadcasts the
    /// terminal signal, clears the registry and releases owned resources;
    /// later calls are no-ops.
    pub fn dispose(&self, reason: impl Into<String>) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let reason = reason.into();
        log::debug!("stream disposed: {}", reason);
        *lock(&self.inner.reason) = Some(reason.clone());
        self.deliver(&Message::Signal(Signal::done(reason)));
        lock(&self.inner.subscribers).clear();
        lock(&self.inner.tombstones).clear();
        lock(&self.inner.on_activate).take();
        lock(&self.inner.on_idle).take();
        let teardowns = std::mem::take(&mut *lock(&self.inner.teardowns));
        for teardown in teardowns {
            teardown();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// The reason given to [`Flux::dispose`], once disposed.
    pub fn dispose_reason(&self) -> Option<String> {
        lock(&self.inner.reason).clone()
    }

    /// Most recent value, for streams constructed with `keep_last`.
    pub fn last(&self) -> Option<V> {
        lock(&self.inner.last).clone()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }

    /// Hook invoked on the 0->1 subscriber edge (per laziness tier).
    pub(crate) fn set_on_activate(&self, hook: impl FnMut() + Send + 'static) {
        *lock(&self.inner.on_activate) = Some(Box::new(hook));
    }

    /// Hook invoked on the 1->0 subscriber edge (`Lazy::Very` only).
    pub(crate) fn set_on_idle(&self, hook: impl FnMut() + Send + 'static) {
        *lock(&self.inner.on_idle) = Some(Box::new(hook));
    }

    /// Register cleanup run exactly once at disposal. If the stream is
    /// already disposed the teardown runs immediately.
    pub(crate) fn add_teardown(&self, teardown: impl FnOnce() + Send + 'static) {
        if self.is_disposed() {
            teardown();
            return;
        }
        lock(&self.inner.teardowns).push(Box::new(teardown));
    }

    fn activate(&self) {
        let run = match self.inner.lazy {
            Lazy::Never => false,
            Lazy::Initial => !self.inner.activated.swap(true, Ordering::AcqRel),
            Lazy::Very => true,
        };
        if !run {
            return;
        }
        // Take the hook out for the call so a hook that disposes the stream
        // (or re-enters it) cannot deadlock on its own slot.
        if let Some(mut hook) = lock(&self.inner.on_activate).take() {
            hook();
            if !self.is_disposed() {
                lock(&self.inner.on_activate).get_or_insert(hook);
            }
        }
    }

    fn remove_subscriber(&self, id: Uuid) {
        if self.is_disposed() {
            return;
        }
        let now_empty = {
            let mut registry = lock(&self.inner.subscribers);
            let before = registry.len();
            registry.retain(|(subscriber, _)| *subscriber != id);
            if registry.len() == before {
                return;
            }
            lock(&self.inner.tombstones).insert(id);
            registry.is_empty()
        };
        if now_empty && self.inner.lazy == Lazy::Very {
            if let Some(mut hook) = lock(&self.inner.on_idle).take() {
                hook();
                if !self.is_disposed() {
                    lock(&self.inner.on_idle).get_or_insert(hook);
                }
            }
        }
    }

    fn deliver(&self, message: &Message<V>) {
        let snapshot: Vec<(Uuid, SharedCallback<V>)> =
            lock(&self.inner.subscribers).clone();
        let is_value = matches!(message, Message::Value(_));

        for (id, callback) in &snapshot {
            // A subscriber may dispose the stream mid-round; stop handing
            // out the value so nobody observes it after the terminal signal.
            if is_value && self.is_disposed() {
                break;
            }
            if lock(&self.inner.tombstones).contains(id) {
                continue;
            }
            // Held only on re-entrant delivery to the same subscriber.
            let Ok(mut callback) = callback.try_lock() else {
                continue;
            };
            if catch_unwind(AssertUnwindSafe(|| (*callback)(message))).is_err() {
                log::warn!("subscriber {} panicked during delivery, continuing", id);
            }
        }

        let registry = lock(&self.inner.subscribers);
        let mut tombstones = lock(&self.inner.tombstones);
        tombstones.retain(|id| registry.iter().any(|(subscriber, _)| subscriber == id));
    }
}

impl<V> fmt::Debug for Flux<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flux")
            .field("subscribers", &lock(&self.inner.subscribers).len())
            .field("disposed", &self.inner.disposed.load(Ordering::Acquire))
            .field("lazy", &self.inner.lazy)
            .finish()
    }
}

/// Idempotent unsubscribe capability returned by [`Flux::subscribe`].
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Subscription {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// A subscription that was never live (stream already disposed).
    fn inert() -> Self {
        Subscription {
            cancel: Mutex::new(None),
        }
    }

    /// Detach the callback. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(cancel) = lock(&self.cancel).take() {
            cancel();
        }
    }

    /// True until [`Subscription::unsubscribe`] has been called.
    pub fn is_active(&self) -> bool {
        lock(&self.cancel).is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
