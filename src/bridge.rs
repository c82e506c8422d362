//! Interop with the async stream ecosystem.
//!
//! Push streams and pull streams meet here: a [`Flux`] can be drained into a
//! `BoxStream`, and any `futures` stream can be replayed into a [`Flux`].

use std::sync::{Arc, Mutex};

use futures::channel::mpsc;
use futures_core::Stream;
use futures_util::stream::BoxStream;
use futures_util::{pin_mut, StreamExt};

use crate::flux::{lock, Flux, FluxOptions, Lazy, Subscription};
use crate::message::Message;

/// Drain a flux into a pull-based stream. The stream ends when the flux is
/// disposed; dropping the stream detaches the subscription on the next
/// delivery.
pub fn into_stream<V>(source: &Flux<V>) -> BoxStream<'static, V>
where
    V: Clone + Send + 'static,
{
    let (sender, receiver) = mpsc::unbounded();
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

    let slot_inner = Arc::clone(&slot);
    let mut sender = Some(sender);
    let subscription = source.subscribe(move |message| match message {
        Message::Value(value) => {
            let Some(tx) = &sender else {
                return;
            };
            if tx.unbounded_send(value.clone()).is_err() {
                // Receiver gone; stop listening.
                sender = None;
                if let Some(subscription) = lock(&slot_inner).take() {
                    subscription.unsubscribe();
                }
            }
        }
        Message::Signal(signal) if signal.is_done() => {
            // Dropping the sender closes the channel.
            sender = None;
        }
        Message::Signal(_) => {}
    });
    *lock(&slot) = Some(subscription);

    receiver.boxed()
}

/// Replay a pull-based stream into a flux. The producer task starts
/// immediately (laziness `Never`) and the flux disposes itself when the
/// stream ends.
pub fn from_stream<S>(stream: S) -> Flux<S::Item>
where
    S: Stream + Send + 'static,
    S::Item: Clone + Send + 'static,
{
    let out: Flux<S::Item> = Flux::with_options(FluxOptions {
        lazy: Lazy::Never,
        keep_last: true,
    });
    let producer = out.clone();
    let task = tokio::spawn(async move {
        pin_mut!(stream);
        while let Some(item) = stream.next().await {
            if producer.is_disposed() {
                return;
            }
            producer.set(item);
        }
        producer.dispose("Upstream stream ended");
    });
    out.add_teardown(move || task.abort());

    out
}
