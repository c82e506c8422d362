use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use flux_stream::{manual, manual_with, ManualOptions, Message, SignalKind};

fn collected<V: Clone + Send + 'static>() -> (Arc<Mutex<Vec<V>>>, impl FnMut(&V) + Send + 'static)
{
    let values: Arc<Mutex<Vec<V>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&values);
    (values, move |value: &V| sink.lock().unwrap().push(value.clone()))
}

#[test]
fn test_set_reaches_every_subscriber_in_order() {
    let stream = manual::<i32>();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&order);
    let _a = stream.subscribe_values(move |_| first.lock().unwrap().push("a"));
    let second = Arc::clone(&order);
    let _b = stream.subscribe_values(move |_| second.lock().unwrap().push("b"));

    stream.set(1);
    assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
}

#[test]
fn test_dispose_is_idempotent() {
    let stream = manual::<i32>();
    let done_count = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&done_count);
    let _sub = stream.subscribe(move |message| {
        if let Message::Signal(signal) = message {
            if signal.is_done() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }
    });

    stream.dispose("closing");
    stream.dispose("closing again");
    assert_eq!(done_count.load(Ordering::SeqCst), 1);
    assert!(stream.is_disposed());
    assert_eq!(stream.dispose_reason().as_deref(), Some("closing"));
}

#[test]
fn test_no_value_follows_done() {
    let stream = manual::<i32>();
    let (values, sink) = collected::<i32>();
    let _sub = stream.subscribe_values(sink);

    stream.set(1);
    stream.dispose("done");
    stream.set(2);
    assert_eq!(*values.lock().unwrap(), vec![1]);
}

#[test]
fn test_subscribe_after_dispose_fires_terminal_once() {
    let stream = manual::<i32>();
    stream.dispose("gone");

    let seen: Arc<Mutex<Vec<Message<i32>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let sub = stream.subscribe(move |message| sink.lock().unwrap().push(message.clone()));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let signal = seen[0].signal().expect("terminal signal");
    assert_eq!(signal.kind, SignalKind::Done);
    assert_eq!(signal.context.as_deref(), Some("gone"));
    assert!(!sub.is_active());
    sub.unsubscribe(); // no-op
}

#[test]
fn test_unsubscribe_is_idempotent() {
    let stream = manual::<i32>();
    let (values, sink) = collected::<i32>();
    let sub = stream.subscribe_values(sink);

    stream.set(1);
    sub.unsubscribe();
    sub.unsubscribe();
    stream.set(2);
    assert_eq!(*values.lock().unwrap(), vec![1]);
}

#[test]
fn test_unsubscribe_during_delivery_skips_remaining() {
    let stream = manual::<i32>();
    let slot: Arc<Mutex<Option<flux_stream::Subscription>>> = Arc::new(Mutex::new(None));
    let later_count = Arc::new(AtomicUsize::new(0));

    // First subscriber tears the second one down mid-round.
    let unsubscriber = Arc::clone(&slot);
    let _a = stream.subscribe_values(move |_| {
        if let Some(sub) = unsubscriber.lock().unwrap().take() {
            sub.unsubscribe();
        }
    });
    let counter = Arc::clone(&later_count);
    let b = stream.subscribe_values(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    *slot.lock().unwrap() = Some(b);

    stream.set(1);
    stream.set(2);
    assert_eq!(later_count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_subscriber_panic_does_not_block_round() {
    let stream = manual::<i32>();
    let (values, sink) = collected::<i32>();

    let _bad = stream.subscribe_values(|value: &i32| {
        if *value == 13 {
            panic!("unlucky");
        }
    });
    let _good = stream.subscribe_values(sink);

    stream.set(13);
    stream.set(14);
    assert_eq!(*values.lock().unwrap(), vec![13, 14]);
    assert!(!stream.is_disposed());
}

#[test]
fn test_subscribe_values_swallows_signals() {
    let stream = manual::<i32>();
    let (values, sink) = collected::<i32>();
    let _sub = stream.subscribe_values(sink);

    stream.set(7);
    stream.dispose("done");
    assert_eq!(*values.lock().unwrap(), vec![7]);
}

#[test]
fn test_last_retains_most_recent_value() {
    let stream = manual::<i32>();
    assert_eq!(stream.last(), None);
    stream.set(1);
    stream.set(2);
    assert_eq!(stream.last(), Some(2));
}

#[test]
fn test_keep_last_disabled() {
    let stream = manual_with::<i32>(ManualOptions {
        keep_last: false,
        ..ManualOptions::default()
    });
    stream.set(1);
    assert_eq!(stream.last(), None);
}

#[test]
fn test_subscriber_count_tracks_edges() {
    let stream = manual::<i32>();
    assert_eq!(stream.subscriber_count(), 0);
    let a = stream.subscribe_values(|_| {});
    let b = stream.subscribe_values(|_| {});
    assert_eq!(stream.subscriber_count(), 2);
    a.unsubscribe();
    b.unsubscribe();
    assert_eq!(stream.subscriber_count(), 0);
}
