use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;
use tokio::time::sleep;

use flux_stream::{from_fn, FnSourceOptions, Lazy};

fn counting_source(
    lazy: Lazy,
    interval: Duration,
) -> (Arc<AtomicUsize>, flux_stream::FnStream<usize>) {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    let source = from_fn(
        move |_| Ok(counter.fetch_add(1, Ordering::SeqCst)),
        FnSourceOptions {
            interval: Some(interval),
            lazy,
            ..Default::default()
        },
    )
    .unwrap();
    (invocations, source)
}

#[tokio::test]
#[serial]
async fn test_lazy_never_produces_without_subscribers() {
    let (invocations, source) = counting_source(Lazy::Never, Duration::from_millis(20));

    sleep(Duration::from_millis(200)).await;
    assert!(invocations.load(Ordering::SeqCst) > 0);
    source.dispose("test over");
}

#[tokio::test]
#[serial]
async fn test_lazy_very_idle_without_subscribers() {
    let (invocations, source) = counting_source(Lazy::Very, Duration::from_millis(20));

    sleep(Duration::from_millis(200)).await;
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
    source.dispose("test over");
}

#[tokio::test]
#[serial]
async fn test_lazy_very_runs_only_while_subscribed() {
    let (invocations, source) = counting_source(Lazy::Very, Duration::from_millis(10));

    let sub = source.subscribe_values(|_| {});
    sleep(Duration::from_millis(80)).await;
    let while_subscribed = invocations.load(Ordering::SeqCst);
    assert!(while_subscribed > 0);

    sub.unsubscribe();
    sleep(Duration::from_millis(30)).await;
    let after_pause = invocations.load(Ordering::SeqCst);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(invocations.load(Ordering::SeqCst), after_pause);

    // Resumes on the next 0->1 edge.
    let _sub = source.subscribe_values(|_| {});
    sleep(Duration::from_millis(60)).await;
    assert!(invocations.load(Ordering::SeqCst) > after_pause);
    source.dispose("test over");
}

#[tokio::test]
#[serial]
async fn test_lazy_initial_keeps_running_after_last_unsubscribe() {
    let (invocations, source) = counting_source(Lazy::Initial, Duration::from_millis(10));

    sleep(Duration::from_millis(50)).await;
    assert_eq!(invocations.load(Ordering::SeqCst), 0);

    let sub = source.subscribe_values(|_| {});
    sleep(Duration::from_millis(50)).await;
    sub.unsubscribe();
    let at_unsubscribe = invocations.load(Ordering::SeqCst);
    assert!(at_unsubscribe > 0);

    sleep(Duration::from_millis(100)).await;
    assert!(invocations.load(Ordering::SeqCst) > at_unsubscribe);
    source.dispose("test over");
}

#[tokio::test]
async fn test_multiple_subscribers_share_one_producer() {
    let (invocations, source) = counting_source(Lazy::Very, Duration::from_millis(10));

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let a = Arc::clone(&first);
    let b = Arc::clone(&second);
    let _sub_a = source.subscribe_values(move |_| {
        a.fetch_add(1, Ordering::SeqCst);
    });
    let _sub_b = source.subscribe_values(move |_| {
        b.fetch_add(1, Ordering::SeqCst);
    });

    sleep(Duration::from_millis(100)).await;
    source.dispose("test over");

    // Both see every value from a single shared producer: deliveries per
    // subscriber match invocations, they do not double up.
    let produced = invocations.load(Ordering::SeqCst);
    assert!(produced > 0);
    assert_eq!(first.load(Ordering::SeqCst), produced);
    assert_eq!(second.load(Ordering::SeqCst), produced);
}
