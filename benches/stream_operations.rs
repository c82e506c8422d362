use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flux_stream::{
    combine_latest, filter, from_array, into_stream, manual, max, transform, FluxInput,
    FromArrayOptions, LatestOptions, MathOptions,
};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::runtime::Runtime;

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for subscribers in [1usize, 8, 64].iter() {
        group.bench_with_input(
            BenchmarkId::new("set", subscribers),
            subscribers,
            |b, &subscribers| {
                let stream = manual::<u64>();
                let _subs: Vec<_> = (0..subscribers)
                    .map(|_| {
                        stream.subscribe_values(|value| {
                            black_box(*value);
                        })
                    })
                    .collect();
                let mut n = 0u64;
                b.iter(|| {
                    n += 1;
                    stream.set(black_box(n));
                });
            },
        );
    }

    group.finish();
}

fn bench_operator_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("operator_chain");

    group.bench_function("filter_transform", |b| {
        let source = manual::<u64>();
        let doubled_evens = transform(&filter(&source, |value| value % 2 == 0), |value| value * 2);
        let _sub = doubled_evens.subscribe_values(|value| {
            black_box(*value);
        });
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            source.set(black_box(n));
        });
    });

    group.bench_function("rolling_max", |b| {
        let source = manual::<f64>();
        let rolled = max(&source, MathOptions::default());
        let _sub = rolled.subscribe_values(|value| {
            black_box(*value);
        });
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            source.set(black_box(n as f64));
        });
    });

    group.finish();
}

fn bench_combine_latest(c: &mut Criterion) {
    c.bench_function("combine_latest_two_inputs", |b| {
        let first = manual::<u64>();
        let second = manual::<u64>();
        let combined = combine_latest(
            vec![FluxInput::from(&first), FluxInput::from(&second)],
            LatestOptions::default(),
        )
        .unwrap();
        let _sub = combined.subscribe_values(|snapshot| {
            black_box(snapshot.len());
        });
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            first.set(black_box(n));
            second.set(black_box(n));
        });
    });
}

fn bench_array_replay(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("array_replay_into_stream", |b| {
        b.to_async(&rt).iter(|| async {
            let source = from_array(
                (0..16u64).collect::<Vec<_>>(),
                FromArrayOptions {
                    interval: Duration::from_micros(50),
                    ..Default::default()
                },
            );
            let drained: Vec<u64> = into_stream(&source).collect().await;
            black_box(drained)
        });
    });
}

criterion_group!(
    benches,
    bench_fan_out,
    bench_operator_chain,
    bench_combine_latest,
    bench_array_replay
);
criterion_main!(benches);
