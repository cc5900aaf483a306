//! Performance benchmarks for the broker hot paths.
//!
//! Tracks the costs that bound throughput:
//! - Queue push/pop without contention
//! - Enqueue through the durable log, with and without fsync
//! - A full enqueue, consume and acknowledge cycle
//! - Backoff calculation

#![allow(clippy::unwrap_used)]

use std::{hint::black_box, sync::Arc, time::Duration};

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use spool_broker::{BoundedQueue, Broker, BrokerConfig, RetryPolicy};
use spool_core::RealClock;
use spool_testing::{record, TestEnv};
use tokio::runtime::Runtime;

/// Benchmarks raw queue operations.
fn bench_queue(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_pop", |b| {
        let queue = BoundedQueue::new(1024);
        b.iter(|| {
            queue.push(black_box(record("bench"))).unwrap();
            rt.block_on(queue.pop(Some(Duration::ZERO))).unwrap()
        });
    });

    group.bench_function("topic_scan_1000", |b| {
        b.iter_batched(
            || {
                let queue = BoundedQueue::new(1001);
                for _ in 0..1000 {
                    queue.push(record("other")).unwrap();
                }
                let mut wanted = record("wanted");
                wanted.topic = Some("target".to_string());
                queue.push(wanted).unwrap();
                queue
            },
            |queue| {
                rt.block_on(
                    queue.pop_where(|r| r.matches_topic(Some("target")), Some(Duration::ZERO)),
                )
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmarks enqueue through the event log.
fn bench_enqueue(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("enqueue");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(10));

    for sync_writes in [false, true] {
        group.bench_with_input(
            BenchmarkId::new("sync_writes", sync_writes),
            &sync_writes,
            |b, &sync_writes| {
                let env = TestEnv::new().unwrap();
                let config = BrokerConfig {
                    queue_max_size: usize::MAX,
                    sync_writes,
                    ..env.config()
                };
                let broker = rt.block_on(open(&env, config));
                b.iter(|| {
                    rt.block_on(broker.enqueue(black_box(json!({"amount": 2000})), None)).unwrap()
                });
            },
        );
    }

    group.finish();
}

/// Benchmarks a full enqueue, consume and acknowledge cycle.
fn bench_delivery_cycle(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("delivery");
    group.throughput(Throughput::Elements(1));

    group.bench_function("enqueue_consume_ack", |b| {
        let env = TestEnv::new().unwrap();
        let broker = rt.block_on(open(&env, env.config()));
        b.iter(|| {
            rt.block_on(async {
                broker.enqueue(json!({"n": 1}), None).await.unwrap();
                let events = broker.consume(1, Some(Duration::ZERO), None).await;
                broker.acknowledge(&[events[0].receipt_id.as_str()]).await.unwrap()
            })
        });
    });

    group.finish();
}

/// Benchmarks backoff calculation across retry counts.
fn bench_backoff(c: &mut Criterion) {
    let policy = RetryPolicy::default();

    c.bench_function("backoff_0_to_32", |b| {
        b.iter(|| (0..32).map(|r| policy.backoff(black_box(r))).max());
    });
}

async fn open(env: &TestEnv, config: BrokerConfig) -> Arc<Broker> {
    let config = BrokerConfig { data_dir: env.data_dir().to_path_buf(), ..config };
    Arc::new(Broker::open(config, Arc::new(RealClock::new())).await.unwrap())
}

criterion_group!(benches, bench_queue, bench_enqueue, bench_delivery_cycle, bench_backoff);
criterion_main!(benches);
