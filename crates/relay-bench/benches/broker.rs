//! Broker benchmarks for Relay.
//!
//! These benchmarks measure the submission path, broadcast fan-out at
//! various subscriber counts, and the sibling roster/history containers.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use relay_core::{Broker, History, Message, Roster, User};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const MAILBOX_CAPACITY: usize = 1024;

/// Benchmark the submit path with a single drained subscriber.
fn bench_submit(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("submit");

    group.bench_function("broadcast_1_sub", |b| {
        let token = CancellationToken::new();
        let broker = Broker::new(token.clone());
        rt.block_on(async {
            broker.run();
            let (tx, mut rx) = mpsc::channel(MAILBOX_CAPACITY);
            broker.register("sub-0", tx).await;
            tokio::spawn(async move { while rx.recv().await.is_some() {} });
        });

        b.iter(|| {
            rt.block_on(broker.submit(black_box(Message::broadcast("bench", "payload"))))
                .unwrap();
        });
        token.cancel();
    });

    group.bench_function("private_1_sub", |b| {
        let token = CancellationToken::new();
        let broker = Broker::new(token.clone());
        rt.block_on(async {
            broker.run();
            let (tx, mut rx) = mpsc::channel(MAILBOX_CAPACITY);
            broker.register("sub-0", tx).await;
            tokio::spawn(async move { while rx.recv().await.is_some() {} });
        });

        b.iter(|| {
            rt.block_on(broker.submit(black_box(Message::direct("bench", "sub-0", "payload"))))
                .unwrap();
        });
        token.cancel();
    });

    group.finish();
}

/// Benchmark broadcast fan-out by subscriber count.
fn bench_fanout(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("fanout");

    for size in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let token = CancellationToken::new();
            let broker = Broker::new(token.clone());
            rt.block_on(async {
                broker.run();
                for i in 0..size {
                    let (tx, mut rx) = mpsc::channel(MAILBOX_CAPACITY);
                    broker.register(format!("sub-{i}"), tx).await;
                    tokio::spawn(async move { while rx.recv().await.is_some() {} });
                }
            });

            b.iter(|| {
                rt.block_on(broker.submit(black_box(Message::broadcast("bench", "payload"))))
                    .unwrap();
            });
            token.cancel();
        });
    }

    group.finish();
}

/// Benchmark roster operations.
fn bench_roster(c: &mut Criterion) {
    let mut group = c.benchmark_group("roster");

    group.bench_function("add", |b| {
        let roster = Roster::new();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            roster
                .add(User::new(format!("user-{i}"), "Bench", "bench@example.com"))
                .unwrap();
        });
    });

    group.bench_function("get", |b| {
        let roster = Roster::new();
        roster
            .add(User::new("user-0", "Bench", "bench@example.com"))
            .unwrap();
        b.iter(|| roster.get(black_box("user-0")).unwrap());
    });

    group.finish();
}

/// Benchmark history appends and queries.
fn bench_history(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("history");

    group.bench_function("append", |b| {
        let history = History::new();
        b.iter(|| {
            rt.block_on(history.append(black_box(Message::broadcast("bench", "payload"))))
                .unwrap();
        });
    });

    group.bench_function("query_by_sender", |b| {
        let history = History::new();
        rt.block_on(async {
            for i in 0..1000 {
                let sender = if i % 2 == 0 { "even" } else { "odd" };
                history
                    .append(Message::broadcast(sender, "payload"))
                    .await
                    .unwrap();
            }
        });
        b.iter(|| rt.block_on(history.query(black_box(Some("even")))));
    });

    group.finish();
}

criterion_group!(benches, bench_submit, bench_fanout, bench_roster, bench_history);
criterion_main!(benches);
