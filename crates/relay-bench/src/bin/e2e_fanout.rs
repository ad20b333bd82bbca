//! End-to-end fan-out benchmark for Relay.
//!
//! This benchmark measures in-process broadcast throughput: one producer
//! blasting broadcasts through the broker, N subscriber tasks draining
//! their mailboxes.

use anyhow::Result;
use relay_core::{Broker, Message};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Barrier};
use tokio_util::sync::CancellationToken;

const MAILBOX_CAPACITY: usize = 1024;
const WARMUP_SECS: u64 = 2;
const BENCH_SECS: u64 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let num_subscribers = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(16);

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║           Relay End-to-End Fan-out Benchmark                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    run_fanout_benchmark(num_subscribers).await
}

async fn run_fanout_benchmark(num_subscribers: usize) -> Result<()> {
    println!("📊 Fan-out benchmark: {} subscribers", num_subscribers);
    println!("   Warmup: {}s, Measurement: {}s", WARMUP_SECS, BENCH_SECS);
    println!();

    let token = CancellationToken::new();
    let broker = Broker::new(token.clone());
    broker.run();

    let delivered = Arc::new(AtomicU64::new(0));
    let barrier = Arc::new(Barrier::new(num_subscribers + 1));

    // Spawn subscriber tasks
    let mut handles = Vec::new();
    for id in 0..num_subscribers {
        let (tx, mut rx) = mpsc::channel(MAILBOX_CAPACITY);
        broker.register(format!("sub-{id}"), tx).await;

        let delivered = Arc::clone(&delivered);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            // Drain until the broker closes the mailbox.
            while rx.recv().await.is_some() {
                delivered.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }

    barrier.wait().await;
    println!("✓ All {} subscribers registered", num_subscribers);

    // Producer - blast broadcasts until shutdown
    let producer_broker = broker.clone();
    let producer = tokio::spawn(async move {
        let mut sent = 0u64;
        loop {
            let msg = Message::broadcast("bench", "payload");
            if producer_broker.submit(msg).await.is_err() {
                break;
            }
            sent += 1;
        }
        sent
    });

    // Warmup phase
    println!("⏳ Warming up for {}s...", WARMUP_SECS);
    tokio::time::sleep(Duration::from_secs(WARMUP_SECS)).await;

    // Reset counter and start measurement
    delivered.store(0, Ordering::SeqCst);
    let start = Instant::now();

    println!("📈 Measuring for {}s...", BENCH_SECS);
    tokio::time::sleep(Duration::from_secs(BENCH_SECS)).await;

    let elapsed = start.elapsed();
    let total_delivered = delivered.load(Ordering::SeqCst);

    // Shut down: the producer sees Stopped, subscribers see end-of-stream.
    token.cancel();
    let total_sent = producer.await?;
    for handle in handles {
        handle.await?;
    }

    let msgs_per_sec = total_delivered as f64 / elapsed.as_secs_f64();
    let per_subscriber = msgs_per_sec / num_subscribers as f64;

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                         RESULTS                              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!(
        "║  Subscribers:          {:>10}                           ║",
        num_subscribers
    );
    println!(
        "║  Duration:             {:>10.2}s                          ║",
        elapsed.as_secs_f64()
    );
    println!(
        "║  Submitted (total):    {:>10}                           ║",
        total_sent
    );
    println!(
        "║  Delivered:            {:>10}                           ║",
        total_delivered
    );
    println!(
        "║  Throughput:           {:>10.0} msg/s                    ║",
        msgs_per_sec
    );
    println!(
        "║  Per-Subscriber:       {:>10.0} msg/s                    ║",
        per_subscriber
    );
    println!("╚══════════════════════════════════════════════════════════════╝");

    Ok(())
}
