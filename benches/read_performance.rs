//! Read-path benchmarks for the manager and loader snapshots.
//!
//! Reads should stay in the nanosecond range and not degrade while a reload
//! is installing new snapshots.

use async_trait::async_trait;
use config_loader::prelude::*;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const DOCUMENT: &str = r#"
welcome:
  title: benchmark
  messages: [a, b, c]
  tail: done
server:
  bind: ":8080"
limits:
  http:
    timeouts:
      read_ms: 500
"#;

struct BenchProvider {
    payload: Mutex<String>,
}

impl BenchProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            payload: Mutex::new(DOCUMENT.to_string()),
        })
    }
}

#[async_trait]
impl Provider for BenchProvider {
    async fn open(&self) -> Result<Vec<Content>> {
        Ok(vec![Content::new("bench", "bench", self.payload.lock().as_str())])
    }

    async fn watch(&self) -> Result<ChangeStream> {
        let (_sender, stream) = ChangeStream::channel();
        Ok(stream)
    }

    fn name(&self) -> String {
        "bench".to_string()
    }
}

fn loaded(runtime: &tokio::runtime::Runtime) -> (Manager, Loader) {
    let provider = BenchProvider::new();
    let manager = Manager::new(provider.clone());
    let loader = Loader::new(provider);
    runtime.block_on(async {
        manager.load().await.unwrap();
        loader.load().await.unwrap();
    });
    (manager, loader)
}

/// Benchmark single-threaded read latency
fn benchmark_read_latency(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (manager, loader) = loaded(&runtime);

    let mut group = c.benchmark_group("read_latency");
    group.bench_function("loader_current", |b| {
        b.iter(|| {
            let options = loader.current();
            black_box(&options.server.bind);
        });
    });
    group.bench_function("manager_current", |b| {
        b.iter(|| {
            let generic = manager.current();
            black_box(generic.doc.len());
        });
    });
    group.finish();
}

/// Benchmark dot-path lookups at increasing depth
fn benchmark_lookup(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (manager, _) = loaded(&runtime);

    let mut group = c.benchmark_group("lookup");
    for path in ["server", "welcome.title", "limits.http.timeouts.read_ms", "limits.missing"] {
        group.bench_with_input(BenchmarkId::from_parameter(path), path, |b, path| {
            b.iter(|| black_box(manager.lookup(path)));
        });
    }
    group.finish();
}

/// Benchmark concurrent reads with varying thread counts
fn benchmark_concurrent_reads(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (_, loader) = loaded(&runtime);

    let mut group = c.benchmark_group("concurrent_reads");

    for num_threads in [1, 2, 4, 8, 16] {
        group.throughput(Throughput::Elements(num_threads as u64 * 1000));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_threads", num_threads)),
            &num_threads,
            |b, &num_threads| {
                let barrier = Arc::new(Barrier::new(num_threads + 1));

                b.iter_custom(|iters| {
                    let mut handles = vec![];

                    for _ in 0..num_threads {
                        let loader = loader.clone();
                        let barrier = Arc::clone(&barrier);

                        handles.push(thread::spawn(move || {
                            barrier.wait();

                            let start = std::time::Instant::now();
                            for _ in 0..iters {
                                let options = loader.current();
                                black_box(&options.welcome.title);
                            }
                            start.elapsed()
                        }));
                    }

                    barrier.wait();

                    let total: Duration = handles.into_iter().map(|h| h.join().unwrap()).sum();
                    total / num_threads as u32
                });
            },
        );
    }

    group.finish();
}

/// Benchmark reloads while 16 readers hammer the snapshot
fn benchmark_reload_under_load(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("reload_under_load");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("reload_with_16_readers", |b| {
        b.iter_custom(|iters| {
            runtime.block_on(async move {
                let loader = Loader::new(BenchProvider::new());
                loader.load().await.unwrap();

                let keep_running = Arc::new(AtomicBool::new(true));
                let reads_completed = Arc::new(AtomicUsize::new(0));

                let mut readers = vec![];
                for _ in 0..16 {
                    let loader = loader.clone();
                    let running = Arc::clone(&keep_running);
                    let counter = Arc::clone(&reads_completed);

                    readers.push(tokio::spawn(async move {
                        while running.load(Ordering::Relaxed) {
                            let options = loader.current();
                            black_box(&options.server.bind);
                            counter.fetch_add(1, Ordering::Relaxed);
                            tokio::task::yield_now().await;
                        }
                    }));
                }

                let start = std::time::Instant::now();
                for _ in 0..iters {
                    loader.load().await.unwrap();
                }
                let duration = start.elapsed();

                keep_running.store(false, Ordering::Relaxed);
                for reader in readers {
                    reader.await.unwrap();
                }

                let total_reads = reads_completed.load(Ordering::Relaxed);
                println!("  Completed {} reads during {} reloads", total_reads, iters);

                duration
            })
        });
    });

    group.finish();
}

/// Benchmark the full load path (open, merge, decode, install)
fn benchmark_load(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (manager, loader) = loaded(&runtime);

    let mut group = c.benchmark_group("load");
    group.bench_function("loader_load", |b| {
        b.iter(|| runtime.block_on(async { black_box(loader.load().await.unwrap()) }));
    });
    group.bench_function("manager_load", |b| {
        b.iter(|| runtime.block_on(async { black_box(manager.load().await.unwrap()) }));
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_read_latency,
    benchmark_lookup,
    benchmark_concurrent_reads,
    benchmark_reload_under_load,
    benchmark_load,
);

criterion_main!(benches);
