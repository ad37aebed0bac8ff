//! Performance benchmarks for digest contexts
//!
//! Measures the overhead of the context and dispatch layer on top of the
//! underlying hash implementations.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use cryptfetch_core::{DigestContext, Registry, digest_oneshot};
use std::hint::black_box;

/// Streaming digests over a range of message sizes
fn benchmark_streaming_digests(c: &mut Criterion) {
    let mut group = c.benchmark_group("streaming_digests");
    let registry = Registry::with_default_provider();

    let sizes = vec![
        64,        // One block
        1_024,     // 1KB
        65_536,    // 64KB
        1_048_576, // 1MB
    ];

    for name in ["SHA2-256", "SHA3-256", "MD5", "CRC32"] {
        let method = registry.get_digest(name, None).unwrap();
        for &size in &sizes {
            let data = generate_test_data(size);
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(name, format_size(size)),
                &data,
                |b, data| {
                    let mut ctx = DigestContext::new();
                    b.iter(|| {
                        ctx.init(&method).unwrap();
                        ctx.update(black_box(data)).unwrap();
                        black_box(ctx.finalize_to_vec().unwrap());
                    })
                },
            );
        }
    }

    group.finish();
}

/// One-shot function versus a private context for short messages
fn benchmark_oneshot_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("oneshot_overhead");
    let registry = Registry::with_default_provider();
    let method = registry.fetch_digest("SHA2-256", None).unwrap();
    let data = generate_test_data(64);

    group.bench_function("digest_oneshot", |b| {
        b.iter(|| black_box(digest_oneshot(&method, black_box(&data)).unwrap()))
    });

    group.bench_function("fresh_context", |b| {
        b.iter(|| {
            let mut ctx = DigestContext::new();
            ctx.init(&method).unwrap();
            ctx.update(black_box(&data)).unwrap();
            black_box(ctx.finalize_to_vec().unwrap())
        })
    });

    group.bench_function("reused_context", |b| {
        let mut ctx = DigestContext::new();
        b.iter(|| {
            ctx.init(&method).unwrap();
            ctx.update(black_box(&data)).unwrap();
            black_box(ctx.finalize_to_vec().unwrap())
        })
    });

    group.finish();
}

// Helper functions

fn generate_test_data(size: usize) -> Vec<u8> {
    // Deterministic data for reproducible benchmarks
    let mut data = Vec::with_capacity(size);
    let mut seed = 0x12345678u32;

    for _ in 0..size {
        data.push((seed & 0xFF) as u8);
        seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    }

    data
}

fn format_size(size: usize) -> String {
    if size >= 1_048_576 {
        format!("{}MB", size / 1_048_576)
    } else if size >= 1_024 {
        format!("{}KB", size / 1_024)
    } else {
        format!("{size}B")
    }
}

criterion_group!(benches, benchmark_streaming_digests, benchmark_oneshot_overhead);

criterion_main!(benches);
