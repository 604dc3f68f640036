//! Frame codec benchmark suite.
//!
//! Benchmarks framing and message parsing at different body sizes:
//! - Encode: `"{len}:{body}"` construction
//! - Decode: reading back-to-back frames from an in-memory stream
//! - Parse: classifying response frames
//!
//! Run with: cargo bench --bench frame_codec
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use firefox_marionette::protocol::{FrameReader, Message, encode};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BODY_SIZES: &[usize] = &[64, 1024, 64 * 1024];
const FRAMES_PER_STREAM: usize = 100;

fn response_body(size: usize) -> String {
    let padding = "x".repeat(size.saturating_sub(40));
    format!(r#"[1,42,null,{{"value":"{padding}"}}]"#)
}

// ============================================================================
// Benchmark: Encode
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for &size in BODY_SIZES {
        let body = response_body(size);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &body, |b, body| {
            b.iter(|| encode(black_box(body)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("decode");

    for &size in BODY_SIZES {
        let frame = encode(&response_body(size));
        let stream: Vec<u8> = frame.repeat(FRAMES_PER_STREAM);

        group.throughput(Throughput::Bytes(stream.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &stream, |b, stream| {
            b.to_async(&rt).iter(|| async {
                let mut reader = FrameReader::new(stream.as_slice());
                let mut count = 0;
                while let Ok(Some(body)) = reader.read_frame().await {
                    black_box(body);
                    count += 1;
                }
                assert_eq!(count, FRAMES_PER_STREAM);
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Parse
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for &size in BODY_SIZES {
        let body = response_body(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &body, |b, body| {
            b.iter(|| Message::parse(black_box(body)));
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(benches, bench_encode, bench_decode, bench_parse);
criterion_main!(benches);
