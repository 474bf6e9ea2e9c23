//! Criterion benchmarks for the OPC decoder and the TCL wire encoder.
//!
//! A full-size frame (21845 pixels) has to be decoded and re-encoded well
//! within one refresh period of the strand.
//!
//! Run with:
//! ```bash
//! cargo bench --package opc-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use opc_core::protocol::frame::MAX_PAYLOAD_LEN;
use opc_core::{encode_pixels_frame, ColorOrder, FrameDecoder, GammaTable, Pixel, WireEncoder};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn make_pixels(count: usize) -> Vec<Pixel> {
    (0..count)
        .map(|i| Pixel::new(i as u8, (i >> 8) as u8, (i * 7) as u8))
        .collect()
}

const PIXEL_COUNTS: [usize; 3] = [50, 1_000, MAX_PAYLOAD_LEN / 3];

// ── Decoder ───────────────────────────────────────────────────────────────────

fn bench_decode_whole(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_whole_frame");
    for count in PIXEL_COUNTS {
        let bytes = encode_pixels_frame(0, &make_pixels(count)).expect("fits in one frame");
        let mut decoder = FrameDecoder::new();
        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, bytes| {
            b.iter(|| {
                let (_, frame) = decoder.feed(black_box(bytes));
                black_box(frame.map(|f| f.pixel_count()))
            })
        });
    }
    group.finish();
}

fn bench_decode_small_chunks(c: &mut Criterion) {
    let bytes = encode_pixels_frame(0, &make_pixels(1_000)).expect("fits in one frame");
    let mut decoder = FrameDecoder::new();
    c.bench_function("decode_1000_pixels_in_64_byte_chunks", |b| {
        b.iter(|| {
            let mut frames = 0;
            for chunk in bytes.chunks(64) {
                frames += decoder.decode_all(black_box(chunk), |f| {
                    black_box(f.pixel_count());
                });
            }
            frames
        })
    });
}

// ── Encoder ───────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("tcl_encode");
    for count in PIXEL_COUNTS {
        let pixels = make_pixels(count);
        let mut encoder = WireEncoder::new(GammaTable::uniform(2.2), ColorOrder::Bgr);
        group.bench_with_input(BenchmarkId::from_parameter(count), &pixels, |b, pixels| {
            b.iter(|| black_box(encoder.encode(black_box(pixels)).len()))
        });
    }
    group.finish();
}

fn bench_gamma_build(c: &mut Criterion) {
    c.bench_function("gamma_table_build", |b| {
        b.iter(|| GammaTable::new(black_box(2.2), black_box(2.4), black_box(2.8)))
    });
}

criterion_group!(
    benches,
    bench_decode_whole,
    bench_decode_small_chunks,
    bench_encode,
    bench_gamma_build
);
criterion_main!(benches);
