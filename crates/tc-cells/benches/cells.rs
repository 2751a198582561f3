//! Benchmarks des conversions cellule.
//!
//! Run with: cargo bench -p tc-cells

#![allow(clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tc_cells::dispatch::BulkDispatcher;
use tc_cells::dither::{floyd_steinberg, floyd_steinberg_parallel};
use tc_core::cell::{CellResult, HalfBlockCellResult};
use tc_core::pixel::expand_gray_to_rgb;

const SIZES: [(u32, u32); 3] = [(160, 96), (640, 480), (1920, 1080)];

fn gradient_rgb(w: u32, h: u32) -> Vec<u8> {
    (0..h)
        .flat_map(|y| (0..w).flat_map(move |x| [(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]))
        .collect()
}

fn bench_braille(c: &mut Criterion) {
    let dispatcher = BulkDispatcher::new(0);
    let mut group = c.benchmark_group("braille_cells");
    for (w, h) in SIZES {
        let rgb = gradient_rgb(w, h);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(4));
        let mut out = vec![CellResult::default(); (cw * ch) as usize];
        group.throughput(Throughput::Elements(u64::from(w * h)));
        group.bench_with_input(BenchmarkId::new("threshold", format!("{w}x{h}")), &rgb, |b, rgb| {
            b.iter(|| {
                dispatcher
                    .braille_cells_rgb(black_box(rgb), w, h, cw, ch, &mut out, 128, false, false)
                    .unwrap();
            });
        });
    }
    group.finish();
}

fn bench_halfblock(c: &mut Criterion) {
    let dispatcher = BulkDispatcher::new(0);
    let (w, h) = (640, 480);
    let rgb = gradient_rgb(w, h);
    let mut out = vec![HalfBlockCellResult::default(); (w * h / 2) as usize];
    c.bench_function("halfblock_cells_640x480", |b| {
        b.iter(|| {
            dispatcher
                .halfblock_cells_rgb(black_box(&rgb), w, h, w, h / 2, &mut out)
                .unwrap();
        });
    });
}

/// Gray input: native gray path vs the RGB expansion the GPU backend performs.
fn bench_gray_expansion(c: &mut Criterion) {
    let dispatcher = BulkDispatcher::new(0);
    let (w, h) = (640, 480);
    let gray: Vec<u8> = (0..w * h).map(|i| (i % 256) as u8).collect();
    let mut out = vec![CellResult::default(); (w / 2 * h / 4) as usize];
    let mut group = c.benchmark_group("gray_input");
    group.bench_function("native", |b| {
        b.iter(|| {
            dispatcher
                .braille_cells_gray(black_box(&gray), w, h, w / 2, h / 4, &mut out, 128, false, false)
                .unwrap();
        });
    });
    group.bench_function("expanded", |b| {
        b.iter(|| {
            let rgb = expand_gray_to_rgb(black_box(&gray));
            dispatcher
                .braille_cells_rgb(&rgb, w, h, w / 2, h / 4, &mut out, 128, false, false)
                .unwrap();
        });
    });
    group.finish();
}

fn bench_dither(c: &mut Criterion) {
    let (w, h) = (640, 480);
    let gray: Vec<u8> = (0..w * h).map(|i| (i % 251) as u8).collect();
    let mut out = vec![0u8; gray.len()];
    let mut group = c.benchmark_group("floyd_steinberg");
    group.bench_function("serial", |b| {
        b.iter(|| floyd_steinberg(black_box(&gray), w, h, &mut out).unwrap());
    });
    group.bench_function("tiled", |b| {
        b.iter(|| floyd_steinberg_parallel(black_box(&gray), w, h, &mut out, 0, 0, 0).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_braille, bench_halfblock, bench_gray_expansion, bench_dither);
criterion_main!(benches);
