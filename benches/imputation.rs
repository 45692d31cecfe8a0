//! Benchmarks for gap imputation.

use anofox_decomp::config::ForecasterConfig;
use anofox_decomp::core::{Frequency, SeriesTable};
use anofox_decomp::impute::{fill_linear_then_rolling, ImputeMode, Imputer};
use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Sine series with a gap of `gap` values every 100 points.
fn generate_gapped(n: usize, gap: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            if i % 100 >= 50 && i % 100 < 50 + gap {
                f64::NAN
            } else {
                (2.0 * std::f64::consts::PI * i as f64 / 24.0).sin()
            }
        })
        .collect()
}

fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_linear_then_rolling");

    for size in [1_000, 10_000, 100_000].iter() {
        for gap in [3, 25].iter() {
            let values = generate_gapped(*size, *gap);
            group.bench_with_input(
                BenchmarkId::new(format!("gap{gap}"), size),
                size,
                |b, _| b.iter(|| fill_linear_then_rolling(black_box(&values), 5, 20)),
            );
        }
    }

    group.finish();
}

fn bench_imputer(c: &mut Criterion) {
    let mut group = c.benchmark_group("imputer");
    let config = ForecasterConfig::default().with_window(24, 12).unwrap();
    let freq = Frequency::hours(1);
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    for size in [1_000, 10_000].iter() {
        // every 7th timestamp missing
        let timestamps = (0..*size)
            .filter(|i| i % 7 != 3)
            .map(|i| base + Duration::hours(i as i64))
            .collect::<Vec<_>>();
        let y = generate_gapped(timestamps.len(), 4);
        let table = SeriesTable::new(timestamps, y).unwrap();
        let imputer = Imputer::new(&config);

        group.bench_with_input(BenchmarkId::new("training", size), size, |b, _| {
            b.iter(|| imputer.impute(black_box(&table), &freq, ImputeMode::Training))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fill, bench_imputer);
criterion_main!(benches);
