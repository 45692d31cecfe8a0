//! Property-based tests for imputation, schedules and reshaping.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated series and settings.

use anofox_decomp::config::WindowSpec;
use anofox_decomp::core::SeriesTable;
use anofox_decomp::impute::fill_linear_then_rolling;
use anofox_decomp::predict::{forecast_origins, raw_frame, target_frame};
use anofox_decomp::train::{
    auto_batch_size, auto_epochs, reg_delay_weight, sample_weight, LrSchedule, OneCycle,
};
use anofox_decomp::utils::split_table;
use anofox_decomp::utils::ValidSize;
use chrono::{Duration, TimeZone, Utc};
use ndarray::Array2;
use proptest::prelude::*;

fn make_table(n: usize) -> SeriesTable {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let timestamps = (0..n).map(|i| base + Duration::hours(i as i64)).collect();
    SeriesTable::new(timestamps, (0..n).map(|i| i as f64).collect()).unwrap()
}

/// Values with one interior gap `(values, gap_start, gap_len)`.
fn gapped_strategy(max_gap: usize) -> impl Strategy<Value = (Vec<f64>, usize, usize)> {
    (80usize..160, 1..=max_gap).prop_flat_map(|(len, gap)| {
        (
            prop::collection::vec(-100.0..100.0_f64, len),
            1..len - gap - 1,
            Just(gap),
        )
    })
}

fn window_strategy() -> impl Strategy<Value = WindowSpec> {
    (0usize..6, 1usize..5).prop_map(|(l, h)| {
        let h = if l == 0 { 1 } else { h };
        WindowSpec::new(l, h).unwrap()
    })
}

// =============================================================================
// Property: gaps within the bound are fully imputed
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn bounded_gaps_are_filled_and_observations_kept(
        (values, start, gap) in gapped_strategy(30)
    ) {
        let mut input = values.clone();
        for v in &mut input[start..start + gap] {
            *v = f64::NAN;
        }
        let (filled, remaining) = fill_linear_then_rolling(&input, 5, 20);
        prop_assert_eq!(remaining, 0);
        prop_assert_eq!(filled.len(), input.len());
        for (i, v) in filled.iter().enumerate() {
            prop_assert!(v.is_finite());
            if !(start..start + gap).contains(&i) {
                prop_assert_eq!(*v, values[i]);
            }
        }
    }

    #[test]
    fn longer_gaps_leave_exactly_the_excess(
        (values, start, gap) in gapped_strategy(60)
    ) {
        let mut input = values;
        for v in &mut input[start..start + gap] {
            *v = f64::NAN;
        }
        let (_, remaining) = fill_linear_then_rolling(&input, 5, 20);
        prop_assert_eq!(remaining, gap.saturating_sub(30));
    }
}

// =============================================================================
// Property: weights and schedules stay in range
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn sample_weight_is_bounded_and_monotone(
        t in 0.0..1.0_f64,
        dt in 0.0..0.5_f64,
        weight in 1.0..10.0_f64,
        start in 0.0..0.9_f64
    ) {
        let w = sample_weight(t, weight, start);
        prop_assert!(w >= 1.0 / weight - 1e-12);
        prop_assert!(w <= 1.0 + 1e-12);
        prop_assert!(sample_weight(t + dt, weight, start) >= w - 1e-12);
    }

    #[test]
    fn reg_delay_fades_in_monotonically(
        epochs in 1usize..200,
        epoch in 0usize..200,
        progress in 0.0..1.0_f64,
        start in 0.0..0.9_f64,
        span in 0.0..0.5_f64
    ) {
        let epoch = epoch % epochs;
        let full = (start + span).min(1.0);
        let w = reg_delay_weight(epoch, progress, epochs, start, full);
        prop_assert!((0.0..=1.0).contains(&w));
        prop_assert!(reg_delay_weight(epoch + 1, progress, epochs, start, full) >= w);
    }

    #[test]
    fn one_cycle_learning_rate_never_exceeds_max(
        max_lr in 1e-4..1.0_f64,
        total in 2usize..500
    ) {
        let mut schedule = OneCycle::new(max_lr, total);
        for _ in 0..total {
            let lr = schedule.learning_rate();
            prop_assert!(lr > 0.0);
            prop_assert!(lr <= max_lr * (1.0 + 1e-9));
            schedule.step();
        }
    }

    #[test]
    fn auto_loop_sizes_stay_in_range(n in 1usize..1_000_000) {
        let batch = auto_batch_size(n);
        prop_assert!(batch >= 1 && batch <= 256 && batch <= n);
        let epochs = auto_epochs(n);
        prop_assert!((40..=400).contains(&epochs));
    }
}

// =============================================================================
// Property: splitting and reshaping preserve row counts
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(60))]

    #[test]
    fn split_overlaps_by_n_lags(n in 30usize..200, window in window_strategy()) {
        let table = make_table(n);
        let (train, valid) = split_table(&table, window, ValidSize::Fraction(0.2)).unwrap();
        prop_assert_eq!(train.len() + valid.len(), n + window.n_lags());
        prop_assert_eq!(train.timestamps()[0], table.timestamps()[0]);
        prop_assert_eq!(valid.last_timestamp(), table.last_timestamp());
    }

    #[test]
    fn target_frame_places_every_origin_once_per_step(
        n in 10usize..80,
        window in window_strategy()
    ) {
        let table = make_table(n);
        let origins = window.origins(n);
        let predicted = Array2::from_elem((origins, window.n_forecasts()), 1.0);
        let frame = target_frame(&table, &predicted, None, window).unwrap();
        prop_assert_eq!(frame.len(), n);
        for k in 1..=window.n_forecasts() {
            let yhat = frame.column(&format!("yhat{k}")).unwrap();
            prop_assert_eq!(yhat.iter().filter(|v| v.is_finite()).count(), origins);
            prop_assert!(yhat[..window.n_lags() + k - 1].iter().all(|v| v.is_nan()));
        }
    }

    #[test]
    fn raw_and_target_layouts_report_the_same_values(
        n in 10usize..80,
        window in window_strategy()
    ) {
        let table = make_table(n);
        let origins = window.origins(n);
        let steps = window.n_forecasts();
        let predicted = Array2::from_shape_fn((origins, steps), |(i, k)| (i * 100 + k) as f64);

        let target = target_frame(&table, &predicted, None, window).unwrap();
        let raw = raw_frame(forecast_origins(table.timestamps(), window), &predicted, None, steps).unwrap();
        prop_assert_eq!(raw.len(), origins);

        let lags = window.n_lags();
        for i in 0..origins {
            prop_assert_eq!(raw.timestamps()[i], target.timestamps()[lags + i]);
            for k in 0..steps {
                let step = raw.column(&format!("step{k}")).unwrap()[i];
                let yhat = target.column(&format!("yhat{}", k + 1)).unwrap()[lags + i + k];
                prop_assert_eq!(step, yhat);
                prop_assert_eq!(step, (i * 100 + k) as f64);
            }
        }
    }
}
