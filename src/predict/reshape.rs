//! Reshaping per-origin predictions into output frames.
//!
//! The raw layout has one row per forecast origin and one column per step.
//! The target layout aligns every step with the row it forecasts.

use crate::config::WindowSpec;
use crate::core::{ForecastFrame, SeriesTable};
use crate::error::{ForecastError, Result};
use crate::predict::components::ComponentKind;
use crate::prepare::ShiftScale;
use crate::train::Components;
use chrono::{DateTime, Utc};
use ndarray::{Array2, ArrayView1};

/// `value * scale + shift`.
pub fn denormalize(raw: &Array2<f64>, params: &ShiftScale) -> Array2<f64> {
    raw.mapv(|v| params.invert(v))
}

/// Timestamps of the first forecast step of every origin.
pub fn forecast_origins(timestamps: &[DateTime<Utc>], window: WindowSpec) -> Vec<DateTime<Utc>> {
    let n = window.origins(timestamps.len());
    timestamps[window.n_lags()..window.n_lags() + n].to_vec()
}

/// Raw layout: `step0..`, then `<component>0..` per component.
pub fn raw_frame(
    origins: Vec<DateTime<Utc>>,
    predicted: &Array2<f64>,
    components: Option<&Components>,
    n_forecasts: usize,
) -> Result<ForecastFrame> {
    check_shape(predicted, origins.len(), n_forecasts)?;
    let mut frame = ForecastFrame::new(origins);
    for step in 0..n_forecasts {
        frame.push_column(format!("step{step}"), predicted.column(step).to_vec())?;
    }
    for (name, values) in components.into_iter().flatten() {
        check_shape(values, frame.len(), n_forecasts)?;
        for step in 0..n_forecasts {
            frame.push_column(format!("{name}{step}"), values.column(step).to_vec())?;
        }
    }
    Ok(frame)
}

/// Target layout over the rows of `table`.
///
/// `table` must hold exactly the rows the origins were built from:
/// `n_lags + origins + n_forecasts - 1`.
pub fn target_frame(
    table: &SeriesTable,
    predicted: &Array2<f64>,
    components: Option<&Components>,
    window: WindowSpec,
) -> Result<ForecastFrame> {
    let n_lags = window.n_lags();
    let horizon = window.n_forecasts();
    let n_origins = predicted.nrows();
    let expected = n_lags + n_origins + horizon - 1;
    if table.len() != expected {
        return Err(ForecastError::DimensionMismatch {
            expected,
            got: table.len(),
        });
    }
    check_shape(predicted, n_origins, horizon)?;

    let y = table.y();
    let mut frame = ForecastFrame::new(table.timestamps().to_vec());
    frame.push_column("y", y.to_vec())?;
    for k in 1..=horizon {
        let yhat = pad_step(predicted.column(k - 1), n_lags, k, horizon);
        let residual = yhat.iter().zip(y).map(|(p, o)| p - o).collect();
        frame.push_column(format!("yhat{k}"), yhat)?;
        frame.push_column(format!("residual{k}"), residual)?;
    }

    for (name, values) in components.into_iter().flatten() {
        check_shape(values, n_origins, horizon)?;
        if ComponentKind::classify(name).is_lagged() {
            for k in 1..=horizon {
                frame.push_column(
                    format!("{name}{k}"),
                    pad_step(values.column(k - 1), n_lags, k, horizon),
                )?;
            }
        } else {
            frame.push_column(name.clone(), spread_once(values, n_lags))?;
        }
    }
    Ok(frame)
}

/// Step `k` (1-based) of every origin, placed on the row it forecasts.
fn pad_step(values: ArrayView1<'_, f64>, n_lags: usize, k: usize, horizon: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; n_lags + k - 1];
    out.extend(values.iter());
    out.extend(std::iter::repeat(f64::NAN).take(horizon - k));
    out
}

/// One value per row: every step of the first origin, then the last step
/// of each later origin.
fn spread_once(values: &Array2<f64>, n_lags: usize) -> Vec<f64> {
    let horizon = values.ncols();
    let mut out = vec![f64::NAN; n_lags];
    if values.nrows() == 0 {
        return out;
    }
    out.extend(values.row(0).iter());
    out.extend(values.column(horizon - 1).iter().skip(1));
    out
}

fn check_shape(values: &Array2<f64>, rows: usize, cols: usize) -> Result<()> {
    if values.nrows() != rows {
        return Err(ForecastError::DimensionMismatch {
            expected: rows,
            got: values.nrows(),
        });
    }
    if values.ncols() != cols {
        return Err(ForecastError::DimensionMismatch {
            expected: cols,
            got: values.ncols(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};
    use ndarray::array;

    fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    fn table(n: usize) -> SeriesTable {
        SeriesTable::new(make_timestamps(n), (0..n).map(|i| i as f64).collect()).unwrap()
    }

    #[test]
    fn target_layout_pads_each_step() {
        // n_lags 2, horizon 2, 3 origins -> 6 rows
        let window = WindowSpec::new(2, 2).unwrap();
        let predicted = array![[10.0, 11.0], [20.0, 21.0], [30.0, 31.0]];
        let frame = target_frame(&table(6), &predicted, None, window).unwrap();

        let yhat1 = frame.column("yhat1").unwrap();
        assert!(yhat1[..2].iter().all(|v| v.is_nan()));
        assert_eq!(&yhat1[2..5], &[10.0, 20.0, 30.0]);
        assert!(yhat1[5].is_nan());

        let yhat2 = frame.column("yhat2").unwrap();
        assert!(yhat2[..3].iter().all(|v| v.is_nan()));
        assert_eq!(&yhat2[3..], &[11.0, 21.0, 31.0]);

        assert_relative_eq!(frame.value("residual1", 2).unwrap(), 8.0);
        assert_eq!(
            frame.column_names().collect::<Vec<_>>(),
            ["y", "yhat1", "residual1", "yhat2", "residual2"]
        );
    }

    #[test]
    fn target_layout_spreads_non_lagged_components_once() {
        let window = WindowSpec::new(1, 3).unwrap();
        let predicted = Array2::zeros((2, 3));
        let mut components = Components::new();
        components.insert("trend".into(), array![[1.0, 2.0, 3.0], [2.0, 3.0, 4.0]]);
        components.insert("ar".into(), array![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]);
        let frame = target_frame(&table(5), &predicted, Some(&components), window).unwrap();

        let trend = frame.column("trend").unwrap();
        assert!(trend[0].is_nan());
        assert_eq!(&trend[1..], &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(frame.column("ar3").unwrap()[3], 0.3);
        assert!(frame.column("ar").is_none());
    }

    #[test]
    fn target_layout_rejects_wrong_row_count() {
        let window = WindowSpec::new(2, 1).unwrap();
        let err = target_frame(&table(5), &Array2::zeros((2, 1)), None, window).unwrap_err();
        assert_eq!(err, ForecastError::DimensionMismatch { expected: 4, got: 5 });
    }

    #[test]
    fn raw_layout_has_step_columns_per_origin() {
        let window = WindowSpec::new(2, 2).unwrap();
        let ts = make_timestamps(6);
        let origins = forecast_origins(&ts, window);
        assert_eq!(origins, ts[2..5].to_vec());

        let predicted = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let mut components = Components::new();
        components.insert("trend".into(), predicted.clone());
        let frame = raw_frame(origins, &predicted, Some(&components), 2).unwrap();
        assert_eq!(
            frame.column_names().collect::<Vec<_>>(),
            ["step0", "step1", "trend0", "trend1"]
        );
        assert_eq!(frame.column("step1"), Some(&[2.0, 4.0, 6.0][..]));
    }

    #[test]
    fn denormalize_applies_scale_then_shift() {
        let out = denormalize(&array![[0.0, 1.0]], &ShiftScale { shift: 5.0, scale: 2.0 });
        assert_eq!(out, array![[5.0, 7.0]]);
    }
}
