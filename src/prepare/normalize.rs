//! Normalization parameters fitted once before training.
//!
//! Parameters are kept per series (local) or shared (global). Time is mapped
//! to `t in [0, 1]` over the training span; values are mapped with
//! `(x - shift) / scale`.

use crate::config::ForecasterConfig;
use crate::core::{is_missing, SeriesCollection, SeriesTable};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

const MIN_SCALE: f64 = 1e-10;

/// Value normalization method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizeMode {
    /// `Soft`, except binary data: min-max for the target, none for columns.
    #[default]
    Auto,
    Off,
    /// Minimum to 0, maximum to 1.
    MinMax,
    /// Zero mean, unit standard deviation.
    Standardize,
    /// Minimum to 0, 95th percentile to 1.
    Soft,
    /// Minimum to 0.1, 90th percentile to 0.9.
    Soft1,
}

impl NormalizeMode {
    fn resolve(self, values: &[f64], target: bool) -> NormalizeMode {
        match self {
            NormalizeMode::Auto if is_binary(values) => {
                if target {
                    NormalizeMode::MinMax
                } else {
                    NormalizeMode::Off
                }
            }
            NormalizeMode::Auto => NormalizeMode::Soft,
            other => other,
        }
    }
}

fn is_binary(values: &[f64]) -> bool {
    let mut seen_zero = false;
    let mut seen_one = false;
    for &v in values {
        if v == 0.0 {
            seen_zero = true;
        } else if v == 1.0 {
            seen_one = true;
        } else {
            return false;
        }
    }
    seen_zero && seen_one
}

/// Affine parameters: `normalized = (x - shift) / scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftScale {
    pub shift: f64,
    pub scale: f64,
}

impl Default for ShiftScale {
    fn default() -> Self {
        Self::identity()
    }
}

impl ShiftScale {
    pub fn identity() -> Self {
        Self {
            shift: 0.0,
            scale: 1.0,
        }
    }

    /// Fit parameters on the observed values.
    pub fn fit(values: &[f64], mode: NormalizeMode, target: bool) -> Self {
        let observed: Vec<f64> = values.iter().copied().filter(|v| !is_missing(*v)).collect();
        if observed.is_empty() {
            return Self::identity();
        }
        let min = observed.iter().copied().fold(f64::INFINITY, f64::min);
        let max = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        match mode.resolve(&observed, target) {
            NormalizeMode::Off => Self::identity(),
            NormalizeMode::MinMax => Self {
                shift: min,
                scale: nonzero(max - min),
            },
            NormalizeMode::Standardize => {
                let n = observed.len() as f64;
                let mean = observed.iter().sum::<f64>() / n;
                let variance = if observed.len() > 1 {
                    observed.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
                } else {
                    0.0
                };
                Self {
                    shift: mean,
                    scale: nonzero(variance.sqrt()),
                }
            }
            NormalizeMode::Soft => {
                let mut width = quantile_higher(&observed, 0.95) - min;
                if width.abs() < MIN_SCALE {
                    width = max - min;
                }
                Self {
                    shift: min,
                    scale: nonzero(width),
                }
            }
            NormalizeMode::Soft1 => {
                let mut width = quantile_higher(&observed, 0.9) - min;
                if width.abs() < MIN_SCALE {
                    width = max - min;
                }
                let scale = nonzero(width) / 0.8;
                Self {
                    shift: min - 0.1 * scale,
                    scale,
                }
            }
            NormalizeMode::Auto => Self::identity(),
        }
    }

    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        (x - self.shift) / self.scale
    }

    #[inline]
    pub fn invert(&self, x: f64) -> f64 {
        x * self.scale + self.shift
    }

    pub fn transform(&self, data: &[f64]) -> Vec<f64> {
        data.iter().map(|&x| self.apply(x)).collect()
    }
}

fn nonzero(width: f64) -> f64 {
    if width.abs() < MIN_SCALE {
        1.0
    } else {
        width
    }
}

/// Quantile taking the next larger observation (no interpolation).
fn quantile_higher(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = (q * (sorted.len() - 1) as f64).ceil() as usize;
    sorted[pos.min(sorted.len() - 1)]
}

/// Maps timestamps onto `t`, with the training span covering `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeParams {
    pub start: DateTime<Utc>,
    pub span_seconds: f64,
}

impl TimeParams {
    fn fit(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let span = (end - start).num_milliseconds() as f64 / 1000.0;
        Self {
            start,
            span_seconds: if span > 0.0 { span } else { 1.0 },
        }
    }

    pub fn apply(&self, ts: DateTime<Utc>) -> f64 {
        (ts - self.start).num_milliseconds() as f64 / 1000.0 / self.span_seconds
    }
}

/// Normalization parameters of one series (or of all series, globally).
#[derive(Debug, Clone, PartialEq)]
pub struct DataParams {
    pub time: TimeParams,
    pub y: ShiftScale,
    /// Covariates and future regressors.
    pub columns: BTreeMap<String, ShiftScale>,
}

/// A table with normalized time, target and numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTable {
    pub table: SeriesTable,
    pub t: Vec<f64>,
    pub y_scaled: Vec<f64>,
    /// Scaled covariates and regressors, raw event indicators.
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl PreparedTable {
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| ForecastError::Data(format!("column {name:?} missing")))
    }
}

/// Per-series normalization parameters, fitted once on the training data.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationStore {
    global: DataParams,
    local: BTreeMap<String, DataParams>,
    global_mode: bool,
    unknown_data: bool,
    scaled_columns: Vec<(String, NormalizeMode)>,
    event_columns: Vec<String>,
}

impl NormalizationStore {
    pub fn fit(collection: &SeriesCollection, config: &ForecasterConfig) -> Result<Self> {
        let norm = config.normalization;
        let mut scaled_columns: Vec<(String, NormalizeMode)> = config
            .covariates
            .iter()
            .map(|(k, c)| (k.clone(), c.normalize))
            .collect();
        scaled_columns.extend(config.regressors.iter().map(|(k, r)| (k.clone(), r.normalize)));
        let event_columns = config
            .all_events()
            .into_iter()
            .map(|(n, _)| n.to_string())
            .collect();

        let tables: Vec<&SeriesTable> = collection.values().filter(|t| !t.is_empty()).collect();
        if tables.is_empty() {
            return Err(ForecastError::EmptyData);
        }

        let global = fit_params(&tables, norm.mode, &scaled_columns)?;
        let mut local = BTreeMap::new();
        if !norm.global {
            for (id, table) in collection {
                if table.is_empty() {
                    continue;
                }
                let mut params = fit_params(&[table], norm.mode, &scaled_columns)?;
                if norm.global_time {
                    params.time = global.time;
                }
                local.insert(id.clone(), params);
            }
        }
        debug!(
            series = collection.len(),
            global = norm.global,
            y_shift = global.y.shift,
            y_scale = global.y.scale,
            "fitted normalization parameters"
        );
        Ok(Self {
            global,
            local,
            global_mode: norm.global,
            unknown_data: norm.unknown_data,
            scaled_columns,
            event_columns,
        })
    }

    pub fn is_global(&self) -> bool {
        self.global_mode
    }

    pub fn global_params(&self) -> &DataParams {
        &self.global
    }

    /// Parameters for a series id.
    pub fn data_params_for(&self, series_id: &str) -> Result<&DataParams> {
        if self.global_mode {
            return Ok(&self.global);
        }
        match self.local.get(series_id) {
            Some(params) => Ok(params),
            None if self.unknown_data => {
                debug!(series = series_id, "using global parameters for unknown series");
                Ok(&self.global)
            }
            None => Err(ForecastError::Data(format!(
                "series {series_id:?} was not seen in training; enable unknown data normalization"
            ))),
        }
    }

    pub fn normalize(&self, series_id: &str, table: &SeriesTable) -> Result<PreparedTable> {
        let params = self.data_params_for(series_id)?;
        let t = table.timestamps().iter().map(|ts| params.time.apply(*ts)).collect();
        let y_scaled = params.y.transform(table.y());
        let mut columns = BTreeMap::new();
        for (name, _) in &self.scaled_columns {
            let values = table
                .column(name)
                .ok_or_else(|| ForecastError::Data(format!("column {name:?} missing")))?;
            let p = params.columns.get(name).copied().unwrap_or_default();
            columns.insert(name.clone(), p.transform(values));
        }
        for name in &self.event_columns {
            let values = table
                .column(name)
                .ok_or_else(|| ForecastError::Data(format!("event column {name:?} missing")))?;
            columns.insert(name.clone(), values.to_vec());
        }
        Ok(PreparedTable {
            table: table.clone(),
            t,
            y_scaled,
            columns,
        })
    }

    pub fn normalize_collection(
        &self,
        collection: &SeriesCollection,
    ) -> Result<BTreeMap<String, PreparedTable>> {
        collection
            .iter()
            .map(|(id, table)| Ok((id.clone(), self.normalize(id, table)?)))
            .collect()
    }
}

fn fit_params(
    tables: &[&SeriesTable],
    mode: NormalizeMode,
    columns: &[(String, NormalizeMode)],
) -> Result<DataParams> {
    let start = tables
        .iter()
        .filter_map(|t| t.first_timestamp())
        .min()
        .ok_or(ForecastError::EmptyData)?;
    let end = tables
        .iter()
        .filter_map(|t| t.last_timestamp())
        .max()
        .ok_or(ForecastError::EmptyData)?;
    let y: Vec<f64> = tables.iter().flat_map(|t| t.y().iter().copied()).collect();

    let mut params = BTreeMap::new();
    for (name, column_mode) in columns {
        let mut values = Vec::new();
        for table in tables {
            let column = table
                .column(name)
                .ok_or_else(|| ForecastError::Data(format!("column {name:?} missing")))?;
            values.extend_from_slice(column);
        }
        params.insert(name.clone(), ShiftScale::fit(&values, *column_mode, false));
    }
    Ok(DataParams {
        time: TimeParams::fit(start, end),
        y: ShiftScale::fit(&y, mode, true),
        columns: params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NormalizationConfig, RegressorConfig};
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn make_table(y: Vec<f64>) -> SeriesTable {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ts = (0..y.len()).map(|i| start + Duration::days(i as i64)).collect();
        SeriesTable::new(ts, y).unwrap()
    }

    #[test]
    fn soft_maps_min_to_zero_and_q95_to_one() {
        let values: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let p = ShiftScale::fit(&values, NormalizeMode::Soft, true);
        assert_relative_eq!(p.shift, 0.0);
        assert_relative_eq!(p.scale, 95.0);
    }

    #[test]
    fn soft1_maps_min_and_q90() {
        let values: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let p = ShiftScale::fit(&values, NormalizeMode::Soft1, true);
        assert_relative_eq!(p.apply(0.0), 0.1, epsilon = 1e-12);
        assert_relative_eq!(p.apply(90.0), 0.9, epsilon = 1e-12);
    }

    #[test]
    fn auto_treats_binary_target_and_columns_differently() {
        let binary = [0.0, 1.0, 1.0, 0.0];
        assert_eq!(
            ShiftScale::fit(&binary, NormalizeMode::Auto, true),
            ShiftScale { shift: 0.0, scale: 1.0 }
        );
        let p = ShiftScale::fit(&[0.0, 2.0, 2.0], NormalizeMode::Auto, false);
        assert_relative_eq!(p.scale, 2.0);
        assert_eq!(
            ShiftScale::fit(&binary, NormalizeMode::Auto, false),
            ShiftScale::identity()
        );
    }

    #[test]
    fn constant_values_get_unit_scale() {
        let p = ShiftScale::fit(&[5.0, 5.0, 5.0], NormalizeMode::Soft, true);
        assert_relative_eq!(p.shift, 5.0);
        assert_relative_eq!(p.scale, 1.0);
        assert_relative_eq!(p.invert(p.apply(7.0)), 7.0);
    }

    #[test]
    fn missing_values_are_ignored_when_fitting() {
        let p = ShiftScale::fit(&[f64::NAN, 1.0, 3.0], NormalizeMode::MinMax, true);
        assert_relative_eq!(p.shift, 1.0);
        assert_relative_eq!(p.scale, 2.0);
    }

    #[test]
    fn time_spans_unit_interval() {
        let table = make_table(vec![1.0; 11]);
        let config = ForecasterConfig::default();
        let store = NormalizationStore::fit(&SeriesCollection::single(table.clone()), &config).unwrap();
        let prepared = store.normalize("", &table).unwrap();
        assert_relative_eq!(prepared.t[0], 0.0);
        assert_relative_eq!(prepared.t[5], 0.5);
        assert_relative_eq!(prepared.t[10], 1.0);
    }

    #[test]
    fn local_parameters_are_per_series_and_unknown_ids_fail() {
        let a = make_table(vec![0.0, 10.0, 20.0]);
        let b = make_table(vec![100.0, 200.0, 300.0]);
        let collection = SeriesCollection::new().with_series("a", a).with_series("b", b);
        let config = ForecasterConfig::default();
        let store = NormalizationStore::fit(&collection, &config).unwrap();
        assert_relative_eq!(store.data_params_for("a").unwrap().y.shift, 0.0);
        assert_relative_eq!(store.data_params_for("b").unwrap().y.shift, 100.0);
        assert!(store.data_params_for("c").is_err());

        let config = config.with_normalization(NormalizationConfig {
            unknown_data: true,
            ..Default::default()
        });
        let store = NormalizationStore::fit(&collection, &config).unwrap();
        assert_relative_eq!(store.data_params_for("c").unwrap().y.shift, 0.0);
    }

    #[test]
    fn regressors_are_scaled_and_required() {
        let config = ForecasterConfig::default()
            .add_future_regressor(
                "temp",
                RegressorConfig {
                    normalize: NormalizeMode::MinMax,
                    ..Default::default()
                },
            )
            .unwrap();
        let table = make_table(vec![1.0, 2.0, 3.0])
            .with_column("temp", vec![10.0, 15.0, 20.0])
            .unwrap();
        let store = NormalizationStore::fit(&SeriesCollection::single(table.clone()), &config).unwrap();
        let prepared = store.normalize("", &table).unwrap();
        assert_eq!(prepared.column("temp").unwrap(), &[0.0, 0.5, 1.0]);

        let bare = make_table(vec![1.0, 2.0, 3.0]);
        assert!(store.normalize("", &bare).is_err());
    }
}
