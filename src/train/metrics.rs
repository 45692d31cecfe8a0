//! Training and validation metrics.
//!
//! A [`MetricsCollection`] accumulates batch metrics over an epoch and
//! stores one row per epoch on [`MetricsCollection::compute`]. Stored rows
//! form a [`MetricsTable`].

use crate::error::{ForecastError, Result};
use crate::prepare::ShiftScale;
use ndarray::Array2;

/// Batch metrics computed from predictions and targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Mean Absolute Error
    Mae,
    /// Mean Squared Error
    Mse,
    /// Root Mean Squared Error
    Rmse,
}

impl MetricKind {
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::Mae => "MAE",
            MetricKind::Mse => "MSE",
            MetricKind::Rmse => "RMSE",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Accumulator {
    sum: f64,
    count: f64,
}

impl Accumulator {
    fn add(&mut self, sum: f64, count: f64) {
        self.sum += sum;
        self.count += count;
    }

    fn mean(&self) -> f64 {
        if self.count > 0.0 {
            self.sum / self.count
        } else {
            f64::NAN
        }
    }
}

/// Accumulates metrics across the batches of one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsCollection {
    batch_metrics: Vec<(MetricKind, Accumulator)>,
    value_metrics: Vec<(String, Accumulator)>,
    shift_scale: Option<ShiftScale>,
    specific_column: Option<usize>,
    stored: MetricsTable,
}

impl MetricsCollection {
    /// `values` names scalar metrics reported directly through
    /// [`update`](Self::update), such as the loss.
    pub fn new(metrics: &[MetricKind], values: &[&str]) -> Self {
        Self {
            batch_metrics: metrics.iter().map(|m| (*m, Accumulator::default())).collect(),
            value_metrics: values
                .iter()
                .map(|v| (v.to_string(), Accumulator::default()))
                .collect(),
            shift_scale: None,
            specific_column: None,
            stored: MetricsTable::default(),
        }
    }

    /// Same batch metrics, no value metrics and no stored rows.
    pub fn new_like(&self) -> Self {
        Self {
            batch_metrics: self
                .batch_metrics
                .iter()
                .map(|(m, _)| (*m, Accumulator::default()))
                .collect(),
            value_metrics: Vec::new(),
            shift_scale: self.shift_scale,
            specific_column: self.specific_column,
            stored: MetricsTable::default(),
        }
    }

    /// Compute batch metrics on the original scale.
    pub fn with_shift_scale(mut self, params: ShiftScale) -> Self {
        self.shift_scale = Some(params);
        self
    }

    /// Restrict batch metrics to one forecast step column.
    pub fn with_specific_column(mut self, column: usize) -> Self {
        self.specific_column = Some(column);
        self
    }

    /// Add one batch. `values` feeds the value metrics by name; unknown
    /// names are ignored.
    pub fn update(&mut self, predicted: &Array2<f64>, target: &Array2<f64>, values: &[(&str, f64)]) -> Result<()> {
        if predicted.dim() != target.dim() {
            return Err(ForecastError::DimensionMismatch {
                expected: target.len(),
                got: predicted.len(),
            });
        }
        let n = predicted.nrows() as f64;
        for (name, value) in values {
            if let Some((_, acc)) = self.value_metrics.iter_mut().find(|(v, _)| v == name) {
                acc.add(value * n, n);
            }
        }

        let restore = |v: f64| match &self.shift_scale {
            Some(p) => p.invert(v),
            None => v,
        };
        let (mut abs_sum, mut sq_sum, mut count) = (0.0, 0.0, 0.0);
        for ((row, col), p) in predicted.indexed_iter() {
            if self.specific_column.is_some_and(|c| c != col) {
                continue;
            }
            let t = target[[row, col]];
            if !(p.is_finite() && t.is_finite()) {
                continue;
            }
            let diff = restore(*p) - restore(t);
            abs_sum += diff.abs();
            sq_sum += diff * diff;
            count += 1.0;
        }
        for (kind, acc) in &mut self.batch_metrics {
            match kind {
                MetricKind::Mae => acc.add(abs_sum, count),
                MetricKind::Mse | MetricKind::Rmse => acc.add(sq_sum, count),
            }
        }
        Ok(())
    }

    /// Epoch values in column order: value metrics first, then batch
    /// metrics. With `save` the row is stored and the accumulators reset.
    pub fn compute(&mut self, save: bool) -> Vec<(String, f64)> {
        let mut row: Vec<(String, f64)> = self
            .value_metrics
            .iter()
            .map(|(name, acc)| (name.clone(), acc.mean()))
            .collect();
        row.extend(self.batch_metrics.iter().map(|(kind, acc)| {
            let mean = acc.mean();
            let value = if *kind == MetricKind::Rmse { mean.sqrt() } else { mean };
            (kind.name().to_string(), value)
        }));
        if save {
            self.stored.push_row(&row);
            self.reset();
        }
        row
    }

    /// Clear the accumulators; stored rows are kept.
    pub fn reset(&mut self) {
        for (_, acc) in &mut self.batch_metrics {
            *acc = Accumulator::default();
        }
        for (_, acc) in &mut self.value_metrics {
            *acc = Accumulator::default();
        }
    }

    pub fn stored(&self) -> &MetricsTable {
        &self.stored
    }

    pub fn into_stored(self) -> MetricsTable {
        self.stored
    }
}

/// One row per epoch, ordered metric columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl MetricsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row. Columns not seen before are added, earlier rows get NaN.
    pub fn push_row(&mut self, row: &[(String, f64)]) {
        for (name, _) in row {
            if !self.columns.contains(name) {
                self.columns.push(name.clone());
                for r in &mut self.rows {
                    r.push(f64::NAN);
                }
            }
        }
        let mut values = vec![f64::NAN; self.columns.len()];
        for (name, value) in row {
            if let Some(i) = self.columns.iter().position(|c| c == name) {
                values[i] = *value;
            }
        }
        self.rows.push(values);
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let i = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[i]).collect())
    }

    pub fn row(&self, index: usize) -> Option<Vec<(String, f64)>> {
        let row = self.rows.get(index)?;
        Some(self.columns.iter().cloned().zip(row.iter().copied()).collect())
    }

    pub fn last_row(&self) -> Option<Vec<(String, f64)>> {
        self.n_rows().checked_sub(1).and_then(|i| self.row(i))
    }

    /// Append the columns of `other` side by side, renamed with `suffix`.
    pub fn merge(mut self, other: &MetricsTable, suffix: &str) -> Result<Self> {
        if other.is_empty() {
            return Ok(self);
        }
        if self.n_rows() != other.n_rows() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.n_rows(),
                got: other.n_rows(),
            });
        }
        self.columns
            .extend(other.columns.iter().map(|c| format!("{c}{suffix}")));
        for (row, extra) in self.rows.iter_mut().zip(&other.rows) {
            row.extend_from_slice(extra);
        }
        Ok(self)
    }
}
