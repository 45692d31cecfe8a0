//! SeriesTable: one time series with a target column and named side columns.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Column names that would collide with normalized-table columns.
pub const NORMALIZED_COLUMNS: [&str; 2] = ["t", "y_scaled"];

/// Missing marker test used across the crate (NaN or infinite).
#[inline]
pub fn is_missing(value: f64) -> bool {
    !value.is_finite()
}

/// Number of consecutive missing values at the end of `values`.
pub fn trailing_missing(values: &[f64]) -> usize {
    values.iter().rev().take_while(|v| is_missing(**v)).count()
}

/// Number of consecutive missing values at the start of `values`.
pub fn leading_missing(values: &[f64]) -> usize {
    values.iter().take_while(|v| is_missing(**v)).count()
}

/// A time series: strictly increasing timestamps, a target `y` and named
/// columns (covariates, future regressors, event indicators).
///
/// Missing values are NaN. Every transformation returns a new table.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTable {
    timestamps: Vec<DateTime<Utc>>,
    y: Vec<f64>,
    columns: BTreeMap<String, Vec<f64>>,
}

/// Builder for constructing a SeriesTable.
#[derive(Debug, Clone, Default)]
pub struct SeriesTableBuilder {
    timestamps: Vec<DateTime<Utc>>,
    y: Option<Vec<f64>>,
    columns: Vec<(String, Vec<f64>)>,
}

impl SeriesTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamps(mut self, timestamps: Vec<DateTime<Utc>>) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn y(mut self, y: Vec<f64>) -> Self {
        self.y = Some(y);
        self
    }

    pub fn column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.columns.push((name.into(), values));
        self
    }

    /// Build the table. Without `y` the target is entirely missing.
    pub fn build(self) -> Result<SeriesTable> {
        let n = self.timestamps.len();
        let y = self.y.unwrap_or_else(|| vec![f64::NAN; n]);
        let mut table = SeriesTable::new(self.timestamps, y)?;
        for (name, values) in self.columns {
            table = table.with_column(name, values)?;
        }
        Ok(table)
    }
}

impl SeriesTable {
    /// Create a table from timestamps and target values.
    pub fn new(timestamps: Vec<DateTime<Utc>>, y: Vec<f64>) -> Result<Self> {
        validate_increasing(&timestamps)?;
        if y.len() != timestamps.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: timestamps.len(),
                got: y.len(),
            });
        }
        Ok(Self {
            timestamps,
            y,
            columns: BTreeMap::new(),
        })
    }

    /// Create a table from rows in any order. Duplicate timestamps are rejected.
    pub fn from_unsorted(mut rows: Vec<(DateTime<Utc>, f64)>) -> Result<Self> {
        rows.sort_by_key(|(ts, _)| *ts);
        if rows.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(ForecastError::TimestampError(
                "duplicate timestamps".to_string(),
            ));
        }
        let (timestamps, y) = rows.into_iter().unzip();
        Self::new(timestamps, y)
    }

    pub fn builder() -> SeriesTableBuilder {
        SeriesTableBuilder::new()
    }

    /// Add or replace a named column.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.len(),
                got: values.len(),
            });
        }
        if name.is_empty() || name == "y" || name == "ds" {
            return Err(ForecastError::Data(format!(
                "invalid column name {name:?}"
            )));
        }
        self.columns.insert(name, values);
        Ok(self)
    }

    /// Replace the target column.
    pub fn with_y(mut self, y: Vec<f64>) -> Result<Self> {
        if y.len() != self.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.len(),
                got: y.len(),
            });
        }
        self.y = y;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Target values (NaN where missing).
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn columns(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.columns
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut Vec<f64>> {
        self.columns.get_mut(name)
    }

    pub(crate) fn y_mut(&mut self) -> &mut Vec<f64> {
        &mut self.y
    }

    /// Whether any target value is observed.
    pub fn has_observed_target(&self) -> bool {
        self.y.iter().any(|v| !is_missing(*v))
    }

    /// Check if the target or any column has missing values.
    pub fn has_missing_values(&self) -> bool {
        self.y.iter().any(|v| is_missing(*v))
            || self
                .columns
                .values()
                .any(|c| c.iter().any(|v| is_missing(*v)))
    }

    /// Extract rows `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<SeriesTable> {
        if start > end {
            return Err(ForecastError::Data("start must be <= end".to_string()));
        }
        if end > self.len() {
            return Err(ForecastError::IndexOutOfBounds {
                index: end,
                size: self.len(),
            });
        }
        Ok(SeriesTable {
            timestamps: self.timestamps[start..end].to_vec(),
            y: self.y[start..end].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), v[start..end].to_vec()))
                .collect(),
        })
    }

    /// The first `n` rows (all rows if fewer).
    pub fn head(&self, n: usize) -> SeriesTable {
        self.rows(0, n.min(self.len()))
    }

    /// The last `n` rows (all rows if fewer).
    pub fn tail(&self, n: usize) -> SeriesTable {
        let n = n.min(self.len());
        self.rows(self.len() - n, self.len())
    }

    /// All rows except the last `n`.
    pub fn drop_tail(&self, n: usize) -> SeriesTable {
        self.head(self.len().saturating_sub(n))
    }

    /// All rows except the first `n`.
    pub fn drop_head(&self, n: usize) -> SeriesTable {
        self.tail(self.len().saturating_sub(n))
    }

    /// Keep the rows for which `keep(index)` is true.
    pub fn filter_rows(&self, mut keep: impl FnMut(usize) -> bool) -> SeriesTable {
        let indices: Vec<usize> = (0..self.len()).filter(|&i| keep(i)).collect();
        self.select_rows(&indices)
    }

    /// Rows whose timestamp lies strictly before `threshold`.
    pub fn before(&self, threshold: DateTime<Utc>) -> SeriesTable {
        let n = self.timestamps.partition_point(|ts| *ts < threshold);
        self.rows(0, n)
    }

    /// Rows whose timestamp is at or after `threshold`.
    pub fn from_timestamp(&self, threshold: DateTime<Utc>) -> SeriesTable {
        let n = self.timestamps.partition_point(|ts| *ts < threshold);
        self.rows(n, self.len())
    }

    fn select_rows(&self, indices: &[usize]) -> SeriesTable {
        SeriesTable {
            timestamps: indices.iter().map(|&i| self.timestamps[i]).collect(),
            y: indices.iter().map(|&i| self.y[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), indices.iter().map(|&i| v[i]).collect()))
                .collect(),
        }
    }

    // Bounds are clamped by callers.
    fn rows(&self, start: usize, end: usize) -> SeriesTable {
        SeriesTable {
            timestamps: self.timestamps[start..end].to_vec(),
            y: self.y[start..end].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), v[start..end].to_vec()))
                .collect(),
        }
    }

    /// Append the rows of `other` after this table. Columns present in only
    /// one of the tables are filled with NaN on the other side.
    pub fn concat(&self, other: &SeriesTable) -> Result<SeriesTable> {
        if let (Some(last), Some(first)) = (self.last_timestamp(), other.first_timestamp()) {
            if first <= last {
                return Err(ForecastError::TimestampError(
                    "appended rows must start after the last timestamp".to_string(),
                ));
            }
        }
        let mut timestamps = self.timestamps.clone();
        timestamps.extend_from_slice(&other.timestamps);
        let mut y = self.y.clone();
        y.extend_from_slice(&other.y);

        let mut columns = BTreeMap::new();
        for name in self.columns.keys().chain(other.columns.keys()) {
            if columns.contains_key(name) {
                continue;
            }
            let mut values = match self.columns.get(name) {
                Some(v) => v.clone(),
                None => vec![f64::NAN; self.len()],
            };
            match other.columns.get(name) {
                Some(v) => values.extend_from_slice(v),
                None => values.extend(std::iter::repeat(f64::NAN).take(other.len())),
            }
            columns.insert(name.clone(), values);
        }
        Ok(SeriesTable {
            timestamps,
            y,
            columns,
        })
    }

    /// Trailing run of missing target values.
    pub fn trailing_missing_target(&self) -> usize {
        trailing_missing(&self.y)
    }
}

fn validate_increasing(timestamps: &[DateTime<Utc>]) -> Result<()> {
    if timestamps.windows(2).any(|w| w[1] <= w[0]) {
        return Err(ForecastError::TimestampError(
            "timestamps must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}
