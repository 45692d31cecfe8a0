//! Forecast output table.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};

/// Output table of a prediction: timestamps plus ordered named columns.
///
/// Column order is insertion order (`y`, `yhat1`, `residual1`, ... for the
/// target layout, `step0`, `step1`, ... for the raw layout).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastFrame {
    timestamps: Vec<DateTime<Utc>>,
    columns: Vec<(String, Vec<f64>)>,
}

impl ForecastFrame {
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Self {
        Self {
            timestamps,
            columns: Vec::new(),
        }
    }

    /// Append a column; replaces a column of the same name in place.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        if values.len() != self.timestamps.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.timestamps.len(),
                got: values.len(),
            });
        }
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name, values)),
        }
        Ok(())
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

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn columns(&self) -> &[(String, Vec<f64>)] {
        &self.columns
    }

    /// Value at `row` of column `name`.
    pub fn value(&self, name: &str, row: usize) -> Result<f64> {
        let column = self
            .column(name)
            .ok_or_else(|| ForecastError::Data(format!("no column {name:?}")))?;
        column
            .get(row)
            .copied()
            .ok_or(ForecastError::IndexOutOfBounds {
                index: row,
                size: column.len(),
            })
    }

    /// All rows except the last `n`.
    pub fn drop_tail(&self, n: usize) -> ForecastFrame {
        let keep = self.len().saturating_sub(n);
        ForecastFrame {
            timestamps: self.timestamps[..keep].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(name, v)| (name.clone(), v[..keep].to_vec()))
                .collect(),
        }
    }
}
