//! Missing-data handling before windowing.
//!
//! [`Imputer::impute`] drops unusable rows, inserts missing calendar
//! timestamps and fills gaps column by column. Trailing rows with unknown
//! target are set aside while predicting so they can be forecast.

mod fill;

pub use fill::{fill_linear_then_rolling, fill_zero, missing_runs};

use crate::config::ForecasterConfig;
use crate::core::{
    is_missing, leading_missing, trailing_missing, Frequency, SeriesCollection, SeriesTable,
};
use crate::error::{ForecastError, Result};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Whether the data is used for training or for predicting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImputeMode {
    Training,
    Predicting,
}

/// Row and value counts from one imputation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImputationReport {
    pub dropped_missing_target: usize,
    pub missing_dates_added: usize,
    pub dropped_off_grid: usize,
    pub dropped_regressor_tail: usize,
    pub dropped_target_tail: usize,
    pub dropped_leading_target: usize,
    /// Excess trailing rows dropped because they exceed the forecast horizon.
    pub truncated_target_tail: usize,
    /// Trailing rows set aside and appended back unchanged.
    pub reattached_tail: usize,
    /// Imputed value count per column.
    pub imputed: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Imputed {
    pub table: SeriesTable,
    pub report: ImputationReport,
}

/// Applies the configured imputation policy to series tables.
#[derive(Debug, Clone, Copy)]
pub struct Imputer<'a> {
    config: &'a ForecasterConfig,
}

impl<'a> Imputer<'a> {
    pub fn new(config: &'a ForecasterConfig) -> Self {
        Self { config }
    }

    pub fn impute(&self, table: &SeriesTable, freq: &Frequency, mode: ImputeMode) -> Result<Imputed> {
        let config = self.config;
        let policy = config.imputation;
        let n_lags = config.n_lags();
        let mut report = ImputationReport::default();
        let mut table = table.clone();

        if n_lags == 0 && mode == ImputeMode::Training {
            let missing = table.y().iter().filter(|v| is_missing(**v)).count();
            if missing > 0 {
                let y = table.y().to_vec();
                table = table.filter_rows(|i| !is_missing(y[i]));
                report.dropped_missing_target = missing;
                info!(rows = missing, "dropped rows with missing target");
            }
        }

        if n_lags > 0 {
            let (filled, added, off_grid) = add_missing_dates(&table, freq)?;
            if added > 0 {
                if !policy.enabled {
                    return Err(ForecastError::MissingDates { count: added });
                }
                info!(added, "missing dates added");
            }
            report.missing_dates_added = added;
            report.dropped_off_grid = off_grid;
            table = filled;
        }

        // Events are exempt: missing occurrences become zeros below.
        if !config.regressors.is_empty() {
            let tail = config
                .regressors
                .keys()
                .map(|name| table.column(name).map_or(0, trailing_missing))
                .max()
                .unwrap_or(0);
            if tail > 0 {
                table = table.drop_tail(tail);
                report.dropped_regressor_tail = tail;
                info!(rows = tail, "dropped rows at end due to missing future regressor values");
            }
        }

        let mut set_aside = None;
        let mut nan_at_end = table.trailing_missing_target();
        if nan_at_end > 0 {
            match mode {
                ImputeMode::Predicting => {
                    let horizon = config.n_forecasts();
                    if horizon > 1 && nan_at_end > horizon {
                        let excess = nan_at_end - horizon;
                        table = table.drop_tail(excess);
                        report.truncated_target_tail = excess;
                        nan_at_end = horizon;
                        warn!(
                            rows = excess,
                            n_forecasts = horizon,
                            "more trailing missing targets than forecast steps; dropped the excess"
                        );
                    }
                    set_aside = Some(table.tail(nan_at_end));
                    table = table.drop_tail(nan_at_end);
                    report.reattached_tail = nan_at_end;
                }
                ImputeMode::Training => {
                    table = table.drop_tail(nan_at_end);
                    report.dropped_target_tail = nan_at_end;
                    info!(
                        rows = nan_at_end,
                        "dropped trailing missing targets; training data is imputed up to the last observation"
                    );
                }
            }
        }

        if mode == ImputeMode::Training && n_lags > 0 {
            let lead = leading_missing(table.y());
            if lead > 0 {
                table = table.drop_head(lead);
                report.dropped_leading_target = lead;
                info!(rows = lead, "dropped leading missing targets");
            }
        }

        let mut columns: Vec<&str> = Vec::new();
        if n_lags > 0 {
            columns.push("y");
        }
        columns.extend(config.data_columns());

        for name in columns {
            let values = if name == "y" {
                table.y()
            } else {
                table
                    .column(name)
                    .ok_or_else(|| ForecastError::Data(format!("column {name:?} missing")))?
            };
            let missing = values.iter().filter(|v| is_missing(**v)).count();
            if missing == 0 {
                continue;
            }
            if !policy.enabled {
                return Err(ForecastError::Data(format!(
                    "missing values found in column {name:?}; enable imputation or preprocess the data"
                )));
            }
            let (filled, remaining) = if config.is_event(name) {
                (fill_zero(values), 0)
            } else {
                fill_linear_then_rolling(values, policy.limit_linear, policy.rolling)
            };
            info!(column = name, imputed = missing - remaining, "auto-imputed missing values");
            if remaining > 0 {
                return Err(ForecastError::IrreducibleGap {
                    column: name.to_string(),
                    remaining,
                    bound: policy.bound(),
                });
            }
            if name == "y" {
                *table.y_mut() = filled;
            } else if let Some(column) = table.column_mut(name) {
                *column = filled;
            }
            report.imputed.insert(name.to_string(), missing);
        }

        if let Some(tail) = set_aside {
            table = table.concat(&tail)?;
        }
        Ok(Imputed { table, report })
    }
}

/// Reindex `table` onto the frequency grid between its first and last
/// timestamp. Returns the table, the number of inserted rows and the number
/// of dropped rows that were not on the grid.
pub fn add_missing_dates(table: &SeriesTable, freq: &Frequency) -> Result<(SeriesTable, usize, usize)> {
    let (Some(first), Some(last)) = (table.first_timestamp(), table.last_timestamp()) else {
        return Ok((table.clone(), 0, 0));
    };
    let grid = freq.grid(first, last)?;
    if grid.as_slice() == table.timestamps() {
        return Ok((table.clone(), 0, 0));
    }

    let source = table.timestamps();
    let mut rows: Vec<Option<usize>> = Vec::with_capacity(grid.len());
    let mut src = 0;
    for ts in &grid {
        while src < source.len() && source[src] < *ts {
            src += 1;
        }
        if src < source.len() && source[src] == *ts {
            rows.push(Some(src));
            src += 1;
        } else {
            rows.push(None);
        }
    }
    let matched = rows.iter().filter(|r| r.is_some()).count();
    let off_grid = table.len() - matched;
    if off_grid > 0 {
        warn!(rows = off_grid, "dropped rows not aligned to the frequency grid");
    }

    let pick = |values: &[f64]| -> Vec<f64> {
        rows.iter()
            .map(|r| r.map_or(f64::NAN, |i| values[i]))
            .collect()
    };
    let mut out = SeriesTable::new(grid.clone(), pick(table.y()))?;
    for (name, values) in table.columns() {
        out = out.with_column(name.clone(), pick(values))?;
    }
    Ok((out, grid.len() - matched, off_grid))
}

/// Impute every series of a collection.
pub fn impute_collection(
    collection: SeriesCollection,
    config: &ForecasterConfig,
    freq: &Frequency,
    mode: ImputeMode,
) -> Result<SeriesCollection> {
    let imputer = Imputer::new(config);
    collection.try_map(|_, table| Ok(imputer.impute(&table, freq, mode)?.table))
}
