//! Data checks, horizon extension, normalization and windowing.

pub mod dataset;
pub mod events;
pub mod horizon;
pub mod normalize;

pub use dataset::{Batch, Batches, DatasetBuilder, LagWindowBuilder, WindowDataset, WindowInputs};
pub use events::{event_indicator, with_events, EventOccurrence};
pub use horizon::{extend, make_future, maybe_extend, periods_to_extend, FutureInputs, HistoricPredictions};
pub use normalize::{DataParams, NormalizationStore, NormalizeMode, PreparedTable, ShiftScale, TimeParams};

use crate::config::ForecasterConfig;
use crate::core::{Frequency, SeriesCollection, SeriesTable, NORMALIZED_COLUMNS};
use crate::error::{ForecastError, Result};
use crate::impute::{ImputeMode, Imputer};

/// Which parts of a table [`check_table`] requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Require at least one observed target.
    pub check_y: bool,
    /// Require every configured covariate, regressor and event column.
    pub exogenous: bool,
}

impl CheckOptions {
    pub fn training() -> Self {
        Self {
            check_y: true,
            exogenous: true,
        }
    }
}

/// Basic sanity checks before imputation.
pub fn check_table(table: &SeriesTable, config: &ForecasterConfig, options: CheckOptions) -> Result<()> {
    if table.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if let Some(name) = NORMALIZED_COLUMNS.iter().find(|c| table.has_column(c)) {
        return Err(ForecastError::Data(format!(
            "table has already been normalized (column {name:?}); provide raw data"
        )));
    }
    if options.check_y && !table.has_observed_target() {
        return Err(ForecastError::Data("target has no observed values".to_string()));
    }
    if options.exogenous {
        let required = config
            .covariates
            .keys()
            .map(|k| ("lagged regressor", k.as_str()))
            .chain(config.regressors.keys().map(|k| ("future regressor", k.as_str())))
            .chain(config.all_events().into_iter().map(|(n, _)| ("event", n)));
        for (kind, name) in required {
            if !table.has_column(name) {
                return Err(ForecastError::Data(format!("{kind} column {name:?} missing")));
            }
        }
    }
    Ok(())
}

pub fn check_collection(
    collection: &SeriesCollection,
    config: &ForecasterConfig,
    options: CheckOptions,
) -> Result<()> {
    if collection.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    collection
        .values()
        .try_for_each(|table| check_table(table, config, options))
}

/// Check and impute tables for prediction. Trailing unknown targets are kept.
pub fn prepare_to_predict(
    collection: SeriesCollection,
    config: &ForecasterConfig,
    freq: &Frequency,
) -> Result<SeriesCollection> {
    let n_lags = config.n_lags();
    let imputer = Imputer::new(config);
    collection.try_map(|_, table| {
        if table.is_empty() || table.len() < n_lags {
            return Err(ForecastError::InsufficientData {
                needed: n_lags.max(1),
                got: table.len(),
            });
        }
        check_table(
            &table,
            config,
            CheckOptions {
                check_y: n_lags > 0,
                exogenous: true,
            },
        )?;
        Ok(imputer.impute(&table, freq, ImputeMode::Predicting)?.table)
    })
}
