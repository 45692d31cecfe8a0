//! Extending series into the future.

use crate::config::ForecasterConfig;
use crate::core::{Frequency, SeriesCollection, SeriesTable};
use crate::error::{ForecastError, Result};
use crate::prepare::events::{event_indicator, EventOccurrence};
use std::collections::BTreeMap;
use tracing::warn;

/// Future values supplied to [`make_future`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FutureInputs {
    pub events: Option<Vec<EventOccurrence>>,
    /// Future values per regressor, starting right after the last row.
    pub regressors: Option<BTreeMap<String, Vec<f64>>>,
}

impl FutureInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, events: Vec<EventOccurrence>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_regressor(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.regressors
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), values);
        self
    }
}

/// How many historic rows receive predictions besides the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoricPredictions {
    #[default]
    None,
    All,
    Last(usize),
}

/// Rows to append so that every forecast step of the last origin exists.
///
/// Zero without lags, and zero with future regressors since their values
/// would be unknown.
pub fn periods_to_extend(table: &SeriesTable, config: &ForecasterConfig) -> usize {
    if config.n_lags() == 0 || !config.regressors.is_empty() {
        return 0;
    }
    config
        .n_forecasts()
        .saturating_sub(table.trailing_missing_target())
}

/// Append `periods` rows with every value missing.
pub fn extend(table: &SeriesTable, periods: usize, freq: &Frequency) -> Result<SeriesTable> {
    if periods == 0 {
        return Ok(table.clone());
    }
    let last = table.last_timestamp().ok_or(ForecastError::EmptyData)?;
    let timestamps = freq.range_after(last, periods)?;
    let mut future = SeriesTable::new(timestamps, vec![f64::NAN; periods])?;
    for name in table.column_names() {
        future = future.with_column(name, vec![f64::NAN; periods])?;
    }
    table.concat(&future)
}

/// Extend every series as far as its horizon requires.
pub fn maybe_extend(
    collection: SeriesCollection,
    config: &ForecasterConfig,
    freq: &Frequency,
) -> Result<(SeriesCollection, BTreeMap<String, usize>)> {
    let mut added = BTreeMap::new();
    let extended = collection.try_map(|id, table| {
        let periods = periods_to_extend(&table, config);
        added.insert(id.to_string(), periods);
        extend(&table, periods, freq)
    })?;
    Ok((extended, added))
}

/// Build the table to predict on: the last `n_lags + n_historic` rows plus
/// `periods` future rows carrying the supplied regressors and events.
pub fn make_future(
    table: &SeriesTable,
    config: &ForecasterConfig,
    freq: &Frequency,
    future: &FutureInputs,
    periods: Option<usize>,
    historic: HistoricPredictions,
) -> Result<SeriesTable> {
    let n_lags = config.n_lags();
    let mut periods = periods.unwrap_or(if n_lags == 0 { 1 } else { config.n_forecasts() });
    let mut n_historic = match historic {
        HistoricPredictions::None => 0,
        HistoricPredictions::All => table.len().saturating_sub(n_lags),
        HistoricPredictions::Last(n) => n,
    };

    if periods == 0 && n_historic == 0 {
        return Err(ForecastError::Configuration(
            "set either history or future to contain more than zero values".to_string(),
        ));
    }
    if n_lags > 0 && periods > 0 && periods != config.n_forecasts() {
        warn!(
            requested = periods,
            n_forecasts = config.n_forecasts(),
            "number of forecast steps is defined by n_forecasts"
        );
        periods = config.n_forecasts();
    }

    let mut regressor_values: BTreeMap<&str, &[f64]> = BTreeMap::new();
    if periods > 0 {
        for name in config.regressors.keys() {
            let values = future
                .regressors
                .as_ref()
                .and_then(|r| r.get(name))
                .filter(|v| v.len() >= periods && v[..periods].iter().all(|x| x.is_finite()))
                .ok_or_else(|| ForecastError::MissingFutureValues { name: name.clone() })?;
            regressor_values.insert(name.as_str(), &values[..periods]);
        }
    }

    if table.len() < n_lags {
        return Err(ForecastError::InsufficientData {
            needed: n_lags,
            got: table.len(),
        });
    }
    if table.len() < n_lags + n_historic {
        warn!(
            requested = n_historic,
            available = table.len() - n_lags,
            "insufficient data for historic forecasts"
        );
        n_historic = table.len() - n_lags;
    }

    let history = table.tail(n_lags + n_historic);
    if periods == 0 {
        return Ok(history);
    }

    if config.has_events() && future.events.is_none() {
        warn!("future events not supplied; all events treated as not occurring");
    }

    let last = table.last_timestamp().ok_or(ForecastError::EmptyData)?;
    let timestamps = freq.range_after(last, periods)?;
    let occurrences = future.events.as_deref().unwrap_or(&[]);

    let mut rows = SeriesTable::new(timestamps.clone(), vec![f64::NAN; periods])?;
    for name in history.column_names() {
        rows = rows.with_column(name, vec![f64::NAN; periods])?;
    }
    for (name, values) in &regressor_values {
        rows = rows.with_column(*name, values.to_vec())?;
    }
    for (name, _) in config.all_events() {
        rows = rows.with_column(name, event_indicator(&timestamps, occurrences, name))?;
    }

    if history.is_empty() {
        Ok(rows)
    } else {
        history.concat(&rows)
    }
}
