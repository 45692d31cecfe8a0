//! Train/validation splits and cross-validation folds without target leakage.
//!
//! Validation sets keep the `n_lags` rows preceding their first target so
//! every validation sample has its inputs, while no validation target is
//! ever seen in training.

use crate::config::WindowSpec;
use crate::core::{SeriesCollection, SeriesTable};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Size of the validation part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidSize {
    /// Fraction of the samples in `(0, 1)`; at least one sample.
    Fraction(f64),
    /// Exact number of samples.
    Count(usize),
}

impl Default for ValidSize {
    fn default() -> Self {
        ValidSize::Fraction(0.2)
    }
}

/// Number of samples that can be cut into train and validation parts.
fn splittable_samples(n_rows: usize, window: WindowSpec) -> usize {
    (n_rows + 2).saturating_sub(window.n_lags() + 2 * window.n_forecasts())
}

/// `(n_train, n_valid)` sample counts for a table of `n_rows` rows.
pub fn split_sizes(n_rows: usize, window: WindowSpec, valid: ValidSize) -> Result<(usize, usize)> {
    let n_samples = splittable_samples(n_rows, window);
    let n_valid = match valid {
        ValidSize::Fraction(p) if p > 0.0 && p < 1.0 => ((n_samples as f64 * p) as usize).max(1),
        ValidSize::Fraction(p) => {
            return Err(ForecastError::Configuration(format!(
                "validation fraction must be in (0, 1), got {p}"
            )))
        }
        ValidSize::Count(0) => {
            return Err(ForecastError::Configuration(
                "validation size must be positive".into(),
            ))
        }
        ValidSize::Count(n) => n,
    };
    if n_samples <= n_valid {
        return Err(ForecastError::InsufficientData {
            needed: n_valid + 1,
            got: n_samples,
        });
    }
    Ok((n_samples - n_valid, n_valid))
}

/// Split one table into overlapping train and validation tables.
pub fn split_table(table: &SeriesTable, window: WindowSpec, valid: ValidSize) -> Result<(SeriesTable, SeriesTable)> {
    let (n_train, n_valid) = split_sizes(table.len(), window, valid)?;
    let split_train = n_train + window.n_lags() + window.n_forecasts() - 1;
    let split_valid = split_train - window.n_lags();
    debug!(n_train, n_valid, "split series");
    Ok((table.head(split_train), table.drop_head(split_valid)))
}

/// Split every series of a collection.
///
/// With `local_split` each series is split on its own; otherwise all series
/// share one time threshold computed over their pooled timestamps.
pub fn split_train_validation(
    collection: &SeriesCollection,
    window: WindowSpec,
    valid: ValidSize,
    local_split: bool,
) -> Result<(SeriesCollection, SeriesCollection)> {
    if collection.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if local_split || collection.len() == 1 {
        return split_each(collection, |table| split_table(table, window, valid));
    }

    let threshold = global_threshold(collection, window, valid)?;
    debug!(%threshold, "global split threshold");
    split_each(collection, |table| {
        let train = table.before(threshold);
        let overlap = train.len().min(window.n_lags());
        let valid_rows = table.drop_head(train.len() - overlap);
        Ok((train, valid_rows))
    })
}

/// First validation timestamp over the pooled, de-duplicated timestamps.
fn global_threshold(
    collection: &SeriesCollection,
    window: WindowSpec,
    valid: ValidSize,
) -> Result<DateTime<Utc>> {
    let mut pooled: Vec<DateTime<Utc>> = collection
        .values()
        .flat_map(|t| t.timestamps().iter().copied())
        .collect();
    pooled.sort();
    pooled.dedup();
    let pooled_window = WindowSpec::new(window.n_lags(), 1)?;
    let (n_train, _) = split_sizes(pooled.len(), pooled_window, valid)?;
    pooled
        .get(n_train + window.n_lags())
        .copied()
        .ok_or(ForecastError::IndexOutOfBounds {
            index: n_train + window.n_lags(),
            size: pooled.len(),
        })
}

fn split_each<F>(collection: &SeriesCollection, mut split: F) -> Result<(SeriesCollection, SeriesCollection)>
where
    F: FnMut(&SeriesTable) -> Result<(SeriesTable, SeriesTable)>,
{
    if collection.is_unnamed() {
        let (train, valid) = split(collection.values().next().ok_or(ForecastError::EmptyData)?)?;
        return Ok((SeriesCollection::single(train), SeriesCollection::single(valid)));
    }
    let mut train = SeriesCollection::new();
    let mut valid = SeriesCollection::new();
    for (id, table) in collection {
        let (t, v) = split(table)?;
        train.insert(id.clone(), t);
        valid.insert(id.clone(), v);
    }
    Ok((train, valid))
}

/// Settings for [`crossvalidation_split`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoldConfig {
    pub k: usize,
    /// Samples per validation fold as a fraction of all samples.
    pub fold_pct: f64,
    /// Fraction of a fold shared with the next one.
    pub fold_overlap_pct: f64,
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            k: 5,
            fold_pct: 0.1,
            fold_overlap_pct: 0.5,
        }
    }
}

impl FoldConfig {
    pub fn new(k: usize, fold_pct: f64) -> Self {
        Self {
            k,
            fold_pct,
            fold_overlap_pct: 0.0,
        }
    }

    pub fn with_overlap(mut self, fold_overlap_pct: f64) -> Self {
        self.fold_overlap_pct = fold_overlap_pct;
        self
    }
}

/// `k` expanding folds cut from the end of the series, oldest first.
pub fn crossvalidation_split(
    table: &SeriesTable,
    window: WindowSpec,
    folds: FoldConfig,
) -> Result<Vec<(SeriesTable, SeriesTable)>> {
    if folds.k == 0 {
        return Err(ForecastError::Configuration("k must be positive".into()));
    }
    if !(folds.fold_pct > 0.0 && folds.fold_pct < 1.0) || !(0.0..1.0).contains(&folds.fold_overlap_pct) {
        return Err(ForecastError::Configuration(
            "fold fractions must be in [0, 1)".into(),
        ));
    }
    let total = splittable_samples(table.len(), window);
    let samples_fold = ((folds.fold_pct * total as f64) as usize).max(1);
    let overlap = (folds.fold_overlap_pct * samples_fold as f64) as usize;
    if overlap >= samples_fold {
        return Err(ForecastError::Configuration(
            "fold overlap must be smaller than the fold".into(),
        ));
    }
    let consumed = samples_fold + (folds.k - 1) * (samples_fold - overlap);
    let min_train = total.saturating_sub(consumed);
    if total < consumed || min_train < samples_fold {
        return Err(ForecastError::InsufficientData {
            needed: consumed + samples_fold,
            got: total,
        });
    }

    let mut out = Vec::with_capacity(folds.k);
    let mut remaining = table.clone();
    for _ in 0..folds.k {
        out.push(split_table(&remaining, window, ValidSize::Count(samples_fold))?);
        remaining = remaining.head(remaining.len() - samples_fold + overlap);
    }
    out.reverse();
    debug!(folds = folds.k, samples_fold, overlap, min_train, "cross-validation folds");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn make_timestamps(start_day: i64, n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(start_day);
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    fn table(n: usize) -> SeriesTable {
        SeriesTable::new(make_timestamps(0, n), (0..n).map(|i| i as f64).collect()).unwrap()
    }

    #[test]
    fn split_keeps_lag_overlap_without_target_leakage() {
        let window = WindowSpec::new(3, 2).unwrap();
        let (train, valid) = split_table(&table(100), window, ValidSize::Fraction(0.2)).unwrap();
        // 100 + 2 - 3 - 4 = 95 samples, 19 validation
        assert_eq!(train.len(), 76 + 3 + 2 - 1);
        assert_eq!(valid.len(), 100 - (80 - 3));
        // validation targets start after the last training row
        let last_train_ts = *train.timestamps().last().unwrap();
        let first_valid_target = valid.timestamps()[window.n_lags()];
        assert!(first_valid_target > last_train_ts);
    }

    #[test]
    fn split_rejects_bad_sizes() {
        let window = WindowSpec::new(2, 1).unwrap();
        assert!(matches!(
            split_table(&table(20), window, ValidSize::Fraction(1.5)),
            Err(ForecastError::Configuration(_))
        ));
        assert!(matches!(
            split_table(&table(5), window, ValidSize::Count(10)),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn global_split_shares_threshold() {
        let window = WindowSpec::new(2, 1).unwrap();
        let a = SeriesTable::new(make_timestamps(0, 30), vec![1.0; 30]).unwrap();
        let b = SeriesTable::new(make_timestamps(5, 30), vec![2.0; 30]).unwrap();
        let collection = SeriesCollection::new().with_series("a", a).with_series("b", b);
        let (train, valid) =
            split_train_validation(&collection, window, ValidSize::Fraction(0.25), false).unwrap();

        // 35 pooled days, 33 samples, 8 for validation -> threshold on day 27
        let threshold = global_threshold(&collection, window, ValidSize::Fraction(0.25)).unwrap();
        assert_eq!(threshold, make_timestamps(27, 1)[0]);
        for id in ["a", "b"] {
            let t = train.get(id).unwrap();
            let v = valid.get(id).unwrap();
            assert!(t.timestamps().iter().all(|ts| *ts < threshold));
            assert_eq!(v.timestamps()[2], threshold);
        }
    }

    #[test]
    fn crossvalidation_folds_expand_towards_the_end() {
        let window = WindowSpec::new(2, 1).unwrap();
        let folds = crossvalidation_split(&table(50), window, FoldConfig::new(3, 0.1)).unwrap();
        assert_eq!(folds.len(), 3);
        // 50 + 2 - 2 - 2 = 48 samples, 4 per fold
        let train_lens: Vec<usize> = folds.iter().map(|(t, _)| t.len()).collect();
        assert!(train_lens.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(folds[2].1.timestamps().last(), table(50).timestamps().last());
        assert_eq!(folds[2].1.len(), 4 + 2);
    }

    #[test]
    fn crossvalidation_requires_enough_training_samples() {
        let window = WindowSpec::new(2, 1).unwrap();
        let err = crossvalidation_split(&table(20), window, FoldConfig::new(6, 0.2)).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { .. }));
        assert!(crossvalidation_split(&table(50), window, FoldConfig::new(3, 0.1).with_overlap(1.0)).is_err());
    }
}
