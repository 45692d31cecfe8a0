//! Windowed samples and mini-batches.

use crate::config::ForecasterConfig;
use crate::error::{ForecastError, Result};
use crate::prepare::normalize::PreparedTable;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use tracing::debug;

/// Model inputs for a set of samples. Row `i` of every matrix belongs to
/// sample `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInputs {
    /// Normalized time of each target step (samples x n_forecasts).
    pub time: Array2<f64>,
    /// Scaled target lags (samples x n_lags), absent without lags.
    pub lags: Option<Array2<f64>>,
    /// Lagged covariates (samples x n_lags, or x 1 for last-value-only).
    pub covariates: BTreeMap<String, Array2<f64>>,
    /// Future regressors at the target steps (samples x n_forecasts).
    pub regressors: BTreeMap<String, Array2<f64>>,
    /// Event indicators at the target steps (samples x n_forecasts).
    pub events: BTreeMap<String, Array2<f64>>,
}

impl WindowInputs {
    pub fn len(&self) -> usize {
        self.time.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn select(&self, indices: &[usize]) -> WindowInputs {
        let pick = |m: &BTreeMap<String, Array2<f64>>| {
            m.iter()
                .map(|(k, v)| (k.clone(), v.select(Axis(0), indices)))
                .collect()
        };
        WindowInputs {
            time: self.time.select(Axis(0), indices),
            lags: self.lags.as_ref().map(|l| l.select(Axis(0), indices)),
            covariates: pick(&self.covariates),
            regressors: pick(&self.regressors),
            events: pick(&self.events),
        }
    }

    fn check_rows(&self, rows: usize) -> Result<()> {
        let all = std::iter::once(&self.time)
            .chain(self.lags.iter())
            .chain(self.covariates.values())
            .chain(self.regressors.values())
            .chain(self.events.values());
        for matrix in all {
            if matrix.nrows() != rows {
                return Err(ForecastError::DimensionMismatch {
                    expected: rows,
                    got: matrix.nrows(),
                });
            }
        }
        Ok(())
    }
}

/// One mini-batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: WindowInputs,
    /// Scaled targets (samples x n_forecasts); missing while predicting.
    pub targets: Array2<f64>,
    /// Series id of each sample.
    pub meta: Vec<String>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.targets.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// All samples of one preparation run.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDataset {
    inputs: WindowInputs,
    targets: Array2<f64>,
    meta: Vec<String>,
}

impl WindowDataset {
    pub fn new(inputs: WindowInputs, targets: Array2<f64>, meta: Vec<String>) -> Result<Self> {
        let rows = targets.nrows();
        inputs.check_rows(rows)?;
        if meta.len() != rows {
            return Err(ForecastError::DimensionMismatch {
                expected: rows,
                got: meta.len(),
            });
        }
        Ok(Self {
            inputs,
            targets,
            meta,
        })
    }

    pub fn len(&self) -> usize {
        self.targets.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn inputs(&self) -> &WindowInputs {
        &self.inputs
    }

    pub fn targets(&self) -> &Array2<f64> {
        &self.targets
    }

    pub fn n_batches(&self, batch_size: usize) -> usize {
        self.len().div_ceil(batch_size.max(1))
    }

    pub fn batch(&self, indices: &[usize]) -> Batch {
        Batch {
            inputs: self.inputs.select(indices),
            targets: self.targets.select(Axis(0), indices),
            meta: indices.iter().map(|&i| self.meta[i].clone()).collect(),
        }
    }

    /// A finite sequence of batches; shuffled when `rng` is given. Call
    /// again for the next epoch.
    pub fn batches(&self, batch_size: usize, rng: Option<&mut StdRng>) -> Batches<'_> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        if let Some(rng) = rng {
            order.shuffle(rng);
        }
        Batches {
            dataset: self,
            order,
            batch_size: batch_size.max(1),
            position: 0,
        }
    }
}

/// Iterator over the batches of a [`WindowDataset`].
#[derive(Debug)]
pub struct Batches<'a> {
    dataset: &'a WindowDataset,
    order: Vec<usize>,
    batch_size: usize,
    position: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.position >= self.order.len() {
            return None;
        }
        let end = (self.position + self.batch_size).min(self.order.len());
        let batch = self.dataset.batch(&self.order[self.position..end]);
        self.position = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.order.len() - self.position).div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches<'_> {}

/// Turns prepared tables into windowed samples.
pub trait DatasetBuilder: Send + Sync {
    /// In predict mode every origin becomes a sample, even with unknown
    /// targets; in training mode samples with a missing target are skipped.
    fn build(
        &self,
        tables: &BTreeMap<String, PreparedTable>,
        config: &ForecasterConfig,
        predict_mode: bool,
    ) -> Result<WindowDataset>;
}

/// Default builder: target lags, lagged covariates, and future regressors,
/// events and time at the target steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct LagWindowBuilder;

impl DatasetBuilder for LagWindowBuilder {
    fn build(
        &self,
        tables: &BTreeMap<String, PreparedTable>,
        config: &ForecasterConfig,
        predict_mode: bool,
    ) -> Result<WindowDataset> {
        let window = config.window();
        let n_lags = window.n_lags();
        let horizon = window.n_forecasts();
        let covariate_width = |name: &str| {
            if config.covariates.get(name).is_some_and(|c| c.only_last_value) {
                1
            } else {
                n_lags
            }
        };
        let event_names: Vec<&str> = config.all_events().into_iter().map(|(n, _)| n).collect();

        let mut time = Vec::new();
        let mut lags = Vec::new();
        let mut targets = Vec::new();
        let mut covariates: BTreeMap<&str, Vec<f64>> =
            config.covariates.keys().map(|k| (k.as_str(), Vec::new())).collect();
        let mut regressors: BTreeMap<&str, Vec<f64>> =
            config.regressors.keys().map(|k| (k.as_str(), Vec::new())).collect();
        let mut events: BTreeMap<&str, Vec<f64>> =
            event_names.iter().map(|k| (*k, Vec::new())).collect();
        let mut meta = Vec::new();
        let mut skipped = 0_usize;

        for (id, prepared) in tables {
            for s in 0..window.origins(prepared.len()) {
                let first = s + n_lags;
                let target = &prepared.y_scaled[first..first + horizon];
                if !predict_mode && target.iter().any(|v| !v.is_finite()) {
                    skipped += 1;
                    continue;
                }
                targets.extend_from_slice(target);
                time.extend_from_slice(&prepared.t[first..first + horizon]);
                lags.extend_from_slice(&prepared.y_scaled[s..first]);
                for (name, out) in covariates.iter_mut() {
                    let values = prepared.column(name)?;
                    out.extend_from_slice(&values[first - covariate_width(*name)..first]);
                }
                for (name, out) in regressors.iter_mut().chain(events.iter_mut()) {
                    let values = prepared.column(name)?;
                    out.extend_from_slice(&values[first..first + horizon]);
                }
                meta.push(id.clone());
            }
        }
        if skipped > 0 {
            debug!(samples = skipped, "skipped samples with missing targets");
        }

        let rows = meta.len();
        let shape = |data: Vec<f64>, cols: usize| {
            Array2::from_shape_vec((rows, cols), data)
                .map_err(|e| ForecastError::ComputationError(e.to_string()))
        };
        let into_matrices = |m: BTreeMap<&str, Vec<f64>>, width: &dyn Fn(&str) -> usize| {
            m.into_iter()
                .map(|(k, v)| Ok((k.to_string(), shape(v, width(k))?)))
                .collect::<Result<BTreeMap<_, _>>>()
        };

        let inputs = WindowInputs {
            time: shape(time, horizon)?,
            lags: if n_lags > 0 {
                Some(shape(lags, n_lags)?)
            } else {
                None
            },
            covariates: into_matrices(covariates, &covariate_width)?,
            regressors: into_matrices(regressors, &|_| horizon)?,
            events: into_matrices(events, &|_| horizon)?,
        };
        WindowDataset::new(inputs, shape(targets, horizon)?, meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CovariateConfig, RegressorConfig};
    use crate::core::{SeriesCollection, SeriesTable};
    use crate::prepare::normalize::NormalizationStore;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rand::SeedableRng;

    fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    fn prepare(config: &ForecasterConfig, table: SeriesTable) -> BTreeMap<String, PreparedTable> {
        let collection = SeriesCollection::single(table);
        let store = NormalizationStore::fit(&collection, config).unwrap();
        store.normalize_collection(&collection).unwrap()
    }

    #[test]
    fn lag_windows_have_expected_shapes() {
        let config = ForecasterConfig::default()
            .with_window(3, 2)
            .unwrap()
            .add_lagged_regressor(&["x"], CovariateConfig::default())
            .unwrap()
            .add_future_regressor("r", RegressorConfig::default())
            .unwrap();
        let n = 10;
        let table = SeriesTable::new(make_timestamps(n), (0..n).map(|i| i as f64).collect())
            .unwrap()
            .with_column("x", vec![1.0; n])
            .unwrap()
            .with_column("r", (0..n).map(|i| i as f64).collect())
            .unwrap();
        let dataset = LagWindowBuilder
            .build(&prepare(&config, table), &config, false)
            .unwrap();

        assert_eq!(dataset.len(), 6);
        let inputs = dataset.inputs();
        assert_eq!(inputs.time.dim(), (6, 2));
        assert_eq!(inputs.lags.as_ref().unwrap().dim(), (6, 3));
        assert_eq!(inputs.covariates["x"].dim(), (6, 3));
        assert_eq!(inputs.regressors["r"].dim(), (6, 2));
        // consecutive samples shift by one row
        let lags = inputs.lags.as_ref().unwrap();
        assert_eq!(lags[[1, 0]], lags[[0, 1]]);
        assert_eq!(dataset.targets()[[0, 0]], lags[[1, 2]]);
    }

    #[test]
    fn training_skips_missing_targets_but_predicting_keeps_them() {
        let config = ForecasterConfig::default().with_window(2, 1).unwrap();
        let mut y: Vec<f64> = (0..6).map(|i| i as f64).collect();
        y[5] = f64::NAN;
        let table = SeriesTable::new(make_timestamps(6), y).unwrap();
        let prepared = prepare(&config, table);
        assert_eq!(LagWindowBuilder.build(&prepared, &config, false).unwrap().len(), 3);
        assert_eq!(LagWindowBuilder.build(&prepared, &config, true).unwrap().len(), 4);
    }

    #[test]
    fn batches_cover_every_sample_once() {
        let config = ForecasterConfig::default();
        let table = SeriesTable::new(make_timestamps(10), vec![1.0; 10]).unwrap();
        let dataset = LagWindowBuilder
            .build(&prepare(&config, table), &config, false)
            .unwrap();
        assert!(dataset.inputs().lags.is_none());

        let mut rng = StdRng::seed_from_u64(7);
        let batches: Vec<Batch> = dataset.batches(4, Some(&mut rng)).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(dataset.n_batches(4), 3);
        let total: usize = batches.iter().map(|b| b.len()).sum();
        assert_eq!(total, 10);

        // restartable
        assert_eq!(dataset.batches(4, None).count(), 3);
    }

    #[test]
    fn dataset_rejects_mismatched_rows() {
        let inputs = WindowInputs {
            time: Array2::zeros((2, 1)),
            lags: None,
            covariates: BTreeMap::new(),
            regressors: BTreeMap::new(),
            events: BTreeMap::new(),
        };
        assert!(WindowDataset::new(inputs, Array2::zeros((3, 1)), vec![String::new(); 3]).is_err());
    }
}
