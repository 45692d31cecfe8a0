//! Forecaster session: configure, fit, predict.
//!
//! [`Forecaster`] owns the configuration and the model factory. `fit`
//! consumes it and returns a [`FittedForecaster`], so the configuration
//! can no longer change once a model has been trained on it.

use crate::config::{CovariateConfig, EventConfig, ForecasterConfig, RegressorConfig};
use crate::core::{infer_collection_frequency, ForecastFrame, Frequency, SeriesCollection, SeriesTable};
use crate::error::{ForecastError, Result};
use crate::impute::{impute_collection, ImputeMode};
use crate::predict::{denormalize, forecast_origins, raw_frame, rescale_components, target_frame};
use crate::prepare::{
    check_collection, make_future, maybe_extend, prepare_to_predict, with_events, CheckOptions,
    DatasetBuilder, EventOccurrence, FutureInputs, HistoricPredictions, LagWindowBuilder,
    NormalizationStore, NormalizeMode, ShiftScale, WindowDataset,
};
use crate::train::{
    evaluate, BoxedModel, Components, DecompositionModel, EpochHook, MetricsTable, ModelContext,
    ModelFactory, Trainer,
};
use crate::utils::split::{self, FoldConfig, ValidSize};
use ndarray::{concatenate, Array2, Axis};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Rows passed to the model per forward call while predicting.
const PREDICT_CHUNK: usize = 1024;

/// Options for [`Forecaster::fit`].
#[derive(Default)]
pub struct FitOptions<'a> {
    /// Skip metrics and validation.
    pub minimal: bool,
    pub hook: Option<&'a mut dyn EpochHook>,
}

impl<'a> FitOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn minimal(mut self) -> Self {
        self.minimal = true;
        self
    }

    pub fn with_hook(mut self, hook: &'a mut dyn EpochHook) -> Self {
        self.hook = Some(hook);
        self
    }
}

/// Output layout of [`FittedForecaster::predict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictOptions {
    /// Include the per-component columns.
    pub decompose: bool,
    /// One row per forecast origin instead of one row per timestamp.
    pub raw: bool,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            decompose: true,
            raw: false,
        }
    }
}

/// Unfitted forecaster.
pub struct Forecaster {
    config: ForecasterConfig,
    factory: ModelFactory,
    dataset_builder: Arc<dyn DatasetBuilder>,
    highlight_step: Option<usize>,
}

impl std::fmt::Debug for Forecaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forecaster")
            .field("config", &self.config)
            .field("highlight_step", &self.highlight_step)
            .finish_non_exhaustive()
    }
}

impl Forecaster {
    pub fn new(config: ForecasterConfig, factory: ModelFactory) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            factory,
            dataset_builder: Arc::new(LagWindowBuilder),
            highlight_step: None,
        })
    }

    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    pub fn add_lagged_regressor(mut self, names: &[&str], config: CovariateConfig) -> Result<Self> {
        self.config = self.config.add_lagged_regressor(names, config)?;
        Ok(self)
    }

    pub fn add_future_regressor(mut self, name: &str, config: RegressorConfig) -> Result<Self> {
        self.config = self.config.add_future_regressor(name, config)?;
        Ok(self)
    }

    pub fn add_events(mut self, names: &[&str], config: EventConfig) -> Result<Self> {
        self.config = self.config.add_events(names, config)?;
        Ok(self)
    }

    pub fn add_country_holidays(mut self, country: &str, names: &[&str], config: EventConfig) -> Result<Self> {
        self.config = self.config.add_country_holidays(country, names, config)?;
        Ok(self)
    }

    pub fn add_seasonality(mut self, name: &str, period: f64, fourier_order: usize) -> Result<Self> {
        self.config = self.config.add_seasonality(name, period, fourier_order)?;
        Ok(self)
    }

    pub fn with_dataset_builder(mut self, builder: Arc<dyn DatasetBuilder>) -> Self {
        self.dataset_builder = builder;
        self
    }

    /// Report metrics for forecast step `step` only (1-based).
    pub fn with_highlight_step(mut self, step: usize) -> Result<Self> {
        if step == 0 || step > self.config.n_forecasts() {
            return Err(ForecastError::Configuration(format!(
                "highlight step must be in 1..={}, got {step}",
                self.config.n_forecasts()
            )));
        }
        self.highlight_step = Some(step);
        Ok(self)
    }

    /// Add the configured event columns to a table.
    pub fn with_events(&self, table: &SeriesTable, occurrences: &[EventOccurrence]) -> Result<SeriesTable> {
        with_events(table, occurrences, &self.config)
    }

    fn prepare_training(&self, data: SeriesCollection, freq: Option<Frequency>) -> Result<(SeriesCollection, Frequency)> {
        check_collection(&data, &self.config, CheckOptions::training())?;
        let freq = infer_collection_frequency(&data, freq)?;
        let imputed = impute_collection(data, &self.config, &freq, ImputeMode::Training)?;
        Ok((imputed, freq))
    }

    /// Train/validation split after checks and imputation.
    pub fn split(
        &self,
        data: SeriesCollection,
        freq: Option<Frequency>,
        valid: ValidSize,
        local_split: bool,
    ) -> Result<(SeriesCollection, SeriesCollection)> {
        let (imputed, _) = self.prepare_training(data, freq)?;
        split::split_train_validation(&imputed, self.config.window(), valid, local_split)
    }

    /// Cross-validation folds after checks and imputation.
    pub fn crossvalidation_split(
        &self,
        data: SeriesTable,
        freq: Option<Frequency>,
        folds: FoldConfig,
    ) -> Result<Vec<(SeriesTable, SeriesTable)>> {
        let (imputed, _) = self.prepare_training(SeriesCollection::single(data), freq)?;
        split::crossvalidation_split(&imputed.into_single()?, self.config.window(), folds)
    }

    pub fn fit(
        self,
        data: SeriesCollection,
        freq: Option<Frequency>,
        validation: Option<SeriesCollection>,
        options: FitOptions<'_>,
    ) -> Result<FittedForecaster> {
        let (imputed, freq) = self.prepare_training(data, freq)?;
        let store = NormalizationStore::fit(&imputed, &self.config)?;
        let prepared = store.normalize_collection(&imputed)?;
        let dataset = self.dataset_builder.build(&prepared, &self.config, false)?;
        if dataset.is_empty() {
            return Err(ForecastError::InsufficientData {
                needed: self.config.window().sample_span(),
                got: imputed.values().map(|t| t.len()).max().unwrap_or(0),
            });
        }
        info!(
            series = imputed.len(),
            samples = dataset.len(),
            freq = ?freq,
            "fitting forecaster"
        );

        let mut model = self.factory.create(&ModelContext::new(&self.config, dataset.len()))?;

        let validation = match validation {
            Some(_) if options.minimal => {
                warn!("validation is not supported in minimal mode; skipping validation");
                None
            }
            Some(v) => Some(self.validation_dataset(v, &freq, &store)?),
            None => None,
        };

        let metrics_scale = metrics_scale(&self.config, &store);
        let trainer = Trainer::new(&self.config)
            .with_metrics_scale(metrics_scale)
            .with_metrics_column(self.highlight_step.map(|k| k - 1))
            .minimal(options.minimal);
        let outcome = trainer.train(model.as_mut(), &dataset, validation.as_ref(), options.hook)?;
        debug!(
            epochs = outcome.epochs,
            batch_size = outcome.batch_size,
            learning_rate = outcome.learning_rate,
            "training finished"
        );

        Ok(FittedForecaster {
            config: self.config,
            model,
            store,
            freq,
            metrics: outcome.metrics,
            metrics_scale,
            dataset_builder: self.dataset_builder,
            highlight_step: self.highlight_step,
        })
    }

    fn validation_dataset(
        &self,
        data: SeriesCollection,
        freq: &Frequency,
        store: &NormalizationStore,
    ) -> Result<WindowDataset> {
        check_collection(&data, &self.config, CheckOptions::training())?;
        let imputed = impute_collection(data, &self.config, freq, ImputeMode::Training)?;
        let prepared = store.normalize_collection(&imputed)?;
        self.dataset_builder.build(&prepared, &self.config, false)
    }
}

/// Metrics are reported on the original scale only when one set of
/// target parameters covers all series.
fn metrics_scale(config: &ForecasterConfig, store: &NormalizationStore) -> Option<ShiftScale> {
    if config.normalization.mode == NormalizeMode::Off {
        return None;
    }
    if store.is_global() {
        Some(store.global_params().y)
    } else {
        if config.collects_metrics() {
            warn!("local normalization: metrics are reported in the normalized scale");
        }
        None
    }
}

/// A trained forecaster.
pub struct FittedForecaster {
    config: ForecasterConfig,
    model: BoxedModel,
    store: NormalizationStore,
    freq: Frequency,
    metrics: MetricsTable,
    metrics_scale: Option<ShiftScale>,
    dataset_builder: Arc<dyn DatasetBuilder>,
    highlight_step: Option<usize>,
}

impl std::fmt::Debug for FittedForecaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FittedForecaster")
            .field("model", &self.model.name())
            .field("freq", &self.freq)
            .field("epochs", &self.metrics.n_rows())
            .finish_non_exhaustive()
    }
}

impl FittedForecaster {
    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    pub fn model(&self) -> &dyn DecompositionModel {
        self.model.as_ref()
    }

    pub fn frequency(&self) -> &Frequency {
        &self.freq
    }

    /// One row per training epoch.
    pub fn metrics(&self) -> &MetricsTable {
        &self.metrics
    }

    pub fn normalization(&self) -> &NormalizationStore {
        &self.store
    }

    pub fn highlight_step(&self) -> Option<usize> {
        self.highlight_step
    }

    pub fn with_events(&self, table: &SeriesTable, occurrences: &[EventOccurrence]) -> Result<SeriesTable> {
        with_events(table, occurrences, &self.config)
    }

    /// Tables to pass to [`predict`](Self::predict) for forecasting past
    /// the end of `data`.
    pub fn make_future(
        &self,
        data: SeriesCollection,
        future: &FutureInputs,
        periods: Option<usize>,
        historic: HistoricPredictions,
    ) -> Result<SeriesCollection> {
        let prepared = prepare_to_predict(data, &self.config, &self.freq)?;
        prepared.try_map(|_, table| make_future(&table, &self.config, &self.freq, future, periods, historic))
    }

    pub fn predict(
        &self,
        data: SeriesCollection,
        options: PredictOptions,
    ) -> Result<SeriesCollection<ForecastFrame>> {
        let data = prepare_to_predict(data, &self.config, &self.freq)?;
        let (extended, added) = maybe_extend(data, &self.config, &self.freq)?;
        extended.try_map(|id, table| {
            let periods_added = added.get(id).copied().unwrap_or(0);
            self.predict_table(id, &table, periods_added, options)
        })
    }

    fn predict_table(
        &self,
        id: &str,
        table: &SeriesTable,
        periods_added: usize,
        options: PredictOptions,
    ) -> Result<ForecastFrame> {
        let window = self.config.window();
        let mut prepared = BTreeMap::new();
        prepared.insert(id.to_string(), self.store.normalize(id, table)?);
        let dataset = self.dataset_builder.build(&prepared, &self.config, true)?;
        if dataset.is_empty() {
            return Err(ForecastError::InsufficientData {
                needed: window.sample_span(),
                got: table.len(),
            });
        }

        let (predicted, components) = self.forward_chunked(&dataset, options.decompose)?;
        let params = self.store.data_params_for(id)?.y;
        let predicted = denormalize(&predicted, &params);
        let components = components.map(|c| rescale_components(&c, &params, &self.config));

        if options.raw {
            let origins = forecast_origins(table.timestamps(), window);
            let frame = raw_frame(origins, &predicted, components.as_ref(), window.n_forecasts())?;
            Ok(if periods_added > 0 { frame.drop_tail(1) } else { frame })
        } else {
            let frame = target_frame(table, &predicted, components.as_ref(), window)?;
            Ok(frame.drop_tail(periods_added))
        }
    }

    fn forward_chunked(&self, dataset: &WindowDataset, decompose: bool) -> Result<(Array2<f64>, Option<Components>)> {
        let mut predicted = Vec::new();
        let mut parts: BTreeMap<String, Vec<Array2<f64>>> = BTreeMap::new();
        for batch in dataset.batches(PREDICT_CHUNK, None) {
            predicted.push(self.model.forward(&batch.inputs)?);
            if decompose {
                for (name, values) in self.model.compute_components(&batch.inputs)? {
                    parts.entry(name).or_default().push(values);
                }
            }
        }
        let predicted = stack_rows(&predicted)?;
        let components = if decompose {
            Some(
                parts
                    .into_iter()
                    .map(|(name, chunks)| Ok((name, stack_rows(&chunks)?)))
                    .collect::<Result<Components>>()?,
            )
        } else {
            None
        };
        Ok((predicted, components))
    }

    /// Metrics of the fitted model on held-out data, one row.
    pub fn test(&self, data: SeriesCollection) -> Result<MetricsTable> {
        if !self.config.collects_metrics() {
            warn!("no metrics configured; nothing to test");
            return Ok(MetricsTable::new());
        }
        check_collection(&data, &self.config, CheckOptions::training())?;
        let imputed = impute_collection(data, &self.config, &self.freq, ImputeMode::Training)?;
        let prepared = self.store.normalize_collection(&imputed)?;
        let dataset = self.dataset_builder.build(&prepared, &self.config, false)?;
        if dataset.is_empty() {
            return Err(ForecastError::InsufficientData {
                needed: self.config.window().sample_span(),
                got: imputed.values().map(|t| t.len()).max().unwrap_or(0),
            });
        }

        let mut metrics = Trainer::new(&self.config)
            .with_metrics_scale(self.metrics_scale)
            .with_metrics_column(self.highlight_step.map(|k| k - 1))
            .metrics_collection(&[]);
        let row = evaluate(self.model.as_ref(), &dataset, &mut metrics, PREDICT_CHUNK)?;
        info!(metrics = ?row, "test metrics");
        Ok(metrics.into_stored())
    }
}

fn stack_rows(chunks: &[Array2<f64>]) -> Result<Array2<f64>> {
    let views: Vec<_> = chunks.iter().map(|c| c.view()).collect();
    concatenate(Axis(0), &views).map_err(|e| ForecastError::ComputationError(e.to_string()))
}
