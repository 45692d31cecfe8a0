//! Mini-batch training loop.

use crate::config::{ForecasterConfig, ProgressMode};
use crate::error::{ForecastError, Result};
use crate::prepare::{ShiftScale, WindowDataset};
use crate::train::metrics::{MetricsCollection, MetricsTable};
use crate::train::model::DecompositionModel;
use crate::train::regularize::Regularizer;
use crate::train::schedule::{auto_batch_size, auto_epochs, reg_delay_weight, sample_weights};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

const DEFAULT_LEARNING_RATE: f64 = 1e-3;

/// Passed to an [`EpochHook`] once per finished epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport<'a> {
    /// Zero-based.
    pub epoch: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    /// Training and validation metrics of the epoch; empty when metrics
    /// are not collected.
    pub metrics: &'a [(String, f64)],
}

/// Progress callback.
pub trait EpochHook {
    fn on_epoch_end(&mut self, report: &EpochReport<'_>);
}

impl<F> EpochHook for F
where
    F: FnMut(&EpochReport<'_>),
{
    fn on_epoch_end(&mut self, report: &EpochReport<'_>) {
        self(report)
    }
}

/// Loop sizes actually used and the collected metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOutcome {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub metrics: MetricsTable,
}

/// Runs the training loop for one configuration.
#[derive(Debug, Clone)]
pub struct Trainer<'a> {
    config: &'a ForecasterConfig,
    regularizer: Regularizer,
    metrics_scale: Option<ShiftScale>,
    metrics_column: Option<usize>,
    minimal: bool,
}

impl<'a> Trainer<'a> {
    pub fn new(config: &'a ForecasterConfig) -> Self {
        Self {
            config,
            regularizer: Regularizer::new(config),
            metrics_scale: None,
            metrics_column: None,
            minimal: false,
        }
    }

    /// Report metrics on the original scale.
    pub fn with_metrics_scale(mut self, params: Option<ShiftScale>) -> Self {
        self.metrics_scale = params;
        self
    }

    /// Restrict batch metrics to one forecast step column (zero-based).
    pub fn with_metrics_column(mut self, column: Option<usize>) -> Self {
        self.metrics_column = column;
        self
    }

    /// Skip metrics and validation.
    pub fn minimal(mut self, minimal: bool) -> Self {
        self.minimal = minimal;
        self
    }

    fn collects_metrics(&self) -> bool {
        !self.minimal && self.config.collects_metrics()
    }

    /// Metrics collection configured like the one used in training, without
    /// value metrics.
    pub fn metrics_collection(&self, values: &[&str]) -> MetricsCollection {
        let mut metrics = MetricsCollection::new(&self.config.collect_metrics, values);
        if let Some(params) = self.metrics_scale {
            metrics = metrics.with_shift_scale(params);
        }
        if let Some(column) = self.metrics_column {
            metrics = metrics.with_specific_column(column);
        }
        metrics
    }

    /// Configured or derived `(epochs, batch_size)`.
    pub fn loop_sizes(&self, n_samples: usize) -> (usize, usize) {
        let train = &self.config.train;
        let batch_size = train.batch_size.unwrap_or_else(|| {
            let size = auto_batch_size(n_samples);
            info!(batch_size = size, "auto-set batch size");
            size
        });
        let epochs = train.epochs.unwrap_or_else(|| {
            let epochs = auto_epochs(n_samples);
            info!(epochs, "auto-set number of epochs");
            epochs
        });
        (epochs, batch_size)
    }

    pub fn train(
        &self,
        model: &mut dyn DecompositionModel,
        dataset: &WindowDataset,
        validation: Option<&WindowDataset>,
        mut hook: Option<&mut dyn EpochHook>,
    ) -> Result<TrainOutcome> {
        if dataset.is_empty() {
            return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
        }
        let train = &self.config.train;
        let (epochs, batch_size) = self.loop_sizes(dataset.len());
        let learning_rate = match train.learning_rate {
            Some(lr) => lr,
            None => {
                let lr = model
                    .find_learning_rate(dataset, train.loss)?
                    .filter(|lr| lr.is_finite() && *lr > 0.0)
                    .unwrap_or(DEFAULT_LEARNING_RATE);
                info!(learning_rate = lr, model = model.name(), "auto-set learning rate");
                lr
            }
        };

        let n_batches = dataset.n_batches(batch_size);
        let mut optimizer = train.optimizer.build();
        let mut schedule = train.schedule.build(learning_rate, epochs * n_batches);
        let mut rng = train.shuffle.then(|| StdRng::seed_from_u64(train.seed));

        let collect = self.collects_metrics();
        let validation = match validation {
            Some(_) if !collect => {
                warn!("validation requires metrics; skipping validation");
                None
            }
            Some(v) if v.is_empty() => {
                warn!("validation set has no samples; skipping validation");
                None
            }
            other => other,
        };
        let mut metrics = self.metrics_collection(&["Loss", "RegLoss"]);
        let mut val_metrics = metrics.new_like();

        debug!(
            samples = dataset.len(),
            epochs,
            batch_size,
            learning_rate,
            model = model.name(),
            "starting training"
        );

        for epoch in 0..epochs {
            for (i, batch) in dataset.batches(batch_size, rng.as_mut()).enumerate() {
                let predicted = model.forward(&batch.inputs)?;
                if predicted.dim() != batch.targets.dim() {
                    return Err(ForecastError::DimensionMismatch {
                        expected: batch.targets.len(),
                        got: predicted.len(),
                    });
                }
                let elementwise = train.loss.elementwise(&predicted, &batch.targets);
                let weights = sample_weights(
                    &batch.inputs.time,
                    train.newer_samples_weight,
                    train.newer_samples_start,
                );
                let n = elementwise.len().max(1) as f64;
                let data_loss = (&elementwise * &weights).sum() / n;

                let delay = reg_delay_weight(
                    epoch,
                    i as f64 / n_batches as f64,
                    epochs,
                    train.reg_delay_start,
                    train.reg_delay_full,
                );
                let reg = self.regularizer.compute(&model.weights(), delay);
                let loss = data_loss + reg.value;
                if !loss.is_finite() {
                    return Err(ForecastError::ComputationError(format!(
                        "non-finite loss {loss} in epoch {epoch}, batch {i}"
                    )));
                }

                let d_predicted: Array2<f64> = train.loss.gradient(&predicted, &batch.targets) * &weights / n;
                model.zero_grad();
                model.backward(&batch.inputs, &d_predicted, &reg.gradients)?;
                let lr = schedule.learning_rate();
                {
                    let (params, grads) = model.parameters_and_gradients();
                    if params.len() != grads.len() {
                        return Err(ForecastError::DimensionMismatch {
                            expected: params.len(),
                            got: grads.len(),
                        });
                    }
                    optimizer.step(params, grads, lr);
                }
                schedule.step();

                if collect {
                    metrics.update(
                        &predicted,
                        &batch.targets,
                        &[("Loss", loss), ("RegLoss", reg.value)],
                    )?;
                }
            }

            let mut row = Vec::new();
            if collect {
                row = metrics.compute(true);
                if let Some(val) = validation {
                    let val_row = evaluate(model, val, &mut val_metrics, batch_size)?;
                    row.extend(val_row.into_iter().map(|(k, v)| (format!("{k}_val"), v)));
                }
            }
            let report = EpochReport {
                epoch,
                epochs,
                learning_rate: schedule.learning_rate(),
                metrics: &row,
            };
            if self.config.progress == ProgressMode::Log {
                info!(epoch = epoch + 1, epochs, metrics = ?row, "epoch finished");
            }
            if let Some(hook) = hook.as_mut() {
                hook.on_epoch_end(&report);
            }
        }

        let metrics = if collect {
            metrics.into_stored().merge(val_metrics.stored(), "_val")?
        } else {
            MetricsTable::new()
        };
        Ok(TrainOutcome {
            epochs,
            batch_size,
            learning_rate,
            metrics,
        })
    }
}

/// Forward-only pass over `dataset`, accumulating into `metrics` and
/// storing one row.
pub fn evaluate(
    model: &dyn DecompositionModel,
    dataset: &WindowDataset,
    metrics: &mut MetricsCollection,
    batch_size: usize,
) -> Result<Vec<(String, f64)>> {
    for batch in dataset.batches(batch_size, None) {
        let predicted = model.forward(&batch.inputs)?;
        metrics.update(&predicted, &batch.targets, &[])?;
    }
    Ok(metrics.compute(true))
}
