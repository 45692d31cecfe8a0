//! Decomposition model interface.
//!
//! The model itself is a collaborator: the training loop only needs a
//! forward pass, per-component outputs, read access to the regularized
//! weights and a flat parameter/gradient view for the optimizer.

use crate::config::{ForecasterConfig, Seasonality, WindowSpec};
use crate::error::Result;
use crate::prepare::{WindowDataset, WindowInputs};
use crate::train::loss::LossFunction;
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// Model outputs per named component (samples x n_forecasts).
///
/// Names follow `trend`, `season_<name>`, `ar`, `lagged_regressor_<name>`,
/// `future_regressor_<name>`, `event_<name>`, and aggregates such as
/// `events_additive` or `future_regressors_multiplicative`.
pub type Components = BTreeMap<String, Array2<f64>>;

/// The weights the regularization penalties act on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelWeights {
    /// Autoregression weights (n_forecasts x n_lags).
    pub ar: Option<Array2<f64>>,
    /// Trend rate changes at the changepoints.
    pub trend_deltas: Option<Array1<f64>>,
    /// Fourier coefficients per seasonality.
    pub seasonality: BTreeMap<String, Array1<f64>>,
    /// Coefficients per event or holiday (all window offsets).
    pub events: BTreeMap<String, Array1<f64>>,
    /// Coefficients per future regressor.
    pub regressors: BTreeMap<String, Array1<f64>>,
}

/// Gradients of a loss term with respect to [`ModelWeights`]. Absent
/// entries mean zero gradient.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightGradients {
    pub ar: Option<Array2<f64>>,
    pub trend_deltas: Option<Array1<f64>>,
    pub seasonality: BTreeMap<String, Array1<f64>>,
    pub events: BTreeMap<String, Array1<f64>>,
    pub regressors: BTreeMap<String, Array1<f64>>,
}

impl WeightGradients {
    pub fn is_empty(&self) -> bool {
        self.ar.is_none()
            && self.trend_deltas.is_none()
            && self.seasonality.is_empty()
            && self.events.is_empty()
            && self.regressors.is_empty()
    }
}

/// A trainable decomposition model.
pub trait DecompositionModel: Send {
    /// Predicted scaled targets (samples x n_forecasts).
    fn forward(&self, inputs: &WindowInputs) -> Result<Array2<f64>>;

    /// Per-component contributions, in the scaled space.
    fn compute_components(&self, inputs: &WindowInputs) -> Result<Components>;

    fn weights(&self) -> ModelWeights;

    /// Accumulate gradients given the loss gradient with respect to the
    /// prediction and the regularization gradient with respect to the
    /// weights.
    fn backward(
        &mut self,
        inputs: &WindowInputs,
        d_predicted: &Array2<f64>,
        d_weights: &WeightGradients,
    ) -> Result<()>;

    fn zero_grad(&mut self);

    /// Flat parameters and their accumulated gradients, same length.
    fn parameters_and_gradients(&mut self) -> (&mut [f64], &[f64]);

    /// Learning rate suggested by a range test, if the model supports one.
    fn find_learning_rate(&mut self, dataset: &WindowDataset, loss: LossFunction) -> Result<Option<f64>> {
        let _ = (dataset, loss);
        Ok(None)
    }

    fn name(&self) -> &str;
}

pub type BoxedModel = Box<dyn DecompositionModel>;

/// What a model factory needs to size the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelContext {
    pub window: WindowSpec,
    pub n_changepoints: usize,
    pub seasonalities: Vec<Seasonality>,
    pub covariates: Vec<String>,
    pub regressors: Vec<String>,
    /// Event and holiday names with their window offset count.
    pub events: Vec<(String, usize)>,
    pub n_samples: usize,
}

impl ModelContext {
    pub fn new(config: &ForecasterConfig, n_samples: usize) -> Self {
        Self {
            window: config.window(),
            n_changepoints: config.trend.n_changepoints,
            seasonalities: config.seasonality.seasonalities.clone(),
            covariates: config.covariates.keys().cloned().collect(),
            regressors: config.regressors.keys().cloned().collect(),
            events: config
                .all_events()
                .into_iter()
                .map(|(n, e)| (n.to_string(), e.offsets()))
                .collect(),
            n_samples,
        }
    }
}

/// Builds a fresh model for each fit.
pub struct ModelFactory {
    factory: Box<dyn Fn(&ModelContext) -> Result<BoxedModel> + Send + Sync>,
}

impl ModelFactory {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&ModelContext) -> Result<BoxedModel> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
        }
    }

    pub fn create(&self, context: &ModelContext) -> Result<BoxedModel> {
        (self.factory)(context)
    }
}

impl std::fmt::Debug for ModelFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelFactory").finish_non_exhaustive()
    }
}
