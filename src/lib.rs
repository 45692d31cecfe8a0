//! # anofox-decomp
//!
//! Orchestration engine for decomposable neural forecasting models.
//!
//! Takes raw time series, checks and imputes them, normalizes, builds lag
//! windows, runs the training loop with scheduled regularization and
//! recency weighting, and reshapes predictions into per-origin or
//! per-target-step frames. The model itself is supplied by the caller
//! through [`train::DecompositionModel`] and [`train::ModelFactory`].

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod config;
pub mod core;
pub mod error;
pub mod forecaster;
pub mod impute;
pub mod predict;
pub mod prepare;
pub mod train;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::config::{
        ComponentMode, CovariateConfig, EventConfig, ForecasterConfig, ImputationPolicy,
        NormalizationConfig, ProgressMode, RegressorConfig, TrainConfig, TrendConfig,
        TrendThreshold, WindowSpec,
    };
    pub use crate::core::{ForecastFrame, Frequency, SeriesCollection, SeriesTable};
    pub use crate::error::{ErrorKind, ForecastError, Result};
    pub use crate::forecaster::{FitOptions, FittedForecaster, Forecaster, PredictOptions};
    pub use crate::prepare::{EventOccurrence, FutureInputs, HistoricPredictions, NormalizeMode};
    pub use crate::train::{
        Components, DecompositionModel, EpochReport, LossFunction, MetricKind, MetricsTable,
        ModelContext, ModelFactory, ModelWeights, WeightGradients,
    };
    pub use crate::utils::split::{FoldConfig, ValidSize};
}
