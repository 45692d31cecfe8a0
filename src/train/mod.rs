//! Training: model interface, losses, optimizers, schedules and metrics.

pub mod loss;
pub mod metrics;
pub mod model;
pub mod optim;
pub mod regularize;
pub mod schedule;
pub mod trainer;

pub use loss::LossFunction;
pub use metrics::{MetricKind, MetricsCollection, MetricsTable};
pub use model::{
    BoxedModel, Components, DecompositionModel, ModelContext, ModelFactory, ModelWeights,
    WeightGradients,
};
pub use optim::{AdamW, Constant, LrSchedule, OneCycle, Optimizer, OptimizerKind, ScheduleKind, Sgd};
pub use regularize::{penalize_nonzero, RegularizationTerm, Regularizer};
pub use schedule::{auto_batch_size, auto_epochs, reg_delay_weight, sample_weight, sample_weights};
pub use trainer::{evaluate, EpochHook, EpochReport, TrainOutcome, Trainer};
