//! Error types for the anofox-decomp library.

use thiserror::Error;

/// Result type alias for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while preparing data, training or predicting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient rows for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid combination of settings.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Input data violates the expected contract.
    #[error("invalid data: {0}")]
    Data(String),

    /// A gap was too long to be imputed.
    #[error(
        "more than {bound} consecutive missing values encountered in column {column}: \
         {remaining} remain after imputation"
    )]
    IrreducibleGap {
        column: String,
        remaining: usize,
        bound: usize,
    },

    /// Future values of a regressor were not supplied.
    #[error("future values of regressor {name} not provided")]
    MissingFutureValues { name: String },

    /// Missing dates were found while imputation is disabled.
    #[error("{count} missing dates found; enable imputation or preprocess the data")]
    MissingDates { count: usize },

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Frequency inference failed.
    #[error("could not infer frequency: {0}")]
    FrequencyInference(String),

    /// Index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    /// Numerical fault, e.g. a non-finite training loss.
    #[error("computation error: {0}")]
    ComputationError(String),
}

/// Coarse error category a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Data,
    InsufficientData,
    Computation,
}

impl ForecastError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::EmptyData
            | Self::Data(_)
            | Self::IrreducibleGap { .. }
            | Self::MissingFutureValues { .. }
            | Self::MissingDates { .. }
            | Self::DimensionMismatch { .. }
            | Self::TimestampError(_)
            | Self::FrequencyInference(_) => ErrorKind::Data,
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::IndexOutOfBounds { .. } | Self::ComputationError(_) => ErrorKind::Computation,
        }
    }
}
