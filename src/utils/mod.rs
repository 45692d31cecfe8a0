//! Utility functions shared by the forecaster.

pub mod split;

pub use split::{crossvalidation_split, split_sizes, split_table, split_train_validation, FoldConfig, ValidSize};
