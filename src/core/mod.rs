//! Core data structures: series tables, collections, frequencies and output frames.

mod collection;
mod frame;
mod frequency;
mod series_table;

pub use collection::{SeriesCollection, SINGLE_SERIES_ID};
pub use frame::ForecastFrame;
pub use frequency::{infer_collection_frequency, Frequency};
pub use series_table::{
    is_missing, leading_missing, trailing_missing, SeriesTable, SeriesTableBuilder,
    NORMALIZED_COLUMNS,
};
