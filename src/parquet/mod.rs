//! Handles serialising and saving data to disk in the _parquet_ file format.

pub mod series;

pub use series::save_series;
