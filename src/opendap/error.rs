//! Error types for remote dataset access.

use thiserror::Error;

pub type DapResult<T> = Result<T, DapError>;

#[derive(Error, Debug)]
pub enum DapError {
    /// Failure inside libnetcdf, including its DAP client
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    /// Variable absent from the dataset
    #[error("Missing variable: {0}")]
    MissingVariable(String),

    /// Attribute absent or of the wrong type
    #[error("Missing attribute {attribute} on {variable}")]
    MissingAttribute { variable: String, attribute: String },

    /// Values that do not fit the expected layout
    #[error("Malformed dataset: {0}")]
    Malformed(String),

    /// No coordinate value inside the requested range
    #[error("No {coordinate} values between {min} and {max}")]
    EmptySelection {
        coordinate: String,
        min: String,
        max: String,
    },
}
