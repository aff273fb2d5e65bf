//! Error types for geometry operations.

use thiserror::Error;

/// Result type alias using GeoError.
pub type GeoResult<T> = Result<T, GeoError>;

/// Errors raised by geotransform and window arithmetic.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Geotransform has non-finite coefficient at index {index}: {value}")]
    NonFinite { index: usize, value: f64 },

    #[error("Invalid geotransform string: {0}. Expected six numbers")]
    InvalidFormat(String),

    #[error("Invalid number in geotransform: {0}")]
    InvalidNumber(String),

    #[error("Invalid window rows {rows:?} cols {cols:?} for raster of {height}x{width}")]
    InvalidWindow {
        rows: (usize, usize),
        cols: (usize, usize),
        height: usize,
        width: usize,
    },
}
