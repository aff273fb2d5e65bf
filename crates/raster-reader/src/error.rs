//! Error types for raster drivers.

use raster_common::GeoError;
use thiserror::Error;

/// Result type for raster driver operations.
pub type ReaderResult<T> = Result<T, ReaderError>;

/// Errors raised while opening or reading a raster.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// The backend could not open the locator.
    #[error("failed to open {locator}: {reason}")]
    OpenFailed { locator: String, reason: String },

    /// The handle was open but pixel data could not be read.
    #[error("failed to read {locator}: {reason}")]
    ReadFailed { locator: String, reason: String },

    /// No compiled-in driver understands this locator.
    #[error("unsupported raster format: {0}")]
    UnsupportedFormat(String),

    /// Window or buffer size is not valid for the raster.
    #[error("invalid read request: {0}")]
    InvalidRequest(#[from] GeoError),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReaderError {
    /// Create an OpenFailed error.
    pub fn open_failed(locator: impl Into<String>, reason: impl ToString) -> Self {
        Self::OpenFailed {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a ReadFailed error.
    pub fn read_failed(locator: impl Into<String>, reason: impl ToString) -> Self {
        Self::ReadFailed {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }
}
