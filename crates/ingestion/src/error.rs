//! Error types for the ingestion crate.

use raster_reader::ReaderError;
use thiserror::Error;

/// Errors that can occur during ingestion.
///
/// Every variant is fatal to the call that raised it. Nothing is retried and
/// no partial store is returned.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to open {locator}: {reason}")]
    Open { locator: String, reason: String },

    #[error("Failed to read {locator}: {reason}")]
    Read { locator: String, reason: String },

    #[error("Unsupported layout in {locator}: {reason}")]
    UnsupportedLayout { locator: String, reason: String },

    #[error(
        "Failed to find all bands specified by band specs {requested:?}: found {found} of {}",
        .requested.len()
    )]
    BandMatch { requested: Vec<String>, found: usize },

    #[error("Band spec {name} matched both {first} and {second}")]
    DuplicateMatch {
        name: String,
        first: String,
        second: String,
    },

    #[error("Cannot convert array of shape {0:?} to 2-D")]
    Shape(Vec<usize>),

    #[error("Band {band} is not on the grid of {reference}: {reason}")]
    GridMismatch {
        band: String,
        reference: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestionError {
    /// Create an Open error.
    pub fn open(locator: impl Into<String>, reason: impl ToString) -> Self {
        Self::Open {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a Read error.
    pub fn read(locator: impl Into<String>, reason: impl ToString) -> Self {
        Self::Read {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }

    /// Map a driver error raised while opening or inspecting `locator`.
    pub fn reader_open(locator: &str, err: ReaderError) -> Self {
        match err {
            ReaderError::OpenFailed { reason, .. } | ReaderError::ReadFailed { reason, .. } => {
                Self::open(locator, reason)
            }
            other => Self::open(locator, other),
        }
    }

    /// Map a driver error raised while reading pixels from `locator`.
    pub fn reader_read(locator: &str, err: ReaderError) -> Self {
        match err {
            ReaderError::OpenFailed { reason, .. } | ReaderError::ReadFailed { reason, .. } => {
                Self::read(locator, reason)
            }
            other => Self::read(locator, other),
        }
    }

    /// Create an UnsupportedLayout error.
    pub fn unsupported_layout(locator: impl Into<String>, reason: impl ToString) -> Self {
        Self::UnsupportedLayout {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
