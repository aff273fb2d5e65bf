//! Raster band ingestion library.
//!
//! Discovers the bands of a raster source, assigns them to caller-named
//! logical bands and reads them into aligned 2-D arrays with coordinate
//! axes.
//!
//! # Architecture
//!
//! - [`source`]: metadata loaders for container files and directories of
//!   single-band files
//! - [`matcher`]: first-match-wins assignment of physical bands to
//!   [`BandSpec`]s
//! - [`loader`]: windowed / decimated band reads, optionally in parallel
//! - [`store`]: the assembled [`GriddedStore`]
//! - [`Ingester`]: facade running the phases with one driver and config
//!
//! Pixel decoding lives behind the `raster-reader` driver traits.

pub mod band_spec;
pub mod canonical;
pub mod config;
pub mod error;
pub mod grid;
mod ingester;
pub mod loader;
pub mod matcher;
pub mod metadata;
pub mod source;
pub mod store;

// Re-exports
pub use band_spec::{BandSpec, BandSpecConfig, TagPredicate};
pub use canonical::to_2d;
pub use config::{BandPlan, ConfigOverlay, IngestConfig};
pub use error::{IngestionError, Result};
pub use grid::{check_grid, GridCheck};
pub use ingester::Ingester;
pub use loader::{load_band, load_bands, Band2D, LoadOptions};
pub use matcher::{default_band_name, match_bands, BandMatch};
pub use metadata::{BandMetadata, SourceKind, SourceLocator, SourceMetadata};
pub use source::{list_raster_files, load_container_meta, load_directory_meta};
pub use store::{assemble, BandSummary, GriddedStore, StoreAttrs, StoreSummary};
