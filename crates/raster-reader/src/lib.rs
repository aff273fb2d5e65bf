//! Raster drivers for band ingestion.
//!
//! Decoding is hidden behind two traits: a [`RasterDriver`] opens a locator
//! and returns a boxed [`RasterHandle`], which reports metadata and reads
//! pixels. Handles release their native resources on drop.
//!
//! # Drivers
//!
//! - [`TiffDriver`]: GeoTIFF files via the pure-Rust `tiff` crate
//! - `NetcdfDriver`: NetCDF/HDF containers (feature `netcdf`, needs
//!   libnetcdf and libhdf5 on the system)
//! - [`MemoryDriver`]: in-memory datasets for tests and embedding
//! - [`FileDriver`]: picks one of the above from the locator

pub mod driver;
pub mod error;
pub mod format;
pub mod geotiff;
pub mod memory;
#[cfg(feature = "netcdf")]
pub mod native;

pub use driver::{
    extract_window, RasterBuffer, RasterDriver, RasterHandle, ReadRequest, Tags,
};
pub use error::{ReaderError, ReaderResult};
pub use format::{detect_format, FileDriver, RasterFormat};
pub use geotiff::{TiffDriver, TiffHandle};
pub use memory::{MemoryDataset, MemoryDriver};
#[cfg(feature = "netcdf")]
pub use native::{silence_hdf5_errors, NetcdfDriver};
