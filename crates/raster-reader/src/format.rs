//! Format detection and the file-dispatching driver.

use tracing::debug;

use crate::driver::{RasterDriver, RasterHandle};
use crate::error::{ReaderError, ReaderResult};
use crate::geotiff::TiffDriver;

/// Raster format detected from a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    /// GeoTIFF (single files in directory sources)
    GeoTiff,
    /// NetCDF / HDF container or one of its subdatasets
    NetCdf,
    /// Unknown format
    Unknown,
}

/// Detect format from a path or subdataset locator.
pub fn detect_format(locator: &str) -> RasterFormat {
    if locator.starts_with("NETCDF:") {
        return RasterFormat::NetCdf;
    }

    let lower = locator.to_lowercase();
    if lower.ends_with(".tif") || lower.ends_with(".tiff") {
        RasterFormat::GeoTiff
    } else if lower.ends_with(".nc")
        || lower.ends_with(".nc4")
        || lower.ends_with(".h5")
        || lower.ends_with(".hdf")
        || lower.ends_with(".he5")
    {
        RasterFormat::NetCdf
    } else {
        RasterFormat::Unknown
    }
}

/// Routes each locator to the driver for its format.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDriver;

impl FileDriver {
    pub fn new() -> Self {
        Self
    }
}

impl RasterDriver for FileDriver {
    fn name(&self) -> &'static str {
        "file"
    }

    fn open(&self, locator: &str) -> ReaderResult<Box<dyn RasterHandle>> {
        let format = detect_format(locator);
        debug!(locator = %locator, format = ?format, "Dispatching open");

        match format {
            RasterFormat::GeoTiff => TiffDriver::new().open(locator),
            #[cfg(feature = "netcdf")]
            RasterFormat::NetCdf => crate::native::NetcdfDriver::new().open(locator),
            #[cfg(not(feature = "netcdf"))]
            RasterFormat::NetCdf => Err(ReaderError::UnsupportedFormat(format!(
                "{locator} (built without the `netcdf` feature)"
            ))),
            RasterFormat::Unknown => Err(ReaderError::UnsupportedFormat(locator.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("scene/B04.TIF"), RasterFormat::GeoTiff);
        assert_eq!(detect_format("scene.tiff"), RasterFormat::GeoTiff);
        assert_eq!(detect_format("MOD09GA.hdf"), RasterFormat::NetCdf);
        assert_eq!(detect_format("NETCDF:\"a.nc\":band1"), RasterFormat::NetCdf);
        assert_eq!(detect_format("notes.txt"), RasterFormat::Unknown);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = FileDriver::new().open("notes.txt").err().unwrap();
        assert!(matches!(err, ReaderError::UnsupportedFormat(_)));
    }
}
