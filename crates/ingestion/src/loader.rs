//! Band array loading.

use ndarray::Array2;
use raster_common::GeoTransform;
use raster_reader::RasterDriver;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::canonical::to_2d;
use crate::error::{IngestionError, Result};
use crate::matcher::BandMatch;
use crate::metadata::{BandMetadata, SourceMetadata};

/// A band read into memory with its coordinate axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Band2D {
    /// Pixel values as `(rows, cols)`.
    pub values: Array2<f32>,
    /// Pixel-center Y coordinate of each row.
    pub y_coords: Vec<f64>,
    /// Pixel-center X coordinate of each column.
    pub x_coords: Vec<f64>,
    /// Band metadata with geotransform, bounds and read request filled in.
    pub metadata: BandMetadata,
}

impl Band2D {
    /// `(rows, cols)` of the values.
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn geotransform(&self) -> Option<GeoTransform> {
        self.metadata.geotransform
    }
}

/// How [`load_bands`] schedules reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Read bands concurrently.
    pub parallel: bool,
    /// Size of a dedicated read pool. `None` uses the global rayon pool.
    pub max_threads: Option<usize>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            max_threads: None,
        }
    }
}

/// Read every matched band, in match order.
///
/// Each band is opened, read and closed independently; the first failure
/// aborts the load and every handle is released by then.
pub fn load_bands(
    driver: &dyn RasterDriver,
    source: &SourceMetadata,
    matches: &[BandMatch],
    options: LoadOptions,
) -> Result<Vec<(String, Band2D)>> {
    info!(
        source = %source.name,
        bands = matches.len(),
        parallel = options.parallel,
        "Loading bands"
    );

    if !options.parallel || matches.len() < 2 {
        return matches.iter().map(|m| load_band(driver, m)).collect();
    }

    let read_all = || {
        matches
            .par_iter()
            .map(|m| load_band(driver, m))
            .collect::<Result<Vec<_>>>()
    };

    match options.max_threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("band-read-{i}"))
            .build()
            .map_err(|e| IngestionError::InvalidConfig(format!("read pool: {e}")))?
            .install(read_all),
        None => read_all(),
    }
}

/// Open, read and canonicalize one band.
pub fn load_band(driver: &dyn RasterDriver, band: &BandMatch) -> Result<(String, Band2D)> {
    let locator = band.metadata.source.as_str();
    let request = band.read_request();

    let (buffer, geotransform) = {
        let mut handle = driver
            .open(locator)
            .map_err(|e| IngestionError::reader_open(locator, e))?;
        let (height, width) = handle.dimensions();
        let geotransform = request
            .geotransform_for(&handle.geotransform(), height, width)
            .map_err(|e| IngestionError::reader_read(locator, e))?;
        let buffer = handle
            .read(&request)
            .map_err(|e| IngestionError::reader_read(locator, e))?;
        (buffer, geotransform)
    };

    let values = to_2d(buffer)?;
    let (rows, cols) = values.dim();
    let (x_coords, y_coords) = geotransform
        .coordinates(cols, rows)
        .map_err(|e| IngestionError::read(locator, e))?;
    let bounds = geotransform
        .bounds(cols, rows)
        .map_err(|e| IngestionError::read(locator, e))?;

    let mut metadata = band.metadata.clone();
    metadata.geotransform = Some(geotransform);
    metadata.bounds = Some(bounds);
    metadata.read = (!request.is_full()).then_some(request);

    debug!(
        band = %band.name,
        source = %locator,
        rows = rows,
        cols = cols,
        "Read band"
    );

    Ok((
        band.name.clone(),
        Band2D {
            values,
            y_coords,
            x_coords,
            metadata,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band_spec::BandSpec;
    use crate::matcher::match_bands;
    use crate::metadata::SourceKind;
    use ndarray::Array2;
    use raster_common::PixelWindow;
    use raster_reader::{MemoryDataset, MemoryDriver, Tags};

    const GT: [f64; 6] = [100.0, 10.0, 0.0, 500.0, 0.0, -10.0];

    fn setup() -> (MemoryDriver, SourceMetadata) {
        let values = |offset: f32| Array2::from_shape_fn((4, 6), move |(r, c)| offset + (c * 10 + r) as f32);
        let driver = MemoryDriver::new()
            .with(
                "red",
                MemoryDataset::raster(values(0.0), GeoTransform::from_gdal(GT)).with_tag("band", "red"),
            )
            .with(
                "nir",
                MemoryDataset::raster(values(100.0), GeoTransform::from_gdal(GT)).with_tag("band", "nir"),
            );
        let tags = |v: &str| Tags::from([("band".to_string(), v.to_string())]);
        let meta = SourceMetadata {
            name: "mem".into(),
            kind: SourceKind::Container,
            container_metadata: Tags::new(),
            bands: vec![
                BandMetadata::new("red", tags("red"), 4, 6),
                BandMetadata::new("nir", tags("nir"), 4, 6),
            ],
            height: 4,
            width: 6,
        };
        (driver, meta)
    }

    #[test]
    fn test_full_read() {
        let (driver, meta) = setup();
        let matches = match_bands(&meta.bands, None).unwrap();
        let bands = load_bands(&driver, &meta, &matches, LoadOptions::default()).unwrap();

        assert_eq!(bands.len(), 2);
        let (name, band) = &bands[1];
        assert_eq!(name, "band_1");
        assert_eq!(band.shape(), (4, 6));
        assert_eq!(band.values[[3, 5]], 153.0);
        assert_eq!(band.x_coords.first(), Some(&105.0));
        assert_eq!(band.y_coords.last(), Some(&465.0));
        assert_eq!(band.geotransform().unwrap().to_gdal(), GT);
        assert!(band.metadata.read.is_none());
        assert_eq!(driver.open_handles(), 0);
    }

    #[test]
    fn test_windowed_decimated_read() {
        let (driver, meta) = setup();
        let specs = [BandSpec::tag_equals("red", "band", "red")
            .with_window(PixelWindow::new((0, 4), (2, 6)))
            .with_buffer_size(2, 2)];
        let matches = match_bands(&meta.bands, Some(&specs)).unwrap();
        let (_, band) = load_band(&driver, &matches[0]).unwrap();

        assert_eq!(band.shape(), (2, 2));
        assert_eq!(
            band.geotransform().unwrap().to_gdal(),
            [120.0, 20.0, 0.0, 500.0, 0.0, -20.0]
        );
        assert_eq!(band.x_coords, vec![130.0, 150.0]);
        assert_eq!(band.y_coords, vec![490.0, 470.0]);
        assert!(band.metadata.read.is_some());
        // source pixel for output (0, 0) is (row 1, col 3)
        assert_eq!(band.values[[0, 0]], 31.0);
    }

    #[test]
    fn test_buffer_defaults_to_window_extent() {
        let (driver, meta) = setup();
        let specs = [BandSpec::tag_equals("red", "band", "red")
            .with_window(PixelWindow::new((1, 3), (0, 5)))];
        let matches = match_bands(&meta.bands, Some(&specs)).unwrap();
        let (_, band) = load_band(&driver, &matches[0]).unwrap();
        assert_eq!(band.shape(), (2, 5));
    }

    #[test]
    fn test_invalid_window_is_read_error() {
        let (driver, meta) = setup();
        let specs = [BandSpec::tag_equals("red", "band", "red")
            .with_window(PixelWindow::new((0, 10), (0, 2)))];
        let matches = match_bands(&meta.bands, Some(&specs)).unwrap();
        let err = load_bands(&driver, &meta, &matches, LoadOptions::default()).unwrap_err();
        assert!(matches!(err, IngestionError::Read { .. }));
        assert_eq!(driver.open_handles(), 0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (driver, meta) = setup();
        let matches = match_bands(&meta.bands, None).unwrap();
        let sequential = LoadOptions {
            parallel: false,
            max_threads: None,
        };
        let pooled = LoadOptions {
            parallel: true,
            max_threads: Some(2),
        };
        let a = load_bands(&driver, &meta, &matches, sequential).unwrap();
        let b = load_bands(&driver, &meta, &matches, pooled).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_failed_read_releases_handles() {
        let (driver, meta) = setup();
        driver.insert(
            "nir",
            MemoryDataset::raster(Array2::zeros((4, 6)), GeoTransform::from_gdal(GT))
                .with_failing_reads(),
        );
        let matches = match_bands(&meta.bands, None).unwrap();
        let err = load_bands(&driver, &meta, &matches, LoadOptions::default()).unwrap_err();
        assert!(matches!(err, IngestionError::Read { ref locator, .. } if locator == "nir"));
        assert_eq!(driver.open_handles(), 0);
    }
}
