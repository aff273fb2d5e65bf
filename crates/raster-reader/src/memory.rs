//! In-memory driver.
//!
//! Datasets are registered under a locator and opened like files. The driver
//! counts live handles so callers can verify every handle was released.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use ndarray::{Array2, Array3, Axis};
use raster_common::GeoTransform;

use crate::driver::{extract_window, RasterBuffer, RasterDriver, RasterHandle, ReadRequest, Tags};
use crate::error::{ReaderError, ReaderResult};

/// A raster or container held in memory.
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    pub tags: Tags,
    pub geotransform: GeoTransform,
    /// Pixel data as `(bands, rows, cols)`. Empty for containers.
    pub bands: Array3<f32>,
    /// Child locators for containers.
    pub subdatasets: Vec<String>,
    /// Make every read fail, for exercising error paths.
    pub fail_reads: bool,
}

impl MemoryDataset {
    /// Single-band raster.
    pub fn raster(values: Array2<f32>, geotransform: GeoTransform) -> Self {
        Self::multiband(values.insert_axis(Axis(0)), geotransform)
    }

    /// Raster with any number of bands.
    pub fn multiband(bands: Array3<f32>, geotransform: GeoTransform) -> Self {
        Self {
            tags: Tags::new(),
            geotransform,
            bands,
            subdatasets: Vec::new(),
            fail_reads: false,
        }
    }

    /// Container exposing the given subdataset locators.
    pub fn container<I, S>(subdatasets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: Tags::new(),
            geotransform: GeoTransform::default(),
            bands: Array3::zeros((0, 0, 0)),
            subdatasets: subdatasets.into_iter().map(Into::into).collect(),
            fail_reads: false,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }
}

/// Registry of in-memory datasets keyed by locator.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    datasets: RwLock<HashMap<String, Arc<MemoryDataset>>>,
    open_handles: Arc<AtomicUsize>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a dataset.
    pub fn insert(&self, locator: impl Into<String>, dataset: MemoryDataset) {
        let mut datasets = self
            .datasets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        datasets.insert(locator.into(), Arc::new(dataset));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(self, locator: impl Into<String>, dataset: MemoryDataset) -> Self {
        self.insert(locator, dataset);
        self
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

impl RasterDriver for MemoryDriver {
    fn name(&self) -> &'static str {
        "MEM"
    }

    fn open(&self, locator: &str) -> ReaderResult<Box<dyn RasterHandle>> {
        let dataset = self
            .datasets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(locator)
            .cloned()
            .ok_or_else(|| ReaderError::open_failed(locator, "no such dataset"))?;

        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryHandle {
            locator: locator.to_string(),
            dataset,
            open_handles: Arc::clone(&self.open_handles),
        }))
    }
}

struct MemoryHandle {
    locator: String,
    dataset: Arc<MemoryDataset>,
    open_handles: Arc<AtomicUsize>,
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RasterHandle for MemoryHandle {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn tags(&self) -> Tags {
        self.dataset.tags.clone()
    }

    fn dimensions(&self) -> (usize, usize) {
        let (_, height, width) = self.dataset.bands.dim();
        (height, width)
    }

    fn band_count(&self) -> usize {
        self.dataset.bands.len_of(Axis(0))
    }

    fn geotransform(&self) -> GeoTransform {
        self.dataset.geotransform
    }

    fn subdatasets(&self) -> Vec<String> {
        self.dataset.subdatasets.clone()
    }

    fn read(&mut self, request: &ReadRequest) -> ReaderResult<RasterBuffer> {
        if self.dataset.fail_reads {
            return Err(ReaderError::read_failed(&self.locator, "simulated read failure"));
        }
        if self.band_count() == 0 {
            return Err(ReaderError::read_failed(&self.locator, "dataset has no bands"));
        }
        let (height, width) = self.dimensions();
        let (window, out_height, out_width) = request.resolve(height, width)?;
        Ok(extract_window(self.dataset.bands.view(), &window, out_height, out_width).into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> MemoryDriver {
        let values = Array2::from_shape_fn((3, 4), |(r, c)| (r * 10 + c) as f32);
        MemoryDriver::new()
            .with(
                "mem://a",
                MemoryDataset::raster(values, GeoTransform::default()).with_tag("band", "red"),
            )
            .with("mem://c", MemoryDataset::container(["mem://a"]))
    }

    #[test]
    fn test_open_and_read() {
        let driver = driver();
        let mut handle = driver.open("mem://a").unwrap();
        assert_eq!(handle.dimensions(), (3, 4));
        assert_eq!(handle.band_count(), 1);
        assert_eq!(handle.tags()["band"], "red");

        let buffer = handle.read(&ReadRequest::full()).unwrap();
        assert_eq!(buffer.shape(), &[1, 3, 4]);
        assert_eq!(buffer[[0, 2, 3]], 23.0);
    }

    #[test]
    fn test_handles_released_on_drop() {
        let driver = driver();
        {
            let _a = driver.open("mem://a").unwrap();
            let _c = driver.open("mem://c").unwrap();
            assert_eq!(driver.open_handles(), 2);
        }
        assert_eq!(driver.open_handles(), 0);
    }

    #[test]
    fn test_container_has_no_pixels() {
        let driver = driver();
        let mut handle = driver.open("mem://c").unwrap();
        assert_eq!(handle.subdatasets(), vec!["mem://a".to_string()]);
        assert_eq!(handle.band_count(), 0);
        assert!(handle.read(&ReadRequest::full()).is_err());
    }

    #[test]
    fn test_unknown_locator() {
        let err = driver().open("mem://missing").err().unwrap();
        assert!(matches!(err, ReaderError::OpenFailed { .. }));
    }
}
