//! Driver and handle traits shared by every raster backend.
//!
//! A [`RasterDriver`] turns a locator (a file path or a subdataset
//! reference) into an open [`RasterHandle`]. Handles own their native
//! resources and release them when dropped, so a handle never outlives the
//! scope that opened it.

use std::collections::BTreeMap;

use ndarray::{s, Array3, ArrayD, ArrayView3};
use raster_common::{GeoTransform, PixelWindow};
use serde::{Deserialize, Serialize};

use crate::error::ReaderResult;

/// Key/value metadata attached to a dataset or band.
pub type Tags = BTreeMap<String, String>;

/// Decoded pixels. Backends return `(bands, rows, cols)`.
pub type RasterBuffer = ArrayD<f32>;

/// Opens rasters by locator.
pub trait RasterDriver: Send + Sync {
    /// Short driver name for logs.
    fn name(&self) -> &'static str;

    /// Open a file or subdataset reference.
    fn open(&self, locator: &str) -> ReaderResult<Box<dyn RasterHandle>>;
}

/// An open raster. Dropping the handle closes it.
pub trait RasterHandle: Send {
    /// The locator this handle was opened from.
    fn locator(&self) -> &str;

    /// Metadata dictionary of the dataset.
    fn tags(&self) -> Tags;

    /// Raster size as `(height, width)`.
    fn dimensions(&self) -> (usize, usize);

    /// Number of bands the dataset exposes. Containers report zero.
    fn band_count(&self) -> usize;

    /// Affine transform of the full-resolution raster.
    fn geotransform(&self) -> GeoTransform;

    /// Subdataset locators exposed by a container, in discovery order.
    fn subdatasets(&self) -> Vec<String> {
        Vec::new()
    }

    /// Read pixels into a `(bands, rows, cols)` buffer.
    fn read(&mut self, request: &ReadRequest) -> ReaderResult<RasterBuffer>;
}

/// Optional sub-window and output buffer size for a read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRequest {
    pub window: Option<PixelWindow>,
    pub out_width: Option<usize>,
    pub out_height: Option<usize>,
}

impl ReadRequest {
    /// Read the whole raster at native resolution.
    pub fn full() -> Self {
        Self::default()
    }

    pub fn with_window(mut self, window: PixelWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_buffer_size(mut self, out_height: usize, out_width: usize) -> Self {
        self.out_height = Some(out_height);
        self.out_width = Some(out_width);
        self
    }

    /// True when the request reads everything at native resolution.
    pub fn is_full(&self) -> bool {
        self.window.is_none() && self.out_width.is_none() && self.out_height.is_none()
    }

    /// Resolve against a `height` x `width` raster.
    ///
    /// Returns the effective window and `(out_height, out_width)`. A missing
    /// buffer dimension defaults to the window extent along that axis.
    pub fn resolve(
        &self,
        height: usize,
        width: usize,
    ) -> ReaderResult<(PixelWindow, usize, usize)> {
        let window = self.window.unwrap_or_else(|| PixelWindow::full(height, width));
        window.check_within(height, width)?;
        let out_height = self.out_height.unwrap_or_else(|| window.height());
        let out_width = self.out_width.unwrap_or_else(|| window.width());
        if out_height == 0 || out_width == 0 {
            return Err(raster_common::GeoError::InvalidWindow {
                rows: (0, out_height),
                cols: (0, out_width),
                height,
                width,
            }
            .into());
        }
        Ok((window, out_height, out_width))
    }

    /// Geotransform of the buffer this request produces.
    pub fn geotransform_for(
        &self,
        native: &GeoTransform,
        height: usize,
        width: usize,
    ) -> ReaderResult<GeoTransform> {
        let (window, out_height, out_width) = self.resolve(height, width)?;
        Ok(native.for_read(&window, out_height, out_width))
    }
}

/// Cut `window` out of every band and resample it to the output size.
///
/// Resampling is nearest-neighbour on pixel centers, which is what a
/// decimated overview read does.
pub fn extract_window(
    bands: ArrayView3<'_, f32>,
    window: &PixelWindow,
    out_height: usize,
    out_width: usize,
) -> Array3<f32> {
    let sub = bands.slice(s![.., window.rows.0..window.rows.1, window.cols.0..window.cols.1]);
    let (n_bands, win_h, win_w) = sub.dim();
    if win_h == out_height && win_w == out_width {
        return sub.to_owned();
    }

    let row_index: Vec<usize> = (0..out_height)
        .map(|i| nearest_source(i, win_h, out_height))
        .collect();
    let col_index: Vec<usize> = (0..out_width)
        .map(|j| nearest_source(j, win_w, out_width))
        .collect();

    Array3::from_shape_fn((n_bands, out_height, out_width), |(b, i, j)| {
        sub[[b, row_index[i], col_index[j]]]
    })
}

#[inline]
fn nearest_source(out_index: usize, source_len: usize, out_len: usize) -> usize {
    let pos = (out_index as f64 + 0.5) * source_len as f64 / out_len as f64;
    (pos.floor() as usize).min(source_len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn ramp(height: usize, width: usize) -> Array3<f32> {
        Array3::from_shape_fn((1, height, width), |(_, r, c)| (c * 1000 + r) as f32)
    }

    #[test]
    fn test_resolve_defaults() {
        let (window, h, w) = ReadRequest::full().resolve(4, 6).unwrap();
        assert_eq!(window, PixelWindow::full(4, 6));
        assert_eq!((h, w), (4, 6));

        let request = ReadRequest::full().with_window(PixelWindow::new((1, 3), (2, 6)));
        let (_, h, w) = request.resolve(4, 6).unwrap();
        assert_eq!((h, w), (2, 4));
    }

    #[test]
    fn test_resolve_rejects_bad_window() {
        let request = ReadRequest::full().with_window(PixelWindow::new((0, 5), (0, 2)));
        assert!(request.resolve(4, 6).is_err());
    }

    #[test]
    fn test_extract_window_native() {
        let data = ramp(4, 6);
        let window = PixelWindow::new((1, 3), (2, 5));
        let out = extract_window(data.view(), &window, 2, 3);
        assert_eq!(out.dim(), (1, 2, 3));
        assert_eq!(out[[0, 0, 0]], 2001.0);
        assert_eq!(out[[0, 1, 2]], 4002.0);
    }

    #[test]
    fn test_extract_window_decimated() {
        let data = ramp(4, 8);
        let out = extract_window(data.view(), &PixelWindow::full(4, 8), 2, 4);
        assert_eq!(out.dim(), (1, 2, 4));
        // Nearest source pixel for output (i, j) is (2i + 1, 2j + 1).
        assert_eq!(out[[0, 0, 0]], 1001.0);
        assert_eq!(out[[0, 1, 3]], 7003.0);
    }

    #[test]
    fn test_geotransform_for_request() {
        let native = GeoTransform::from_gdal([0.0, 1.0, 0.0, 10.0, 0.0, -1.0]);
        let request = ReadRequest::full()
            .with_window(PixelWindow::new((2, 6), (4, 8)))
            .with_buffer_size(2, 2);
        let gt = request.geotransform_for(&native, 10, 10).unwrap();
        assert_eq!(gt.to_gdal(), [4.0, 2.0, 0.0, 8.0, 0.0, -2.0]);
    }
}
