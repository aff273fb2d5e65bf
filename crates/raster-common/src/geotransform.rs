//! Affine geotransforms and the coordinate axes derived from them.
//!
//! Coefficients follow the GDAL ordering:
//!
//! ```text
//! world_x = gt[0] + col * gt[1] + row * gt[2]
//! world_y = gt[3] + col * gt[4] + row * gt[5]
//! ```
//!
//! `col`/`row` are pixel-edge positions, so pixel centers sit at `+0.5`.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{GeoError, GeoResult};
use crate::window::PixelWindow;

/// Six-coefficient affine mapping from pixel space to world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// World X of the top-left corner of pixel (0, 0).
    pub origin_x: f64,
    /// X advance per column.
    pub pixel_width: f64,
    /// X advance per row (zero unless rotated).
    pub x_skew: f64,
    /// World Y of the top-left corner of pixel (0, 0).
    pub origin_y: f64,
    /// Y advance per column (zero unless rotated).
    pub y_skew: f64,
    /// Y advance per row. Negative for north-up rasters.
    pub pixel_height: f64,
}

impl Default for GeoTransform {
    /// The identity transform GDAL reports for rasters without georeferencing.
    fn default() -> Self {
        Self::from_gdal([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }
}

impl GeoTransform {
    /// Build from the GDAL 6-tuple ordering.
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            origin_x: gt[0],
            pixel_width: gt[1],
            x_skew: gt[2],
            origin_y: gt[3],
            y_skew: gt[4],
            pixel_height: gt[5],
        }
    }

    /// Coefficients in GDAL ordering.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.x_skew,
            self.origin_y,
            self.y_skew,
            self.pixel_height,
        ]
    }

    /// Parse six numbers separated by whitespace and/or commas.
    ///
    /// This is the form GDAL writes into the `GeoTransform` attribute of a
    /// NetCDF grid-mapping variable.
    pub fn parse(s: &str) -> GeoResult<Self> {
        let parts: Vec<&str> = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 6 {
            return Err(GeoError::InvalidFormat(s.to_string()));
        }

        let mut gt = [0.0; 6];
        for (slot, part) in gt.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| GeoError::InvalidNumber(part.to_string()))?;
        }
        Ok(Self::from_gdal(gt))
    }

    /// Fail if any coefficient is NaN or infinite.
    pub fn validate(&self) -> GeoResult<()> {
        for (index, value) in self.to_gdal().into_iter().enumerate() {
            if !value.is_finite() {
                return Err(GeoError::NonFinite { index, value });
            }
        }
        Ok(())
    }

    /// True when neither skew term is set.
    pub fn is_axis_aligned(&self) -> bool {
        self.x_skew == 0.0 && self.y_skew == 0.0
    }

    /// Map a (possibly fractional) pixel position to world coordinates.
    #[inline]
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.x_skew;
        let y = self.origin_y + col * self.y_skew + row * self.pixel_height;
        (x, y)
    }

    /// World coordinates of the center of pixel (`col`, `row`).
    #[inline]
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Per-axis pixel-center coordinates for a `width` x `height` raster.
    ///
    /// X values are taken along the first row and Y values along the first
    /// column, which is exact for axis-aligned transforms.
    pub fn coordinates(&self, width: usize, height: usize) -> GeoResult<(Vec<f64>, Vec<f64>)> {
        self.validate()?;
        let xs = (0..width).map(|col| self.pixel_center(col, 0).0).collect();
        let ys = (0..height).map(|row| self.pixel_center(0, row).1).collect();
        Ok((xs, ys))
    }

    /// Envelope of the four outer corners of a `width` x `height` raster.
    pub fn bounds(&self, width: usize, height: usize) -> GeoResult<BoundingBox> {
        self.validate()?;
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(0.0, h),
            self.apply(w, h),
        ];
        // Four corners always yield a box.
        Ok(BoundingBox::envelope(corners).unwrap_or(BoundingBox::new(
            self.origin_x,
            self.origin_y,
            self.origin_x,
            self.origin_y,
        )))
    }

    /// Transform describing a buffer read from `window` and resampled to
    /// `out_height` x `out_width` pixels.
    ///
    /// The origin moves to the window's top-left corner and each term scales
    /// by the ratio of window extent to buffer extent along its axis.
    pub fn for_read(&self, window: &PixelWindow, out_height: usize, out_width: usize) -> Self {
        let (origin_x, origin_y) = self.apply(window.cols.0 as f64, window.rows.0 as f64);
        let sx = window.width() as f64 / out_width.max(1) as f64;
        let sy = window.height() as f64 / out_height.max(1) as f64;
        Self {
            origin_x,
            pixel_width: self.pixel_width * sx,
            x_skew: self.x_skew * sy,
            origin_y,
            y_skew: self.y_skew * sx,
            pixel_height: self.pixel_height * sy,
        }
    }
}

/// Pixel-center coordinate axes: `(x[width], y[height])`.
pub fn coordinates(
    width: usize,
    height: usize,
    geotransform: &GeoTransform,
) -> GeoResult<(Vec<f64>, Vec<f64>)> {
    geotransform.coordinates(width, height)
}

/// Corner envelope `(minx, miny, maxx, maxy)` of the raster.
pub fn bounds(width: usize, height: usize, geotransform: &GeoTransform) -> GeoResult<BoundingBox> {
    geotransform.bounds(width, height)
}
