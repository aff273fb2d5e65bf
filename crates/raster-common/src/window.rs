//! Pixel windows for partial raster reads.

use serde::{Deserialize, Serialize};

use crate::error::{GeoError, GeoResult};

/// A half-open pixel window `rows.0..rows.1` by `cols.0..cols.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelWindow {
    pub rows: (usize, usize),
    pub cols: (usize, usize),
}

impl PixelWindow {
    pub fn new(rows: (usize, usize), cols: (usize, usize)) -> Self {
        Self { rows, cols }
    }

    /// Window covering a whole `height` x `width` raster.
    pub fn full(height: usize, width: usize) -> Self {
        Self::new((0, height), (0, width))
    }

    /// Number of rows in the window.
    pub fn height(&self) -> usize {
        self.rows.1.saturating_sub(self.rows.0)
    }

    /// Number of columns in the window.
    pub fn width(&self) -> usize {
        self.cols.1.saturating_sub(self.cols.0)
    }

    /// Fail unless the window is non-empty and lies inside the raster.
    pub fn check_within(&self, height: usize, width: usize) -> GeoResult<()> {
        let (r0, r1) = self.rows;
        let (c0, c1) = self.cols;
        if r0 >= r1 || c0 >= c1 || r1 > height || c1 > width {
            return Err(GeoError::InvalidWindow {
                rows: self.rows,
                cols: self.cols,
                height,
                width,
            });
        }
        Ok(())
    }
}
