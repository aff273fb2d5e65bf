//! Synthetic raster data and GeoTIFF fixture writers.
//!
//! Generators produce predictable values so tests can check exactly which
//! source pixel ended up where after windowing or decimation.

use std::fs::File;
use std::path::{Path, PathBuf};

use quick_xml::escape::escape;
use tiff::encoder::colortype::{Gray32Float, RGB32Float};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tiff::TiffError;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_MODEL_TRANSFORMATION: u16 = 34264;
const TAG_GDAL_METADATA: u16 = 42112;
const TAG_IMAGE_DESCRIPTION: u16 = 270;

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data is being read correctly
/// by checking that grid[row][col] == col * 1000 + row.
///
/// # Returns
///
/// A `Vec<f32>` in row-major order (row 0 first, then row 1, etc.)
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50); // 10 * 5
/// assert_eq!(grid[0], 0.0);   // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);  // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    create_offset_grid(width, height, 0.0)
}

/// Same pattern as [`create_test_grid`], shifted by `offset`.
///
/// Handy for telling bands apart: give each band a distinct offset.
pub fn create_offset_grid(width: usize, height: usize, offset: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32 + offset);
        }
    }
    data
}

/// Creates a grid with NaN values at specified `(col, row)` positions, zeros elsewhere.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![0.0f32; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}

/// Builder for small float32 GeoTIFF files.
///
/// Writes pixel data plus the georeferencing and metadata tags a raster
/// reader looks at: ModelPixelScale/ModelTiepoint for north-up transforms,
/// ModelTransformation for rotated ones, `GDAL_METADATA` for key/value
/// items and ImageDescription.
///
/// # Example
///
/// ```ignore
/// use test_utils::{create_test_grid, GeoTiffFixture};
///
/// GeoTiffFixture::new(5, 4, create_test_grid(5, 4))
///     .with_geotransform([10.0, 2.0, 0.0, 50.0, 0.0, -2.0])
///     .with_tag("band", "red")
///     .write(&path)?;
/// ```
#[derive(Debug, Clone)]
pub struct GeoTiffFixture {
    width: usize,
    height: usize,
    samples: usize,
    data: Vec<f32>,
    geotransform: Option<[f64; 6]>,
    tags: Vec<(String, String)>,
    description: Option<String>,
}

impl GeoTiffFixture {
    /// Single-band raster; `data` is row-major with `width * height` values.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Self {
        Self {
            width,
            height,
            samples: 1,
            data,
            geotransform: None,
            tags: Vec::new(),
            description: None,
        }
    }

    /// Three-band raster with samples interleaved per pixel.
    pub fn rgb(width: usize, height: usize, data: Vec<f32>) -> Self {
        Self {
            samples: 3,
            ..Self::new(width, height, data)
        }
    }

    /// GDAL-ordered geotransform. Without one no model tags are written.
    pub fn with_geotransform(mut self, gt: [f64; 6]) -> Self {
        self.geotransform = Some(gt);
        self
    }

    /// Add a `GDAL_METADATA` item.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Write the file, replacing anything already at `path`.
    pub fn write(&self, path: &Path) -> Result<(), TiffError> {
        if self.data.len() != self.width * self.height * self.samples {
            return Err(TiffError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "expected {} values, got {}",
                    self.width * self.height * self.samples,
                    self.data.len()
                ),
            )));
        }

        let file = File::create(path)?;
        let mut encoder = TiffEncoder::new(file)?;
        let (width, height) = (self.width as u32, self.height as u32);

        match self.samples {
            3 => {
                let mut image = encoder.new_image::<RGB32Float>(width, height)?;
                self.write_tags(image.encoder())?;
                image.write_data(&self.data)?;
            }
            _ => {
                let mut image = encoder.new_image::<Gray32Float>(width, height)?;
                self.write_tags(image.encoder())?;
                image.write_data(&self.data)?;
            }
        }
        Ok(())
    }

    fn write_tags<W, K>(
        &self,
        dir: &mut tiff::encoder::DirectoryEncoder<'_, W, K>,
    ) -> Result<(), TiffError>
    where
        W: std::io::Write + std::io::Seek,
        K: tiff::encoder::TiffKind,
    {
        if let Some(gt) = self.geotransform {
            if gt[2] == 0.0 && gt[4] == 0.0 {
                let scale = [gt[1], -gt[5], 0.0];
                let tiepoint = [0.0, 0.0, 0.0, gt[0], gt[3], 0.0];
                dir.write_tag(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE), &scale[..])?;
                dir.write_tag(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT), &tiepoint[..])?;
            } else {
                let matrix = [
                    gt[1], gt[2], 0.0, gt[0], //
                    gt[4], gt[5], 0.0, gt[3], //
                    0.0, 0.0, 0.0, 0.0, //
                    0.0, 0.0, 0.0, 1.0,
                ];
                dir.write_tag(Tag::from_u16_exhaustive(TAG_MODEL_TRANSFORMATION), &matrix[..])?;
            }
        }

        if !self.tags.is_empty() {
            let xml = gdal_metadata_xml(&self.tags);
            dir.write_tag(Tag::from_u16_exhaustive(TAG_GDAL_METADATA), xml.as_str())?;
        }

        if let Some(description) = &self.description {
            dir.write_tag(
                Tag::from_u16_exhaustive(TAG_IMAGE_DESCRIPTION),
                description.as_str(),
            )?;
        }
        Ok(())
    }
}

fn gdal_metadata_xml(tags: &[(String, String)]) -> String {
    let mut xml = String::from("<GDALMetadata>\n");
    for (key, value) in tags {
        // GDAL serializes empty items as self-closing elements.
        if value.is_empty() {
            xml.push_str(&format!("  <Item name=\"{}\" />\n", escape(key)));
        } else {
            xml.push_str(&format!(
                "  <Item name=\"{}\">{}</Item>\n",
                escape(key),
                escape(value)
            ));
        }
    }
    xml.push_str("</GDALMetadata>");
    xml
}

/// Write one single-band GeoTIFF per `(file_name, band_tag)` into `dir`.
///
/// Every file gets the same geotransform, a `band=<band_tag>` metadata item
/// and values from [`create_offset_grid`] offset by `100 * position`, so
/// the first file starts at 0, the second at 100, and so on.
pub fn write_band_directory(
    dir: &Path,
    bands: &[(&str, &str)],
    width: usize,
    height: usize,
    geotransform: [f64; 6],
) -> Result<Vec<PathBuf>, TiffError> {
    bands
        .iter()
        .enumerate()
        .map(|(i, (file_name, band))| {
            let path = dir.join(file_name);
            GeoTiffFixture::new(
                width,
                height,
                create_offset_grid(width, height, 100.0 * i as f32),
            )
            .with_geotransform(geotransform)
            .with_tag("band", *band)
            .write(&path)?;
            Ok(path)
        })
        .collect()
}
