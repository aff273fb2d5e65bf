//! GeoTIFF driver built on the pure-Rust `tiff` decoder.
//!
//! Georeferencing comes from the GeoTIFF model tags; band metadata comes from
//! the `GDAL_METADATA` XML tag and a few baseline ASCII tags, named the way
//! GDAL reports them.

use std::fs::File;

use ndarray::Array3;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use raster_common::GeoTransform;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::debug;

use crate::driver::{extract_window, RasterBuffer, RasterDriver, RasterHandle, ReadRequest, Tags};
use crate::error::{ReaderError, ReaderResult};

// GeoTIFF / GDAL tag IDs
pub const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub const TAG_MODEL_TIEPOINT: u16 = 33922;
pub const TAG_MODEL_TRANSFORMATION: u16 = 34264;
pub const TAG_GDAL_METADATA: u16 = 42112;

const TAG_IMAGE_DESCRIPTION: u16 = 270;
const TAG_SOFTWARE: u16 = 305;
const TAG_DATETIME: u16 = 306;
const TAG_PLANAR_CONFIGURATION: u16 = 284;

/// `PlanarConfiguration` value for band-sequential storage.
const PLANAR_SEPARATE: u32 = 2;

/// Baseline ASCII tags surfaced as metadata, keyed the way GDAL names them.
const ASCII_TAGS: [(u16, &str); 3] = [
    (TAG_IMAGE_DESCRIPTION, "TIFFTAG_IMAGEDESCRIPTION"),
    (TAG_SOFTWARE, "TIFFTAG_SOFTWARE"),
    (TAG_DATETIME, "TIFFTAG_DATETIME"),
];

/// Opens `.tif` / `.tiff` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct TiffDriver;

impl TiffDriver {
    pub fn new() -> Self {
        Self
    }
}

impl RasterDriver for TiffDriver {
    fn name(&self) -> &'static str {
        "GTiff"
    }

    fn open(&self, locator: &str) -> ReaderResult<Box<dyn RasterHandle>> {
        Ok(Box::new(TiffHandle::open(locator)?))
    }
}

/// An open GeoTIFF. The file closes when the handle drops.
pub struct TiffHandle {
    locator: String,
    decoder: Decoder<File>,
    width: usize,
    height: usize,
    samples: usize,
    planar: bool,
    geotransform: GeoTransform,
    tags: Tags,
}

impl TiffHandle {
    pub fn open(locator: &str) -> ReaderResult<Self> {
        let file = File::open(locator).map_err(|e| ReaderError::open_failed(locator, e))?;
        let mut decoder = Decoder::new(file)
            .map_err(|e| ReaderError::open_failed(locator, e))?
            .with_limits(Limits::unlimited());

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| ReaderError::open_failed(locator, e))?;

        let samples = decoder
            .get_tag_u32(Tag::SamplesPerPixel)
            .map(|s| s as usize)
            .unwrap_or(1);
        let planar = decoder
            .get_tag_u32(Tag::from_u16_exhaustive(TAG_PLANAR_CONFIGURATION))
            .map(|config| config == PLANAR_SEPARATE)
            .unwrap_or(false);

        let geotransform = read_geotransform(&mut decoder);
        let tags = read_tags(&mut decoder);

        debug!(
            locator = %locator,
            width = width,
            height = height,
            samples = samples,
            planar = planar,
            tags = tags.len(),
            "Opened GeoTIFF"
        );

        Ok(Self {
            locator: locator.to_string(),
            decoder,
            width: width as usize,
            height: height as usize,
            samples,
            planar,
            geotransform,
            tags,
        })
    }
}

impl RasterHandle for TiffHandle {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn tags(&self) -> Tags {
        self.tags.clone()
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    fn band_count(&self) -> usize {
        self.samples
    }

    fn geotransform(&self) -> GeoTransform {
        self.geotransform
    }

    fn read(&mut self, request: &ReadRequest) -> ReaderResult<RasterBuffer> {
        let (window, out_height, out_width) = request.resolve(self.height, self.width)?;

        let decoded = self
            .decoder
            .read_image()
            .map_err(|e| ReaderError::read_failed(&self.locator, e))?;
        let values = decoding_to_f32(decoded)
            .ok_or_else(|| ReaderError::read_failed(&self.locator, "unsupported sample type"))?;

        let bands = samples_to_bands(values, self.height, self.width, self.samples, self.planar)
            .map_err(|e| ReaderError::read_failed(&self.locator, e))?;

        Ok(extract_window(bands.view(), &window, out_height, out_width).into_dyn())
    }
}

/// Arrange decoded samples as `(band, row, col)`.
///
/// Chunky files interleave samples per pixel; planar files store one full
/// plane per band. A buffer that does not hold every plane is a shape error.
fn samples_to_bands(
    values: Vec<f32>,
    height: usize,
    width: usize,
    samples: usize,
    planar: bool,
) -> Result<Array3<f32>, ndarray::ShapeError> {
    if planar {
        Array3::from_shape_vec((samples, height, width), values)
    } else {
        Array3::from_shape_vec((height, width, samples), values)
            .map(|pixels| pixels.permuted_axes([2, 0, 1]))
    }
}

fn decoding_to_f32(result: DecodingResult) -> Option<Vec<f32>> {
    let values = match result {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(values)
}

/// Geotransform from ModelTransformation, else PixelScale + Tiepoint, else identity.
fn read_geotransform(decoder: &mut Decoder<File>) -> GeoTransform {
    let f64_tag = |decoder: &mut Decoder<File>, code: u16| {
        decoder
            .get_tag_f64_vec(Tag::from_u16_exhaustive(code))
            .ok()
    };

    if let Some(m) = f64_tag(decoder, TAG_MODEL_TRANSFORMATION).filter(|m| m.len() >= 16) {
        return GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]);
    }

    let scale = f64_tag(decoder, TAG_MODEL_PIXEL_SCALE).filter(|v| v.len() >= 2);
    let tiepoint = f64_tag(decoder, TAG_MODEL_TIEPOINT).filter(|v| v.len() >= 6);
    match (scale, tiepoint) {
        (Some(scale), Some(tp)) => {
            let (sx, sy) = (scale[0], scale[1]);
            GeoTransform::from_gdal([tp[3] - tp[0] * sx, sx, 0.0, tp[4] + tp[1] * sy, 0.0, -sy])
        }
        _ => GeoTransform::default(),
    }
}

fn read_tags(decoder: &mut Decoder<File>) -> Tags {
    let mut tags = Tags::new();

    for (code, key) in ASCII_TAGS {
        if let Ok(value) = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(code)) {
            let value = value.trim_end_matches('\0').trim().to_string();
            if !value.is_empty() {
                tags.insert(key.to_string(), value);
            }
        }
    }

    if let Ok(xml) = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_METADATA)) {
        tags.extend(parse_gdal_metadata(&xml));
    }

    tags
}

/// Parse `<GDALMetadata><Item name="KEY">value</Item>...</GDALMetadata>`.
///
/// Dataset-level and band-level items are merged; a file in a directory
/// source carries a single band, so the distinction does not matter here.
/// Self-closing items map to an empty value. Parsing stops at the first
/// malformed event, keeping the items read so far.
pub fn parse_gdal_metadata(xml: &str) -> Tags {
    let mut tags = Tags::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    // Name and accumulated text of the open <Item>.
    let mut current: Option<(String, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == ITEM => {
                current = item_name(&e).map(|name| (name, String::new()));
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == ITEM => {
                if let Some(name) = item_name(&e) {
                    tags.insert(name, String::new());
                }
            }
            Ok(Event::Text(t)) => {
                if let Some((_, value)) = current.as_mut() {
                    match t.unescape() {
                        Ok(text) => value.push_str(&text),
                        Err(e) => {
                            debug!(error = %e, "Bad escape in GDAL metadata");
                            break;
                        }
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == ITEM => {
                if let Some((name, value)) = current.take() {
                    tags.insert(name, value);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(
                    position = reader.buffer_position(),
                    error = %e,
                    "Malformed GDAL metadata"
                );
                break;
            }
            _ => {}
        }
    }

    tags
}

const ITEM: &[u8] = b"Item";

fn item_name(element: &BytesStart<'_>) -> Option<String> {
    element
        .attributes()
        .filter_map(|attr| attr.ok())
        .find(|attr| attr.key.as_ref() == b"name")
        .and_then(|attr| attr.unescape_value().ok())
        .map(|name| name.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gdal_metadata() {
        let xml = r#"<GDALMetadata>
  <Item name="band">nir</Item>
  <Item name="WAVELENGTH" sample="0">0.865</Item>
  <Item name="NOTE">a &amp; b &lt;c&gt;</Item>
</GDALMetadata>"#;
        let tags = parse_gdal_metadata(xml);
        assert_eq!(tags.len(), 3);
        assert_eq!(tags["band"], "nir");
        assert_eq!(tags["WAVELENGTH"], "0.865");
        assert_eq!(tags["NOTE"], "a & b <c>");
    }

    #[test]
    fn test_parse_gdal_metadata_malformed() {
        assert!(parse_gdal_metadata("").is_empty());
        assert!(parse_gdal_metadata("<GDALMetadata><Item name=\"x\">1").is_empty());
        assert!(parse_gdal_metadata("<Item>no name</Item>").is_empty());
    }

    #[test]
    fn test_parse_gdal_metadata_self_closing_item() {
        let xml = "<GDALMetadata>\n  <Item name=\"EMPTY\" />\n  <Item name=\"band\">nir</Item>\n</GDALMetadata>";
        let tags = parse_gdal_metadata(xml);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags["EMPTY"], "");
        assert_eq!(tags.get("band").map(String::as_str), Some("nir"));
    }

    #[test]
    fn test_parse_gdal_metadata_character_references() {
        let xml = r#"<GDALMetadata><Item name="NOTE">a &#38; b &#x3C;c&#x3E;</Item></GDALMetadata>"#;
        assert_eq!(parse_gdal_metadata(xml)["NOTE"], "a & b <c>");
    }

    #[test]
    fn test_parse_gdal_metadata_attribute_names() {
        let xml = r#"<GDALMetadata>
  <Item xname="wrong" name='band' role="band">red</Item>
  <Item xname="only">ignored</Item>
</GDALMetadata>"#;
        let tags = parse_gdal_metadata(xml);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags["band"], "red");
    }

    #[test]
    fn test_samples_to_bands_layouts() {
        // 2 bands, 1 row, 2 cols.
        let chunky = samples_to_bands(vec![1.0, 10.0, 2.0, 20.0], 1, 2, 2, false).unwrap();
        let planar = samples_to_bands(vec![1.0, 2.0, 10.0, 20.0], 1, 2, 2, true).unwrap();
        assert_eq!(chunky, planar);
        assert_eq!(planar[[0, 0, 1]], 2.0);
        assert_eq!(planar[[1, 0, 0]], 10.0);

        // Only the first plane decoded.
        assert!(samples_to_bands(vec![1.0, 2.0], 1, 2, 2, true).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let err = TiffDriver::new().open("/nonexistent/raster.tif").err().unwrap();
        assert!(matches!(err, ReaderError::OpenFailed { .. }));
    }

    #[test]
    fn test_read_written_geotiff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.tif");
        let data = test_utils::create_test_grid(5, 4);
        test_utils::GeoTiffFixture::new(5, 4, data)
            .with_geotransform([10.0, 2.0, 0.0, 50.0, 0.0, -2.0])
            .with_tag("band", "red")
            .with_description("ramp fixture")
            .write(&path)
            .unwrap();

        let mut handle = TiffDriver::new().open(path.to_str().unwrap()).unwrap();
        assert_eq!(handle.dimensions(), (4, 5));
        assert_eq!(handle.band_count(), 1);
        assert_eq!(
            handle.geotransform().to_gdal(),
            [10.0, 2.0, 0.0, 50.0, 0.0, -2.0]
        );

        let tags = handle.tags();
        assert_eq!(tags["band"], "red");
        assert_eq!(tags["TIFFTAG_IMAGEDESCRIPTION"], "ramp fixture");

        let buffer = handle.read(&ReadRequest::full()).unwrap();
        assert_eq!(buffer.shape(), &[1, 4, 5]);
        assert_eq!(buffer[[0, 0, 1]], 1000.0);
        assert_eq!(buffer[[0, 3, 0]], 3.0);
    }

    #[test]
    fn test_read_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.tif");
        test_utils::GeoTiffFixture::new(6, 6, test_utils::create_test_grid(6, 6))
            .write(&path)
            .unwrap();

        let mut handle = TiffDriver::new().open(path.to_str().unwrap()).unwrap();
        let request = ReadRequest::full()
            .with_window(raster_common::PixelWindow::new((2, 4), (1, 5)));
        let buffer = handle.read(&request).unwrap();
        assert_eq!(buffer.shape(), &[1, 2, 4]);
        assert_eq!(buffer[[0, 0, 0]], 1002.0);
    }
}
