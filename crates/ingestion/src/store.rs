//! The assembled, ordered band store.

use raster_common::BoundingBox;
use serde::Serialize;

use crate::loader::Band2D;
use crate::metadata::{SourceKind, SourceMetadata};

/// Attributes recorded at assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreAttrs {
    /// Source metadata exactly as loaded.
    pub source: SourceMetadata,
    /// Band names in store order.
    pub band_order: Vec<String>,
    /// Union of every band's bounds.
    pub aggregate_bounds: Option<BoundingBox>,
}

/// Named 2-D bands in logical order plus assembly attributes.
#[derive(Debug, Clone)]
pub struct GriddedStore {
    bands: Vec<(String, Band2D)>,
    attrs: StoreAttrs,
}

/// Build a store from loaded bands.
pub fn assemble(
    bands: Vec<(String, Band2D)>,
    source: SourceMetadata,
    band_order: Vec<String>,
) -> GriddedStore {
    let aggregate_bounds = bands
        .iter()
        .filter_map(|(_, band)| band.metadata.bounds)
        .reduce(|acc, b| acc.union(&b));

    GriddedStore {
        bands,
        attrs: StoreAttrs {
            source,
            band_order,
            aggregate_bounds,
        },
    }
}

impl GriddedStore {
    pub fn attrs(&self) -> &StoreAttrs {
        &self.attrs
    }

    pub fn band_order(&self) -> &[String] {
        &self.attrs.band_order
    }

    pub fn get(&self, name: &str) -> Option<&Band2D> {
        self.bands
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, band)| band)
    }

    /// Bands in store order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Band2D)> {
        self.bands.iter().map(|(name, band)| (name.as_str(), band))
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn into_bands(self) -> Vec<(String, Band2D)> {
        self.bands
    }

    /// Pixel-free description of the store.
    pub fn summary(&self) -> StoreSummary {
        StoreSummary {
            source: self.attrs.source.name.clone(),
            kind: self.attrs.source.kind,
            height: self.attrs.source.height,
            width: self.attrs.source.width,
            band_order: self.attrs.band_order.clone(),
            aggregate_bounds: self.attrs.aggregate_bounds,
            bands: self
                .iter()
                .map(|(name, band)| BandSummary::new(name, band))
                .collect(),
        }
    }
}

/// Serializable store overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSummary {
    pub source: String,
    pub kind: SourceKind,
    pub height: usize,
    pub width: usize,
    pub band_order: Vec<String>,
    pub aggregate_bounds: Option<BoundingBox>,
    pub bands: Vec<BandSummary>,
}

/// Per-band statistics. NaN pixels are excluded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandSummary {
    pub name: String,
    pub source: String,
    pub rows: usize,
    pub cols: usize,
    pub geotransform: Option<[f64; 6]>,
    pub bounds: Option<BoundingBox>,
    pub valid_pixels: usize,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub mean: Option<f64>,
}

impl BandSummary {
    fn new(name: &str, band: &Band2D) -> Self {
        let (rows, cols) = band.shape();
        let mut valid = 0usize;
        let mut sum = 0.0f64;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in band.values.iter().filter(|v| !v.is_nan()) {
            valid += 1;
            sum += v as f64;
            min = min.min(v);
            max = max.max(v);
        }

        Self {
            name: name.to_string(),
            source: band.metadata.source.clone(),
            rows,
            cols,
            geotransform: band.metadata.geotransform.map(|gt| gt.to_gdal()),
            bounds: band.metadata.bounds,
            valid_pixels: valid,
            min: (valid > 0).then_some(min),
            max: (valid > 0).then_some(max),
            mean: (valid > 0).then(|| sum / valid as f64),
        }
    }
}
