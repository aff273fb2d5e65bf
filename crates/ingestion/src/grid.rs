//! Optional check that loaded bands share one pixel grid.

use std::fmt;

use raster_common::GeoTransform;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{IngestionError, Result};
use crate::loader::Band2D;

/// What to do when bands are not on the same grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridCheck {
    /// Do not compare grids.
    #[default]
    Allow,
    /// Log each mismatching band and continue.
    Warn,
    /// Fail with [`IngestionError::GridMismatch`].
    Reject,
}

impl GridCheck {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "allow" | "off" | "none" => Some(Self::Allow),
            "warn" => Some(Self::Warn),
            "reject" | "strict" => Some(Self::Reject),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Warn => "warn",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for GridCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare every band against the first one.
///
/// Bands agree when their shapes are equal and each geotransform
/// coefficient matches within `tolerance`, relative to the larger magnitude
/// (but at least 1.0).
pub fn check_grid(bands: &[(String, Band2D)], policy: GridCheck, tolerance: f64) -> Result<()> {
    if policy == GridCheck::Allow {
        return Ok(());
    }
    let Some(((reference_name, reference), rest)) = bands.split_first() else {
        return Ok(());
    };

    for (name, band) in rest {
        let Some(reason) = grid_difference(reference, band, tolerance) else {
            continue;
        };
        match policy {
            GridCheck::Reject => {
                return Err(IngestionError::GridMismatch {
                    band: name.clone(),
                    reference: reference_name.clone(),
                    reason,
                })
            }
            _ => warn!(
                band = %name,
                reference = %reference_name,
                reason = %reason,
                "Band is not on the reference grid"
            ),
        }
    }
    Ok(())
}

fn grid_difference(reference: &Band2D, band: &Band2D, tolerance: f64) -> Option<String> {
    if reference.shape() != band.shape() {
        return Some(format!(
            "shape {:?} differs from {:?}",
            band.shape(),
            reference.shape()
        ));
    }

    let a = reference.geotransform().unwrap_or_default();
    let b = band.geotransform().unwrap_or_default();
    if transforms_close(&a, &b, tolerance) {
        None
    } else {
        Some(format!(
            "geotransform {:?} differs from {:?}",
            b.to_gdal(),
            a.to_gdal()
        ))
    }
}

fn transforms_close(a: &GeoTransform, b: &GeoTransform, tolerance: f64) -> bool {
    a.to_gdal()
        .iter()
        .zip(b.to_gdal().iter())
        .all(|(x, y)| (x - y).abs() <= tolerance * x.abs().max(y.abs()).max(1.0))
}
