//! Assignment of physical bands to logical band names.
//!
//! Rules:
//!
//! - Without specs every physical band is kept as `band_<i>` in discovery
//!   order.
//! - With specs, each physical band is offered to the specs in spec order
//!   and the first spec whose predicate accepts it claims it
//!   (first-match-wins). A band claimed by nobody is skipped.
//! - Matches are returned ordered by the position of the claiming spec.
//! - Every spec must claim exactly one band, otherwise the whole match
//!   fails.

use raster_reader::ReadRequest;
use tracing::debug;

use crate::band_spec::BandSpec;
use crate::error::{IngestionError, Result};
use crate::metadata::BandMetadata;

/// One physical band assigned to a logical slot.
#[derive(Debug, Clone)]
pub struct BandMatch {
    /// Position of the claiming spec, or the discovery index without specs.
    pub logical_index: usize,
    /// Index into the source's band list.
    pub physical_index: usize,
    /// Logical name the band is stored under.
    pub name: String,
    /// The claiming spec. `None` for default-named bands.
    pub spec: Option<BandSpec>,
    pub metadata: BandMetadata,
}

impl BandMatch {
    /// Read requested by the claiming spec, or a full read.
    pub fn read_request(&self) -> ReadRequest {
        self.spec
            .as_ref()
            .map(BandSpec::read_request)
            .unwrap_or_default()
    }
}

/// Name given to physical band `index` when no specs are supplied.
pub fn default_band_name(index: usize) -> String {
    format!("band_{index}")
}

/// Match `bands` against `specs`.
///
/// An empty spec slice behaves like `None`.
pub fn match_bands(bands: &[BandMetadata], specs: Option<&[BandSpec]>) -> Result<Vec<BandMatch>> {
    let specs = specs.filter(|s| !s.is_empty());

    let Some(specs) = specs else {
        if bands.is_empty() {
            return Err(IngestionError::BandMatch {
                requested: Vec::new(),
                found: 0,
            });
        }
        return Ok(bands
            .iter()
            .enumerate()
            .map(|(i, metadata)| BandMatch {
                logical_index: i,
                physical_index: i,
                name: default_band_name(i),
                spec: None,
                metadata: metadata.clone(),
            })
            .collect());
    };

    let mut claimed: Vec<Option<usize>> = vec![None; specs.len()];
    let mut matches = Vec::with_capacity(specs.len());

    for (physical_index, band) in bands.iter().enumerate() {
        let Some(logical_index) = specs.iter().position(|spec| spec.matches(&band.tags)) else {
            continue;
        };
        let spec = &specs[logical_index];

        if let Some(first) = claimed[logical_index] {
            return Err(IngestionError::DuplicateMatch {
                name: spec.name.clone(),
                first: bands[first].source.clone(),
                second: band.source.clone(),
            });
        }
        claimed[logical_index] = Some(physical_index);

        debug!(
            band = %spec.name,
            source = %band.source,
            logical_index = logical_index,
            "Band matched"
        );
        matches.push(BandMatch {
            logical_index,
            physical_index,
            name: spec.name.clone(),
            spec: Some(spec.clone()),
            metadata: band.clone(),
        });
    }

    if matches.len() != specs.len() {
        return Err(IngestionError::BandMatch {
            requested: specs.iter().map(|s| s.name.clone()).collect(),
            found: matches.len(),
        });
    }

    matches.sort_by_key(|m| m.logical_index);
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_reader::Tags;

    fn band(source: &str, value: &str) -> BandMetadata {
        BandMetadata::new(
            source,
            Tags::from([("band".to_string(), value.to_string())]),
            2,
            2,
        )
    }

    fn names(matches: &[BandMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_default_names() {
        let bands = [band("a", "x"), band("b", "y")];
        let matches = match_bands(&bands, None).unwrap();
        assert_eq!(names(&matches), ["band_0", "band_1"]);
        assert!(matches.iter().all(|m| m.spec.is_none()));
        assert_eq!(matches[1].metadata.source, "b");
    }

    #[test]
    fn test_empty_specs_use_default_names() {
        let bands = [band("a", "x")];
        let matches = match_bands(&bands, Some(&[])).unwrap();
        assert_eq!(names(&matches), ["band_0"]);
    }

    #[test]
    fn test_no_bands_is_an_error() {
        let err = match_bands(&[], None).unwrap_err();
        assert!(matches!(err, IngestionError::BandMatch { found: 0, .. }));
    }

    #[test]
    fn test_ordered_by_spec_position() {
        let bands = [band("a.tif", "red"), band("b.tif", "nir")];
        let specs = [
            BandSpec::tag_equals("nir", "band", "nir"),
            BandSpec::tag_equals("red", "band", "red"),
        ];
        let matches = match_bands(&bands, Some(&specs)).unwrap();
        assert_eq!(names(&matches), ["nir", "red"]);
        assert_eq!(matches[0].physical_index, 1);
        assert_eq!(matches[1].logical_index, 1);
    }

    #[test]
    fn test_first_match_wins() {
        let bands = [band("a", "red")];
        let specs = [
            BandSpec::new("anything", |_: &Tags| true),
            BandSpec::tag_equals("red", "band", "red"),
        ];
        let err = match_bands(&bands, Some(&specs)).unwrap_err();
        // "anything" claimed the only band; "red" is left empty.
        assert!(matches!(err, IngestionError::BandMatch { found: 1, .. }));
    }

    #[test]
    fn test_partial_match_rejected() {
        let bands = [band("a", "red"), band("b", "nir"), band("c", "qa")];
        let specs = [
            BandSpec::tag_equals("red", "band", "red"),
            BandSpec::tag_equals("nir", "band", "nir"),
            BandSpec::tag_equals("swir", "band", "swir"),
        ];
        let err = match_bands(&bands, Some(&specs)).unwrap_err();
        assert!(err.to_string().contains("found 2 of 3"), "{err}");
    }

    #[test]
    fn test_duplicate_claim_rejected() {
        let bands = [band("a", "red"), band("b", "red")];
        let specs = [BandSpec::tag_equals("red", "band", "red")];
        let err = match_bands(&bands, Some(&specs)).unwrap_err();
        match err {
            IngestionError::DuplicateMatch { name, first, second } => {
                assert_eq!((name.as_str(), first.as_str(), second.as_str()), ("red", "a", "b"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_request_follows_spec() {
        let bands = [band("a", "red")];
        let specs = [BandSpec::tag_equals("red", "band", "red").with_buffer_size(1, 1)];
        let matches = match_bands(&bands, Some(&specs)).unwrap();
        assert_eq!(matches[0].read_request().out_width, Some(1));

        let defaults = match_bands(&bands, None).unwrap();
        assert!(defaults[0].read_request().is_full());
    }
}
