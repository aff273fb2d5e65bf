//! Source metadata loaders.
//!
//! Both loaders open each physical band only long enough to read its tags
//! and dimensions; no pixel data is decoded here.

use std::path::{Path, PathBuf};

use raster_reader::RasterDriver;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::band_spec::BandSpec;
use crate::error::{IngestionError, Result};
use crate::matcher::match_bands;
use crate::metadata::{BandMetadata, SourceKind, SourceMetadata};

/// Enumerate the subdatasets of a container and read their tags.
///
/// The first subdataset's dimensions become the source dimensions.
pub fn load_container_meta(driver: &dyn RasterDriver, locator: &str) -> Result<SourceMetadata> {
    let (container_metadata, subdatasets) = {
        let handle = driver
            .open(locator)
            .map_err(|e| IngestionError::reader_open(locator, e))?;
        (handle.tags(), handle.subdatasets())
    };

    if subdatasets.is_empty() {
        return Err(IngestionError::open(locator, "container exposes no subdatasets"));
    }

    let mut bands = Vec::with_capacity(subdatasets.len());
    for sub in subdatasets {
        let handle = driver
            .open(&sub)
            .map_err(|e| IngestionError::reader_open(&sub, e))?;
        let (height, width) = handle.dimensions();
        debug!(subdataset = %sub, height = height, width = width, "Discovered sub-band");
        let tags = handle.tags();
        drop(handle);
        bands.push(BandMetadata::new(sub, tags, height, width));
    }

    let (height, width) = (bands[0].height, bands[0].width);
    info!(
        source = %locator,
        bands = bands.len(),
        height = height,
        width = width,
        "Loaded container metadata"
    );

    Ok(SourceMetadata {
        name: locator.to_string(),
        kind: SourceKind::Container,
        container_metadata,
        bands,
        height,
        width,
    })
}

/// Files directly inside `dir` whose extension is in `extensions`
/// (case-insensitive), sorted by file name.
pub fn list_raster_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestionError::open(
            dir.display().to_string(),
            "not a readable directory",
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| IngestionError::open(dir.display().to_string(), e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let recognized = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)));
        if recognized {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Read tags of every single-band raster in `dir` and validate `specs`
/// against them.
///
/// All discovered files are kept in the metadata. The source dimensions
/// are those of the first matched band in logical order.
pub fn load_directory_meta(
    driver: &dyn RasterDriver,
    dir: &Path,
    specs: Option<&[BandSpec]>,
    extensions: &[String],
) -> Result<SourceMetadata> {
    let files = list_raster_files(dir, extensions)?;
    debug!(dir = %dir.display(), files = files.len(), "Listed raster files");

    let mut bands = Vec::with_capacity(files.len());
    for path in files {
        let locator = path.to_string_lossy().into_owned();
        let handle = driver
            .open(&locator)
            .map_err(|e| IngestionError::reader_open(&locator, e))?;

        let count = handle.band_count();
        if count != 1 {
            return Err(IngestionError::unsupported_layout(
                locator,
                format!("directory sources need single-band files, found {count} bands"),
            ));
        }
        let (height, width) = handle.dimensions();
        let tags = handle.tags();
        drop(handle);
        bands.push(BandMetadata::new(locator, tags, height, width));
    }

    let matches = match_bands(&bands, specs)?;
    let (height, width) = (matches[0].metadata.height, matches[0].metadata.width);

    info!(
        source = %dir.display(),
        files = bands.len(),
        matched = matches.len(),
        height = height,
        width = width,
        "Loaded directory metadata"
    );

    Ok(SourceMetadata {
        name: dir.display().to_string(),
        kind: SourceKind::Directory,
        container_metadata: Default::default(),
        bands,
        height,
        width,
    })
}
