//! Source and band metadata.
//!
//! Metadata is produced by the source loaders without reading pixel data.
//! Geotransform, bounds and the effective read request are filled in per
//! band once the band is actually read.

use std::fmt;
use std::path::{Path, PathBuf};

use raster_common::{BoundingBox, GeoTransform};
use raster_reader::{ReadRequest, Tags};
use serde::{Deserialize, Serialize};

/// Shape of a raster source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// One file exposing several subdatasets (NetCDF, HDF).
    Container,
    /// A directory of single-band raster files.
    Directory,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container => write!(f, "container"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// Where bands come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// Container file (or any locator the driver understands).
    Container(String),
    /// Directory of single-band files.
    Directory(PathBuf),
}

impl SourceLocator {
    /// Directories become directory sources, anything else a container.
    pub fn detect(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.is_dir() {
            Self::Directory(path.to_path_buf())
        } else {
            Self::Container(path.to_string_lossy().into_owned())
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Container(_) => SourceKind::Container,
            Self::Directory(_) => SourceKind::Directory,
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container(locator) => write!(f, "{locator}"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// Metadata of one physical band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandMetadata {
    /// Locator the driver opens to read this band.
    pub source: String,
    pub tags: Tags,
    /// Physical raster height at discovery.
    pub height: usize,
    /// Physical raster width at discovery.
    pub width: usize,
    /// Transform of the array as read. Absent until the band is read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geotransform: Option<GeoTransform>,
    /// Corner envelope of the array as read. Absent until the band is read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
    /// Window / buffer size used for the read, when not a full read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<ReadRequest>,
}

impl BandMetadata {
    pub fn new(source: impl Into<String>, tags: Tags, height: usize, width: usize) -> Self {
        Self {
            source: source.into(),
            tags,
            height,
            width,
            geotransform: None,
            bounds: None,
            read: None,
        }
    }
}

/// Everything known about a source before pixels are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Container locator or directory path.
    pub name: String,
    pub kind: SourceKind,
    /// Dataset-level tags of a container. Empty for directories.
    pub container_metadata: Tags,
    /// Physical bands in discovery order.
    pub bands: Vec<BandMetadata>,
    pub height: usize,
    pub width: usize,
}

impl SourceMetadata {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
