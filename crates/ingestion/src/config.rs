//! Ingestion configuration and band plans.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::band_spec::{BandSpec, BandSpecConfig};
use crate::error::{IngestionError, Result};
use crate::grid::GridCheck;
use crate::loader::LoadOptions;

/// Configuration for an [`Ingester`](crate::Ingester).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// File extensions recognized in directory sources (no dot,
    /// case-insensitive).
    pub extensions: Vec<String>,

    /// Read bands concurrently.
    pub parallel_reads: bool,

    /// Dedicated read pool size. `None` shares the global rayon pool.
    pub max_read_threads: Option<usize>,

    /// Policy for bands that do not share a grid.
    pub grid_check: GridCheck,

    /// Relative tolerance for geotransform comparison.
    pub grid_tolerance: f64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["tif".to_string(), "tiff".to_string()],
            parallel_reads: true,
            max_read_threads: None,
            grid_check: GridCheck::Allow,
            grid_tolerance: 1e-9,
        }
    }
}

impl IngestConfig {
    /// Load configuration from environment variables.
    ///
    /// - `RASTER_EXTENSIONS`: comma-separated list, e.g. `tif,tiff,img`
    /// - `PARALLEL_READS`: `true`/`1` or anything else for false
    /// - `MAX_READ_THREADS`: pool size, `0` for the global pool
    /// - `GRID_CHECK`: `allow`, `warn` or `reject`
    /// - `GRID_TOLERANCE`: relative tolerance
    ///
    /// Unparseable values leave the default in place.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) with a custom variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("RASTER_EXTENSIONS") {
            config.extensions = val
                .split(',')
                .map(|ext| ext.trim().trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty())
                .collect();
        }

        if let Some(val) = lookup("PARALLEL_READS") {
            config.parallel_reads = val.to_lowercase() == "true" || val == "1";
        }

        if let Some(val) = lookup("MAX_READ_THREADS") {
            if let Ok(threads) = val.parse::<usize>() {
                config.max_read_threads = (threads > 0).then_some(threads);
            }
        }

        if let Some(val) = lookup("GRID_CHECK") {
            if let Some(policy) = GridCheck::parse(&val) {
                config.grid_check = policy;
            }
        }

        if let Some(val) = lookup("GRID_TOLERANCE") {
            if let Ok(tolerance) = val.parse() {
                config.grid_tolerance = tolerance;
            }
        }

        config
    }

    /// Parse from YAML. Missing fields take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| IngestionError::InvalidConfig(format!("config YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(IngestionError::InvalidConfig(
                "extensions must not be empty".to_string(),
            ));
        }

        if let Some(ext) = self
            .extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.contains('.'))
        {
            return Err(IngestionError::InvalidConfig(format!(
                "invalid extension {ext:?}"
            )));
        }

        if self.max_read_threads == Some(0) {
            return Err(IngestionError::InvalidConfig(
                "max_read_threads must be > 0".to_string(),
            ));
        }

        if !self.grid_tolerance.is_finite() || self.grid_tolerance < 0.0 {
            return Err(IngestionError::InvalidConfig(
                "grid_tolerance must be a finite value >= 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply the fields set in `overlay`, leaving the rest untouched.
    pub fn overlay(mut self, overlay: &ConfigOverlay) -> Self {
        if let Some(extensions) = &overlay.extensions {
            self.extensions = extensions.clone();
        }
        if let Some(parallel) = overlay.parallel_reads {
            self.parallel_reads = parallel;
        }
        if let Some(threads) = overlay.max_read_threads {
            self.max_read_threads = Some(threads);
        }
        if let Some(policy) = overlay.grid_check {
            self.grid_check = policy;
        }
        if let Some(tolerance) = overlay.grid_tolerance {
            self.grid_tolerance = tolerance;
        }
        self
    }

    /// Read scheduling derived from this configuration.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            parallel: self.parallel_reads,
            max_threads: self.max_read_threads,
        }
    }
}

/// Partial [`IngestConfig`]. Unset fields keep the underlying value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_reads: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_read_threads: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_check: Option<GridCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_tolerance: Option<f64>,
}

/// A YAML file listing the logical bands to load.
///
/// ```yaml
/// config:
///   grid_check: warn
/// bands:
///   - name: nir
///     search_key: band
///     search_value: "^nir$"
///   - name: red
///     search_key: band
///     search_value: "^red$"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPlan {
    /// Overrides applied on top of the environment configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigOverlay>,

    #[serde(default)]
    pub bands: Vec<BandSpecConfig>,
}

impl BandPlan {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| IngestionError::InvalidConfig(format!("band plan YAML: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Compile the band descriptors. `None` when the plan lists no bands.
    pub fn band_specs(&self) -> Result<Option<Vec<BandSpec>>> {
        if self.bands.is_empty() {
            return Ok(None);
        }
        self.bands
            .iter()
            .map(BandSpecConfig::build)
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}
