//! Main Ingester struct tying the loaders together.

use std::sync::Arc;

use raster_reader::{FileDriver, RasterDriver};
use tracing::info;

use crate::band_spec::BandSpec;
use crate::config::IngestConfig;
use crate::error::{IngestionError, Result};
use crate::grid::check_grid;
use crate::loader::load_bands;
use crate::matcher::match_bands;
use crate::metadata::{SourceLocator, SourceMetadata};
use crate::source::{load_container_meta, load_directory_meta};
use crate::store::{assemble, GriddedStore};

/// Loads raster sources into [`GriddedStore`]s.
///
/// Ingestion has two phases. [`load_meta`](Self::load_meta) discovers bands
/// without reading pixels; [`load_array`](Self::load_array) matches bands
/// against the caller's specs and reads them.
pub struct Ingester {
    driver: Arc<dyn RasterDriver>,
    config: IngestConfig,
}

impl Ingester {
    /// Create a new Ingester. Fails if `config` does not validate.
    pub fn new(driver: Arc<dyn RasterDriver>, config: IngestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { driver, config })
    }

    /// Ingester reading files through [`FileDriver`].
    pub fn with_file_driver(config: IngestConfig) -> Result<Self> {
        Self::new(Arc::new(FileDriver::new()), config)
    }

    /// Discover the bands of a source.
    ///
    /// Directory sources also check `specs` here, so a partial match fails
    /// before any pixel is read. Container sources ignore `specs` until
    /// [`load_array`](Self::load_array).
    pub fn load_meta(
        &self,
        source: &SourceLocator,
        specs: Option<&[BandSpec]>,
    ) -> Result<SourceMetadata> {
        match source {
            SourceLocator::Container(locator) => load_container_meta(self.driver.as_ref(), locator),
            SourceLocator::Directory(dir) => load_directory_meta(
                self.driver.as_ref(),
                dir,
                specs,
                &self.config.extensions,
            ),
        }
    }

    /// Match, read and assemble the bands of a source.
    pub fn load_array(
        &self,
        source: &SourceLocator,
        meta: SourceMetadata,
        specs: Option<&[BandSpec]>,
    ) -> Result<GriddedStore> {
        if meta.kind != source.kind() {
            return Err(IngestionError::InvalidConfig(format!(
                "metadata describes a {} source but {source} is a {} source",
                meta.kind,
                source.kind()
            )));
        }

        let matches = match_bands(&meta.bands, specs)?;
        let bands = load_bands(
            self.driver.as_ref(),
            &meta,
            &matches,
            self.config.load_options(),
        )?;
        check_grid(&bands, self.config.grid_check, self.config.grid_tolerance)?;

        let band_order: Vec<String> = bands.iter().map(|(name, _)| name.clone()).collect();
        info!(
            source = %source,
            driver = self.driver.name(),
            bands = ?band_order,
            "Assembled store"
        );
        Ok(assemble(bands, meta, band_order))
    }

    /// [`load_meta`](Self::load_meta) followed by [`load_array`](Self::load_array).
    pub fn ingest(&self, source: &SourceLocator, specs: Option<&[BandSpec]>) -> Result<GriddedStore> {
        let meta = self.load_meta(source, specs)?;
        self.load_array(source, meta, specs)
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn driver(&self) -> &Arc<dyn RasterDriver> {
        &self.driver
    }
}
