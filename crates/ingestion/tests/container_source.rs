//! Container sources exercised through the in-memory driver.

use std::sync::Arc;

use ingestion::{
    BandSpec, IngestConfig, Ingester, IngestionError, SourceKind, SourceLocator,
};
use ndarray::Array2;
use raster_common::{BoundingBox, GeoTransform, PixelWindow};
use raster_reader::{MemoryDataset, MemoryDriver};
use test_utils::assert_coords_approx_eq;

const CONTAINER: &str = "MOD09GA.hdf";

fn sub(name: &str) -> String {
    format!("HDF4_EOS:EOS_GRID:\"{CONTAINER}\":MODIS_Grid_500m:{name}")
}

/// Two reflectance bands on slightly different grids.
fn modis_driver() -> Arc<MemoryDriver> {
    let red = Array2::from_shape_fn((3, 4), |(r, c)| (r * 4 + c) as f32);
    let nir = Array2::from_shape_fn((6, 8), |(r, c)| 100.0 + (r * 8 + c) as f32);
    Arc::new(
        MemoryDriver::new()
            .with(
                CONTAINER,
                MemoryDataset::container([sub("sur_refl_b01"), sub("sur_refl_b02")])
                    .with_tag("SHORTNAME", "MOD09GA"),
            )
            .with(
                sub("sur_refl_b01"),
                MemoryDataset::raster(red, GeoTransform::from_gdal([0.0, 2.0, 0.0, 6.0, 0.0, -2.0]))
                    .with_tag("long_name", "Surface Reflectance Band 1"),
            )
            .with(
                sub("sur_refl_b02"),
                MemoryDataset::raster(nir, GeoTransform::from_gdal([0.0, 1.0, 0.0, 6.0, 0.0, -1.0]))
                    .with_tag("long_name", "Surface Reflectance Band 2"),
            ),
    )
}

fn ingester(driver: Arc<MemoryDriver>) -> Ingester {
    Ingester::new(driver, IngestConfig::default()).unwrap()
}

#[test]
fn test_container_default_names() {
    let driver = modis_driver();
    let source = SourceLocator::Container(CONTAINER.into());
    let ingester = ingester(driver.clone());

    let meta = ingester.load_meta(&source, None).unwrap();
    assert_eq!(meta.kind, SourceKind::Container);
    assert_eq!(meta.container_metadata["SHORTNAME"], "MOD09GA");
    assert_eq!((meta.height, meta.width), (3, 4));

    let store = ingester.load_array(&source, meta, None).unwrap();
    assert_eq!(store.band_order(), ["band_0", "band_1"]);

    // Each band keeps its own grid and coordinates.
    let b0 = store.get("band_0").unwrap();
    let b1 = store.get("band_1").unwrap();
    assert_eq!(b0.shape(), (3, 4));
    assert_eq!(b1.shape(), (6, 8));
    assert_coords_approx_eq!((b0.x_coords[0], b0.y_coords[0]), (1.0, 5.0), 1e-12);
    assert_coords_approx_eq!((b1.x_coords[0], b1.y_coords[0]), (0.5, 5.5), 1e-12);
    assert_eq!(
        store.attrs().aggregate_bounds,
        Some(BoundingBox::new(0.0, 0.0, 8.0, 6.0))
    );
    assert_eq!(driver.open_handles(), 0);
}

#[test]
fn test_container_pattern_specs() {
    let driver = modis_driver();
    let source = SourceLocator::Container(CONTAINER.into());
    let specs = vec![
        BandSpec::pattern("nir", "long_name", "band 2$", false, true).unwrap(),
        BandSpec::pattern("red", "long_name", "band 1$", false, true)
            .unwrap()
            .with_window(PixelWindow::new((0, 2), (0, 2))),
    ];

    let store = ingester(driver).ingest(&source, Some(&specs)).unwrap();
    assert_eq!(store.band_order(), ["nir", "red"]);
    assert_eq!(store.get("red").unwrap().shape(), (2, 2));
    assert_eq!(store.get("nir").unwrap().values[[0, 0]], 100.0);
}

#[test]
fn test_unopenable_container() {
    let driver = modis_driver();
    let source = SourceLocator::Container("missing.hdf".into());
    let err = ingester(driver.clone()).load_meta(&source, None).unwrap_err();
    assert!(matches!(err, IngestionError::Open { .. }));
    assert_eq!(driver.open_handles(), 0);
}

#[test]
fn test_read_failure_releases_every_handle() {
    let driver = modis_driver();
    driver.insert(
        sub("sur_refl_b02"),
        MemoryDataset::raster(Array2::zeros((6, 8)), GeoTransform::default()).with_failing_reads(),
    );
    let source = SourceLocator::Container(CONTAINER.into());

    let err = ingester(driver.clone()).ingest(&source, None).unwrap_err();
    assert!(matches!(err, IngestionError::Read { .. }));
    assert_eq!(driver.open_handles(), 0);
}

#[test]
fn test_three_dimensional_buffer_is_shape_error() {
    let driver = Arc::new(
        MemoryDriver::new()
            .with("cube.nc", MemoryDataset::container(["cube.nc:t"]))
            .with(
                "cube.nc:t",
                MemoryDataset::multiband(ndarray::Array3::zeros((2, 3, 3)), GeoTransform::default()),
            ),
    );
    let source = SourceLocator::Container("cube.nc".into());
    let err = ingester(driver.clone()).ingest(&source, None).unwrap_err();
    assert!(matches!(err, IngestionError::Shape(ref shape) if shape == &[2, 3, 3]));
    assert_eq!(driver.open_handles(), 0);
}
