//! Common test fixtures for raster ingestion tests.
//!
//! Geotransforms are in GDAL ordering `[x0, dx, rx, y0, ry, dy]`.

/// Reference geotransforms.
pub mod geotransforms {
    /// 30 m UTM grid, north-up (Landsat-like).
    pub const UTM_30M: [f64; 6] = [399_960.0, 30.0, 0.0, 4_200_000.0, 0.0, -30.0];

    /// Quarter-degree global grid, north-up.
    pub const GLOBAL_QUARTER_DEGREE: [f64; 6] = [-180.0, 0.25, 0.0, 90.0, 0.0, -0.25];

    /// Unit grid anchored at the origin with row advancing south.
    pub const UNIT_NORTH_UP: [f64; 6] = [0.0, 1.0, 0.0, 0.0, 0.0, -1.0];

    /// Small rotation (skew terms set).
    pub const ROTATED: [f64; 6] = [1000.0, 10.0, 2.0, 5000.0, 1.5, -10.0];
}

/// Band tag values commonly found in spectral products.
pub mod bands {
    /// `(file_name, band tag)` for a three-band directory source.
    pub const LANDSAT_FILES: [(&str, &str); 3] = [
        ("LC08_B2.TIF", "blue"),
        ("LC08_B4.TIF", "red"),
        ("LC08_B5.TIF", "nir"),
    ];

    /// Tag key used by the band directory writer.
    pub const BAND_KEY: &str = "band";
}
