//! Common geometry types shared by the raster reader and ingestion crates.

pub mod bbox;
pub mod error;
pub mod geotransform;
pub mod window;

pub use bbox::BoundingBox;
pub use error::{GeoError, GeoResult};
pub use geotransform::{bounds, coordinates, GeoTransform};
pub use window::PixelWindow;
