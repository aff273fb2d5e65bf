//! NetCDF / HDF container driver using the native netcdf library.
//!
//! A container file exposes every variable with at least two dimensions as a
//! subdataset, referenced GDAL-style as `NETCDF:"<path>":<variable>`. The last
//! two dimensions of a variable are its rows and columns; any leading
//! dimensions are flattened into bands.

use std::sync::Once;

use ndarray::Array3;
use netcdf::{AttributeValue, Variable};
use raster_common::GeoTransform;
use tracing::debug;

use crate::driver::{extract_window, RasterBuffer, RasterDriver, RasterHandle, ReadRequest, Tags};
use crate::error::{ReaderError, ReaderResult};

/// Locator prefix for container subdatasets.
pub const SUBDATASET_PREFIX: &str = "NETCDF:";

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints diagnostics to stderr even when the Rust side
/// handles the error (for example when probing optional attributes). Safe to
/// call repeatedly; only the first call does anything.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable error output.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Build the locator of one variable inside a container.
pub fn subdataset_locator(path: &str, variable: &str) -> String {
    format!("{SUBDATASET_PREFIX}\"{path}\":{variable}")
}

/// Split a subdataset locator into `(path, variable)`.
pub fn parse_subdataset_locator(locator: &str) -> Option<(&str, &str)> {
    let rest = locator.strip_prefix(SUBDATASET_PREFIX)?;
    if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.find('"')?;
        let variable = quoted[end + 1..].strip_prefix(':')?;
        Some((&quoted[..end], variable))
    } else {
        let (path, variable) = rest.rsplit_once(':')?;
        Some((path, variable))
    }
}

/// Opens NetCDF/HDF containers and their variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetcdfDriver;

impl NetcdfDriver {
    pub fn new() -> Self {
        Self
    }
}

impl RasterDriver for NetcdfDriver {
    fn name(&self) -> &'static str {
        "netCDF"
    }

    fn open(&self, locator: &str) -> ReaderResult<Box<dyn RasterHandle>> {
        silence_hdf5_errors();

        match parse_subdataset_locator(locator) {
            Some((path, variable)) => Ok(Box::new(VariableHandle::open(locator, path, variable)?)),
            None => Ok(Box::new(ContainerHandle::open(locator)?)),
        }
    }
}

/// The container itself: global attributes plus a subdataset list.
struct ContainerHandle {
    locator: String,
    file: netcdf::File,
}

impl ContainerHandle {
    fn open(path: &str) -> ReaderResult<Self> {
        let file = netcdf::open(path).map_err(|e| ReaderError::open_failed(path, e))?;
        Ok(Self {
            locator: path.to_string(),
            file,
        })
    }

    fn raster_variables(&self) -> Vec<Variable<'_>> {
        self.file
            .variables()
            .filter(|v| v.dimensions().len() >= 2)
            .collect()
    }
}

impl RasterHandle for ContainerHandle {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn tags(&self) -> Tags {
        self.file
            .attributes()
            .filter_map(|attr| {
                let value = attr.value().ok()?;
                Some((attr.name().to_string(), attribute_to_string(&value)?))
            })
            .collect()
    }

    fn dimensions(&self) -> (usize, usize) {
        self.raster_variables()
            .first()
            .map(spatial_shape)
            .unwrap_or((0, 0))
    }

    fn band_count(&self) -> usize {
        0
    }

    fn geotransform(&self) -> GeoTransform {
        GeoTransform::default()
    }

    fn subdatasets(&self) -> Vec<String> {
        self.raster_variables()
            .iter()
            .map(|v| subdataset_locator(&self.locator, &v.name()))
            .collect()
    }

    fn read(&mut self, _request: &ReadRequest) -> ReaderResult<RasterBuffer> {
        Err(ReaderError::read_failed(
            &self.locator,
            "container has no pixels; open a subdataset",
        ))
    }
}

/// One variable of a container.
struct VariableHandle {
    locator: String,
    file: netcdf::File,
    variable: String,
    bands: usize,
    height: usize,
    width: usize,
    geotransform: GeoTransform,
}

impl VariableHandle {
    fn open(locator: &str, path: &str, variable: &str) -> ReaderResult<Self> {
        let file = netcdf::open(path).map_err(|e| ReaderError::open_failed(locator, e))?;
        let var = file.variable(variable).ok_or_else(|| {
            ReaderError::open_failed(locator, format!("no variable named {variable}"))
        })?;

        let dims = var.dimensions();
        if dims.len() < 2 {
            return Err(ReaderError::open_failed(
                locator,
                format!("variable {variable} has {} dimension(s)", dims.len()),
            ));
        }
        let (height, width) = spatial_shape(&var);
        let bands = dims[..dims.len() - 2].iter().map(|d| d.len()).product();
        let geotransform = variable_geotransform(&file, &var);
        drop(var);

        debug!(
            locator = %locator,
            height = height,
            width = width,
            bands = bands,
            "Opened NetCDF variable"
        );

        Ok(Self {
            locator: locator.to_string(),
            file,
            variable: variable.to_string(),
            bands,
            height,
            width,
            geotransform,
        })
    }

    fn var(&self) -> ReaderResult<Variable<'_>> {
        self.file
            .variable(&self.variable)
            .ok_or_else(|| ReaderError::read_failed(&self.locator, "variable disappeared"))
    }
}

impl RasterHandle for VariableHandle {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn tags(&self) -> Tags {
        let mut tags: Tags = match self.var() {
            Ok(var) => var
                .attributes()
                .filter_map(|attr| {
                    let value = attr.value().ok()?;
                    Some((attr.name().to_string(), attribute_to_string(&value)?))
                })
                .collect(),
            Err(_) => Tags::new(),
        };
        tags.insert("NETCDF_VARNAME".to_string(), self.variable.clone());
        tags
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    fn band_count(&self) -> usize {
        self.bands
    }

    fn geotransform(&self) -> GeoTransform {
        self.geotransform
    }

    fn read(&mut self, request: &ReadRequest) -> ReaderResult<RasterBuffer> {
        let (window, out_height, out_width) = request.resolve(self.height, self.width)?;
        let var = self.var()?;

        let raw: Vec<f32> = var
            .get_values(..)
            .map_err(|e| ReaderError::read_failed(&self.locator, e))?;

        let scale_factor = f64_attr(&var, "scale_factor").unwrap_or(1.0) as f32;
        let add_offset = f64_attr(&var, "add_offset").unwrap_or(0.0) as f32;
        let fill_value = f64_attr(&var, "_FillValue").map(|v| v as f32);

        let data: Vec<f32> = raw
            .into_iter()
            .map(|val| match fill_value {
                Some(fill) if val == fill => f32::NAN,
                _ => val * scale_factor + add_offset,
            })
            .collect();

        let bands = Array3::from_shape_vec((self.bands, self.height, self.width), data)
            .map_err(|e| ReaderError::read_failed(&self.locator, e))?;
        Ok(extract_window(bands.view(), &window, out_height, out_width).into_dyn())
    }
}

fn spatial_shape(var: &Variable<'_>) -> (usize, usize) {
    let dims = var.dimensions();
    let n = dims.len();
    (dims[n - 2].len(), dims[n - 1].len())
}

/// GDAL `GeoTransform` on the grid-mapping variable, else coordinate
/// variables, else identity.
fn variable_geotransform(file: &netcdf::File, var: &Variable<'_>) -> GeoTransform {
    let from_grid_mapping = string_attr(var, "grid_mapping")
        .and_then(|name| file.variable(&name))
        .and_then(|gm| string_attr(&gm, "GeoTransform"))
        .and_then(|s| GeoTransform::parse(&s).ok());
    if let Some(gt) = from_grid_mapping {
        return gt;
    }

    let dims = var.dimensions();
    let n = dims.len();
    let axis = |name: String| -> Option<(f64, f64)> {
        let coord = file.variable(&name)?;
        let values: Vec<f64> = coord.get_values(..).ok()?;
        let first = *values.first()?;
        let step = values.get(1).map(|second| second - first).unwrap_or(1.0);
        Some((first - step / 2.0, step))
    };

    match (axis(dims[n - 1].name()), axis(dims[n - 2].name())) {
        (Some((x0, dx)), Some((y0, dy))) => GeoTransform::from_gdal([x0, dx, 0.0, y0, 0.0, dy]),
        _ => GeoTransform::default(),
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when probing optional attributes.
fn has_attr(var: &Variable<'_>, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn f64_attr(var: &Variable<'_>, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let value = var.attribute_value(name)?.ok()?;
    f64::try_from(value).ok()
}

fn string_attr(var: &Variable<'_>, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

fn attribute_to_string(value: &AttributeValue) -> Option<String> {
    fn join<T: ToString>(values: &[T]) -> String {
        values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    let s = match value {
        AttributeValue::Str(s) => s.clone(),
        AttributeValue::Strs(v) => v.join(" "),
        AttributeValue::Double(x) => x.to_string(),
        AttributeValue::Doubles(v) => join(v),
        AttributeValue::Float(x) => x.to_string(),
        AttributeValue::Floats(v) => join(v),
        AttributeValue::Int(x) => x.to_string(),
        AttributeValue::Ints(v) => join(v),
        AttributeValue::Short(x) => x.to_string(),
        AttributeValue::Shorts(v) => join(v),
        AttributeValue::Uchar(x) => x.to_string(),
        AttributeValue::Schar(x) => x.to_string(),
        AttributeValue::Ushort(x) => x.to_string(),
        AttributeValue::Uint(x) => x.to_string(),
        AttributeValue::Longlong(x) => x.to_string(),
        AttributeValue::Ulonglong(x) => x.to_string(),
        _ => return None,
    };
    Some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdataset_locator_roundtrip() {
        let locator = subdataset_locator("/data/scene.nc", "reflectance_b4");
        assert_eq!(locator, "NETCDF:\"/data/scene.nc\":reflectance_b4");
        assert_eq!(
            parse_subdataset_locator(&locator),
            Some(("/data/scene.nc", "reflectance_b4"))
        );
    }

    #[test]
    fn test_parse_unquoted_locator() {
        assert_eq!(
            parse_subdataset_locator("NETCDF:scene.nc:temp"),
            Some(("scene.nc", "temp"))
        );
        assert_eq!(parse_subdataset_locator("/data/scene.nc"), None);
    }
}
