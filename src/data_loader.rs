//! NetCDF data loading functionality.
//!
//! This module reads a NetCDF file into a [`MemoryDataset`]. All metadata is
//! extracted. Values are read eagerly for variables of rank 1 and 2, which
//! covers coordinate and bounds variables; larger data variables are
//! described by metadata only.

use ndarray::{ArrayD, IxDyn};
use netcdf::{self, Attribute, Variable as NetCDFVariable};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::dataset::{AttributeValue, Dimension, MemoryDataset, Metadata, Variable};
use crate::error::{GridclipError, Result};
use crate::logging::log_timed_operation;

/// Highest rank whose values are read into memory
const MAX_EAGER_RANK: usize = 2;

/// Load a NetCDF file into an in-memory dataset
pub fn load_netcdf(path: &Path) -> Result<MemoryDataset> {
    log_timed_operation("netcdf_load", || {
        // Check if the file exists
        if !path.exists() {
            return Err(GridclipError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )));
        }

        let file = netcdf::open(path)?;

        info!("Opened NetCDF file: {}", path.display());
        debug!("File has {} variables", file.variables().count());
        debug!("File has {} dimensions", file.dimensions().count());

        let metadata = extract_metadata(&file)?;
        let data = extract_data(&file, &metadata)?;

        let dataset = MemoryDataset::from_parts(metadata, data);
        dataset.validate()?;
        Ok(dataset)
    })
}

/// Extract metadata from the NetCDF file
fn extract_metadata(file: &netcdf::File) -> Result<Metadata> {
    // Extract global attributes
    let mut global_attributes = HashMap::new();
    for attr in file.attributes() {
        let value = convert_attribute(&attr)?;
        global_attributes.insert(attr.name().to_string(), value);
    }

    // Extract dimensions
    let mut dimensions = HashMap::new();
    for dim in file.dimensions() {
        let dimension = Dimension {
            name: dim.name().to_string(),
            size: dim.len(),
            is_unlimited: dim.is_unlimited(),
        };
        dimensions.insert(dim.name().to_string(), dimension);
    }

    // Extract variables and their metadata
    let mut variables = HashMap::new();
    for var in file.variables() {
        // Skip variables we can't handle (non-numeric types)
        if !is_supported_variable(&var) {
            warn!("Skipping unsupported variable: {}", var.name());
            continue;
        }

        let var_dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|dim| dim.name().to_string())
            .collect();
        let var_shape: Vec<usize> = var.dimensions().iter().map(|dim| dim.len()).collect();

        let mut var_attrs = HashMap::new();
        for attr in var.attributes() {
            let value = convert_attribute(&attr)?;
            var_attrs.insert(attr.name().to_string(), value);
        }

        variables.insert(
            var.name().to_string(),
            Variable {
                name: var.name().to_string(),
                dimensions: var_dims,
                shape: var_shape,
                attributes: var_attrs,
            },
        );
    }

    Ok(Metadata {
        global_attributes,
        dimensions,
        variables,
    })
}

/// Check if a variable has a supported type that we can work with
fn is_supported_variable(var: &NetCDFVariable) -> bool {
    use netcdf::types::{BasicType, VariableType};

    matches!(
        var.vartype(),
        VariableType::Basic(BasicType::Byte)
            | VariableType::Basic(BasicType::Ubyte)
            | VariableType::Basic(BasicType::Short)
            | VariableType::Basic(BasicType::Ushort)
            | VariableType::Basic(BasicType::Int)
            | VariableType::Basic(BasicType::Uint)
            | VariableType::Basic(BasicType::Int64)
            | VariableType::Basic(BasicType::Uint64)
            | VariableType::Basic(BasicType::Float)
            | VariableType::Basic(BasicType::Double)
    )
}

/// Convert a NetCDF attribute to our AttributeValue enum
fn convert_attribute(attr: &Attribute) -> Result<AttributeValue> {
    use netcdf::AttributeValue as NcAttributeValue;

    let value = attr.value()?;

    match value {
        NcAttributeValue::Str(s) => Ok(AttributeValue::Text(s)),

        // Numeric scalars are stored as f64
        NcAttributeValue::Uchar(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Schar(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Short(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Int(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Float(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Double(v) => Ok(AttributeValue::Number(v)),

        NcAttributeValue::Shorts(v) => Ok(AttributeValue::NumberArray(
            v.into_iter().map(|x| x as f64).collect(),
        )),
        NcAttributeValue::Ints(v) => Ok(AttributeValue::NumberArray(
            v.into_iter().map(|x| x as f64).collect(),
        )),
        NcAttributeValue::Floats(v) => Ok(AttributeValue::NumberArray(
            v.into_iter().map(|x| x as f64).collect(),
        )),
        NcAttributeValue::Doubles(v) => Ok(AttributeValue::NumberArray(v)),

        // Anything else keeps a text rendering
        other => Ok(AttributeValue::Text(format!("{:?}", other))),
    }
}

/// Read the values of every small variable
fn extract_data(file: &netcdf::File, metadata: &Metadata) -> Result<HashMap<String, ArrayD<f64>>> {
    let mut data = HashMap::new();

    for (var_name, var_meta) in &metadata.variables {
        if var_meta.dimensions.is_empty() || var_meta.dimensions.len() > MAX_EAGER_RANK {
            continue;
        }
        if let Some(var) = file.variable(var_name) {
            let array = convert_variable_to_array(&var, &var_meta.shape)?;
            data.insert(var_name.clone(), array);
        }
    }

    debug!("Read values of {} variables", data.len());
    Ok(data)
}

/// Convert a NetCDF variable to an ndarray ArrayD<f64>
fn convert_variable_to_array(var: &NetCDFVariable, shape: &[usize]) -> Result<ArrayD<f64>> {
    use netcdf::types::{BasicType, VariableType};

    let values: Vec<f64> = match var.vartype() {
        VariableType::Basic(BasicType::Byte) => var
            .get_values::<i8, _>(&[] as &[netcdf::Extent])?
            .into_iter()
            .map(f64::from)
            .collect(),
        VariableType::Basic(BasicType::Ubyte) => var
            .get_values::<u8, _>(&[] as &[netcdf::Extent])?
            .into_iter()
            .map(f64::from)
            .collect(),
        VariableType::Basic(BasicType::Short) => var
            .get_values::<i16, _>(&[] as &[netcdf::Extent])?
            .into_iter()
            .map(f64::from)
            .collect(),
        VariableType::Basic(BasicType::Ushort) => var
            .get_values::<u16, _>(&[] as &[netcdf::Extent])?
            .into_iter()
            .map(f64::from)
            .collect(),
        VariableType::Basic(BasicType::Int) => var
            .get_values::<i32, _>(&[] as &[netcdf::Extent])?
            .into_iter()
            .map(f64::from)
            .collect(),
        VariableType::Basic(BasicType::Uint) => var
            .get_values::<u32, _>(&[] as &[netcdf::Extent])?
            .into_iter()
            .map(f64::from)
            .collect(),
        // 64-bit integers may lose precision beyond 2^53
        VariableType::Basic(BasicType::Int64) => var
            .get_values::<i64, _>(&[] as &[netcdf::Extent])?
            .into_iter()
            .map(|v| v as f64)
            .collect(),
        VariableType::Basic(BasicType::Uint64) => var
            .get_values::<u64, _>(&[] as &[netcdf::Extent])?
            .into_iter()
            .map(|v| v as f64)
            .collect(),
        VariableType::Basic(BasicType::Float) => var
            .get_values::<f32, _>(&[] as &[netcdf::Extent])?
            .into_iter()
            .map(f64::from)
            .collect(),
        VariableType::Basic(BasicType::Double) => {
            var.get_values::<f64, _>(&[] as &[netcdf::Extent])?
        }
        other => {
            return Err(GridclipError::DataNotFound {
                message: format!("Unsupported variable type for {}: {:?}", var.name(), other),
            })
        }
    };

    Ok(ArrayD::from_shape_vec(IxDyn(shape), values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use tempfile::tempdir;

    /// Create a small NetCDF file with a 2x3 grid and bounds
    fn create_test_netcdf_file(path: &Path) -> Result<()> {
        let mut file = netcdf::create(path)?;

        file.add_dimension("time", 2)?;
        file.add_dimension("lat", 2)?;
        file.add_dimension("lon", 3)?;
        file.add_dimension("bnds", 2)?;
        file.add_attribute("title", "Gridclip Test File")?;

        // Written as int64, the way xarray encodes times by default
        let mut time = file.add_variable::<i64>("time", &["time"])?;
        time.put_attribute("axis", "T")?;
        time.put_attribute("units", "days since 2000-01-01")?;
        time.put_attribute("calendar", "standard")?;
        time.put_values(&[0i64, 1], &[..])?;

        let mut station = file.add_variable::<u16>("station_id", &["lon"])?;
        station.put_values(&[7u16, 8, 9], &[..])?;

        let mut lat = file.add_variable::<f64>("lat", &["lat"])?;
        lat.put_attribute("bounds", "lat_bnds")?;
        lat.put_values(&[0.5, 1.5], &[..])?;

        let mut lat_bnds = file.add_variable::<f64>("lat_bnds", &["lat", "bnds"])?;
        lat_bnds.put_values(&[0.0, 1.0, 1.0, 2.0], &[..])?;

        let mut lon = file.add_variable::<f32>("lon", &["lon"])?;
        lon.put_attribute("bounds", "lon_bnds")?;
        lon.put_values(&[0.5f32, 1.5, 2.5], &[..])?;

        let mut lon_bnds = file.add_variable::<f32>("lon_bnds", &["lon", "bnds"])?;
        lon_bnds.put_values(&[0.0f32, 1.0, 1.0, 2.0, 2.0, 3.0], &[..])?;

        let mut tas = file.add_variable::<f32>("tas", &["time", "lat", "lon"])?;
        tas.put_attribute("units", "K")?;
        let values: Vec<f32> = (0..12).map(|i| i as f32).collect();
        tas.put_values(&values, &[..])?;

        Ok(())
    }

    #[test]
    fn test_file_not_found() {
        let result = load_netcdf(Path::new("/nonexistent/file.nc"));
        match result.unwrap_err() {
            GridclipError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("Expected IO error, got {:?}", other),
        }
    }

    #[test]
    fn test_netcdf_loading() -> Result<()> {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.nc");
        create_test_netcdf_file(&file_path)?;

        let dataset = load_netcdf(&file_path)?;

        assert!(dataset.metadata.global_attributes.contains_key("title"));
        assert_eq!(dataset.metadata.dimensions["lon"].size, 3);
        assert_eq!(dataset.get_dimension_names("tas")?, vec!["time", "lat", "lon"]);

        // Coordinates and bounds are read, f32 widened to f64
        assert_eq!(dataset.read_values("lon")?.as_slice().unwrap(), &[0.5, 1.5, 2.5]);
        assert_eq!(dataset.read_values("lat_bnds")?.shape(), &[2, 2]);

        // 64-bit and unsigned integer variables are widened too
        assert_eq!(dataset.read_values("time")?.as_slice().unwrap(), &[0.0, 1.0]);
        assert_eq!(dataset.read_values("station_id")?.as_slice().unwrap(), &[7.0, 8.0, 9.0]);

        let dim_map = crate::axis::discover(&dataset, "tas")?;
        assert_eq!(dim_map.get(crate::axis::AxisTag::T).variable(), Some("time"));

        // The data variable is described but not read
        assert!(dataset.has_variable("tas"));
        assert!(dataset.read_values("tas").is_err());
        Ok(())
    }

    #[test]
    fn test_attribute_conversion() -> Result<()> {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.nc");
        create_test_netcdf_file(&file_path)?;

        let dataset = load_netcdf(&file_path)?;

        match &dataset.metadata.global_attributes["title"] {
            AttributeValue::Text(text) => assert_eq!(text, "Gridclip Test File"),
            other => panic!("Expected Text attribute, got {:?}", other),
        }
        assert_eq!(
            dataset.get_attribute("lat", "bounds").and_then(|a| a.as_str()),
            Some("lat_bnds")
        );
        assert_eq!(
            dataset.get_attribute("time", "calendar").and_then(|a| a.as_str()),
            Some("standard")
        );
        Ok(())
    }
}
