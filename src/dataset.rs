//! Dataset abstraction consumed by axis discovery.
//!
//! A [`Dataset`] exposes named dimensions, named variables and per-variable
//! attributes. [`MemoryDataset`] is the in-memory implementation used by the
//! NetCDF loader and by tests.

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{GridclipError, Result};

/// Metadata about a dataset dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Name of the dimension
    pub name: String,
    /// Size of the dimension
    pub size: usize,
    /// Whether this dimension is unlimited
    pub is_unlimited: bool,
}

/// Metadata about a dataset variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Name of the variable
    pub name: String,
    /// Dimensions of the variable
    pub dimensions: Vec<String>,
    /// Shape of the variable (dimension sizes)
    pub shape: Vec<usize>,
    /// Variable attributes
    pub attributes: HashMap<String, AttributeValue>,
}

/// Possible attribute values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String attribute
    Text(String),
    /// Numeric attribute (stored as f64 for simplicity)
    Number(f64),
    /// Array of numbers
    NumberArray(Vec<f64>),
}

impl AttributeValue {
    /// The attribute as text, if it is a string attribute
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(value: Vec<f64>) -> Self {
        AttributeValue::NumberArray(value)
    }
}

/// Dimension and variable metadata of a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// File-level attributes
    pub global_attributes: HashMap<String, AttributeValue>,
    /// Dimensions in the file
    pub dimensions: HashMap<String, Dimension>,
    /// Variables in the file
    pub variables: HashMap<String, Variable>,
}

/// Minimal read surface required from a gridded dataset.
pub trait Dataset {
    /// Look up a variable's metadata by name
    fn get_variable(&self, name: &str) -> Option<&Variable>;

    /// Look up a string-keyed attribute of a variable
    fn get_attribute(&self, variable: &str, name: &str) -> Option<&AttributeValue> {
        self.get_variable(variable)
            .and_then(|var| var.attributes.get(name))
    }

    /// Ordered dimension names of a variable
    fn get_dimension_names(&self, variable: &str) -> Result<Vec<String>> {
        self.get_variable(variable)
            .map(|var| var.dimensions.clone())
            .ok_or_else(|| GridclipError::DataNotFound {
                message: format!("Variable not found: {}", variable),
            })
    }

    /// Read a variable's values, decoded to f64, in its declared shape
    fn read_values(&self, variable: &str) -> Result<ArrayD<f64>>;
}

/// A dataset held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    /// Dataset metadata
    pub metadata: Metadata,
    /// Loaded data arrays
    pub data: HashMap<String, ArrayD<f64>>,
}

impl MemoryDataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dataset from already extracted metadata and data
    pub fn from_parts(metadata: Metadata, data: HashMap<String, ArrayD<f64>>) -> Self {
        Self { metadata, data }
    }

    /// Declare a dimension
    pub fn add_dimension(&mut self, name: &str, size: usize) -> &mut Self {
        self.metadata.dimensions.insert(
            name.to_string(),
            Dimension {
                name: name.to_string(),
                size,
                is_unlimited: false,
            },
        );
        self
    }

    /// Add a variable over previously declared dimensions
    pub fn add_variable(&mut self, name: &str, dimensions: &[&str], values: Vec<f64>) -> Result<()> {
        let shape = dimensions
            .iter()
            .map(|dim| {
                self.metadata
                    .dimensions
                    .get(*dim)
                    .map(|d| d.size)
                    .ok_or_else(|| GridclipError::DataNotFound {
                        message: format!(
                            "Variable {} references non-existent dimension {}",
                            name, dim
                        ),
                    })
            })
            .collect::<Result<Vec<usize>>>()?;

        let array = ArrayD::from_shape_vec(IxDyn(&shape), values)?;

        self.metadata.variables.insert(
            name.to_string(),
            Variable {
                name: name.to_string(),
                dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
                shape,
                attributes: HashMap::new(),
            },
        );
        self.data.insert(name.to_string(), array);
        Ok(())
    }

    /// Set an attribute on an existing variable
    pub fn add_attribute(
        &mut self,
        variable: &str,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<()> {
        let var = self
            .metadata
            .variables
            .get_mut(variable)
            .ok_or_else(|| GridclipError::DataNotFound {
                message: format!("Variable not found: {}", variable),
            })?;
        var.attributes.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Check if a variable exists
    pub fn has_variable(&self, name: &str) -> bool {
        self.metadata.variables.contains_key(name)
    }

    /// Validate that metadata and data arrays are consistent
    pub fn validate(&self) -> Result<()> {
        for (var_name, var) in &self.metadata.variables {
            for dim_name in &var.dimensions {
                if !self.metadata.dimensions.contains_key(dim_name) {
                    return Err(GridclipError::DataNotFound {
                        message: format!(
                            "Variable {} references non-existent dimension {}",
                            var_name, dim_name
                        ),
                    });
                }
            }

            if let Some(data) = self.data.get(var_name) {
                if data.shape() != var.shape.as_slice() {
                    return Err(GridclipError::DataNotFound {
                        message: format!(
                            "Variable {} has inconsistent shape between metadata ({:?}) and data ({:?})",
                            var_name,
                            var.shape,
                            data.shape()
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}

impl Dataset for MemoryDataset {
    fn get_variable(&self, name: &str) -> Option<&Variable> {
        self.metadata.variables.get(name)
    }

    fn read_values(&self, variable: &str) -> Result<ArrayD<f64>> {
        self.data
            .get(variable)
            .cloned()
            .ok_or_else(|| GridclipError::DataNotFound {
                message: format!("Data array for variable {} not loaded", variable),
            })
    }
}
