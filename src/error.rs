//! Error types for gridclip.
//!
//! Every failure is fatal to the current request. Variants carry the axis,
//! variable or cell index involved so a failure can be diagnosed from the
//! message alone.

use thiserror::Error;

use crate::axis::AxisTag;

/// The main error type for gridclip operations.
#[derive(Error, Debug)]
pub enum GridclipError {
    /// NetCDF file operation errors
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Array shape errors
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A dimension of the target variable has no coordinate variable
    #[error("Missing coordinate variable for dimension '{dimension}' of variable '{variable}'")]
    MissingCoordinateVariable { variable: String, dimension: String },

    /// Conflicting bounds declarations
    #[error("Ambiguous bounds reference on '{variable}': {message}")]
    AmbiguousBoundsReference { variable: String, message: String },

    /// Temporal axis without units or calendar and no override
    #[error("Missing temporal metadata: variable '{variable}' has no '{attribute}' attribute")]
    MissingTemporalMetadata { variable: String, attribute: String },

    /// Wrapping removed every part of a geometry
    #[error("Geometry {} is empty after wrap/unwrap", format_index(.index))]
    EmptyGeometryAfterWrap { index: Option<(usize, usize)> },

    /// Query polygon with no area
    #[error("Degenerate query geometry: area {area}")]
    DegenerateQueryGeometry { area: f64 },

    /// Only WGS84 is supported
    #[error("Unsupported projection: {proj4}")]
    UnsupportedProjection { proj4: String },

    /// Only `point` and `polygon` abstractions are supported
    #[error("Unsupported abstraction: {name}. Must be one of: point, polygon")]
    UnsupportedAbstraction { name: String },

    /// The axis tag of a coordinate variable could not be determined
    #[error("Cannot resolve axis for dimension '{dimension}' of variable '{variable}': {message}")]
    AxisUnresolved {
        variable: String,
        dimension: String,
        message: String,
    },

    /// Two dimensions resolved to the same axis tag
    #[error("Axis {axis} is claimed by both '{first}' and '{second}'")]
    DuplicateAxis {
        axis: AxisTag,
        first: String,
        second: String,
    },

    /// Polygon cells need bounds on both spatial axes
    #[error("Axis {axis} ('{variable}') has no bounds; polygon abstraction requires bounds")]
    MissingBounds { axis: AxisTag, variable: String },

    /// Unparseable CF time units string
    #[error("Invalid time units '{units}': {message}")]
    InvalidTimeUnits { units: String, message: String },

    /// Unknown CF calendar name
    #[error("Unsupported calendar: {calendar}")]
    UnsupportedCalendar { calendar: String },

    /// Data not found errors
    #[error("Data not found: {message}")]
    DataNotFound { message: String },

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// Selection was cancelled by the caller
    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },
}

fn format_index(index: &Option<(usize, usize)>) -> String {
    match index {
        Some((row, col)) => format!("at row {}, col {}", row, col),
        None => "(no cell index)".to_string(),
    }
}

/// Convenience type alias for Results with GridclipError
pub type Result<T> = std::result::Result<T, GridclipError>;
