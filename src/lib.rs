//! # gridclip
//!
//! Derive cell geometries from gridded climate data and subset them against
//! arbitrary polygons.
//!
//! Given a NetCDF-style dataset and the name of a gridded variable, gridclip
//! discovers which dimensions are time, level, row and column, decodes their
//! coordinates, builds the grid of cell geometries and selects the cells that
//! intersect a query polygon.
//!
//! ## Architecture
//!
//! - **Data Layer**: [`dataset`] abstracts named variables and attributes;
//!   `data_loader` reads NetCDF files into memory
//! - **Axes**: [`axis`] maps dimensions to axes and decodes coordinates,
//!   including CF time
//! - **Grid**: [`grid`] builds cell envelopes and geometries; [`wrap`]
//!   converts between the -180..180 and 0..360 longitude conventions
//! - **Selection**: [`select`] filters cells against a query polygon
//!
//! ## Example
//!
//! ```no_run
//! use gridclip::{query, select::SelectOptions, Config, DatasetInterface};
//! # fn main() -> gridclip::Result<()> {
//! let dataset = gridclip::data_loader::load_netcdf(std::path::Path::new("tas.nc"))?;
//! let config = Config::default();
//! let iface = DatasetInterface::open(&dataset, "tas", &config.overrides)?;
//! let selection = iface.select(&query::parse_bbox("-10,-5,10,5")?, &SelectOptions::default())?;
//! println!("{} cells selected", selection.len());
//! # Ok(())
//! # }
//! ```

pub mod axis;
pub mod config;
#[cfg(feature = "netcdf")]
pub mod data_loader;
pub mod dataset;
pub mod error;
pub mod grid;
pub mod interface;
pub mod logging;
pub mod query;
pub mod select;
pub mod wrap;

pub use axis::{AxisEntry, AxisTag, AxisWarning, DimensionMap};
pub use config::{Config, Overrides, SelectionConfig};
pub use dataset::{AttributeValue, Dataset, Dimension, MemoryDataset, Metadata, Variable};
pub use error::{GridclipError, Result};
pub use grid::{Abstraction, Grid, Projection};
pub use interface::DatasetInterface;
pub use logging::{
    generate_operation_id, init_tracing, log_error, log_grid_stats, log_operation_end,
    log_operation_start, log_selection_stats, log_timed_operation,
};
pub use select::{select, select_all, SelectOptions, Selection, SpatialOperation};
pub use wrap::{Convention, WrapState};
