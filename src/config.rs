//! Configuration management for gridclip.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GridclipError, Result};
use crate::grid::{Abstraction, Projection};
use crate::select::{SpatialOperation, DEFAULT_CELL_SIZE};

/// Command-line arguments for gridclip
#[derive(Parser, Debug)]
#[command(name = "gridclip")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the NetCDF file to read
    pub netcdf_file: PathBuf,

    /// Name of the gridded variable to subset
    #[arg(short = 'v', long, env = "GRIDCLIP_VARIABLE")]
    pub variable: String,

    /// Query bounding box as min_lon,min_lat,max_lon,max_lat
    #[arg(short, long, allow_hyphen_values = true)]
    pub bbox: Option<String>,

    /// Query polygon as "x y, x y, ..." (an alternative to --bbox)
    #[arg(long, allow_hyphen_values = true, conflicts_with = "bbox")]
    pub polygon: Option<String>,

    /// Spatial operation (intersects, clip)
    #[arg(long, env = "GRIDCLIP_OPERATION")]
    pub operation: Option<String>,

    /// Scan candidate cells on the rayon thread pool
    #[arg(long, env = "GRIDCLIP_PARALLEL")]
    pub parallel: bool,

    /// Calendar override for the time axis
    #[arg(long, env = "GRIDCLIP_T_CALENDAR")]
    pub t_calendar: Option<String>,

    /// Units override for the time axis
    #[arg(long, env = "GRIDCLIP_T_UNITS")]
    pub t_units: Option<String>,

    /// Spatial abstraction override (point, polygon)
    #[arg(long, env = "GRIDCLIP_ABSTRACTION")]
    pub abstraction: Option<String>,

    /// Path to JSON configuration file
    #[arg(short, long, env = "GRIDCLIP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GRIDCLIP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// The dataset and query named on the command line
#[derive(Debug, Clone)]
pub struct Request {
    pub netcdf_file: PathBuf,
    pub variable: String,
    pub bbox: Option<String>,
    pub polygon: Option<String>,
}

/// Metadata overrides applied when opening a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    /// Calendar used instead of the time variable's `calendar` attribute
    #[serde(default)]
    pub t_calendar: Option<String>,

    /// Units used instead of the time variable's `units` attribute
    #[serde(default)]
    pub t_units: Option<String>,

    /// PROJ.4 string. Only the unset (WGS84) case is supported.
    #[serde(default)]
    pub s_proj4: Option<String>,

    /// Spatial abstraction; inferred from the row bounds when unset
    #[serde(default)]
    pub s_abstraction: Option<String>,
}

/// Selection tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Spatial operation applied to candidate cells
    #[serde(default = "default_operation")]
    pub operation: String,

    /// Scan candidates in parallel
    #[serde(default)]
    pub parallel: bool,

    /// Edge length of the query index cells
    #[serde(default = "default_index_cell_size")]
    pub index_cell_size: f64,

    /// Convert selected geometries of 0..360 grids to -180..180
    #[serde(default = "default_vector_wrap")]
    pub vector_wrap: bool,
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Dataset overrides
    #[serde(default)]
    pub overrides: Overrides,

    /// Selection configuration
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, Request)> {
        Self::from_args(Args::parse())
    }

    /// Build the configuration from already-parsed arguments
    pub fn from_args(args: Args) -> Result<(Self, Request)> {
        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        // Override with command-line arguments
        if let Some(operation) = args.operation {
            config.selection.operation = operation;
        }
        if args.parallel {
            config.selection.parallel = true;
        }
        if args.t_calendar.is_some() {
            config.overrides.t_calendar = args.t_calendar;
        }
        if args.t_units.is_some() {
            config.overrides.t_units = args.t_units;
        }
        if args.abstraction.is_some() {
            config.overrides.s_abstraction = args.abstraction;
        }
        config.log_level = args.log_level;

        let request = Request {
            netcdf_file: args.netcdf_file,
            variable: args.variable,
            bbox: args.bbox,
            polygon: args.polygon,
        };

        Ok((config, request))
    }

    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.overrides.t_calendar.is_some() {
            self.overrides.t_calendar = other.overrides.t_calendar;
        }
        if other.overrides.t_units.is_some() {
            self.overrides.t_units = other.overrides.t_units;
        }
        if other.overrides.s_proj4.is_some() {
            self.overrides.s_proj4 = other.overrides.s_proj4;
        }
        if other.overrides.s_abstraction.is_some() {
            self.overrides.s_abstraction = other.overrides.s_abstraction;
        }
        self.selection = other.selection;
        self.log_level = other.log_level;
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate log level
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(GridclipError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        if self.selection.operation.parse::<SpatialOperation>().is_err() {
            return Err(GridclipError::Config {
                message: format!(
                    "Invalid spatial operation: {}. Must be one of: intersects, clip",
                    self.selection.operation
                ),
            });
        }

        if !(self.selection.index_cell_size > 0.0) || !self.selection.index_cell_size.is_finite() {
            return Err(GridclipError::Config {
                message: format!(
                    "Index cell size must be a positive number, got {}",
                    self.selection.index_cell_size
                ),
            });
        }

        // Unsupported projections and abstractions keep their own error kinds
        Projection::from_proj4(self.overrides.s_proj4.as_deref())?;
        if let Some(name) = &self.overrides.s_abstraction {
            name.parse::<Abstraction>()?;
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            overrides: Overrides::default(),
            selection: SelectionConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            operation: default_operation(),
            parallel: false,
            index_cell_size: default_index_cell_size(),
            vector_wrap: default_vector_wrap(),
        }
    }
}

// Default value functions for serde
fn default_operation() -> String {
    "intersects".to_string()
}

fn default_index_cell_size() -> f64 {
    DEFAULT_CELL_SIZE
}

fn default_vector_wrap() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
