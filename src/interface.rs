//! Dataset interface: the discovered axes and grid of one target variable.

use geo::Polygon;
use tracing::info;

use crate::axis::{self, AxisTag, DimensionMap, SpatialAxis, TemporalInterface};
use crate::config::Overrides;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::grid::{Abstraction, Grid, Projection};
use crate::logging::{log_grid_stats, log_timed_operation};
use crate::select::{self, SelectOptions, Selection};

/// Everything needed to subset one variable of a dataset.
///
/// Built once per open and immutable afterwards.
#[derive(Debug, Clone)]
pub struct DatasetInterface {
    target: String,
    dim_map: DimensionMap,
    temporal: TemporalInterface,
    level: SpatialAxis,
    row: SpatialAxis,
    col: SpatialAxis,
    spatial: Grid,
}

impl DatasetInterface {
    /// Discover the axes of `target`, decode them and build its grid.
    ///
    /// Without an abstraction override the grid uses points when the row
    /// axis has no bounds and polygons otherwise.
    pub fn open<D: Dataset + ?Sized>(dataset: &D, target: &str, overrides: &Overrides) -> Result<Self> {
        let projection = Projection::from_proj4(overrides.s_proj4.as_deref())?;
        let requested = overrides
            .s_abstraction
            .as_deref()
            .map(str::parse::<Abstraction>)
            .transpose()?;

        // Heuristic fallbacks are logged by discovery itself
        let dim_map = axis::discover(dataset, target)?;

        let temporal = TemporalInterface::build(
            dataset,
            &dim_map,
            overrides.t_units.as_deref(),
            overrides.t_calendar.as_deref(),
        )?;
        let level = SpatialAxis::numeric(dataset, &dim_map, AxisTag::Z)?;
        let row = SpatialAxis::numeric(dataset, &dim_map, AxisTag::Y)?;
        let col = SpatialAxis::numeric(dataset, &dim_map, AxisTag::X)?;

        let abstraction = requested.unwrap_or(if row.bounds().is_none() {
            Abstraction::Point
        } else {
            Abstraction::Polygon
        });
        let spatial = Grid::build(&row, &col, abstraction, projection)?;
        log_grid_stats(target, &spatial);

        info!(
            variable = target,
            time_steps = temporal.axis.len(),
            levels = level.len(),
            "Dataset interface ready"
        );

        Ok(Self {
            target: target.to_string(),
            dim_map,
            temporal,
            level,
            row,
            col,
            spatial,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn dim_map(&self) -> &DimensionMap {
        &self.dim_map
    }

    pub fn temporal(&self) -> &TemporalInterface {
        &self.temporal
    }

    pub fn level(&self) -> &SpatialAxis {
        &self.level
    }

    pub fn row(&self) -> &SpatialAxis {
        &self.row
    }

    pub fn col(&self) -> &SpatialAxis {
        &self.col
    }

    pub fn grid(&self) -> &Grid {
        &self.spatial
    }

    /// Select the cells of the grid intersecting `query`
    pub fn select(&self, query: &Polygon<f64>, options: &SelectOptions) -> Result<Selection> {
        log_timed_operation("select", || select::select(&self.spatial, query, options))
    }

    /// Every cell of the grid
    pub fn select_all(&self) -> Selection {
        select::select_all(&self.spatial)
    }
}
