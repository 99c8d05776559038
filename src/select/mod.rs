//! Spatial selection of grid cells against a query polygon.
//!
//! Selection runs in three stages:
//!
//! 1. An envelope pre-filter over the cell envelope arrays, widened by one
//!    cell resolution, marks candidate cells.
//! 2. The query is loaded into a [`SpatialIndex`].
//! 3. Candidates are scanned in row-major order and each cell geometry is
//!    tested against the index, sequentially or in parallel by row.
//!
//! The result is always in row-major order regardless of how the scan ran.

pub mod index;

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use geo::{Area, BooleanOps, BoundingRect, Geometry, MultiPolygon, Polygon, Rect};
use ndarray::{Array2, Zip};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::config::SelectionConfig;
use crate::error::{GridclipError, Result};
use crate::grid::Grid;
use crate::wrap;

pub use index::{SpatialIndex, DEFAULT_CELL_SIZE};

/// Predicate applied to each candidate cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatialOperation {
    /// Keep whole cells that intersect the query
    #[default]
    Intersects,
    /// Keep cells sharing area with the query, trimmed to it
    Clip,
}

impl FromStr for SpatialOperation {
    type Err = GridclipError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "intersects" => Ok(SpatialOperation::Intersects),
            "clip" => Ok(SpatialOperation::Clip),
            other => Err(GridclipError::InvalidParameter {
                param: "operation".to_string(),
                message: format!("unknown spatial operation '{}'", other),
            }),
        }
    }
}

impl fmt::Display for SpatialOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpatialOperation::Intersects => f.write_str("intersects"),
            SpatialOperation::Clip => f.write_str("clip"),
        }
    }
}

/// Runtime options for [`select`]
#[derive(Debug, Clone)]
pub struct SelectOptions {
    pub operation: SpatialOperation,
    pub parallel: bool,
    pub index_cell_size: f64,
    /// Checked between candidate cells; setting it aborts the scan
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            operation: SpatialOperation::Intersects,
            parallel: false,
            index_cell_size: DEFAULT_CELL_SIZE,
            cancel: None,
        }
    }
}

impl SelectOptions {
    pub fn from_config(config: &SelectionConfig) -> Result<Self> {
        Ok(Self {
            operation: config.operation.parse()?,
            parallel: config.parallel,
            index_cell_size: config.index_cell_size,
            cancel: None,
        })
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Cells selected from a grid.
///
/// `row_indices` and `col_indices` are parallel and row-major ordered.
/// `mask` is `false` exactly at selected cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    geometries: Array2<Option<Geometry<f64>>>,
    row_indices: Vec<usize>,
    col_indices: Vec<usize>,
    mask: Array2<bool>,
}

impl Selection {
    fn empty(shape: (usize, usize)) -> Self {
        Self {
            geometries: Array2::from_elem(shape, None),
            row_indices: Vec::new(),
            col_indices: Vec::new(),
            mask: Array2::from_elem(shape, true),
        }
    }

    /// Geometries of candidate cells; `None` outside the candidate set
    pub fn geometries(&self) -> &Array2<Option<Geometry<f64>>> {
        &self.geometries
    }

    pub fn row_indices(&self) -> &[usize] {
        &self.row_indices
    }

    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    /// Number of selected cells
    pub fn len(&self) -> usize {
        self.row_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_indices.is_empty()
    }

    /// Selected `(row, col)` pairs in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.row_indices
            .iter()
            .copied()
            .zip(self.col_indices.iter().copied())
    }

    /// Envelope of the selected geometries
    pub fn envelope(&self) -> Option<Rect<f64>> {
        self.cells()
            .filter_map(|(i, j)| self.geometries[[i, j]].as_ref())
            .filter_map(|g| g.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    geo::Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    geo::Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            })
    }

    /// Relative area weights of the selected cells
    pub fn weights(&self, grid: &Grid) -> Array2<f64> {
        grid.weights(&self.geometries, &self.mask)
    }

    /// Move every stored geometry from 0..360 to -180..180.
    pub fn wrap(&self) -> Result<Selection> {
        let mut geometries = Array2::from_elem(self.geometries.dim(), None);
        for ((i, j), geometry) in self.geometries.indexed_iter() {
            if let Some(g) = geometry {
                let wrapped = wrap::wrap(g).map_err(|e| match e {
                    GridclipError::EmptyGeometryAfterWrap { .. } => {
                        GridclipError::EmptyGeometryAfterWrap {
                            index: Some((i, j)),
                        }
                    }
                    other => other,
                })?;
                geometries[[i, j]] = Some(wrapped);
            }
        }

        Ok(Selection {
            geometries,
            row_indices: self.row_indices.clone(),
            col_indices: self.col_indices.clone(),
            mask: self.mask.clone(),
        })
    }
}

/// Every cell of the grid, unmasked
pub fn select_all(grid: &Grid) -> Selection {
    let shape = grid.shape();
    let geometries = Array2::from_shape_fn(shape, |(i, j)| Some(grid.cell(i, j)));
    let row_indices = grid.real_row().iter().copied().collect();
    let col_indices = grid.real_col().iter().copied().collect();

    Selection {
        geometries,
        row_indices,
        col_indices,
        mask: Array2::from_elem(shape, false),
    }
}

/// Select the cells of `grid` that intersect `query`.
pub fn select(grid: &Grid, query: &Polygon<f64>, options: &SelectOptions) -> Result<Selection> {
    let start = Instant::now();

    let area = query.unsigned_area();
    if !(area > 0.0) {
        return Err(GridclipError::DegenerateQueryGeometry { area });
    }

    let query = prepare_query(grid, query)?;
    let Some(envelope) = query.bounding_rect() else {
        return Ok(Selection::empty(grid.shape()));
    };

    let candidates = candidate_mask(grid, &envelope);
    let candidate_count = candidates.iter().filter(|&&c| c).count();
    if candidate_count == 0 {
        debug!("No candidate cells inside the query envelope");
        return Ok(Selection::empty(grid.shape()));
    }

    let index = SpatialIndex::build(&query, options.index_cell_size)?;

    let mut hits = if options.parallel {
        (0..grid.shape().0)
            .into_par_iter()
            .map(|i| scan_row(grid, &candidates, i, &index, &query, options))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
    } else {
        let mut hits = Vec::with_capacity(candidate_count);
        for i in 0..grid.shape().0 {
            hits.extend(scan_row(grid, &candidates, i, &index, &query, options)?);
        }
        hits
    };
    hits.sort_by_key(|hit| (hit.row, hit.col));

    let selection = assemble(grid, hits);

    debug!(
        candidates = candidate_count,
        selected = selection.len(),
        parallel = options.parallel,
        duration_ms = start.elapsed().as_millis() as u64,
        "Selection complete"
    );

    Ok(selection)
}

/// Move the query into the grid's longitude convention
fn prepare_query(grid: &Grid, query: &Polygon<f64>) -> Result<MultiPolygon<f64>> {
    let state = grid.wrap_state();
    if !state.is_wrapped {
        return Ok(MultiPolygon::new(vec![query.clone()]));
    }

    match wrap::unwrap(&Geometry::Polygon(query.clone()), state.left_upper_bound)? {
        Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Ok(mp),
        _ => Ok(MultiPolygon::new(vec![query.clone()])),
    }
}

/// Cells whose envelope overlaps the query envelope, with a tolerance of one
/// cell resolution on each axis
fn candidate_mask(grid: &Grid, envelope: &Rect<f64>) -> Array2<bool> {
    let resolution = grid.resolution();
    let (x_lo, x_hi) = (envelope.min().x - resolution.col, envelope.max().x + resolution.col);
    let (y_lo, y_hi) = (envelope.min().y - resolution.row, envelope.max().y + resolution.row);

    let mut mask = Array2::from_elem(grid.shape(), false);
    Zip::from(&mut mask)
        .and(grid.min_col())
        .and(grid.max_col())
        .and(grid.min_row())
        .and(grid.max_row())
        .for_each(|m, &min_x, &max_x, &min_y, &max_y| {
            *m = min_x <= x_hi && max_x >= x_lo && min_y <= y_hi && max_y >= y_lo;
        });
    mask
}

struct CellHit {
    row: usize,
    col: usize,
    geometry: Geometry<f64>,
    selected: bool,
}

fn scan_row(
    grid: &Grid,
    candidates: &Array2<bool>,
    i: usize,
    index: &SpatialIndex,
    query: &MultiPolygon<f64>,
    options: &SelectOptions,
) -> Result<Vec<CellHit>> {
    let mut hits = Vec::new();
    for (j, _) in candidates.row(i).indexed_iter().filter(|(_, c)| **c) {
        if options.is_cancelled() {
            return Err(GridclipError::Cancelled {
                operation: "select".to_string(),
            });
        }

        let cell = grid.cell(i, j);
        let mut selected = index.intersects(&cell);
        let geometry = match (selected, options.operation, &cell) {
            (true, SpatialOperation::Clip, Geometry::Polygon(polygon)) => {
                let clipped = MultiPolygon::new(vec![polygon.clone()]).intersection(query);
                // Cells touching the query only along an edge or corner have no clipped part
                if clipped.unsigned_area() > 0.0 {
                    Geometry::MultiPolygon(clipped)
                } else {
                    selected = false;
                    cell
                }
            }
            _ => cell,
        };

        hits.push(CellHit {
            row: i,
            col: j,
            geometry,
            selected,
        });
    }
    Ok(hits)
}

fn assemble(grid: &Grid, hits: Vec<CellHit>) -> Selection {
    let shape = grid.shape();
    let selected = hits.iter().filter(|h| h.selected).count();

    let mut selection = Selection {
        geometries: Array2::from_elem(shape, None),
        row_indices: Vec::with_capacity(selected),
        col_indices: Vec::with_capacity(selected),
        mask: Array2::from_elem(shape, true),
    };

    for hit in hits {
        if hit.selected {
            selection.row_indices.push(grid.real_row()[[hit.row, hit.col]]);
            selection.col_indices.push(grid.real_col()[[hit.row, hit.col]]);
            selection.mask[[hit.row, hit.col]] = false;
        }
        selection.geometries[[hit.row, hit.col]] = Some(hit.geometry);
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{AxisTag, SpatialAxis};
    use crate::grid::{Abstraction, Projection};
    use geo::{polygon, Intersects};
    use ndarray::{Array1, Array2};

    /// Unit cells covering `[x0, x0 + cols] x [y0, y0 + rows]`
    fn grid(x0: f64, y0: f64, rows: usize, cols: usize, abstraction: Abstraction) -> Grid {
        let centres = |origin: f64, n: usize| -> Array1<f64> {
            (0..n).map(|k| origin + k as f64 + 0.5).collect()
        };
        let bounds = |c: &Array1<f64>| Array2::from_shape_fn((c.len(), 2), |(k, b)| c[k] - 0.5 + b as f64);

        let lat = centres(y0, rows);
        let lon = centres(x0, cols);
        let row = SpatialAxis::from_arrays(AxisTag::Y, "lat", lat.clone(), Some(bounds(&lat))).unwrap();
        let col = SpatialAxis::from_arrays(AxisTag::X, "lon", lon.clone(), Some(bounds(&lon))).unwrap();
        Grid::build(&row, &col, abstraction, Projection::Wgs84).unwrap()
    }

    fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
        polygon![
            (x: min_x, y: min_y),
            (x: max_x, y: min_y),
            (x: max_x, y: max_y),
            (x: min_x, y: max_y),
        ]
    }

    fn exhaustive(grid: &Grid, query: &Polygon<f64>) -> Vec<(usize, usize)> {
        let (rows, cols) = grid.shape();
        (0..rows)
            .flat_map(|i| (0..cols).map(move |j| (i, j)))
            .filter(|&(i, j)| grid.cell(i, j).intersects(query))
            .collect()
    }

    #[test]
    fn test_unit_grid_offset_query() -> Result<()> {
        let grid = grid(0.0, 0.0, 5, 5, Abstraction::Polygon);
        let selection = select(&grid, &rect(1.5, 1.5, 2.5, 2.5), &SelectOptions::default())?;

        assert_eq!(selection.row_indices(), &[1, 1, 2, 2]);
        assert_eq!(selection.col_indices(), &[1, 2, 1, 2]);
        assert_eq!(selection.mask().iter().filter(|&&m| !m).count(), 4);
        assert!(!selection.mask()[[2, 2]]);
        assert!(selection.mask()[[0, 0]]);
        Ok(())
    }

    #[test]
    fn test_matches_exhaustive_scan() -> Result<()> {
        let grid = grid(-20.0, -10.0, 20, 40, Abstraction::Polygon);
        let query = polygon![
            (x: -13.3, y: -7.7),
            (x: 14.1, y: -2.2),
            (x: 3.7, y: 8.9),
            (x: -4.4, y: 2.3),
        ];
        let selection = select(&grid, &query, &SelectOptions::default())?;
        let got: Vec<_> = selection.cells().collect();
        assert_eq!(got, exhaustive(&grid, &query));
        Ok(())
    }

    #[test]
    fn test_mask_is_complement_of_indices() -> Result<()> {
        let grid = grid(0.0, 0.0, 8, 8, Abstraction::Polygon);
        let selection = select(&grid, &rect(0.2, 3.1, 6.6, 4.9), &SelectOptions::default())?;
        for ((i, j), &masked) in selection.mask().indexed_iter() {
            let listed = selection.cells().any(|c| c == (i, j));
            assert_eq!(masked, !listed, "cell ({}, {})", i, j);
        }
        Ok(())
    }

    #[test]
    fn test_outside_envelope_selects_nothing() -> Result<()> {
        let grid = grid(0.0, 0.0, 5, 5, Abstraction::Polygon);
        let selection = select(&grid, &rect(50.0, 50.0, 60.0, 60.0), &SelectOptions::default())?;
        assert!(selection.is_empty());
        assert!(selection.mask().iter().all(|&m| m));
        assert!(selection.geometries().iter().all(Option::is_none));
        Ok(())
    }

    #[test]
    fn test_degenerate_query_rejected() {
        let grid = grid(0.0, 0.0, 5, 5, Abstraction::Polygon);
        let line = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 2.0, y: 2.0)];
        let err = select(&grid, &line, &SelectOptions::default()).unwrap_err();
        assert!(matches!(err, GridclipError::DegenerateQueryGeometry { .. }));
    }

    #[test]
    fn test_parallel_matches_sequential() -> Result<()> {
        let grid = grid(-30.0, -30.0, 60, 60, Abstraction::Polygon);
        let query = polygon![
            (x: -25.5, y: -3.3),
            (x: 0.1, y: -28.8),
            (x: 26.2, y: 0.4),
            (x: 0.3, y: 24.9),
        ];
        let sequential = select(&grid, &query, &SelectOptions::default())?;
        let parallel = select(
            &grid,
            &query,
            &SelectOptions {
                parallel: true,
                ..Default::default()
            },
        )?;
        assert_eq!(sequential, parallel);
        Ok(())
    }

    #[test]
    fn test_cancelled_scan() {
        let grid = grid(0.0, 0.0, 5, 5, Abstraction::Polygon);
        let cancel = Arc::new(AtomicBool::new(true));
        let options = SelectOptions::default().with_cancel(cancel);
        let err = select(&grid, &rect(0.5, 0.5, 4.5, 4.5), &options).unwrap_err();
        assert!(matches!(err, GridclipError::Cancelled { .. }));
    }

    #[test]
    fn test_clip_trims_cells() -> Result<()> {
        let grid = grid(0.0, 0.0, 2, 2, Abstraction::Polygon);
        let options = SelectOptions {
            operation: SpatialOperation::Clip,
            ..Default::default()
        };
        let selection = select(&grid, &rect(0.5, 0.5, 1.5, 1.5), &options)?;
        assert_eq!(selection.len(), 4);
        for (i, j) in selection.cells() {
            let area = selection.geometries()[[i, j]].as_ref().map_or(0.0, |g| g.unsigned_area());
            assert!((area - 0.25).abs() < 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_clip_drops_edge_touching_cells() -> Result<()> {
        let grid = grid(0.0, 0.0, 3, 3, Abstraction::Polygon);
        let options = SelectOptions {
            operation: SpatialOperation::Clip,
            ..Default::default()
        };
        // Exactly the centre cell; its eight neighbours share only an edge or corner
        let selection = select(&grid, &rect(1.0, 1.0, 2.0, 2.0), &options)?;
        assert_eq!(selection.cells().collect::<Vec<_>>(), vec![(1, 1)]);
        assert_eq!(selection.mask().iter().filter(|&&m| !m).count(), 1);

        let weights = selection.weights(&grid);
        assert!((weights[[1, 1]] - 1.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_point_abstraction() -> Result<()> {
        let grid = grid(0.0, 0.0, 4, 4, Abstraction::Point);
        let selection = select(&grid, &rect(0.9, 0.9, 2.6, 2.6), &SelectOptions::default())?;
        assert_eq!(selection.cells().collect::<Vec<_>>(), vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
        Ok(())
    }

    #[test]
    fn test_wrapped_grid_with_western_query() -> Result<()> {
        // 0..360 grid; a query over -10..10 must pick both ends of the row
        let grid = grid(0.0, 0.0, 1, 360, Abstraction::Polygon);
        assert!(grid.wrap_state().is_wrapped);

        let selection = select(&grid, &rect(-9.5, 0.2, 9.5, 0.8), &SelectOptions::default())?;
        let cols: Vec<usize> = selection.col_indices().to_vec();
        let expected: Vec<usize> = (0..10).chain(350..360).collect();
        assert_eq!(cols, expected);

        let wrapped = selection.wrap()?;
        let envelope = wrapped.envelope().unwrap();
        assert_eq!(envelope.min().x, -10.0);
        assert_eq!(envelope.max().x, 10.0);
        Ok(())
    }

    #[test]
    fn test_select_all() {
        let grid = grid(0.0, 0.0, 3, 2, Abstraction::Polygon);
        let selection = select_all(&grid);
        assert_eq!(selection.len(), 6);
        assert_eq!(selection.row_indices(), &[0, 0, 1, 1, 2, 2]);
        assert_eq!(selection.col_indices(), &[0, 1, 0, 1, 0, 1]);
        assert!(selection.mask().iter().all(|&m| !m));

        let weights = selection.weights(&grid);
        assert!(weights.iter().all(|&w| w == 1.0));
    }

    #[test]
    fn test_operation_parsing() {
        assert_eq!("Clip".parse::<SpatialOperation>().unwrap(), SpatialOperation::Clip);
        assert!("within".parse::<SpatialOperation>().is_err());
    }
}
