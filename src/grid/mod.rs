//! Rectilinear grid built from a row and a column axis.
//!
//! Every cell `(i, j)` carries its envelope (`min_col`, `min_row`,
//! `max_col`, `max_row`), its source indices and a 1-based id. Cells are
//! synthesised as geometries on demand by [`Grid::cell`].

use std::fmt;
use std::str::FromStr;

use geo::{Area, Coord, Geometry, Point, Polygon, Rect};
use ndarray::{Array1, Array2, ArrayView1, Zip};
use serde::Serialize;

use crate::axis::{AxisTag, SpatialAxis};
use crate::error::{GridclipError, Result};
use crate::wrap::WrapState;

/// Geometric representation of grid cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Abstraction {
    /// Cell centres
    Point,
    /// Cell rectangles built from bounds
    Polygon,
}

impl FromStr for Abstraction {
    type Err = GridclipError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point" => Ok(Abstraction::Point),
            "polygon" => Ok(Abstraction::Polygon),
            _ => Err(GridclipError::UnsupportedAbstraction {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Abstraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Abstraction::Point => f.write_str("point"),
            Abstraction::Polygon => f.write_str("polygon"),
        }
    }
}

/// Coordinate reference system of a grid. Only geographic WGS84 is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Projection {
    #[default]
    Wgs84,
}

impl Projection {
    /// Resolve a PROJ.4 override. Any explicit projection is rejected.
    pub fn from_proj4(proj4: Option<&str>) -> Result<Self> {
        match proj4 {
            None => Ok(Projection::Wgs84),
            Some(p) => Err(GridclipError::UnsupportedProjection {
                proj4: p.to_string(),
            }),
        }
    }
}

/// Approximate cell spacing along each axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resolution {
    pub row: f64,
    pub col: f64,
}

/// A fully materialised rectilinear grid
#[derive(Debug, Clone)]
pub struct Grid {
    abstraction: Abstraction,
    projection: Projection,
    min_col: Array2<f64>,
    min_row: Array2<f64>,
    max_col: Array2<f64>,
    max_row: Array2<f64>,
    real_row: Array2<usize>,
    real_col: Array2<usize>,
    gid: Array2<u64>,
    mask: Array2<bool>,
    resolution: Resolution,
    wrap: WrapState,
}

impl Grid {
    /// Build the grid for a row and column axis.
    ///
    /// The polygon abstraction requires bounds on both axes. The point
    /// abstraction uses the axis points and gives zero-extent envelopes.
    pub fn build(
        row: &SpatialAxis,
        col: &SpatialAxis,
        abstraction: Abstraction,
        projection: Projection,
    ) -> Result<Self> {
        let (row_lo, row_hi) = axis_extents(row, abstraction)?;
        let (col_lo, col_hi) = axis_extents(col, abstraction)?;
        let shape = (row_lo.len(), col_lo.len());

        let min_row = Array2::from_shape_fn(shape, |(i, _)| row_lo[i]);
        let max_row = Array2::from_shape_fn(shape, |(i, _)| row_hi[i]);
        let min_col = Array2::from_shape_fn(shape, |(_, j)| col_lo[j]);
        let max_col = Array2::from_shape_fn(shape, |(_, j)| col_hi[j]);

        let real_row = Array2::from_shape_fn(shape, |(i, _)| i);
        let real_col = Array2::from_shape_fn(shape, |(_, j)| j);
        let gid = Array2::from_shape_fn(shape, |(i, j)| (i * shape.1 + j) as u64 + 1);
        let mask = Array2::from_elem(shape, false);

        let resolution = Resolution {
            row: approximate_resolution(row),
            col: approximate_resolution(col),
        };

        let col_bounds = Array2::from_shape_fn((col_lo.len(), 2), |(j, k)| {
            if k == 0 {
                col_lo[j]
            } else {
                col_hi[j]
            }
        });
        let wrap = WrapState::detect(col_bounds.view());

        Ok(Self {
            abstraction,
            projection,
            min_col,
            min_row,
            max_col,
            max_row,
            real_row,
            real_col,
            gid,
            mask,
            resolution,
            wrap,
        })
    }

    pub fn abstraction(&self) -> Abstraction {
        self.abstraction
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.gid.dim()
    }

    pub fn len(&self) -> usize {
        self.gid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gid.is_empty()
    }

    pub fn min_col(&self) -> &Array2<f64> {
        &self.min_col
    }

    pub fn min_row(&self) -> &Array2<f64> {
        &self.min_row
    }

    pub fn max_col(&self) -> &Array2<f64> {
        &self.max_col
    }

    pub fn max_row(&self) -> &Array2<f64> {
        &self.max_row
    }

    pub fn real_row(&self) -> &Array2<usize> {
        &self.real_row
    }

    pub fn real_col(&self) -> &Array2<usize> {
        &self.real_col
    }

    pub fn gid(&self) -> &Array2<u64> {
        &self.gid
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn wrap_state(&self) -> WrapState {
        self.wrap
    }

    /// Geometry of cell `(i, j)` under the grid's abstraction
    pub fn cell(&self, i: usize, j: usize) -> Geometry<f64> {
        let (min_x, min_y) = (self.min_col[[i, j]], self.min_row[[i, j]]);
        let (max_x, max_y) = (self.max_col[[i, j]], self.max_row[[i, j]]);

        match self.abstraction {
            Abstraction::Point => Geometry::Point(Point::new(min_x, min_y)),
            Abstraction::Polygon => Geometry::Polygon(cell_polygon(min_x, min_y, max_x, max_y)),
        }
    }

    /// Envelope of the whole grid, `None` for an empty grid
    pub fn extent(&self) -> Option<Rect<f64>> {
        if self.is_empty() {
            return None;
        }
        let min_x = self.min_col.iter().copied().fold(f64::INFINITY, f64::min);
        let min_y = self.min_row.iter().copied().fold(f64::INFINITY, f64::min);
        let max_x = self.max_col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let max_y = self.max_row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Rect::new(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        ))
    }

    /// Relative area weights for a set of selected cell geometries.
    ///
    /// Each unmasked cell weighs its area divided by the largest area in the
    /// selection. Masked or missing cells weigh 0. Zero-area geometries
    /// (points) all weigh 1.
    pub fn weights(
        &self,
        geometries: &Array2<Option<Geometry<f64>>>,
        mask: &Array2<bool>,
    ) -> Array2<f64> {
        let mut areas = Array2::<f64>::zeros(geometries.dim());
        Zip::from(&mut areas)
            .and(geometries)
            .and(mask)
            .for_each(|area, geometry, &masked| {
                if let (false, Some(g)) = (masked, geometry) {
                    *area = g.unsigned_area();
                }
            });

        let max_area = areas.iter().copied().fold(0.0_f64, f64::max);
        let mut weights = Array2::<f64>::zeros(geometries.dim());
        Zip::from(&mut weights)
            .and(&areas)
            .and(geometries)
            .and(mask)
            .for_each(|w, &area, geometry, &masked| {
                if masked || geometry.is_none() {
                    return;
                }
                *w = if max_area > 0.0 { area / max_area } else { 1.0 };
            });
        weights
    }
}

/// Axis-aligned cell rectangle with counter-clockwise exterior
pub fn cell_polygon(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
    Rect::new(
        Coord { x: min_x, y: min_y },
        Coord { x: max_x, y: max_y },
    )
    .to_polygon()
}

/// Per-index lower and upper extents of an axis
fn axis_extents(axis: &SpatialAxis, abstraction: Abstraction) -> Result<(Array1<f64>, Array1<f64>)> {
    let variable = axis.variable().unwrap_or_default().to_string();

    match abstraction {
        Abstraction::Polygon => {
            let bounds = axis.bounds().ok_or_else(|| GridclipError::MissingBounds {
                axis: axis.tag(),
                variable: variable.clone(),
            })?;
            let lo = bounds.rows().into_iter().map(|b| b[0].min(b[1])).collect();
            let hi = bounds.rows().into_iter().map(|b| b[0].max(b[1])).collect();
            Ok((lo, hi))
        }
        Abstraction::Point => {
            let points = axis.points().ok_or_else(|| GridclipError::DataNotFound {
                message: format!("No coordinate values for {} axis", axis_name(axis.tag())),
            })?;
            Ok((points.clone(), points.clone()))
        }
    }
}

fn axis_name(tag: AxisTag) -> &'static str {
    match tag {
        AxisTag::T => "time",
        AxisTag::Z => "level",
        AxisTag::Y => "row",
        AxisTag::X => "column",
    }
}

/// Mean absolute spacing of consecutive values. Falls back to the bounds
/// width for single-element axes and 0.0 when nothing is known.
fn approximate_resolution(axis: &SpatialAxis) -> f64 {
    let values = axis.value().or_else(|| axis.points());
    match values {
        Some(v) if v.len() >= 2 => mean_spacing(v.view()),
        _ => axis
            .bounds()
            .and_then(|b| b.rows().into_iter().next().map(|r| (r[1] - r[0]).abs()))
            .unwrap_or(0.0),
    }
}

fn mean_spacing(values: ArrayView1<f64>) -> f64 {
    let n = values.len() - 1;
    let total: f64 = values
        .windows(2)
        .into_iter()
        .map(|w| (w[1] - w[0]).abs())
        .sum();
    total / n as f64
}
