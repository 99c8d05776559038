//! Coarse uniform-grid index over the parts of a query geometry.
//!
//! The query envelope is cut into square cells of a fixed size and each
//! query part is clipped into the cells it touches. Intersection tests then
//! only look at the clipped pieces of the index cells a candidate overlaps,
//! which keeps each test local even for large, complex query polygons.

use geo::{BooleanOps, BoundingRect, Coord, Geometry, Intersects, MultiPolygon, Polygon, Rect};

use crate::error::{GridclipError, Result};

/// Default edge length of an index cell, in coordinate units
pub const DEFAULT_CELL_SIZE: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct SpatialIndex {
    envelope: Rect<f64>,
    cell_size: f64,
    nx: usize,
    ny: usize,
    /// Clipped query pieces per index cell, row-major
    pieces: Vec<Vec<Polygon<f64>>>,
}

impl SpatialIndex {
    pub fn build(query: &MultiPolygon<f64>, cell_size: f64) -> Result<Self> {
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(GridclipError::InvalidParameter {
                param: "index_cell_size".to_string(),
                message: format!("must be a positive number, got {}", cell_size),
            });
        }
        let envelope = query
            .bounding_rect()
            .ok_or(GridclipError::DegenerateQueryGeometry { area: 0.0 })?;

        let nx = cells_along(envelope.width(), cell_size);
        let ny = cells_along(envelope.height(), cell_size);
        let mut pieces = vec![Vec::new(); nx * ny];

        for part in query.iter() {
            let Some(part_rect) = part.bounding_rect() else {
                continue;
            };
            let (x0, x1) = span(part_rect.min().x, part_rect.max().x, envelope.min().x, cell_size, nx);
            let (y0, y1) = span(part_rect.min().y, part_rect.max().y, envelope.min().y, cell_size, ny);
            let part = MultiPolygon::new(vec![part.clone()]);

            for iy in y0..=y1 {
                for ix in x0..=x1 {
                    let cell = cell_rect(&envelope, cell_size, ix, iy);
                    let slot = &mut pieces[iy * nx + ix];
                    if contains_rect(&cell, &part_rect) {
                        slot.extend(part.0.iter().cloned());
                    } else {
                        let clip = MultiPolygon::new(vec![cell.to_polygon()]);
                        slot.extend(part.intersection(&clip));
                    }
                }
            }
        }

        Ok(Self {
            envelope,
            cell_size,
            nx,
            ny,
            pieces,
        })
    }

    /// `(columns, rows)` of index cells
    pub fn dims(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn envelope(&self) -> Rect<f64> {
        self.envelope
    }

    /// Number of clipped pieces held across all index cells
    pub fn piece_count(&self) -> usize {
        self.pieces.iter().map(Vec::len).sum()
    }

    /// Whether `geometry` intersects the indexed query
    pub fn intersects(&self, geometry: &Geometry<f64>) -> bool {
        let Some(rect) = geometry.bounding_rect() else {
            return false;
        };
        if !rect.intersects(&self.envelope) {
            return false;
        }

        let origin = self.envelope.min();
        let (x0, x1) = span(rect.min().x, rect.max().x, origin.x, self.cell_size, self.nx);
        let (y0, y1) = span(rect.min().y, rect.max().y, origin.y, self.cell_size, self.ny);

        (y0..=y1).any(|iy| {
            (x0..=x1).any(|ix| {
                self.pieces[iy * self.nx + ix]
                    .iter()
                    .any(|piece| geometry.intersects(piece))
            })
        })
    }
}

fn cells_along(extent: f64, cell_size: f64) -> usize {
    ((extent / cell_size).ceil() as usize).max(1)
}

/// Inclusive range of index cells covering `[lo, hi]`
fn span(lo: f64, hi: f64, origin: f64, cell_size: f64, n: usize) -> (usize, usize) {
    let last = n - 1;
    let first = ((lo - origin) / cell_size).floor().max(0.0) as usize;
    let end = ((hi - origin) / cell_size).floor().max(0.0) as usize;
    (first.min(last), end.min(last))
}

fn cell_rect(envelope: &Rect<f64>, cell_size: f64, ix: usize, iy: usize) -> Rect<f64> {
    let min = Coord {
        x: envelope.min().x + ix as f64 * cell_size,
        y: envelope.min().y + iy as f64 * cell_size,
    };
    Rect::new(
        min,
        Coord {
            x: min.x + cell_size,
            y: min.y + cell_size,
        },
    )
}

fn contains_rect(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    outer.min().x <= inner.min().x
        && outer.min().y <= inner.min().y
        && outer.max().x >= inner.max().x
        && outer.max().y >= inner.max().y
}
