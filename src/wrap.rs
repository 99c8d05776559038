//! Longitude convention handling.
//!
//! Grids come either in the -180..180 convention or the 0..360 one. A grid
//! is wrapped (0..360) when any column bound exceeds 180. [`wrap`] moves
//! geometries from 0..360 into -180..180, splitting anything that straddles
//! 180; [`unwrap`] moves geometries lying left of a split longitude into
//! 0..360 so they can be compared against a wrapped grid.

use geo::{
    Area, BooleanOps, BoundingRect, Coord, CoordsIter, Geometry, MultiPolygon, Point, Polygon,
    Rect, Translate,
};
use ndarray::ArrayView2;
use serde::Serialize;

use crate::error::{GridclipError, Result};

/// Longitude of the antimeridian in the 0..360 convention
const ANTIMERIDIAN: f64 = 180.0;
/// Parts with no more area than this are slivers left over from clipping
const DEGENERATE_AREA: f64 = 1e-12;

/// Longitude convention of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Convention {
    /// -180..180
    Unwrapped,
    /// 0..360
    Wrapped,
}

/// Convention detected for a grid's column axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WrapState {
    pub is_wrapped: bool,
    /// Split longitude handed to [`unwrap`]; the lower bound of the first
    /// column straddling 0, or 0.0 when none does
    pub left_upper_bound: f64,
}

impl WrapState {
    /// Inspect column bounds (shape `[N, 2]`) in index order.
    pub fn detect(col_bounds: ArrayView2<f64>) -> Self {
        if !col_bounds.iter().any(|&b| b > ANTIMERIDIAN) {
            return Self {
                is_wrapped: false,
                left_upper_bound: 0.0,
            };
        }

        let left_upper_bound = col_bounds
            .rows()
            .into_iter()
            .find(|row| row[0] < 0.0 && row[1] > 0.0)
            .map_or(0.0, |row| row[0]);

        Self {
            is_wrapped: true,
            left_upper_bound,
        }
    }

    pub fn convention(&self) -> Convention {
        if self.is_wrapped {
            Convention::Wrapped
        } else {
            Convention::Unwrapped
        }
    }
}

/// Convert a geometry from 0..360 to -180..180.
///
/// Geometries entirely east of 180 are shifted by -360. Geometries that
/// straddle 180 are split there and the eastern part is shifted, giving a
/// multi-part result. Anything else is returned unchanged.
pub fn wrap(geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
    if let Geometry::Point(point) = geometry {
        return Ok(if point.x() > ANTIMERIDIAN {
            Geometry::Point(Point::new(point.x() - 360.0, point.y()))
        } else {
            geometry.clone()
        });
    }

    let polygons = as_multi_polygon(geometry)?;
    let Some(envelope) = polygons.bounding_rect() else {
        return Ok(geometry.clone());
    };

    if envelope.min().x > ANTIMERIDIAN {
        return Ok(geometry.translate(-360.0, 0.0));
    }
    if envelope.max().x <= ANTIMERIDIAN {
        return Ok(geometry.clone());
    }

    let left = polygons.intersection(&clip_region(&envelope, envelope.min().x - 1.0, ANTIMERIDIAN));
    let right = polygons
        .intersection(&clip_region(&envelope, ANTIMERIDIAN, envelope.max().x + 1.0))
        .translate(-360.0, 0.0);

    recombine(left, right)
}

/// Convert a geometry into 0..360 using `left_max_bound` as the split.
///
/// Any part west of `left_max_bound` is shifted by +360; the rest is kept.
/// Geometries with no coordinate west of the split are returned unchanged.
pub fn unwrap(geometry: &Geometry<f64>, left_max_bound: f64) -> Result<Geometry<f64>> {
    if let Geometry::Point(point) = geometry {
        return Ok(if point.x() < left_max_bound {
            Geometry::Point(Point::new(point.x() + 360.0, point.y()))
        } else {
            geometry.clone()
        });
    }

    let polygons = as_multi_polygon(geometry)?;
    if !polygons.coords_iter().any(|c| c.x < left_max_bound) {
        return Ok(geometry.clone());
    }
    let Some(envelope) = polygons.bounding_rect() else {
        return Ok(geometry.clone());
    };

    let left = polygons
        .intersection(&clip_region(&envelope, envelope.min().x - 1.0, left_max_bound))
        .translate(360.0, 0.0);
    let right = polygons.intersection(&clip_region(&envelope, left_max_bound, envelope.max().x + 1.0));

    recombine(left, right)
}

fn as_multi_polygon(geometry: &Geometry<f64>) -> Result<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Ok(MultiPolygon::new(vec![polygon.clone()])),
        Geometry::MultiPolygon(polygons) => Ok(polygons.clone()),
        Geometry::Rect(rect) => Ok(MultiPolygon::new(vec![rect.to_polygon()])),
        other => Err(GridclipError::InvalidParameter {
            param: "geometry".to_string(),
            message: format!("cannot wrap geometry of type {}", geometry_kind(other)),
        }),
    }
}

/// A clip rectangle spanning `[x_min, x_max]` and the full latitude range of
/// `envelope`
fn clip_region(envelope: &Rect<f64>, x_min: f64, x_max: f64) -> MultiPolygon<f64> {
    let rect = Rect::new(
        Coord {
            x: x_min,
            y: envelope.min().y - 1.0,
        },
        Coord {
            x: x_max,
            y: envelope.max().y + 1.0,
        },
    );
    MultiPolygon::new(vec![rect.to_polygon()])
}

fn recombine(left: MultiPolygon<f64>, right: MultiPolygon<f64>) -> Result<Geometry<f64>> {
    let parts: Vec<Polygon<f64>> = left
        .into_iter()
        .chain(right)
        .filter(|part| part.unsigned_area() > DEGENERATE_AREA)
        .collect();

    if parts.is_empty() {
        return Err(GridclipError::EmptyGeometryAfterWrap { index: None });
    }
    Ok(Geometry::MultiPolygon(MultiPolygon::new(parts)))
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
