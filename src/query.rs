//! Query polygon construction.
//!
//! Queries arrive either as a bounding box string or as a ring of `(x, y)`
//! pairs. Both end up as a closed [`Polygon`] in geographic coordinates.

use geo::{Coord, LineString, Polygon};

use crate::error::{GridclipError, Result};

/// Build a polygon from a ring of `(x, y)` pairs. The ring is closed if the
/// last pair does not repeat the first.
pub fn polygon_from_ring(ring: &[(f64, f64)]) -> Result<Polygon<f64>> {
    if ring.len() < 3 {
        return Err(GridclipError::InvalidParameter {
            param: "polygon".to_string(),
            message: format!("a ring needs at least 3 coordinates, got {}", ring.len()),
        });
    }
    if let Some((x, y)) = ring.iter().find(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(GridclipError::InvalidParameter {
            param: "polygon".to_string(),
            message: format!("non-finite coordinate ({}, {})", x, y),
        });
    }

    let coords: Vec<Coord<f64>> = ring.iter().map(|&(x, y)| Coord { x, y }).collect();
    // LineString is closed by Polygon::new
    Ok(Polygon::new(LineString::from(coords), vec![]))
}

/// Parse a ring string "x y, x y, ..."
pub fn parse_ring(ring: &str) -> Result<Polygon<f64>> {
    let pairs = ring
        .split(',')
        .map(|pair| {
            let mut parts = pair.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(x), Some(y), None) => Ok((parse_number("polygon", x)?, parse_number("polygon", y)?)),
                _ => Err(GridclipError::InvalidParameter {
                    param: "polygon".to_string(),
                    message: format!("Expected 'x y', got '{}'", pair.trim()),
                }),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    polygon_from_ring(&pairs)
}

/// Parse a bounding box string "min_lon,min_lat,max_lon,max_lat" into a polygon
pub fn parse_bbox(bbox: &str) -> Result<Polygon<f64>> {
    let parts: Vec<&str> = bbox.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(GridclipError::InvalidParameter {
            param: "bbox".to_string(),
            message: "Bounding box must be in format 'min_lon,min_lat,max_lon,max_lat'".to_string(),
        });
    }

    let min_lon = parse_number("bbox", parts[0])?;
    let min_lat = parse_number("bbox", parts[1])?;
    let max_lon = parse_number("bbox", parts[2])?;
    let max_lat = parse_number("bbox", parts[3])?;

    if min_lat > max_lat {
        return Err(GridclipError::InvalidParameter {
            param: "bbox".to_string(),
            message: format!("min_lat ({}) must be <= max_lat ({})", min_lat, max_lat),
        });
    }
    if min_lon > max_lon {
        return Err(GridclipError::InvalidParameter {
            param: "bbox".to_string(),
            message: format!("min_lon ({}) must be <= max_lon ({})", min_lon, max_lon),
        });
    }

    // Latitude must be in the range -90 to 90
    if !(-90.0..=90.0).contains(&min_lat) || !(-90.0..=90.0).contains(&max_lat) {
        return Err(GridclipError::InvalidParameter {
            param: "bbox".to_string(),
            message: "Latitude must be in the range -90 to 90".to_string(),
        });
    }

    polygon_from_ring(&[
        (min_lon, min_lat),
        (max_lon, min_lat),
        (max_lon, max_lat),
        (min_lon, max_lat),
    ])
}

fn parse_number(param: &str, text: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| GridclipError::InvalidParameter {
            param: param.to_string(),
            message: format!("Invalid number: {}", text.trim()),
        })
}
