//! Decoded values of a single discovered axis.
//!
//! One generic [`AxisInterface`] covers every axis; what differs between the
//! temporal axis and the level/row/column axes is the decode function and
//! the [`Materialize`] policy chosen for the tag.

use ndarray::{Array1, Array2, ArrayD, Ix1, Ix2};
use tracing::debug;

use super::calendar::{Calendar, CfDateTime, TimeUnits};
use super::{AxisEntry, AxisTag, DimensionMap};
use crate::dataset::Dataset;
use crate::error::{GridclipError, Result};

/// When `value` is populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialize {
    /// Only when a bounds variable exists; bound-less spatial axes are
    /// represented by their raw points instead
    BoundsGated,
    /// Whenever the axis is present
    Always,
}

impl Materialize {
    /// Policy used for each axis tag
    pub fn for_tag(tag: AxisTag) -> Self {
        match tag {
            AxisTag::T => Materialize::Always,
            AxisTag::Z | AxisTag::Y | AxisTag::X => Materialize::BoundsGated,
        }
    }
}

/// The decoded coordinate and bounds arrays of one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisInterface<V> {
    tag: AxisTag,
    variable: Option<String>,
    points: Option<Array1<V>>,
    value: Option<Array1<V>>,
    bounds: Option<Array2<V>>,
}

/// Level, row and column axes keep raw numeric values
pub type SpatialAxis = AxisInterface<f64>;

impl<V: Clone> AxisInterface<V> {
    /// Load an axis from the dataset and decode it eagerly.
    pub fn build<D, F>(
        dataset: &D,
        tag: AxisTag,
        entry: &AxisEntry,
        materialize: Materialize,
        decode: F,
    ) -> Result<Self>
    where
        D: Dataset + ?Sized,
        F: Fn(f64) -> Result<V>,
    {
        let AxisEntry::Present { variable, bounds } = entry else {
            return Ok(Self::absent(tag));
        };

        let raw_points = read_points(dataset, variable)?;
        let raw_bounds = match bounds {
            Some(name) => Some(read_bounds(dataset, name, raw_points.len())?),
            None => None,
        };

        let (points, value, bounds) = Self::format(&raw_points, raw_bounds.as_ref(), materialize, &decode)?;

        debug!(
            axis = %tag,
            variable = variable.as_str(),
            len = raw_points.len(),
            has_bounds = bounds.is_some(),
            "Axis formatted"
        );

        Ok(Self {
            tag,
            variable: Some(variable.clone()),
            points: Some(points),
            value,
            bounds,
        })
    }

    /// Decode raw coordinate and bounds arrays.
    ///
    /// Returns `(points, value, bounds)`. `value` follows the materialize
    /// policy; `bounds` is decoded whenever raw bounds are given.
    #[allow(clippy::type_complexity)]
    pub fn format<F>(
        raw_points: &Array1<f64>,
        raw_bounds: Option<&Array2<f64>>,
        materialize: Materialize,
        decode: &F,
    ) -> Result<(Array1<V>, Option<Array1<V>>, Option<Array2<V>>)>
    where
        F: Fn(f64) -> Result<V>,
    {
        let points = raw_points
            .iter()
            .map(|&v| decode(v))
            .collect::<Result<Vec<V>>>()
            .map(Array1::from_vec)?;

        let bounds = match raw_bounds {
            Some(raw) => {
                let decoded = raw.iter().map(|&v| decode(v)).collect::<Result<Vec<V>>>()?;
                Some(Array2::from_shape_vec(raw.dim(), decoded)?)
            }
            None => None,
        };

        let value = match (materialize, &bounds) {
            (Materialize::Always, _) | (Materialize::BoundsGated, Some(_)) => Some(points.clone()),
            (Materialize::BoundsGated, None) => None,
        };

        Ok((points, value, bounds))
    }

    fn absent(tag: AxisTag) -> Self {
        Self {
            tag,
            variable: None,
            points: None,
            value: None,
            bounds: None,
        }
    }

    pub fn tag(&self) -> AxisTag {
        self.tag
    }

    /// Name of the backing coordinate variable
    pub fn variable(&self) -> Option<&str> {
        self.variable.as_deref()
    }

    /// Whether the target variable has this axis at all
    pub fn is_present(&self) -> bool {
        self.variable.is_some()
    }

    /// Coordinate values, regardless of the materialize policy
    pub fn points(&self) -> Option<&Array1<V>> {
        self.points.as_ref()
    }

    /// Coordinate values; absent for bound-less spatial axes
    pub fn value(&self) -> Option<&Array1<V>> {
        self.value.as_ref()
    }

    /// Per-cell `[lower, upper]` bounds, shape `[N, 2]`
    pub fn bounds(&self) -> Option<&Array2<V>> {
        self.bounds.as_ref()
    }

    /// Number of coordinate values
    pub fn len(&self) -> usize {
        self.points.as_ref().map_or(0, |p| p.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SpatialAxis {
    /// Build a level, row or column axis with pass-through decoding
    pub fn numeric<D: Dataset + ?Sized>(dataset: &D, map: &DimensionMap, tag: AxisTag) -> Result<Self> {
        Self::build(dataset, tag, map.get(tag), Materialize::for_tag(tag), |v| Ok(v))
    }

    /// Assemble an axis from in-memory arrays, applying the bounds-gated policy
    pub fn from_arrays(
        tag: AxisTag,
        variable: &str,
        points: Array1<f64>,
        bounds: Option<Array2<f64>>,
    ) -> Result<Self> {
        let (points, value, bounds) =
            Self::format(&points, bounds.as_ref(), Materialize::for_tag(tag), &|v| Ok(v))?;
        Ok(Self {
            tag,
            variable: Some(variable.to_string()),
            points: Some(points),
            value,
            bounds,
        })
    }
}

/// The temporal axis plus the metadata used to decode it
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalInterface {
    pub axis: AxisInterface<CfDateTime>,
    pub units: Option<String>,
    pub calendar: Option<Calendar>,
}

impl TemporalInterface {
    /// Build the temporal axis.
    ///
    /// `t_units` and `t_calendar` override the coordinate variable's
    /// `units` and `calendar` attributes.
    pub fn build<D: Dataset + ?Sized>(
        dataset: &D,
        map: &DimensionMap,
        t_units: Option<&str>,
        t_calendar: Option<&str>,
    ) -> Result<Self> {
        let entry = map.get(AxisTag::T);
        let Some(variable) = entry.variable() else {
            return Ok(Self {
                axis: AxisInterface::absent(AxisTag::T),
                units: None,
                calendar: None,
            });
        };

        let units = resolve_attribute(dataset, variable, "units", t_units)?;
        let calendar: Calendar = resolve_attribute(dataset, variable, "calendar", t_calendar)?.parse()?;
        let parsed = TimeUnits::parse(&units)?;

        let axis = AxisInterface::build(
            dataset,
            AxisTag::T,
            entry,
            Materialize::for_tag(AxisTag::T),
            |v| parsed.decode(v, calendar),
        )?;

        Ok(Self {
            axis,
            units: Some(units),
            calendar: Some(calendar),
        })
    }
}

fn resolve_attribute<D: Dataset + ?Sized>(
    dataset: &D,
    variable: &str,
    attribute: &str,
    overridden: Option<&str>,
) -> Result<String> {
    if let Some(value) = overridden {
        return Ok(value.to_string());
    }
    dataset
        .get_attribute(variable, attribute)
        .and_then(|a| a.as_str())
        .map(str::to_string)
        .ok_or_else(|| GridclipError::MissingTemporalMetadata {
            variable: variable.to_string(),
            attribute: attribute.to_string(),
        })
}

fn read_points<D: Dataset + ?Sized>(dataset: &D, variable: &str) -> Result<Array1<f64>> {
    let values: ArrayD<f64> = dataset.read_values(variable)?;
    values
        .into_dimensionality::<Ix1>()
        .map_err(|_| GridclipError::InvalidParameter {
            param: variable.to_string(),
            message: "coordinate variable must be one-dimensional".to_string(),
        })
}

fn read_bounds<D: Dataset + ?Sized>(dataset: &D, variable: &str, len: usize) -> Result<Array2<f64>> {
    let values: ArrayD<f64> = dataset.read_values(variable)?;
    let bounds = values
        .into_dimensionality::<Ix2>()
        .map_err(|_| GridclipError::InvalidParameter {
            param: variable.to_string(),
            message: "bounds variable must be two-dimensional".to_string(),
        })?;
    if bounds.dim() != (len, 2) {
        return Err(GridclipError::InvalidParameter {
            param: variable.to_string(),
            message: format!("bounds shape {:?} does not match [{}, 2]", bounds.dim(), len),
        });
    }
    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::registry::discover;
    use crate::dataset::MemoryDataset;

    fn dataset(with_bounds: bool) -> MemoryDataset {
        let mut ds = MemoryDataset::new();
        ds.add_dimension("time", 2)
            .add_dimension("lat", 2)
            .add_dimension("lon", 2)
            .add_dimension("bnds", 2);
        ds.add_variable("time", &["time"], vec![0.0, 0.5]).unwrap();
        ds.add_variable("lat", &["lat"], vec![10.5, 11.5]).unwrap();
        ds.add_variable("lon", &["lon"], vec![20.5, 21.5]).unwrap();
        ds.add_variable("tas", &["time", "lat", "lon"], vec![0.0; 8]).unwrap();
        ds.add_attribute("time", "units", "days since 2001-01-01").unwrap();
        ds.add_attribute("time", "calendar", "noleap").unwrap();
        if with_bounds {
            ds.add_variable("lat_bnds", &["lat", "bnds"], vec![10.0, 11.0, 11.0, 12.0])
                .unwrap();
            ds.add_attribute("lat", "bounds", "lat_bnds").unwrap();
        }
        ds
    }

    #[test]
    fn test_bounds_gate_value() -> Result<()> {
        let ds = dataset(true);
        let map = discover(&ds, "tas")?;

        let row = SpatialAxis::numeric(&ds, &map, AxisTag::Y)?;
        assert_eq!(row.value().unwrap().to_vec(), vec![10.5, 11.5]);
        assert_eq!(row.bounds().unwrap().dim(), (2, 2));

        let col = SpatialAxis::numeric(&ds, &map, AxisTag::X)?;
        assert!(col.value().is_none());
        assert!(col.bounds().is_none());
        assert_eq!(col.points().unwrap().to_vec(), vec![20.5, 21.5]);
        Ok(())
    }

    #[test]
    fn test_absent_axis() -> Result<()> {
        let ds = dataset(false);
        let map = discover(&ds, "tas")?;
        let level = SpatialAxis::numeric(&ds, &map, AxisTag::Z)?;
        assert!(!level.is_present());
        assert!(level.is_empty());
        assert!(level.value().is_none());
        Ok(())
    }

    #[test]
    fn test_temporal_decoding() -> Result<()> {
        let ds = dataset(false);
        let map = discover(&ds, "tas")?;
        let temporal = TemporalInterface::build(&ds, &map, None, None)?;

        let values = temporal.axis.value().unwrap();
        assert_eq!(values[0], CfDateTime::new(2001, 1, 1, 0, 0, 0));
        assert_eq!(values[1], CfDateTime::new(2001, 1, 1, 12, 0, 0));
        assert_eq!(temporal.calendar, Some(Calendar::NoLeap));
        Ok(())
    }

    #[test]
    fn test_temporal_overrides() -> Result<()> {
        let ds = dataset(false);
        let map = discover(&ds, "tas")?;
        let temporal = TemporalInterface::build(&ds, &map, Some("hours since 2000-01-01"), Some("360_day"))?;
        assert_eq!(
            temporal.axis.value().unwrap()[1],
            CfDateTime::new(2000, 1, 1, 0, 30, 0)
        );
        Ok(())
    }

    #[test]
    fn test_missing_temporal_metadata() {
        let mut ds = dataset(false);
        ds.metadata
            .variables
            .get_mut("time")
            .unwrap()
            .attributes
            .remove("calendar");
        let map = discover(&ds, "tas").unwrap();

        match TemporalInterface::build(&ds, &map, None, None) {
            Err(GridclipError::MissingTemporalMetadata { attribute, .. }) => {
                assert_eq!(attribute, "calendar")
            }
            other => panic!("Expected MissingTemporalMetadata, got {:?}", other),
        }

        assert!(TemporalInterface::build(&ds, &map, None, Some("standard")).is_ok());
    }

    #[test]
    fn test_bounds_shape_mismatch() {
        let mut ds = dataset(false);
        ds.add_dimension("three", 3);
        ds.add_variable("lon_bnds", &["three", "bnds"], vec![0.0; 6]).unwrap();
        ds.add_attribute("lon", "bounds", "lon_bnds").unwrap();
        let map = discover(&ds, "tas").unwrap();

        assert!(SpatialAxis::numeric(&ds, &map, AxisTag::X).is_err());
    }
}
