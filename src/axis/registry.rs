//! Axis discovery.
//!
//! Each dimension of the target variable must have a coordinate variable of
//! the same name. Its axis tag is resolved by the strategies in
//! [`AxisStrategy::PRIORITY`], first match wins. Bounds variables are found
//! through the attributes listed in [`BOUNDS_ATTRIBUTES`].

use std::collections::HashMap;
use tracing::{debug, warn};

use super::{AxisEntry, AxisTag, AxisWarning, DimensionMap};
use crate::dataset::{AttributeValue, Dataset};
use crate::error::{GridclipError, Result};

/// Attributes that may name a bounds variable, highest priority first
pub const BOUNDS_ATTRIBUTES: [&str; 2] = ["bounds", "bnds"];

/// A way of resolving the axis tag of a coordinate variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisStrategy {
    /// Read the CF `axis` attribute
    ExplicitAttribute,
    /// Guess from the dimension's position within a 3-D or 4-D variable
    PositionalHeuristic,
}

impl AxisStrategy {
    /// Order in which strategies are tried
    pub const PRIORITY: [AxisStrategy; 2] = [
        AxisStrategy::ExplicitAttribute,
        AxisStrategy::PositionalHeuristic,
    ];

    fn resolve<D: Dataset + ?Sized>(
        self,
        dataset: &D,
        target: &str,
        dims: &[String],
        position: usize,
    ) -> Result<Option<AxisTag>> {
        let dimension = &dims[position];
        match self {
            AxisStrategy::ExplicitAttribute => match dataset.get_attribute(dimension, "axis") {
                None => Ok(None),
                Some(value) => value
                    .as_str()
                    .and_then(AxisTag::from_attribute)
                    .map(Some)
                    .ok_or_else(|| GridclipError::AxisUnresolved {
                        variable: target.to_string(),
                        dimension: dimension.clone(),
                        message: format!("unrecognised 'axis' attribute {:?}", value),
                    }),
            },
            AxisStrategy::PositionalHeuristic => Ok(guess_by_location(dims.len(), position)),
        }
    }
}

fn guess_by_location(rank: usize, position: usize) -> Option<AxisTag> {
    match (rank, position) {
        (3, 0) => Some(AxisTag::T),
        (3, 1) => Some(AxisTag::Y),
        (3, 2) => Some(AxisTag::X),
        (4, 0) => Some(AxisTag::T),
        (4, 1) => Some(AxisTag::Z),
        (4, 2) => Some(AxisTag::Y),
        (4, 3) => Some(AxisTag::X),
        _ => None,
    }
}

/// Discover the axes of `target` within `dataset`.
pub fn discover<D: Dataset + ?Sized>(dataset: &D, target: &str) -> Result<DimensionMap> {
    let dims = dataset.get_dimension_names(target)?;
    let mut map = DimensionMap::new(target);

    for (position, dimension) in dims.iter().enumerate() {
        if dataset.get_variable(dimension).is_none() {
            return Err(GridclipError::MissingCoordinateVariable {
                variable: target.to_string(),
                dimension: dimension.clone(),
            });
        }

        let mut resolved = None;
        for strategy in AxisStrategy::PRIORITY {
            if let Some(tag) = strategy.resolve(dataset, target, &dims, position)? {
                resolved = Some((tag, strategy));
                break;
            }
        }

        let (tag, strategy) = resolved.ok_or_else(|| GridclipError::AxisUnresolved {
            variable: target.to_string(),
            dimension: dimension.clone(),
            message: format!(
                "no 'axis' attribute and no positional rule for a {}-D variable",
                dims.len()
            ),
        })?;

        if strategy == AxisStrategy::PositionalHeuristic {
            warn!(
                variable = target,
                dimension = dimension.as_str(),
                axis = %tag,
                "Guessing axis from dimension position; 'axis' attribute missing"
            );
            map.push_warning(AxisWarning {
                dimension: dimension.clone(),
                axis: tag,
                position,
                rank: dims.len(),
            });
        }

        let entry = map.entry_mut(tag);
        if let AxisEntry::Present { variable, .. } = entry {
            return Err(GridclipError::DuplicateAxis {
                axis: tag,
                first: variable.clone(),
                second: dimension.clone(),
            });
        }
        *entry = AxisEntry::Present {
            variable: dimension.clone(),
            bounds: None,
        };
    }

    attach_bounds(dataset, &mut map)?;
    debug!(variable = target, "Axis discovery complete");
    Ok(map)
}

/// Resolve and attach the bounds variable of every present axis.
fn attach_bounds<D: Dataset + ?Sized>(dataset: &D, map: &mut DimensionMap) -> Result<()> {
    let mut claimed: HashMap<String, String> = HashMap::new();

    for tag in AxisTag::ALL {
        let entry = map.entry_mut(tag);
        let AxisEntry::Present { variable, bounds } = entry else {
            continue;
        };

        let Some(name) = bounds_reference(dataset, variable)? else {
            continue;
        };

        if dataset.get_variable(&name).is_none() {
            return Err(GridclipError::DataNotFound {
                message: format!(
                    "Bounds variable {} referenced by {} does not exist",
                    name, variable
                ),
            });
        }

        if let Some(other) = claimed.insert(name.clone(), variable.clone()) {
            return Err(GridclipError::AmbiguousBoundsReference {
                variable: variable.clone(),
                message: format!("bounds variable '{}' is also claimed by '{}'", name, other),
            });
        }

        *bounds = Some(name);
    }

    Ok(())
}

/// The bounds variable named by a coordinate variable's attributes.
///
/// Both recognised attributes may be present only if they agree.
fn bounds_reference<D: Dataset + ?Sized>(dataset: &D, variable: &str) -> Result<Option<String>> {
    let mut found: Option<(&str, String)> = None;

    for attribute in BOUNDS_ATTRIBUTES {
        let Some(value) = dataset.get_attribute(variable, attribute) else {
            continue;
        };
        let name = match value {
            AttributeValue::Text(name) => name.trim().to_string(),
            other => {
                return Err(GridclipError::AmbiguousBoundsReference {
                    variable: variable.to_string(),
                    message: format!("'{}' attribute is not a variable name: {:?}", attribute, other),
                })
            }
        };

        match &found {
            Some((first_attr, first_name)) if *first_name != name => {
                return Err(GridclipError::AmbiguousBoundsReference {
                    variable: variable.to_string(),
                    message: format!(
                        "'{}' names '{}' but '{}' names '{}'",
                        first_attr, first_name, attribute, name
                    ),
                });
            }
            Some(_) => {}
            None => found = Some((attribute, name)),
        }
    }

    Ok(found.map(|(_, name)| name))
}
