//! Coordinate axes of a gridded variable.
//!
//! [`registry::discover`] maps the dimensions of a target variable onto the
//! four recognised axes and records each axis's bounds variable in a
//! [`DimensionMap`]. [`interface::AxisInterface`] then loads and decodes the
//! values of one axis.

pub mod calendar;
pub mod interface;
pub mod registry;

use serde::Serialize;
use std::fmt;

pub use calendar::{Calendar, CfDateTime, TimeUnit, TimeUnits};
pub use interface::{AxisInterface, Materialize, SpatialAxis, TemporalInterface};
pub use registry::{discover, AxisStrategy, BOUNDS_ATTRIBUTES};

/// One of the four recognised coordinate axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AxisTag {
    /// Time
    T,
    /// Vertical level
    Z,
    /// Row (latitude)
    Y,
    /// Column (longitude)
    X,
}

impl AxisTag {
    /// All tags in storage order
    pub const ALL: [AxisTag; 4] = [AxisTag::T, AxisTag::Z, AxisTag::Y, AxisTag::X];

    /// Parse the value of an `axis` attribute
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "T" => Some(AxisTag::T),
            "Z" => Some(AxisTag::Z),
            "Y" => Some(AxisTag::Y),
            "X" => Some(AxisTag::X),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        match self {
            AxisTag::T => 0,
            AxisTag::Z => 1,
            AxisTag::Y => 2,
            AxisTag::X => 3,
        }
    }
}

impl fmt::Display for AxisTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AxisTag::T => "T",
            AxisTag::Z => "Z",
            AxisTag::Y => "Y",
            AxisTag::X => "X",
        };
        f.write_str(s)
    }
}

/// Discovery result for a single axis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum AxisEntry {
    /// The axis exists, backed by a coordinate variable and optional bounds
    Present {
        variable: String,
        bounds: Option<String>,
    },
    /// The target variable has no dimension on this axis
    #[default]
    Absent,
}

impl AxisEntry {
    /// Coordinate variable name, if present
    pub fn variable(&self) -> Option<&str> {
        match self {
            AxisEntry::Present { variable, .. } => Some(variable),
            AxisEntry::Absent => None,
        }
    }

    /// Bounds variable name, if present and declared
    pub fn bounds(&self) -> Option<&str> {
        match self {
            AxisEntry::Present { bounds, .. } => bounds.as_deref(),
            AxisEntry::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, AxisEntry::Present { .. })
    }
}

/// Non-fatal discovery diagnostic: an axis tag was guessed from position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisWarning {
    /// Dimension whose tag was guessed
    pub dimension: String,
    /// The guessed tag
    pub axis: AxisTag,
    /// Position of the dimension within the target variable
    pub position: usize,
    /// Rank of the target variable
    pub rank: usize,
}

impl fmt::Display for AxisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dimension '{}' has no 'axis' attribute; guessed {} from position {} of {}",
            self.dimension, self.axis, self.position, self.rank
        )
    }
}

/// Mapping from axis tag to its discovered coordinate and bounds variables.
///
/// Holds at most one entry per tag. Built once per dataset open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DimensionMap {
    target: String,
    entries: [AxisEntry; 4],
    warnings: Vec<AxisWarning>,
}

impl DimensionMap {
    pub(crate) fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn entry_mut(&mut self, tag: AxisTag) -> &mut AxisEntry {
        &mut self.entries[tag.slot()]
    }

    pub(crate) fn push_warning(&mut self, warning: AxisWarning) {
        self.warnings.push(warning);
    }

    /// Name of the variable the map was discovered for
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Entry for one axis
    pub fn get(&self, tag: AxisTag) -> &AxisEntry {
        &self.entries[tag.slot()]
    }

    /// Present axes in T, Z, Y, X order
    pub fn iter(&self) -> impl Iterator<Item = (AxisTag, &AxisEntry)> {
        AxisTag::ALL.into_iter().map(move |tag| (tag, self.get(tag)))
    }

    /// Heuristic fallbacks taken during discovery
    pub fn warnings(&self) -> &[AxisWarning] {
        &self.warnings
    }
}
