//! Structured simulation grid

use crate::{parameters::ConfigError, Precision, ScalarField};
use thiserror::Error;

/// Names of the grid axes, in storage order
pub const AXIS_NAMES: [&str; 3] = ["width", "height", "depth"];

/// Structured 3D grid over which the tissue fields are defined
///
/// The grid is immutable once constructed. Its shape is expressed in cells as
/// `[width, height, depth]` and matches the `[x, y, z]` indexing of every
/// [`ScalarField`] defined on it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Grid {
    /// Number of cells along each axis
    shape: [usize; 3],

    /// Distance between two neighboring cells along each axis
    spacing: [Precision; 3],
}
//
impl Grid {
    /// Set up a grid, checking that its dimensions make sense
    pub fn new(shape: [usize; 3], spacing: [Precision; 3]) -> Result<Self, ConfigError> {
        for (axis, &len) in shape.iter().enumerate() {
            if len == 0 {
                return Err(ConfigError::InvalidDimension {
                    axis: AXIS_NAMES[axis],
                    value: len,
                });
            }
        }
        for (axis, &step) in spacing.iter().enumerate() {
            if !(step.is_finite() && step > 0.0) {
                return Err(ConfigError::NonPositiveSpacing {
                    axis: AXIS_NAMES[axis],
                    value: step,
                });
            }
        }
        Ok(Self { shape, spacing })
    }

    /// Number of cells along each axis
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Distance between neighboring cells along each axis
    pub fn spacing(&self) -> [Precision; 3] {
        self.spacing
    }

    /// Total number of cells
    pub fn num_cells(&self) -> usize {
        self.shape.iter().product()
    }

    /// Allocate a field of this grid's shape, filled with a constant value
    pub fn filled(&self, value: Precision) -> ScalarField {
        ScalarField::from_elem(self.shape, value)
    }

    /// Allocate a field of this grid's shape, filled with zeros
    pub fn zeros(&self) -> ScalarField {
        self.filled(0.0)
    }

    /// Check that a field is defined on this grid
    ///
    /// `field` is the name of the field, used for error reporting.
    pub fn check(&self, field: &'static str, shape: &[usize]) -> Result<(), ShapeMismatch> {
        if shape == self.shape {
            Ok(())
        } else {
            Err(ShapeMismatch {
                field,
                expected: self.shape,
                actual: shape.to_vec(),
            })
        }
    }
}

/// A field does not have the shape of the simulation grid
///
/// Fields are never broadcast or truncated to fit the grid.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{field} has shape {actual:?}, but the simulation grid has shape {expected:?}")]
pub struct ShapeMismatch {
    /// Name of the offending field
    pub field: &'static str,

    /// Shape of the simulation grid
    pub expected: [usize; 3],

    /// Shape of the offending field
    pub actual: Vec<usize>,
}
