//! Data model of the cardiac tissue simulation
//!
//! Everything that describes the simulated tissue lives here: the structured
//! grid, the scalar fields defined on it, the state variables of the ionic
//! model, the tissue geometry and the run configuration.

pub mod geometry;
pub mod grid;
#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod parameters;
pub mod state;

use ndarray::{Array3, ArrayView3, ArrayViewMut3};

/// Computation precision
pub type Precision = f32;

/// Dense 3D array holding one value per grid cell, indexed as `[x, y, z]`
pub type ScalarField = Array3<Precision>;

/// Read-only view of a [`ScalarField`]
pub type ScalarFieldView<'a> = ArrayView3<'a, Precision>;

/// Mutable view of a [`ScalarField`]
pub type ScalarFieldViewMut<'a> = ArrayViewMut3<'a, Precision>;

/// Generate a 3D array with a function of the axis index
///
/// Handy when the same computation must be carried out along every axis.
#[inline]
pub fn array3<T>(f: impl FnMut(usize) -> T) -> [T; 3] {
    std::array::from_fn(f)
}
