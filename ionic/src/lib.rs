//! Ionic models
//!
//! An ionic model describes the membrane current kinetics of a single tissue
//! cell. It knows nothing about space: all spatial coupling between cells
//! goes through the diffusion of the membrane potential, which is handled by
//! the compute backends.

mod minimal;

pub use minimal::MinimalModel;

use data::{Precision, ScalarField, ScalarFieldView};
use ndarray::Zip;

/// Values of the four state variables at one cell, or their time derivatives
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Variables {
    /// Membrane potential
    pub u: Precision,

    /// Fast gating variable
    pub v: Precision,

    /// Slow gating variable
    pub w: Precision,

    /// Slow recovery variable
    pub s: Precision,
}
//
impl From<[Precision; 4]> for Variables {
    #[inline]
    fn from([u, v, w, s]: [Precision; 4]) -> Self {
        Self { u, v, w, s }
    }
}
//
impl From<Variables> for [Precision; 4] {
    #[inline]
    fn from(Variables { u, v, w, s }: Variables) -> Self {
        [u, v, w, s]
    }
}

/// Pointwise reaction term of the tissue model
///
/// Implementations must be stateless: the derivatives may only depend on the
/// state variables of the cell at the current instant. This is what allows
/// compute backends to evaluate the model at every cell of the grid, in any
/// order and from any thread.
pub trait IonicModel: Send + Sync {
    /// Time derivatives of the state variables of a cell
    fn differentiate(&self, state: Variables) -> Variables;

    /// Evaluate [`IonicModel::differentiate()`] over whole fields
    ///
    /// Takes the U, V, W and S fields and returns dU, dV, dW and dS. All input
    /// fields must have the same shape, this is not checked.
    fn differentiate_fields(&self, [u, v, w, s]: [ScalarFieldView<'_>; 4]) -> [ScalarField; 4] {
        let derivatives = Zip::from(&u)
            .and(&v)
            .and(&w)
            .and(&s)
            .map_collect(|&u, &v, &w, &s| self.differentiate(Variables { u, v, w, s }));
        [
            derivatives.map(|d| d.u),
            derivatives.map(|d| d.v),
            derivatives.map(|d| d.w),
            derivatives.map(|d| d.s),
        ]
    }
}

/// Ionic model without any membrane current
///
/// Every state variable stays constant in the absence of diffusion, so the
/// simulation reduces to the heat equation on the potential.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Passive;
//
impl IonicModel for Passive {
    #[inline]
    fn differentiate(&self, _state: Variables) -> Variables {
        Variables::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::grid::Grid;

    #[test]
    fn passive_model_is_inert() {
        let state = Variables::from([0.7, 0.2, 0.4, 0.9]);
        assert_eq!(Passive.differentiate(state), Variables::default());
    }

    #[test]
    fn field_evaluation_matches_pointwise() {
        let grid = Grid::new([3, 2, 2], [1.0; 3]).unwrap();
        let u = ScalarField::from_shape_fn(grid.shape(), |(x, y, z)| {
            0.1 * x as Precision + 0.3 * y as Precision + 0.05 * z as Precision
        });
        let v = grid.filled(1.0);
        let w = grid.filled(0.8);
        let s = grid.filled(0.1);
        let model = MinimalModel::default();
        let derivatives = model.differentiate_fields([u.view(), v.view(), w.view(), s.view()]);
        for ((x, y, z), &u) in u.indexed_iter() {
            let expected: [Precision; 4] = model
                .differentiate(Variables {
                    u,
                    v: 1.0,
                    w: 0.8,
                    s: 0.1,
                })
                .into();
            for (field, expected) in derivatives.iter().zip(expected) {
                assert_eq!(field[[x, y, z]], expected);
            }
        }
    }
}
