//! Heterogeneous diffusion operator
//!
//! The Laplacian term `∇·(D∇U)` is discretized with the conservative 7-point
//! stencil. The flux through the face between two neighboring cells is
//! proportional to the potential difference across the face, weighted by the
//! harmonic mean of the two cells' conductivities. Insulating cells thus
//! block all flux through their faces, and no flux goes through the faces of
//! the domain edge.

use data::{
    array3,
    grid::{Grid, ShapeMismatch},
    Precision, ScalarField, ScalarFieldView,
};

/// Conductivity of the face between two cells
#[inline]
pub fn face_conductivity(left: Precision, right: Precision) -> Precision {
    let sum = left + right;
    if sum > 0.0 {
        2.0 * left * right / sum
    } else {
        0.0
    }
}

/// Inverse squared grid spacing along each axis
pub fn inverse_spacing_squared(spacing: [Precision; 3]) -> [Precision; 3] {
    array3(|axis| 1.0 / (spacing[axis] * spacing[axis]))
}

/// Weighted Laplacian at a single cell
///
/// `potential` gives access to the boundary-enforced potential at any cell of
/// the grid, which lets backends evaluate the boundary conditions on the fly
/// instead of materializing a padded field. `conductivity` must have the
/// shape `shape`, which is not checked.
#[inline(always)]
pub fn laplacian_at(
    cell: [usize; 3],
    shape: [usize; 3],
    potential: impl Fn([usize; 3]) -> Precision,
    conductivity: &ScalarFieldView<'_>,
    inv_spacing_sq: [Precision; 3],
) -> Precision {
    let center_u = potential(cell);
    let center_d = conductivity[cell];
    let mut acc = 0.0;
    for axis in 0..3 {
        let mut flux = 0.0;
        if cell[axis] > 0 {
            let mut neighbor = cell;
            neighbor[axis] -= 1;
            let d = face_conductivity(center_d, conductivity[neighbor]);
            flux += d * (potential(neighbor) - center_u);
        }
        if cell[axis] + 1 < shape[axis] {
            let mut neighbor = cell;
            neighbor[axis] += 1;
            let d = face_conductivity(center_d, conductivity[neighbor]);
            flux += d * (potential(neighbor) - center_u);
        }
        acc += flux * inv_spacing_sq[axis];
    }
    acc
}

/// Weighted Laplacian of a boundary-enforced potential field
pub fn laplacian(
    grid: &Grid,
    potential: ScalarFieldView<'_>,
    conductivity: ScalarFieldView<'_>,
) -> Result<ScalarField, ShapeMismatch> {
    grid.check("diffused potential", potential.shape())?;
    grid.check("conductivity", conductivity.shape())?;
    let shape = grid.shape();
    let inv_spacing_sq = inverse_spacing_squared(grid.spacing());
    Ok(ScalarField::from_shape_fn(shape, |(x, y, z)| {
        laplacian_at(
            [x, y, z],
            shape,
            |cell| potential[cell],
            &conductivity,
            inv_spacing_sq,
        )
    }))
}

/// Stability number of the explicit Euler diffusion scheme
///
/// The scheme is stable when `dt · max(D) · Σ 2/h²` is at most 1.
pub fn stability_number(
    time_step: Precision,
    max_conductivity: Precision,
    spacing: [Precision; 3],
) -> Precision {
    let stencil_weight: Precision = inverse_spacing_squared(spacing)
        .iter()
        .map(|inv_h2| 2.0 * inv_h2)
        .sum();
    time_step * max_conductivity * stencil_weight
}
