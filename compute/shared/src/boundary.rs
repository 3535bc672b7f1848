//! No-flux (Neumann) boundary conditions
//!
//! The outermost layer of cells of the potential field is overwritten with a
//! mirror image of the adjacent interior layer before the diffusion stencil is
//! evaluated. The potential gradient across the domain edge is thus zero, and
//! no current flows out of the tissue.
//!
//! Along an axis that has fewer than 3 cells, there is no interior layer to
//! mirror, and every layer is left as is.

use data::{grid::Grid, grid::ShapeMismatch, array3, ScalarField, ScalarFieldView};

/// Index of the cell that a boundary-enforced field copies at some index
///
/// `len` is the number of cells along the axis of interest.
#[inline]
pub fn mirror(index: usize, len: usize) -> usize {
    debug_assert!(index < len);
    if len < 3 {
        index
    } else if index == 0 {
        1
    } else if index == len - 1 {
        len - 2
    } else {
        index
    }
}

/// Index of the cell that a boundary-enforced field copies at some position
#[inline]
pub fn mirror_cell(cell: [usize; 3], shape: [usize; 3]) -> [usize; 3] {
    array3(|axis| mirror(cell[axis], shape[axis]))
}

/// Apply no-flux boundary conditions to a field
///
/// Returns a copy of `field` where the outermost layer of cells along every
/// axis is replaced by the adjacent interior layer.
pub fn enforce_neumann(
    grid: &Grid,
    field: ScalarFieldView<'_>,
) -> Result<ScalarField, ShapeMismatch> {
    grid.check("boundary-enforced field", field.shape())?;
    let shape = grid.shape();
    Ok(ScalarField::from_shape_fn(shape, |(x, y, z)| {
        field[mirror_cell([x, y, z], shape)]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::Precision;

    fn grid(shape: [usize; 3]) -> Grid {
        Grid::new(shape, [1.0; 3]).unwrap()
    }

    fn ramp(shape: [usize; 3]) -> ScalarField {
        ScalarField::from_shape_fn(shape, |(x, y, z)| (x * 100 + y * 10 + z) as Precision)
    }

    #[test]
    fn mirror_indices() {
        assert_eq!((0..5).map(|i| mirror(i, 5)).collect::<Vec<_>>(), [1, 1, 2, 3, 3]);
        assert_eq!((0..3).map(|i| mirror(i, 3)).collect::<Vec<_>>(), [1, 1, 1]);
        assert_eq!((0..2).map(|i| mirror(i, 2)).collect::<Vec<_>>(), [0, 1]);
        assert_eq!(mirror(0, 1), 0);
    }

    #[test]
    fn uniform_field_is_unchanged() {
        let grid = grid([5, 4, 3]);
        let field = grid.filled(0.75);
        assert_eq!(enforce_neumann(&grid, field.view()).unwrap(), field);
    }

    #[test]
    fn edges_mirror_interior() {
        let shape = [5, 4, 3];
        let grid = grid(shape);
        let field = ramp(shape);
        let enforced = enforce_neumann(&grid, field.view()).unwrap();
        for ((x, y, z), &value) in enforced.indexed_iter() {
            let on_edge = [x, y, z]
                .iter()
                .zip(shape)
                .any(|(&i, len)| i == 0 || i == len - 1);
            if !on_edge {
                assert_eq!(value, field[[x, y, z]]);
            }
        }
        assert_eq!(enforced[[0, 2, 1]], field[[1, 2, 1]]);
        assert_eq!(enforced[[4, 0, 2]], field[[3, 1, 1]]);
        assert_eq!(enforced[[0, 0, 0]], field[[1, 1, 1]]);
        assert_eq!(enforced[[4, 3, 2]], field[[3, 2, 1]]);
    }

    #[test]
    fn degenerate_axes_are_replicated() {
        // A single layer along z, two layers along y: only x is mirrored
        let shape = [4, 2, 1];
        let flat = grid(shape);
        let field = ramp(shape);
        let enforced = enforce_neumann(&flat, field.view()).unwrap();
        for y in 0..2 {
            assert_eq!(enforced[[0, y, 0]], field[[1, y, 0]]);
            assert_eq!(enforced[[1, y, 0]], field[[1, y, 0]]);
            assert_eq!(enforced[[2, y, 0]], field[[2, y, 0]]);
            assert_eq!(enforced[[3, y, 0]], field[[2, y, 0]]);
        }

        let single = grid([1, 1, 1]);
        let field = single.filled(3.0);
        assert_eq!(enforce_neumann(&single, field.view()).unwrap(), field);
    }

    #[test]
    fn rejects_foreign_fields() {
        let grid = grid([3, 3, 3]);
        let err = enforce_neumann(&grid, ScalarField::zeros([3, 3, 4]).view()).unwrap_err();
        assert_eq!(err.expected, [3, 3, 3]);
    }
}
