//! Tissue geometry and conductivity

use crate::{
    grid::{Grid, ShapeMismatch},
    parameters::{ConfigError, Parameters},
    Precision, ScalarField, ScalarFieldView,
};
use ndarray::Zip;
use std::path::Path;

/// Potential reported for cells that are not tissue in masked fields
pub const NON_TISSUE_POTENTIAL: Precision = -1.0;

/// Simulation domain: which cells are tissue, and how well they conduct
///
/// The domain is built once before the simulation starts and is never
/// modified afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Domain {
    /// Simulation grid
    grid: Grid,

    /// Geometry mask, positive values denote tissue
    mask: ScalarField,

    /// Per-cell diffusion coefficient, zero means insulation
    conductivity: ScalarField,
}
//
impl Domain {
    /// Domain where every cell is tissue with the same conductivity
    pub fn uniform(grid: Grid, diffusion: Precision) -> Result<Self, ConfigError> {
        Self::from_mask(grid, grid.filled(1.0), diffusion)
    }

    /// Domain with the given geometry mask and a uniform tissue conductivity
    ///
    /// Cells outside of the tissue get a zero conductivity.
    pub fn from_mask(
        grid: Grid,
        mask: ScalarField,
        diffusion: Precision,
    ) -> Result<Self, ConfigError> {
        check_conductivity(diffusion)?;
        let conductivity = mask.mapv(|m| if m > 0.0 { diffusion } else { 0.0 });
        Self::heterogeneous(grid, mask, conductivity)
    }

    /// Domain with an arbitrary geometry mask and conductivity field
    pub fn heterogeneous(
        grid: Grid,
        mask: ScalarField,
        conductivity: ScalarField,
    ) -> Result<Self, ConfigError> {
        grid.check("geometry mask", mask.shape())?;
        grid.check("conductivity", conductivity.shape())?;
        for &d in conductivity.iter() {
            check_conductivity(d)?;
        }
        Ok(Self {
            grid,
            mask,
            conductivity,
        })
    }

    /// Build the domain described by simulation parameters
    ///
    /// If no geometry file is specified, the whole grid is tissue.
    pub fn load(params: &Parameters) -> Result<Self, ConfigError> {
        let grid = params.grid()?;
        match &params.geometry_file {
            Some(path) => {
                let mask =
                    load_mask(path, grid, params.block_averaging, params.image_threshold)?;
                log::info!(
                    "Loaded geometry from {}: {} tissue cells out of {}",
                    path.display(),
                    mask.iter().filter(|&&m| m > 0.0).count(),
                    grid.num_cells()
                );
                Self::from_mask(grid, mask, params.diffusion)
            }
            None => Self::uniform(grid, params.diffusion),
        }
    }

    /// Simulation grid
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Geometry mask
    pub fn mask(&self) -> &ScalarField {
        &self.mask
    }

    /// Conductivity field
    pub fn conductivity(&self) -> &ScalarField {
        &self.conductivity
    }

    /// Truth that a certain cell is tissue
    pub fn is_tissue(&self, cell: [usize; 3]) -> bool {
        self.mask[cell] > 0.0
    }

    /// Highest conductivity of the domain
    pub fn max_conductivity(&self) -> Precision {
        self.conductivity.fold(0.0, |acc, &d| acc.max(d))
    }

    /// Copy of a field where non-tissue cells are replaced with a sentinel
    pub fn masked(
        &self,
        field: ScalarFieldView<'_>,
        sentinel: Precision,
    ) -> Result<ScalarField, ShapeMismatch> {
        self.grid.check("masked field", field.shape())?;
        Ok(Zip::from(&self.mask)
            .and(&field)
            .map_collect(|&m, &x| if m > 0.0 { x } else { sentinel }))
    }
}

/// Check that a conductivity value is usable
fn check_conductivity(d: Precision) -> Result<(), ConfigError> {
    if d.is_finite() && d >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NegativeConductivity(d))
    }
}

/// Load a geometry mask from an image
///
/// The image is a mosaic of `depth` z-slices, laid out left to right then top
/// to bottom. Each slice spans `width * Mx` pixels horizontally and `height *
/// My` pixels vertically, and every `Mx x My` block of pixels is averaged into
/// a single voxel. Voxels whose average luminance exceeds `threshold` are
/// tissue (mask value 1), others are not (mask value 0).
pub fn load_mask(
    path: &Path,
    grid: Grid,
    [mx, my]: [usize; 2],
    threshold: Precision,
) -> Result<ScalarField, ConfigError> {
    for (axis, factor) in ["Mx", "My"].into_iter().zip([mx, my]) {
        if factor == 0 {
            return Err(ConfigError::InvalidBlockAveraging { axis });
        }
    }
    let image = image::open(path)
        .map_err(|source| ConfigError::GeometryUnreadable {
            path: path.to_owned(),
            source,
        })?
        .to_luma32f();
    let [width, height, depth] = grid.shape();

    // Check that the mosaic holds enough slices
    let slice_size = [width * mx, height * my];
    let image_size = [image.width(), image.height()];
    let slices_per_row = image_size[0] as usize / slice_size[0];
    let slice_rows = image_size[1] as usize / slice_size[1];
    if slices_per_row * slice_rows < depth {
        return Err(ConfigError::GeometryTooSmall {
            path: path.to_owned(),
            image_size,
            slice_size,
            depth,
        });
    }

    // Average pixel blocks into voxels
    let block_norm = 1.0 / (mx * my) as Precision;
    Ok(ScalarField::from_shape_fn(grid.shape(), |(x, y, z)| {
        let origin = [
            (z % slices_per_row) * slice_size[0] + x * mx,
            (z / slices_per_row) * slice_size[1] + y * my,
        ];
        let mut sum = 0.0;
        for dy in 0..my {
            for dx in 0..mx {
                sum += image.get_pixel((origin[0] + dx) as u32, (origin[1] + dy) as u32).0[0];
            }
        }
        if sum * block_norm > threshold {
            1.0
        } else {
            0.0
        }
    }))
}
