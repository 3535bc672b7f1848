//! Parallel implementation of the cardiac tissue simulation
//!
//! This crate implements a parallel version of the simulation based on
//! domain decomposition and fork-join parallelism. The grid is recursively
//! split into slabs of x-planes until each slab is small enough to be
//! processed efficiently by a single thread.
//!
//! Boundary conditions, reaction and diffusion are fused into a single pass
//! over the grid, but every cell is computed with the same floating-point
//! operations as in the naive backend, so both produce identical results.

mod args;

pub use args::{CliArgs, DEFAULT_SEQ_BLOCK_SIZE};

use compute::{
    boundary::mirror_cell,
    diffusion::{inverse_spacing_squared, laplacian_at},
    Problem, SimulateBase, SimulateCreate, SimulateStep,
};
use data::{grid::ShapeMismatch, state::State, Precision, ScalarFieldView, ScalarFieldViewMut};
use ionic::{IonicModel, Variables};
use ndarray::{Axis, Zip};
use rayon::{prelude::*, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;

/// Number of bytes of field data that are accessed per grid cell in a step
///
/// That's the four inputs, the four outputs and the conductivity.
const BYTES_PER_CELL: usize = 9 * std::mem::size_of::<Precision>();

/// Cardiac tissue simulation
#[derive(Debug)]
pub struct Simulation<Model: IonicModel> {
    /// Problem being simulated
    problem: Problem<Model>,

    /// Number of grid cells below which parallelism is not considered
    /// worthwhile
    sequential_len_threshold: usize,
}
//
impl<Model: IonicModel> SimulateBase for Simulation<Model> {
    type CliArgs = CliArgs;

    type Model = Model;

    type Error = Error;

    fn problem(&self) -> &Problem<Model> {
        &self.problem
    }
}
//
impl<Model: IonicModel> SimulateCreate for Simulation<Model> {
    fn new(problem: Problem<Model>, args: CliArgs) -> Result<Self, Error> {
        if let Some(num_threads) = args.num_threads {
            ThreadPoolBuilder::new()
                .num_threads(num_threads.into())
                .build_global()
                .map_err(Error::ThreadPool)?;
        }
        let sequential_len_threshold = (args.seq_block_size() / BYTES_PER_CELL).max(1);
        log::debug!(
            "Parallel tasks will process at least {sequential_len_threshold} cells, \
             using {} threads",
            rayon::current_num_threads()
        );
        Ok(Self {
            problem,
            sequential_len_threshold,
        })
    }
}
//
impl<Model: IonicModel> SimulateStep for Simulation<Model> {
    fn perform_step(&self, state: &mut State) -> Result<(), Error> {
        self.problem.check_state(state)?;
        let (inputs, outputs) = state.in_out();
        let slab = Slab {
            x_start: 0,
            outputs,
        };
        rayon::iter::split(slab, |slab| {
            if slab.len() <= self.sequential_len_threshold || slab.num_planes() < 2 {
                (slab, None)
            } else {
                let (first, second) = slab.split();
                (first, Some(second))
            }
        })
        .for_each(|slab| self.step_slab(&inputs, slab));
        Ok(())
    }
}
//
impl<Model: IonicModel> Simulation<Model> {
    /// Compute the next state of a slab of the grid
    fn step_slab(&self, [in_u, in_v, in_w, in_s]: &[ScalarFieldView<'_>; 4], slab: Slab<'_>) {
        let domain = self.problem.domain();
        let shape = domain.grid().shape();
        let inv_spacing_sq = inverse_spacing_squared(domain.grid().spacing());
        let conductivity = domain.conductivity().view();
        let model = self.problem.model();
        let dt = self.problem.time_step();

        let x_start = slab.x_start;
        let [out_u, out_v, out_w, out_s] = slab.outputs;
        Zip::indexed(out_u)
            .and(out_v)
            .and(out_w)
            .and(out_s)
            .for_each(|(x, y, z), out_u, out_v, out_w, out_s| {
                let cell = [x_start + x, y, z];
                let variables = Variables {
                    u: in_u[cell],
                    v: in_v[cell],
                    w: in_w[cell],
                    s: in_s[cell],
                };
                let derivatives = model.differentiate(variables);
                let boundary_u = |cell| in_u[mirror_cell(cell, shape)];
                let u0 = boundary_u(cell);
                let lap = laplacian_at(cell, shape, boundary_u, &conductivity, inv_spacing_sq);
                *out_u = u0 + dt * derivatives.u + dt * lap;
                *out_v = variables.v + dt * derivatives.v;
                *out_w = variables.w + dt * derivatives.w;
                *out_s = variables.s + dt * derivatives.s;
            });
    }
}

/// Range of x-planes of the output state that a task is responsible for
struct Slab<'out> {
    /// Index of the first x-plane of the slab within the grid
    x_start: usize,

    /// Output U, V, W and S within the slab
    outputs: [ScalarFieldViewMut<'out>; 4],
}
//
impl Slab<'_> {
    /// Number of grid cells within the slab
    fn len(&self) -> usize {
        self.outputs[0].len()
    }

    /// Number of x-planes within the slab
    fn num_planes(&self) -> usize {
        self.outputs[0].len_of(Axis(0))
    }

    /// Split the slab into two halves
    fn split(self) -> (Self, Self) {
        let mid = self.num_planes() / 2;
        let [u, v, w, s] = self.outputs.map(|field| field.split_at(Axis(0), mid));
        let ((u1, u2), (v1, v2), (w1, w2), (s1, s2)) = (u, v, w, s);
        (
            Self {
                x_start: self.x_start,
                outputs: [u1, v1, w1, s1],
            },
            Self {
                x_start: self.x_start + mid,
                outputs: [u2, v2, w2, s2],
            },
        )
    }
}

/// Things that can go wrong when performing parallel simulation
#[derive(Debug, Error)]
pub enum Error {
    /// The state is not defined on the simulation grid
    #[error(transparent)]
    Shape(#[from] ShapeMismatch),

    /// Failed to configure thread pool
    #[error("failed to configure thread pool")]
    ThreadPool(#[source] ThreadPoolBuildError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::{geometry::Domain, grid::Grid};
    use ionic::Passive;

    #[test]
    fn slabs_split_along_x() {
        let grid = Grid::new([5, 2, 3], [1.0; 3]).unwrap();
        let mut state = State::resting(&grid, grid.zeros()).unwrap();
        let (_inputs, outputs) = state.in_out();
        let slab = Slab {
            x_start: 0,
            outputs,
        };
        assert_eq!(slab.len(), 30);
        let (first, second) = slab.split();
        assert_eq!((first.x_start, first.num_planes()), (0, 2));
        assert_eq!((second.x_start, second.num_planes()), (2, 3));
        assert_eq!(second.len(), 18);
        let (third, fourth) = second.split();
        assert_eq!((third.x_start, third.num_planes()), (2, 1));
        assert_eq!((fourth.x_start, fourth.num_planes()), (3, 2));
    }

    #[test]
    fn block_size_sets_task_granularity() {
        let grid = Grid::new([4, 4, 4], [1.0; 3]).unwrap();
        let problem = Problem::new(Domain::uniform(grid, 1.0).unwrap(), Passive, 0.1).unwrap();
        let sim = Simulation::new(problem.clone(), CliArgs::default()).unwrap();
        assert_eq!(
            sim.sequential_len_threshold,
            DEFAULT_SEQ_BLOCK_SIZE / BYTES_PER_CELL
        );
        let args = CliArgs {
            seq_block_size: std::num::NonZeroUsize::new(1),
            ..Default::default()
        };
        let sim = Simulation::new(problem, args).unwrap();
        assert_eq!(sim.sequential_len_threshold, 1);
    }

    #[test]
    fn foreign_states_are_rejected() {
        let grid = Grid::new([4, 4, 4], [1.0; 3]).unwrap();
        let problem = Problem::new(Domain::uniform(grid, 1.0).unwrap(), Passive, 0.1).unwrap();
        let sim = Simulation::new(problem, CliArgs::default()).unwrap();
        let other = Grid::new([4, 3, 4], [1.0; 3]).unwrap();
        let mut state = State::resting(&other, other.zeros()).unwrap();
        assert!(matches!(sim.perform_step(&mut state), Err(Error::Shape(_))));
    }
}
