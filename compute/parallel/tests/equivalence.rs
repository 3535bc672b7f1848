//! The parallel backend must reproduce the naive backend exactly

use compute::{
    stimulus::{Protocol, Stimulus},
    Problem, Simulate, SimulateCreate,
};
use compute_parallel::CliArgs;
use data::{geometry::Domain, grid::Grid, parameters::Parameters, state::State, Precision};
use ionic::MinimalModel;
use std::num::NonZeroUsize;

/// Run both backends on the same problem and compare their final states
fn compare(domain: Domain, initial: State, seq_block_size: usize, steps: usize) {
    let params = Parameters {
        shape: domain.grid().shape(),
        s2_time: 1.0,
        ..Default::default()
    };
    let protocol = Protocol::from_iter([Stimulus::s2(&domain, &params).unwrap()]);
    let problem = Problem::new(domain, MinimalModel::default(), 0.1).unwrap();

    let naive = compute_naive::Simulation::new(problem.clone(), Default::default()).unwrap();
    let mut expected = initial.clone();
    naive
        .perform_steps(&mut expected, &protocol, 0, steps)
        .unwrap();

    let args = CliArgs {
        num_threads: None,
        seq_block_size: NonZeroUsize::new(seq_block_size),
    };
    let parallel = compute_parallel::Simulation::new(problem, args).unwrap();
    let mut actual = initial;
    parallel
        .perform_steps(&mut actual, &protocol, 0, steps)
        .unwrap();

    assert_eq!(actual.into_current(), expected.into_current());
}

#[test]
fn uniform_box() {
    let params = Parameters {
        shape: [13, 6, 5],
        ..Default::default()
    };
    let domain = Domain::load(&params).unwrap();
    let initial = State::initial(&domain, &params);
    for seq_block_size in [1, 1000, 1 << 20] {
        compare(domain.clone(), initial.clone(), seq_block_size, 30);
    }
}

#[test]
fn heterogeneous_tissue() {
    let grid = Grid::new([9, 7, 4], [0.5, 1.0, 2.0]).unwrap();
    let mask = data::ScalarField::from_shape_fn(grid.shape(), |(x, y, z)| {
        if (x + y + z) % 7 == 0 {
            0.0
        } else {
            1.0
        }
    });
    let conductivity = data::ScalarField::from_shape_fn(grid.shape(), |(x, y, z)| {
        mask[[x, y, z]] * (0.1 + 0.05 * ((x * y + z) % 4) as Precision)
    });
    let domain = Domain::heterogeneous(grid, mask, conductivity).unwrap();
    let u = data::ScalarField::from_shape_fn(grid.shape(), |(x, y, _)| {
        if x < 2 || y > 5 {
            1.0
        } else {
            0.0
        }
    });
    let initial = State::resting(&grid, u).unwrap();
    compare(domain, initial, 1, 25);
}

#[test]
fn degenerate_axes() {
    let grid = Grid::new([6, 1, 2], [1.0; 3]).unwrap();
    let domain = Domain::uniform(grid, 0.5).unwrap();
    let mut u = grid.zeros();
    u[[0, 0, 0]] = 1.0;
    let initial = State::resting(&grid, u).unwrap();
    compare(domain, initial, 1, 10);
}
