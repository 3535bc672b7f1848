//! End-to-end simulation scenarios

use compute::{
    integrator::{Integrator, Snapshot},
    stimulus::{Protocol, Schedule, Stimulus},
    Problem, Simulate, SimulateCreate, SimulateStep,
};
use compute_naive::Simulation;
use data::{
    geometry::Domain,
    grid::Grid,
    parameters::Parameters,
    state::State,
    Precision, ScalarField,
};
use ionic::{IonicModel, MinimalModel, Passive, Variables};
use ndarray::s;
use std::num::NonZeroUsize;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cube() -> Grid {
    Grid::new([8, 8, 8], [1.0; 3]).unwrap()
}

/// Potential at rest, except for a 2-cell thick x-slab in the middle
fn slab(grid: &Grid) -> ScalarField {
    let mut u = grid.zeros();
    u.slice_mut(s![3..5, .., ..]).fill(1.0);
    u
}

fn simulation<Model: IonicModel>(domain: Domain, model: Model) -> Simulation<Model> {
    Simulation::new(Problem::new(domain, model, 0.1).unwrap(), Default::default()).unwrap()
}

#[test]
fn slab_diffuses_symmetrically() {
    init_logger();
    let grid = cube();
    let sim = simulation(Domain::uniform(grid, 1.0).unwrap(), Passive);
    let initial = slab(&grid);
    let mut state = State::resting(&grid, initial.clone()).unwrap();
    sim.perform_steps(&mut state, &Protocol::new(), 0, 5).unwrap();

    let u = state.potential();
    for y in 0..8 {
        for z in 0..8 {
            // The potential spreads out of the slab
            assert!(u[[2, y, z]] > initial[[2, y, z]]);
            assert!(u[[5, y, z]] > initial[[5, y, z]]);
            assert!(u[[3, y, z]] < 1.0 && u[[4, y, z]] < 1.0);
            assert!(u[[3, y, z]] > 0.0);

            // Symmetric slab, symmetric boundaries, symmetric result
            for x in 0..4 {
                assert!((u[[x, y, z]] - u[[7 - x, y, z]]).abs() < 1e-6);
            }

            // Nothing varies along the slab
            assert_eq!(u[[2, y, z]], u[[2, 0, 0]]);
        }
    }

    // Gating variables are not diffused
    let [_u, v, w, s] = state.current();
    assert!(v.iter().chain(w.iter()).all(|&x| x == 1.0));
    assert!(s.iter().all(|&x| x == 0.0));
}

#[test]
fn steps_are_deterministic() {
    let grid = cube();
    let sim = simulation(Domain::uniform(grid, 1.0).unwrap(), MinimalModel::default());
    let run = || {
        let mut state = State::resting(&grid, slab(&grid)).unwrap();
        sim.perform_steps(&mut state, &Protocol::new(), 0, 20).unwrap();
        state.into_current()
    };
    assert_eq!(run(), run());
}

#[test]
fn steps_do_not_depend_on_batching() {
    let grid = cube();
    let domain = Domain::uniform(grid, 1.0).unwrap();
    let params = Parameters {
        shape: grid.shape(),
        s2_time: 0.4,
        ..Default::default()
    };
    let protocol = Protocol::from_iter([Stimulus::s2(&domain, &params).unwrap()]);
    let sim = simulation(domain, MinimalModel::default());

    let mut direct = State::resting(&grid, slab(&grid)).unwrap();
    sim.perform_steps(&mut direct, &protocol, 0, 9).unwrap();

    let mut batched = State::resting(&grid, slab(&grid)).unwrap();
    sim.perform_steps(&mut batched, &protocol, 0, 8).unwrap();
    sim.perform_steps(&mut batched, &protocol, 8, 1).unwrap();

    assert_eq!(direct.into_current(), batched.into_current());
}

#[test]
fn stimulus_raises_tissue_once() {
    init_logger();
    let grid = cube();
    let mut mask = grid.filled(1.0);
    mask[[3, 3, 3]] = 0.0;
    let domain = Domain::from_mask(grid, mask.clone(), 1.0).unwrap();
    let dt = 0.1;
    let schedule = Schedule::new(0.0, 1, 800.0, dt, dt).unwrap();
    let protocol = Protocol::from_iter([Stimulus::new(&grid, mask, schedule).unwrap()]);
    let sim = simulation(domain, Passive);

    let mut u = grid.zeros();
    u.slice_mut(s![..2, .., ..]).fill(1.0);
    let mut state = State::resting(&grid, u).unwrap();
    sim.perform_steps(&mut state, &protocol, 0, 1).unwrap();
    for (cell, &u) in state.potential().indexed_iter() {
        let expected = if cell == (3, 3, 3) { 0.0 } else { 1.0 };
        assert_eq!(u, expected, "at {cell:?}");
    }

    // Inactive afterwards, and the insulated cell stays isolated
    assert!((1..100).all(|step| !schedule.is_active_at_step(step)));
    let after_stimulus = state.potential().clone();
    sim.perform_steps(&mut state, &protocol, 1, 10).unwrap();
    assert_eq!(state.potential(), &after_stimulus);
}

#[test]
fn insulated_cells_follow_their_own_kinetics() {
    let grid = Grid::new([4, 4, 4], [1.0; 3]).unwrap();
    let model = MinimalModel::default();
    let sim = simulation(Domain::uniform(grid, 0.0).unwrap(), model);
    let u = ScalarField::from_shape_fn(grid.shape(), |(x, y, z)| {
        ((x + 2 * y + 3 * z) % 5) as Precision * 0.3
    });
    let mut state = State::resting(&grid, u.clone()).unwrap();
    sim.perform_step(&mut state).unwrap();
    state.flip();

    let [new_u, new_v, new_w, new_s] = state.current();
    for x in 1..3 {
        for y in 1..3 {
            for z in 1..3 {
                let cell = [x, y, z];
                let d = model.differentiate(Variables {
                    u: u[cell],
                    v: 1.0,
                    w: 1.0,
                    s: 0.0,
                });
                assert_eq!(new_u[cell], u[cell] + 0.1 * d.u + 0.1 * 0.0);
                assert_eq!(new_v[cell], 1.0 + 0.1 * d.v);
                assert_eq!(new_w[cell], 1.0 + 0.1 * d.w);
                assert_eq!(new_s[cell], 0.0 + 0.1 * d.s);
            }
        }
    }
}

#[test]
fn foreign_states_are_rejected() {
    let sim = simulation(Domain::uniform(cube(), 1.0).unwrap(), Passive);
    let grid = Grid::new([8, 8, 7], [1.0; 3]).unwrap();
    let mut state = State::resting(&grid, grid.zeros()).unwrap();
    let err = sim.perform_step(&mut state).unwrap_err();
    assert_eq!(err.expected, [8, 8, 8]);
    assert_eq!(err.actual, vec![8, 8, 7]);
}

#[test]
fn excitation_propagates_through_tissue() {
    init_logger();
    let params = Parameters {
        shape: [12, 2, 2],
        samples: 1000,
        dt_per_plot: 10,
        ..Default::default()
    };
    let domain = Domain::load(&params).unwrap();
    let mut state = State::initial(&domain, &params);
    let sim = simulation(domain, MinimalModel::default());
    let integrator = Integrator::new(sim, Protocol::new(), params.samples)
        .observe_every(NonZeroUsize::new(params.dt_per_plot).unwrap());

    let mut snapshots: Vec<Snapshot> = Vec::new();
    let report = integrator.run(&mut state, &mut snapshots).unwrap();
    assert_eq!(report.observations, 100);
    assert_eq!(report.first_non_finite_step, None);
    assert!(state.is_finite());

    let mut peak: Vec<Precision> = vec![0.0; params.shape[0]];
    for snapshot in &snapshots {
        for (x, peak) in peak.iter_mut().enumerate() {
            *peak = snapshot.potential[[x, 0, 0]].max(*peak);
        }
    }
    for (x, &peak) in peak.iter().enumerate() {
        assert!(peak > 0.5, "cell {x} was never excited (peak {peak})");
    }
}
