//! Benchmarking utilities
//!
//! Please consider using the macros provided by this crate instead of calling
//! these implementation details directly.

use crate::{stimulus::Protocol, Problem, Simulate, SimulateCreate};
use clap::{Args, Command, FromArgMatches};
use criterion::{BenchmarkId, Criterion, Throughput};
use data::{geometry::Domain, grid::Grid, state::State};
use std::{hint::black_box, sync::Once};

/// Re-export criterion for the criterion_benchmark macro
pub use criterion;

/// Ionic model used by all backend benchmarks
pub type BenchmarkModel = ionic::MinimalModel;

// Make sure env_logger is only initialized once
fn init_logger() {
    static INIT_LOGGER: Once = Once::new();
    INIT_LOGGER.call_once(env_logger::init);
}

/// Common criterion benchmark for all cardiac simulation backends
/// Use via the criterion_benchmark macro
pub fn criterion_benchmark<Simulation>(c: &mut Criterion, backend_name: &str)
where
    Simulation: SimulateCreate<Model = BenchmarkModel> + Simulate,
{
    init_logger();

    let args = Simulation::CliArgs::from_arg_matches(
        &Simulation::CliArgs::augment_args(Command::default().no_binary_name(true))
            .get_matches_from(None::<&str>),
    )
    .expect("Failed to parse arguments from defaults & environment");
    log::info!("Benchmarking {backend_name} with {args:?}");

    let protocol = Protocol::new();
    let mut group = c.benchmark_group(backend_name.to_owned());
    for size_pow2 in 3..=7 {
        let size = 2usize.pow(size_pow2);
        let shape = [size; 3];
        let grid = Grid::new(shape, [1.0; 3]).expect("Benchmark grid should be valid");
        let domain = Domain::uniform(grid, 1.0).expect("Benchmark domain should be valid");
        let problem = Problem::new(domain, BenchmarkModel::default(), 0.1)
            .expect("Benchmark time step should be valid");
        let sim = Simulation::new(black_box(problem), black_box(args.clone()))
            .expect("Failed to set up the simulation");

        let mut seed = grid.zeros();
        seed.slice_mut(ndarray::s![..2, .., ..]).fill(1.0);
        let mut state = State::resting(&grid, seed).expect("Seed is defined on the grid");

        let num_steps = 8;
        group.throughput(Throughput::Elements((grid.num_cells() * num_steps) as u64));
        group.bench_function(
            BenchmarkId::from_parameter(format!("{size}³cells,{num_steps}steps")),
            |b| {
                b.iter(|| {
                    sim.perform_steps(&mut state, &protocol, 0, num_steps)
                        .expect("Simulation step failed")
                });
            },
        );
        black_box(state);
    }
    group.finish();
}
