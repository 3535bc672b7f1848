//! Common facilities shared by all compute backends
//!
//! A compute backend knows how to advance the tissue [`State`] by one explicit
//! Euler time step. Everything around that, namely the no-flux boundary
//! conditions, the diffusion stencil, the stimulus protocol and the time
//! integration loop, is defined here so that all backends agree on it.

#[cfg(feature = "criterion")]
pub mod benchmark;
pub mod boundary;
pub mod diffusion;
pub mod integrator;
pub mod stimulus;

use clap::Args;
use data::{
    geometry::Domain,
    grid::ShapeMismatch,
    parameters::ConfigError,
    state::State,
    Precision,
};
use ionic::IonicModel;
use std::{error::Error, fmt::Debug};
use stimulus::Protocol;

/// Everything that compute backends need to know about the simulated problem
#[derive(Clone, Debug, PartialEq)]
pub struct Problem<Model: IonicModel> {
    /// Tissue geometry and conductivity
    domain: Domain,

    /// Reaction term
    model: Model,

    /// Time step
    time_step: Precision,
}
//
impl<Model: IonicModel> Problem<Model> {
    /// Describe a simulation problem
    pub fn new(domain: Domain, model: Model, time_step: Precision) -> Result<Self, ConfigError> {
        if !(time_step.is_finite() && time_step > 0.0) {
            return Err(ConfigError::NonPositiveTimeStep(time_step));
        }
        Ok(Self {
            domain,
            model,
            time_step,
        })
    }

    /// Tissue geometry and conductivity
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Reaction term
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Time step
    pub fn time_step(&self) -> Precision {
        self.time_step
    }

    /// Stability number of the explicit diffusion scheme
    ///
    /// The scheme is stable when this is at most 1. This is not enforced.
    pub fn stability_number(&self) -> Precision {
        diffusion::stability_number(
            self.time_step,
            self.domain.max_conductivity(),
            self.domain.grid().spacing(),
        )
    }

    /// Check that a state is defined on the problem's grid
    pub fn check_state(&self, state: &State) -> Result<(), ShapeMismatch> {
        state.check(self.domain.grid())
    }
}

/// Commonalities between all ways to set up a simulation
pub trait SimulateBase: Sized {
    /// Supplementary CLI arguments allowing fine-tuning of this backend
    ///
    /// To honor the principle of least surprise and make criterion
    /// microbenchmarks work smoothly, any argument you add must have a default
    /// value and should also be configurable through environment variables.
    type CliArgs: Args + Clone + Debug;

    /// Reaction term of the simulated tissue
    type Model: IonicModel;

    /// Errors that can occur during a simulation
    type Error: Error + From<ShapeMismatch> + Send + Sync + 'static;

    /// Problem being simulated
    fn problem(&self) -> &Problem<Self::Model>;
}

/// Simulation setup
pub trait SimulateCreate: SimulateBase {
    /// Set up the simulation
    fn new(problem: Problem<Self::Model>, args: Self::CliArgs) -> Result<Self, Self::Error>;
}

/// Simulation that performs one time step at a time
///
/// If you implement this, then a [`Simulate`] implementation that loops while
/// applying stimuli and flipping the state buffers will be automatically
/// provided.
pub trait SimulateStep: SimulateBase {
    /// Compute the next state of the tissue
    ///
    /// The current state is read from the input buffers of `state`, and the
    /// next state is written into its output buffers. It is the job of the
    /// caller to flip the buffers if they want the result to become the input.
    ///
    /// Implementations must check that `state` is defined on the problem's
    /// grid before touching it.
    fn perform_step(&self, state: &mut State) -> Result<(), Self::Error>;
}

/// Simulation of several time steps
pub trait Simulate: SimulateBase {
    /// Perform `steps` time steps, the first of which has index `first_step`
    ///
    /// After each step, the stimuli of `protocol` that are active at the
    /// step's index raise the potential, then the new state replaces the old
    /// one as a whole.
    fn perform_steps(
        &self,
        state: &mut State,
        protocol: &Protocol,
        first_step: usize,
        steps: usize,
    ) -> Result<(), Self::Error>;
}
//
impl<T: SimulateStep> Simulate for T {
    fn perform_steps(
        &self,
        state: &mut State,
        protocol: &Protocol,
        first_step: usize,
        steps: usize,
    ) -> Result<(), Self::Error> {
        for step in first_step..first_step + steps {
            self.perform_step(state)?;
            protocol.apply(step, state.output_potential_mut().view_mut())?;
            state.flip();
        }
        Ok(())
    }
}

/// Placeholder for backends that have no CLI arguments
#[derive(Args, Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct NoArgs {}

/// Macro that generates a complete criterion benchmark harness for you
#[macro_export]
#[cfg(feature = "criterion")]
macro_rules! criterion_benchmark {
    ($backend:ident) => {
        fn criterion_benchmark(c: &mut $crate::benchmark::criterion::Criterion) {
            $crate::benchmark::criterion_benchmark::<
                $backend::Simulation<$crate::benchmark::BenchmarkModel>,
            >(c, stringify!($backend))
        }
        $crate::benchmark::criterion::criterion_group!(benches, criterion_benchmark);
        $crate::benchmark::criterion::criterion_main!(benches);
    };
}
