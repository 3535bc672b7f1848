//! Time integration loop
//!
//! The [`Integrator`] drives a simulation backend through a fixed number of
//! time steps, applying the stimulus protocol after each step and handing
//! masked snapshots of the potential to an [`Observer`] at a fixed cadence.

use crate::{stimulus::Protocol, Simulate};
use data::{geometry::NON_TISSUE_POTENTIAL, state::State, Precision, ScalarField};
use std::{
    convert::Infallible,
    error::Error,
    num::NonZeroUsize,
    time::{Duration, Instant},
};
use thiserror::Error;

/// Masked potential at the end of some time step
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Index of the time step that produced this potential
    pub step: usize,

    /// Simulated time at the end of that step
    pub time: Precision,

    /// Membrane potential, with non-tissue cells set to the sentinel value
    pub potential: ScalarField,
}

/// Something that receives snapshots of the potential as a simulation runs
///
/// Observers may be called any number of times, including zero. They only
/// get copies of the potential and thus cannot affect the simulation.
pub trait Observer {
    /// Error that can occur while handling a snapshot
    type Error: Error + Send + Sync + 'static;

    /// Handle a new snapshot
    fn observe(&mut self, snapshot: Snapshot) -> Result<(), Self::Error>;

    /// Handle the end of the simulation
    fn finish(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
//
/// Observer that discards all snapshots
impl Observer for () {
    type Error = Infallible;

    fn observe(&mut self, _snapshot: Snapshot) -> Result<(), Infallible> {
        Ok(())
    }
}
//
/// Observer that records all snapshots in memory
impl Observer for Vec<Snapshot> {
    type Error = Infallible;

    fn observe(&mut self, snapshot: Snapshot) -> Result<(), Infallible> {
        self.push(snapshot);
        Ok(())
    }
}

/// Summary of a completed simulation run
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    /// Number of time steps that were performed
    pub steps: usize,

    /// Number of snapshots that were sent to the observer
    pub observations: usize,

    /// First observed time step after which the state was not finite
    pub first_non_finite_step: Option<usize>,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

/// Failure of a simulation run
///
/// Errors from the backend and the observer are passed through unchanged.
#[derive(Debug, Error)]
pub enum RunError<SimulationError: Error + 'static, ObserverError: Error + 'static> {
    /// The simulation backend failed
    #[error(transparent)]
    Simulation(SimulationError),

    /// The observer failed to handle a snapshot
    #[error("failed to handle a potential snapshot")]
    Observer(#[source] ObserverError),
}

/// Time integration loop
pub struct Integrator<Simulation: Simulate> {
    /// Simulation backend
    simulation: Simulation,

    /// Stimuli applied after each step
    protocol: Protocol,

    /// Total number of time steps
    samples: usize,

    /// Number of time steps between two observations, if observing
    cadence: Option<NonZeroUsize>,

    /// Value of non-tissue cells in snapshots, [`NON_TISSUE_POTENTIAL`] by
    /// default
    sentinel: Precision,
}
//
impl<Simulation: Simulate> Integrator<Simulation> {
    /// Set up a time integration loop that performs `samples` time steps
    ///
    /// By default, the potential is never observed.
    pub fn new(simulation: Simulation, protocol: Protocol, samples: usize) -> Self {
        let stability = simulation.problem().stability_number();
        if stability > 1.0 {
            log::warn!(
                "Diffusion stability number is {stability} > 1, \
                 the explicit scheme will likely diverge. Consider reducing dt."
            );
        } else {
            log::debug!("Diffusion stability number is {stability}");
        }
        Self {
            simulation,
            protocol,
            samples,
            cadence: None,
            sentinel: NON_TISSUE_POTENTIAL,
        }
    }

    /// Observe the potential after every step whose index is a multiple of
    /// `cadence`
    pub fn observe_every(mut self, cadence: NonZeroUsize) -> Self {
        self.cadence = Some(cadence);
        self
    }

    /// Use another value for non-tissue cells in snapshots
    pub fn with_sentinel(mut self, sentinel: Precision) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Simulation backend
    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Total number of time steps
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Number of snapshots that a run will produce
    pub fn num_observations(&self) -> usize {
        self.cadence
            .map_or(0, |cadence| self.samples.div_ceil(cadence.get()))
    }

    /// Run the simulation to completion
    ///
    /// `state` holds the initial state on input and the final state on
    /// output. The first failure of the backend or observer aborts the run.
    pub fn run<Obs: Observer>(
        &self,
        state: &mut State,
        observer: &mut Obs,
    ) -> Result<Report, RunError<Simulation::Error, Obs::Error>> {
        let start = Instant::now();
        let problem = self.simulation.problem();
        problem
            .check_state(state)
            .map_err(|e| RunError::Simulation(e.into()))?;
        let time_step = problem.time_step();

        let mut next_step = 0;
        let mut observations = 0;
        let mut first_non_finite_step = None;
        while next_step < self.samples {
            // Run up to the next observation point, or to the end
            let next_observation = self
                .cadence
                .map(|cadence| next_step.div_ceil(cadence.get()) * cadence.get())
                .filter(|&step| step < self.samples);
            let batch_end = next_observation.map_or(self.samples, |step| step + 1);
            self.simulation
                .perform_steps(state, &self.protocol, next_step, batch_end - next_step)
                .map_err(RunError::Simulation)?;
            next_step = batch_end;

            if let Some(step) = next_observation {
                if first_non_finite_step.is_none() && !state.is_finite() {
                    log::warn!("Simulation state is not finite after step {step}");
                    first_non_finite_step = Some(step);
                }
                let potential = problem
                    .domain()
                    .masked(state.potential().view(), self.sentinel)
                    .map_err(|e| RunError::Simulation(e.into()))?;
                let time = (step + 1) as Precision * time_step;
                log::debug!("Observing step {step} (t = {time})");
                observer
                    .observe(Snapshot {
                        step,
                        time,
                        potential,
                    })
                    .map_err(RunError::Observer)?;
                observations += 1;
            }
        }
        if first_non_finite_step.is_none() && self.samples > 0 && !state.is_finite() {
            log::warn!("Final simulation state is not finite");
        }
        observer.finish().map_err(RunError::Observer)?;

        let elapsed = start.elapsed();
        log::info!(
            "Performed {} time steps in {:?} ({:?}/step)",
            self.samples,
            elapsed,
            elapsed / u32::try_from(self.samples.max(1)).unwrap_or(u32::MAX)
        );
        Ok(Report {
            steps: self.samples,
            observations,
            first_non_finite_step,
            elapsed,
        })
    }
}
