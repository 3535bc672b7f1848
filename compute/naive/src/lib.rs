//! Naive implementation of the cardiac tissue simulation
//!
//! This version literally follows the textbook description of a time step:
//! it materializes the boundary-enforced potential, the reaction derivatives
//! and the Laplacian as whole fields, then combines them. It is slow because
//! of all the resulting memory traffic, but easy to check.

use compute::{
    boundary::enforce_neumann, diffusion::laplacian, NoArgs, Problem, SimulateBase,
    SimulateCreate, SimulateStep,
};
use data::{grid::ShapeMismatch, state::State};
use ionic::IonicModel;
use ndarray::Zip;

/// Cardiac tissue simulation
#[derive(Debug)]
pub struct Simulation<Model: IonicModel> {
    /// Problem being simulated
    problem: Problem<Model>,
}
//
impl<Model: IonicModel> SimulateBase for Simulation<Model> {
    type CliArgs = NoArgs;

    type Model = Model;

    type Error = ShapeMismatch;

    fn problem(&self) -> &Problem<Model> {
        &self.problem
    }
}
//
impl<Model: IonicModel> SimulateCreate for Simulation<Model> {
    fn new(problem: Problem<Model>, _args: NoArgs) -> Result<Self, ShapeMismatch> {
        Ok(Self { problem })
    }
}
//
impl<Model: IonicModel> SimulateStep for Simulation<Model> {
    fn perform_step(&self, state: &mut State) -> Result<(), ShapeMismatch> {
        self.problem.check_state(state)?;
        let domain = self.problem.domain();
        let grid = domain.grid();
        let dt = self.problem.time_step();
        let (inputs, [out_u, out_v, out_w, out_s]) = state.in_out();
        let [_u, v, w, s] = inputs;

        // Boundary conditions only apply to the diffused potential
        let u0 = enforce_neumann(grid, inputs[0])?;

        // The reaction term sees the potential as it was before
        let [du, dv, dw, ds] = self.problem.model().differentiate_fields(inputs);
        let lap = laplacian(grid, u0.view(), domain.conductivity().view())?;

        // Explicit Euler step
        Zip::from(out_u)
            .and(&u0)
            .and(&du)
            .and(&lap)
            .for_each(|out, &u0, &du, &lap| *out = u0 + dt * du + dt * lap);
        for (out, input, derivative) in [(out_v, v, dv), (out_w, w, dw), (out_s, s, ds)] {
            Zip::from(out)
                .and(&input)
                .and(&derivative)
                .for_each(|out, &x, &dx| *out = x + dt * dx);
        }
        Ok(())
    }
}
