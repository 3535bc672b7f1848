//! Pick the best compute backend allowed by enabled crate features, expose it
//! as a Simulation typedef.

cfg_if::cfg_if! {
    if #[cfg(feature = "compute_parallel")] {
        pub type Simulation<Model> = compute_parallel::Simulation<Model>;
    } else if #[cfg(any(feature = "compute_naive", test))] {
        pub type Simulation<Model> = compute_naive::Simulation<Model>;
    } else {
        // If no backend was specified, use a backend skeleton that throws a
        // minimal number of compiler errors.
        use compute::{stimulus::Protocol, NoArgs, Problem, Simulate, SimulateBase, SimulateCreate};
        use data::{grid::ShapeMismatch, state::State};
        use ionic::IonicModel;
        //
        pub struct Simulation<Model: IonicModel>(Problem<Model>);
        //
        impl<Model: IonicModel> SimulateBase for Simulation<Model> {
            type CliArgs = NoArgs;

            type Model = Model;

            type Error = ShapeMismatch;

            fn problem(&self) -> &Problem<Model> {
                &self.0
            }
        }
        //
        impl<Model: IonicModel> SimulateCreate for Simulation<Model> {
            fn new(_problem: Problem<Model>, _args: NoArgs) -> Result<Self, ShapeMismatch> {
                std::compile_error!("Please enable at least one compute backend via crate features")
            }
        }
        //
        impl<Model: IonicModel> Simulate for Simulation<Model> {
            fn perform_steps(
                &self,
                _state: &mut State,
                _protocol: &Protocol,
                _first_step: usize,
                _steps: usize,
            ) -> Result<(), ShapeMismatch> {
                Ok(())
            }
        }
    }
}
