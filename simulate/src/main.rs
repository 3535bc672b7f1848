use clap::Parser;
use compute::{
    integrator::{Integrator, Observer, Snapshot},
    stimulus::{Protocol, Stimulus},
    Problem, SimulateCreate,
};
use compute_selector::Simulation;
use data::{
    geometry::Domain,
    hdf5::{self, Writer},
    parameters::ConfigError,
    state::State,
};
use eyre::{eyre, Result};
use ionic::MinimalModel;
use std::{
    num::NonZeroUsize,
    path::PathBuf,
    sync::mpsc::{self, SendError, SyncSender},
    time::Instant,
};
use ui::SharedArgs;

/// Simulate the propagation of electrical excitation in cardiac tissue
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CLI arguments describing the simulated problem
    #[command(flatten)]
    shared: SharedArgs<Simulation<MinimalModel>>,

    /// Path to the results output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Size of the snapshot buffer between the compute and I/O thread
    ///
    /// A larger buffer enables better performance, at the cost of higher RAM
    /// utilization. 2 is the minimum to fully decouple compute and I/O, higher
    /// values may be beneficial if the I/O backend works in a batched fashion.
    #[arg(long, default_value_t = NonZeroUsize::new(2).unwrap())]
    output_buffer: NonZeroUsize,
}

/// Observer that forwards snapshots to the HDF5 writer thread
struct SnapshotSender(SyncSender<Snapshot>);
//
impl Observer for SnapshotSender {
    type Error = SendError<Snapshot>;

    fn observe(&mut self, snapshot: Snapshot) -> Result<(), Self::Error> {
        self.0.send(snapshot)
    }
}

fn main() -> Result<()> {
    // Enable logging to syslog
    ui::init_syslog();

    // Parse CLI arguments and simulation properties
    let args = Args::parse();
    let params = args.shared.parameters()?;
    log::info!("Simulating with {params:?}");
    let file_name = ui::simulation_output_path(args.output);

    // Set up the tissue, its initial state and the S2 stimulus
    let init_start = Instant::now();
    let domain = Domain::load(&params)?;
    let mut state = State::initial(&domain, &params);
    let protocol = Protocol::from_iter([Stimulus::s2(&domain, &params)?]);

    // Set up the simulation
    let problem = Problem::new(domain, MinimalModel::default(), params.time_step)?;
    let simulation = Simulation::new(problem, args.shared.backend)?;
    let cadence = NonZeroUsize::new(params.dt_per_plot).ok_or(ConfigError::ZeroPlotCadence)?;
    let integrator = Integrator::new(simulation, protocol, params.samples).observe_every(cadence);
    let num_images = integrator.num_observations();
    let mut writer = Writer::create(
        hdf5::Config {
            file_name,
            dataset_name: None,
        },
        params.shape,
        num_images,
    )?;
    log::info!("Initialized simulation in {:?}", init_start.elapsed());

    // Set up progress reporting
    let progress = ui::init_progress_reporting("Writing potential snapshot", num_images);

    let report = std::thread::scope(|s| {
        // Start the writer thread
        let (sender, receiver) = mpsc::sync_channel::<Snapshot>(args.output_buffer.into());
        let writer = &mut writer;
        let progress = &progress;
        let writer_thread = s.spawn(move || -> hdf5::Result<()> {
            for snapshot in receiver {
                writer.write(snapshot.time, snapshot.potential.view())?;
                progress.inc(1);
            }
            Ok(())
        });

        // Run the simulation on the main thread
        let mut observer = SnapshotSender(sender);
        let result = integrator.run(&mut state, &mut observer);
        drop(observer);

        // I/O errors explain why snapshots could not be sent, report them first
        writer_thread
            .join()
            .map_err(|_| eyre!("HDF5 writer thread panicked"))??;
        Ok::<_, eyre::Report>(result?)
    })?;
    progress.finish();

    // Make sure output data is written correctly
    writer.close()?;
    log::info!(
        "Wrote {} snapshots of {} time steps in {:?}",
        report.observations,
        report.steps,
        report.elapsed
    );
    if let Some(step) = report.first_non_finite_step {
        log::warn!("The simulation diverged around step {step}, consider reducing dt");
    }
    Ok(())
}
