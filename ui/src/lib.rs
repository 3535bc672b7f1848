//! This crate collects elements that are shared between the two CLI programs
//! data-to-pics and simulate.

#[cfg(feature = "simulation")]
use clap::Args;
#[cfg(feature = "visualization")]
use colorous::Gradient;
#[cfg(feature = "simulation")]
use compute::SimulateBase;
#[cfg(feature = "visualization")]
use data::geometry::NON_TISSUE_POTENTIAL;
#[cfg(feature = "simulation")]
use data::parameters::{ConfigError, Parameters};
#[cfg(any(feature = "simulation", feature = "visualization"))]
use data::Precision;
#[cfg(feature = "tui")]
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
#[cfg(feature = "tui")]
use log::LevelFilter;
use std::path::PathBuf;
#[cfg(feature = "tui")]
use std::time::Duration;

/// CLI arguments that configure the simulated problem
///
/// Every simulation property can be set with `-p KEY=VALUE`. The most common
/// ones also have a dedicated flag, which takes priority.
#[cfg(feature = "simulation")]
#[derive(Args)]
pub struct SharedArgs<Simulation: SimulateBase> {
    /// Number of grid cells along the x axis
    #[arg(long)]
    pub width: Option<usize>,

    /// Number of grid cells along the y axis
    #[arg(long)]
    pub height: Option<usize>,

    /// Number of grid cells along the z axis
    #[arg(long)]
    pub depth: Option<usize>,

    /// Grayscale image describing the tissue geometry, slice by slice
    #[arg(short, long)]
    pub geometry: Option<PathBuf>,

    /// Simulated time interval on each simulation step
    #[arg(short = 't', long)]
    pub deltat: Option<Precision>,

    /// Total number of simulation steps
    #[arg(short = 'n', long)]
    pub samples: Option<usize>,

    /// Number of simulation steps between two potential snapshots
    #[arg(short = 'e', long)]
    pub steps_per_image: Option<usize>,

    /// Conductivity of the tissue
    #[arg(short, long)]
    pub diffusion: Option<Precision>,

    /// Simulation property, as KEY=VALUE (can be repeated)
    #[arg(short, long = "property", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,

    /// Backend-specific CLI arguments
    #[command(flatten)]
    pub backend: Simulation::CliArgs,
}
//
#[cfg(feature = "simulation")]
impl<Simulation: SimulateBase> SharedArgs<Simulation> {
    /// Simulation parameters requested on the command line
    pub fn parameters(&self) -> Result<Parameters, ConfigError> {
        let mut properties = self.properties.clone();
        let flags = [
            ("width", self.width.map(|x| x.to_string())),
            ("height", self.height.map(|x| x.to_string())),
            ("depth", self.depth.map(|x| x.to_string())),
            (
                "fname",
                self.geometry.as_ref().map(|p| p.display().to_string()),
            ),
            ("dt", self.deltat.map(|x| x.to_string())),
            ("samples", self.samples.map(|x| x.to_string())),
            ("dt_per_plot", self.steps_per_image.map(|x| x.to_string())),
            ("diff", self.diffusion.map(|x| x.to_string())),
        ];
        properties.extend(
            flags
                .into_iter()
                .filter_map(|(key, value)| Some((key.to_owned(), value?))),
        );
        Parameters::from_properties(properties)
    }
}

/// Parse a KEY=VALUE simulation property
#[cfg(feature = "simulation")]
fn parse_property(s: &str) -> Result<(String, String), InvalidProperty> {
    let (key, value) = s.split_once('=').ok_or_else(|| InvalidProperty(s.to_owned()))?;
    Ok((key.trim().to_owned(), value.trim().to_owned()))
}

/// A simulation property is not written as KEY=VALUE
#[cfg(feature = "simulation")]
#[derive(Debug, thiserror::Error)]
#[error("expected KEY=VALUE, got {0:?}")]
pub struct InvalidProperty(String);

/// Output file of the "simulate" executable, if not specified
pub fn simulation_output_path(output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| "output.h5".into())
}

/// Enable logging to syslog
///
/// Logging to stderr would corrupt the progress bar, but if no syslog daemon
/// is reachable, it is better than nothing.
#[cfg(feature = "tui")]
pub fn init_syslog() {
    let level = default_log_level();
    if let Err(e) = syslog::init(syslog::Facility::default(), level, None) {
        init_stderr_logging();
        log::warn!("Failed to initialize syslog ({e}), logging to stderr instead");
    }
}

/// Enable logging to stderr, configurable through `RUST_LOG`
#[cfg(feature = "tui")]
pub fn init_stderr_logging() {
    env_logger::Builder::new()
        .filter_level(default_log_level())
        .parse_default_env()
        .init();
}

/// Log level used when the user does not specify any
#[cfg(feature = "tui")]
fn default_log_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Set up a progress bar over a known number of work items
#[cfg(feature = "tui")]
pub fn init_progress_reporting(message: &'static str, num_items: usize) -> ProgressBar {
    let style = ProgressStyle::with_template("{msg} {pos}/{len} {wide_bar} {elapsed}/~{duration}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let progress = ProgressBar::new(num_items as u64)
        .with_message(message)
        .with_style(style)
        .with_finish(ProgressFinish::AndClear);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Color gradient of the potential visualizations
#[cfg(feature = "visualization")]
pub const GRADIENT: Gradient = colorous::INFERNO;

/// Color of the cells that are not tissue
#[cfg(feature = "visualization")]
pub const NON_TISSUE_COLOR: [u8; 3] = [0, 0, 0];

/// Color of a masked potential value, given the resting and excited
/// potentials
///
/// Non-tissue cells and non-finite potentials are drawn with
/// [`NON_TISSUE_COLOR`].
#[cfg(feature = "visualization")]
pub fn potential_color(potential: Precision, [min_v, max_v]: [Precision; 2]) -> [u8; 3] {
    if potential == NON_TISSUE_POTENTIAL || !potential.is_finite() {
        return NON_TISSUE_COLOR;
    }
    let normalized = f64::from((potential - min_v) / (max_v - min_v));
    let color = GRADIENT.eval_continuous(normalized.clamp(0.0, 1.0));
    [color.r, color.g, color.b]
}
