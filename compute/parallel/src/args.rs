//! CLI arguments

use clap::Args;
use std::num::NonZeroUsize;

/// Number of processed bytes per parallel task if not specified
///
/// This is half of a typical 32 KiB per-core L1 data cache.
pub const DEFAULT_SEQ_BLOCK_SIZE: usize = 16 * 1024;

/// CLI parameters for the multithreaded implementation
#[derive(Args, Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct CliArgs {
    /// Number of processing threads
    ///
    /// Defaults to one thread per logical CPU.
    #[arg(short = 'j', long, env)]
    pub num_threads: Option<NonZeroUsize>,

    /// Number of processed bytes per parallel task
    ///
    /// There is a granularity compromise between exposing opportunities for
    /// parallelism and keeping individual sequential tasks efficient. This
    /// block size is the tuning knob that lets you fine-tune this compromise.
    /// A task always processes at least one x-plane of the grid.
    #[arg(long, env)]
    pub seq_block_size: Option<NonZeroUsize>,
}
//
impl CliArgs {
    /// Number of processed bytes per parallel task
    pub fn seq_block_size(&self) -> usize {
        self.seq_block_size
            .map_or(DEFAULT_SEQ_BLOCK_SIZE, usize::from)
    }
}
