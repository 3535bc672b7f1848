mod render;

use clap::Parser;
use data::{
    hdf5::{Config, Reader},
    Precision,
};
use eyre::{bail, eyre, Result};
use image::RgbImage;
use std::path::PathBuf;

/// Number of rendered images that may wait for the saver thread
const SAVE_QUEUE_LEN: usize = 4;

/// Convert cardiac simulation output to images
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input HDF5 file
    #[arg(short, long)]
    input: PathBuf,

    /// Directory where output images will be saved
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Index of the z-slice to be rendered (middle slice by default)
    #[arg(short = 'z', long)]
    slice: Option<usize>,

    /// Resting potential, drawn with the start of the color gradient
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    min_v: Precision,

    /// Excited potential, drawn with the end of the color gradient
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    max_v: Precision,
}

fn main() -> Result<()> {
    // Enable logging to stderr
    ui::init_stderr_logging();

    // Parse CLI arguments
    let args = Args::parse();
    let output_dir = args.output_dir.unwrap_or_else(|| "./".into());
    if !(args.max_v > args.min_v) {
        bail!("invalid potential range [{}, {}]", args.min_v, args.max_v);
    }
    let range = [args.min_v, args.max_v];

    // Open the HDF5 dataset
    let reader = Reader::open(Config {
        file_name: args.input,
        dataset_name: None,
    })?;
    let [width, height, depth] = reader.field_shape();
    let z = args.slice.unwrap_or(depth / 2);
    if z >= depth {
        bail!("cannot render z-slice {z}, the simulation only has {depth}");
    }
    log::info!(
        "Rendering z-slice {z} of {} snapshots of shape {:?}",
        reader.num_images(),
        [width, height, depth]
    );

    // Set up progress reporting
    let progress = ui::init_progress_reporting("Saving image", reader.num_images());

    std::thread::scope(|s| {
        // Start the image saving thread
        let (sender, receiver) = crossbeam_channel::bounded::<(usize, RgbImage)>(SAVE_QUEUE_LEN);
        let output_dir = &output_dir;
        let progress = &progress;
        let saver = s.spawn(move || -> Result<()> {
            for (idx, image) in receiver {
                image.save(output_dir.join(format!("{idx}.png")))?;
                progress.inc(1);
            }
            Ok(())
        });

        // Render snapshots on the main thread
        for (idx, frame) in reader.enumerate() {
            let frame = frame?;
            log::debug!("Rendering snapshot {idx} (t = {})", frame.time);
            let mut image = RgbImage::new(width as u32, height as u32);
            render::render_slice(frame.potential.view(), z, range, &mut image);
            if sender.send((idx, image)).is_err() {
                // The saver thread failed, its error is reported below
                break;
            }
        }
        drop(sender);
        saver
            .join()
            .map_err(|_| eyre!("image saving thread panicked"))??;
        Ok::<_, eyre::Report>(())
    })?;
    progress.finish();
    Ok(())
}
