//! Moving potential snapshots to and from HDF5 files

use crate::{Precision, ScalarField, ScalarFieldView};
use ::hdf5::{Dataset, File};
use ndarray::{arr1, Array1, Ix3};
use std::path::Path;

pub use ::hdf5::Result;

/// Common configuration for reading and writing to HDF5 files
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Config<'dsname, FileName: AsRef<Path>> {
    /// Name of the HDF5 file to be accessed
    pub file_name: FileName,

    /// Name of the potential dataset within the file
    pub dataset_name: Option<&'dsname str>,
}
//
impl<'dsname, FileName: AsRef<Path>> Config<'dsname, FileName> {
    fn dataset_name(&self) -> &'dsname str {
        self.dataset_name.unwrap_or("potential")
    }
}

/// Name of the dataset holding the simulated time of each snapshot
const TIME_DATASET: &str = "time";

/// Mechanism to write potential snapshots into an HDF5 file
pub struct Writer {
    /// Common HDF5 I/O state
    state: State,

    /// Snapshot time dataset
    times: Dataset,
}
//
impl Writer {
    /// Create or truncate a file
    ///
    /// The file will be dimensioned to store a certain amount of potential
    /// fields of a certain shape.
    pub fn create(
        config: Config<'_, impl AsRef<Path>>,
        shape: [usize; 3],
        num_images: usize,
    ) -> Result<Self> {
        let dataset_name = config.dataset_name();
        let file = File::create(config.file_name)?;
        let [width, height, depth] = shape;
        let dataset = file
            .new_dataset::<Precision>()
            .chunk([1, width, height, depth])
            .shape([num_images, width, height, depth])
            .create(dataset_name)?;
        let times = file
            .new_dataset::<Precision>()
            .shape([num_images])
            .create(TIME_DATASET)?;
        Ok(Self {
            state: State {
                file,
                dataset,
                position: 0,
            },
            times,
        })
    }

    /// Write a new potential snapshot to the file
    pub fn write(&mut self, time: Precision, potential: ScalarFieldView<'_>) -> Result<()> {
        let position = self.state.position;
        self.state
            .dataset
            .write_slice(potential, (position, .., .., ..))?;
        self.times
            .write_slice(&arr1(&[time]), position..position + 1)?;
        self.state.position += 1;
        Ok(())
    }

    /// Number of snapshots written so far
    pub fn position(&self) -> usize {
        self.state.position
    }

    /// Flush the file to the underlying storage medium and close it
    ///
    /// This should automatically happen on Drop, but doing it manually allows
    /// you to catch and handle errors, instead of letting them lead to panics.
    pub fn close(self) -> Result<()> {
        self.state.file.close()
    }
}

/// Potential snapshot read back from an HDF5 file
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Simulated time at which the snapshot was taken
    pub time: Precision,

    /// Masked membrane potential
    pub potential: ScalarField,
}

/// Mechanism to read potential snapshots back from an HDF5 file
pub struct Reader {
    /// Common HDF5 I/O state
    state: State,

    /// Simulated time of each snapshot
    time_values: Array1<Precision>,

    /// Number of snapshots to be read
    num_images: usize,
}
//
impl Reader {
    /// Open an existing file
    pub fn open(config: Config<'_, impl AsRef<Path>>) -> Result<Self> {
        let dataset_name = config.dataset_name();
        let file = File::open(config.file_name)?;
        let dataset = file.dataset(dataset_name)?;
        let time_values = file.dataset(TIME_DATASET)?.read_1d::<Precision>()?;
        let num_images = dataset.shape().first().copied().unwrap_or(0);
        Ok(Self {
            state: State {
                file,
                dataset,
                position: 0,
            },
            time_values,
            num_images,
        })
    }

    /// Shape of the potential fields that will be read out
    pub fn field_shape(&self) -> [usize; 3] {
        let dataset_shape = self.state.dataset.shape();
        assert_eq!(
            dataset_shape.len(),
            4,
            "Dataset should be a stack of 3D fields"
        );
        [dataset_shape[1], dataset_shape[2], dataset_shape[3]]
    }

    /// Number of snapshots to be read out
    pub fn num_images(&self) -> usize {
        self.num_images
    }

    /// Read the next potential snapshot, if any
    ///
    /// You can equivalently treat this reader as an iterator of frames.
    pub fn read(&mut self) -> Option<Result<Frame>> {
        (self.state.position < self.num_images).then(|| {
            let position = self.state.position;
            let potential = self
                .state
                .dataset
                .read_slice::<Precision, _, Ix3>((position, .., .., ..))?;
            self.state.position += 1;
            Ok(Frame {
                time: self.time_values.get(position).copied().unwrap_or(Precision::NAN),
                potential,
            })
        })
    }
}
//
impl Iterator for Reader {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read()
    }
}

/// HDF5 file and dataset handles
struct State {
    /// File handle
    file: File,

    /// Potential dataset
    dataset: Dataset,

    /// Number of snapshots that were read or written so far
    position: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let path = std::env::temp_dir().join(format!("data-hdf5-{}.h5", std::process::id()));
        let shape = [3, 2, 2];
        let first =
            ScalarField::from_shape_fn(shape, |(x, y, z)| (x + 10 * y + 100 * z) as Precision);
        let second = first.mapv(|x| -x);

        let mut writer = Writer::create(
            Config {
                file_name: path.clone(),
                dataset_name: None,
            },
            shape,
            2,
        )
        .unwrap();
        writer.write(0.0, first.view()).unwrap();
        writer.write(1.5, second.view()).unwrap();
        assert_eq!(writer.position(), 2);
        writer.close().unwrap();

        let reader = Reader::open(Config {
            file_name: path.clone(),
            dataset_name: None,
        })
        .unwrap();
        assert_eq!(reader.field_shape(), shape);
        assert_eq!(reader.num_images(), 2);
        let frames = reader.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(
            frames,
            vec![
                Frame {
                    time: 0.0,
                    potential: first
                },
                Frame {
                    time: 1.5,
                    potential: second
                }
            ]
        );
        std::fs::remove_file(path).unwrap();
    }
}
