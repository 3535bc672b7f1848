//! Computation parameters

use crate::{
    grid::{Grid, ShapeMismatch, AXIS_NAMES},
    Precision,
};
use std::{path::PathBuf, str::FromStr};
use thiserror::Error;

/// Computation parameters
///
/// Built once from defaults and a set of named properties, validated, then
/// shared read-only by everything that needs it.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameters {
    /// Number of grid cells along each axis (`width`, `height`, `depth`)
    pub shape: [usize; 3],

    /// Grid spacing along each axis (`dx`, `dy`, `dz`)
    pub spacing: [Precision; 3],

    /// Image describing the tissue geometry (`fname`)
    ///
    /// If unset, the whole grid is tissue.
    pub geometry_file: Option<PathBuf>,

    /// Number of geometry image pixels averaged into one voxel along the
    /// image's horizontal and vertical axes (`Mx`, `My`)
    pub block_averaging: [usize; 2],

    /// Average pixel luminance above which a voxel is tissue (`image_threshold`)
    pub image_threshold: Precision,

    /// Time step (`dt`)
    ///
    /// The scheme is explicit, so `dt * diffusion / spacing²` must remain
    /// small for the simulation to be stable.
    pub time_step: Precision,

    /// Number of time steps between two observations of the potential
    /// (`dt_per_plot`)
    pub dt_per_plot: usize,

    /// Conductivity of the tissue (`diff`)
    pub diffusion: Precision,

    /// Total number of time steps (`samples`)
    pub samples: usize,

    /// Start time of the S2 stimulus (`s2_time`)
    pub s2_time: Precision,

    /// Number of S2 stimulus pulses (`s2_nstim`)
    pub s2_pulses: usize,

    /// Time between the starts of two S2 pulses (`s2_period`)
    pub s2_period: Precision,

    /// Duration of one S2 pulse, one time step if unset (`s2_duration`)
    pub s2_duration: Option<Precision>,

    /// Resting potential (`min_v`)
    pub min_v: Precision,

    /// Excited potential (`max_v`)
    pub max_v: Precision,
}
//
impl Default for Parameters {
    fn default() -> Self {
        Self {
            shape: [64, 64, 64],
            spacing: [1.0; 3],
            geometry_file: None,
            block_averaging: [1, 1],
            image_threshold: 1.0e-4,
            time_step: 0.1,
            dt_per_plot: 10,
            diffusion: 1.0,
            samples: 10_000,
            s2_time: 200.0,
            s2_pulses: 1,
            s2_period: 800.0,
            s2_duration: None,
            min_v: 0.0,
            max_v: 1.0,
        }
    }
}
//
impl Parameters {
    /// Build parameters from named properties
    ///
    /// Properties with a recognized key override the matching default.
    /// Unrecognized keys are ignored. The result is validated.
    pub fn from_properties<K, V>(
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, ConfigError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();
        for (key, value) in properties {
            params.set(key.as_ref(), value.as_ref())?;
        }
        params.validate()?;
        Ok(params)
    }

    /// Override a single parameter from its property name
    ///
    /// Returns `false` if the key was not recognized.
    pub fn set(&mut self, key: &str, value: &str) -> Result<bool, ConfigError> {
        fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
            value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_owned(),
                value: value.to_owned(),
            })
        }
        match key {
            "width" => self.shape[0] = parse(key, value)?,
            "height" => self.shape[1] = parse(key, value)?,
            "depth" => self.shape[2] = parse(key, value)?,
            "dx" => self.spacing[0] = parse(key, value)?,
            "dy" => self.spacing[1] = parse(key, value)?,
            "dz" => self.spacing[2] = parse(key, value)?,
            "fname" => {
                let value = value.trim();
                self.geometry_file = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "Mx" => self.block_averaging[0] = parse(key, value)?,
            "My" => self.block_averaging[1] = parse(key, value)?,
            "image_threshold" => self.image_threshold = parse(key, value)?,
            "dt" => self.time_step = parse(key, value)?,
            "dt_per_plot" => self.dt_per_plot = parse(key, value)?,
            "diff" => self.diffusion = parse(key, value)?,
            "samples" => self.samples = parse(key, value)?,
            "s2_time" => self.s2_time = parse(key, value)?,
            "s2_nstim" => self.s2_pulses = parse(key, value)?,
            "s2_period" => self.s2_period = parse(key, value)?,
            "s2_duration" => self.s2_duration = Some(parse(key, value)?),
            "min_v" => self.min_v = parse(key, value)?,
            "max_v" => self.max_v = parse(key, value)?,
            _ => {
                log::debug!("Ignoring unrecognized property {key}={value}");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Check that the parameters describe a runnable simulation
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid()?;
        for (axis, &factor) in self.block_averaging.iter().enumerate() {
            if factor == 0 {
                return Err(ConfigError::InvalidBlockAveraging {
                    axis: ["Mx", "My"][axis],
                });
            }
        }
        if !self.image_threshold.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "image_threshold".to_owned(),
                value: self.image_threshold.to_string(),
            });
        }
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(ConfigError::NonPositiveTimeStep(self.time_step));
        }
        if self.dt_per_plot == 0 {
            return Err(ConfigError::ZeroPlotCadence);
        }
        if !(self.diffusion.is_finite() && self.diffusion >= 0.0) {
            return Err(ConfigError::NegativeConductivity(self.diffusion));
        }
        if !(self.s2_time.is_finite() && self.s2_time >= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "s2_time".to_owned(),
                value: self.s2_time.to_string(),
            });
        }
        if !(self.s2_period.is_finite() && self.s2_period > 0.0) {
            return Err(ConfigError::InvalidPulsePeriod(self.s2_period));
        }
        let duration = self.s2_duration();
        if !(duration.is_finite() && duration > 0.0) {
            return Err(ConfigError::InvalidPulseDuration(duration));
        }
        if !(self.min_v.is_finite() && self.max_v.is_finite() && self.min_v <= self.max_v) {
            return Err(ConfigError::InvalidPotentialRange {
                min_v: self.min_v,
                max_v: self.max_v,
            });
        }
        Ok(())
    }

    /// Simulation grid
    pub fn grid(&self) -> Result<Grid, ConfigError> {
        Grid::new(self.shape, self.spacing)
    }

    /// Duration of one S2 stimulus pulse
    pub fn s2_duration(&self) -> Precision {
        self.s2_duration.unwrap_or(self.time_step)
    }

    /// Iterate over the parameters as named properties
    ///
    /// Feeding the output to [`Parameters::from_properties`] yields back the
    /// same parameters.
    pub fn properties(&self) -> Vec<(&'static str, String)> {
        let mut properties = Vec::with_capacity(20);
        for (axis, name) in AXIS_NAMES.iter().enumerate() {
            properties.push((*name, self.shape[axis].to_string()));
        }
        for (axis, name) in ["dx", "dy", "dz"].into_iter().enumerate() {
            properties.push((name, self.spacing[axis].to_string()));
        }
        if let Some(path) = &self.geometry_file {
            properties.push(("fname", path.display().to_string()));
        }
        properties.extend([
            ("Mx", self.block_averaging[0].to_string()),
            ("My", self.block_averaging[1].to_string()),
            ("image_threshold", self.image_threshold.to_string()),
            ("dt", self.time_step.to_string()),
            ("dt_per_plot", self.dt_per_plot.to_string()),
            ("diff", self.diffusion.to_string()),
            ("samples", self.samples.to_string()),
            ("s2_time", self.s2_time.to_string()),
            ("s2_nstim", self.s2_pulses.to_string()),
            ("s2_period", self.s2_period.to_string()),
        ]);
        if let Some(duration) = self.s2_duration {
            properties.push(("s2_duration", duration.to_string()));
        }
        properties.extend([
            ("min_v", self.min_v.to_string()),
            ("max_v", self.max_v.to_string()),
        ]);
        properties
    }
}

/// Things that can be wrong with a simulation's configuration
///
/// These are all detected before the first time step.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A grid axis has no cells
    #[error("grid {axis} must be at least 1, got {value}")]
    InvalidDimension { axis: &'static str, value: usize },

    /// A grid spacing is zero, negative or not finite
    #[error("grid spacing along {axis} must be positive, got {value}")]
    NonPositiveSpacing { axis: &'static str, value: Precision },

    /// The time step is zero, negative or not finite
    #[error("time step must be positive, got {0}")]
    NonPositiveTimeStep(Precision),

    /// Observations were requested every 0 steps
    #[error("dt_per_plot must be at least 1")]
    ZeroPlotCadence,

    /// A conductivity is negative or not finite
    #[error("conductivity must be non-negative, got {0}")]
    NegativeConductivity(Precision),

    /// Stimulus pulses do not repeat with a positive period
    #[error("stimulus period must be positive, got {0}")]
    InvalidPulsePeriod(Precision),

    /// Stimulus pulses do not last for a positive time
    #[error("stimulus duration must be positive, got {0}")]
    InvalidPulseDuration(Precision),

    /// Resting potential is above excited potential
    #[error("invalid potential range [{min_v}, {max_v}]")]
    InvalidPotentialRange { min_v: Precision, max_v: Precision },

    /// A geometry block averaging factor is zero
    #[error("block averaging factor {axis} must be at least 1")]
    InvalidBlockAveraging { axis: &'static str },

    /// A property has a recognized key but its value cannot be parsed
    #[error("invalid value {value:?} for property {key}")]
    InvalidValue { key: String, value: String },

    /// The geometry image could not be loaded
    #[error("failed to read geometry file {path:?}")]
    GeometryUnreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The geometry image does not contain enough slices for the grid
    #[error(
        "geometry file {path:?} is {image_size:?} pixels, which cannot hold \
         {depth} slices of {slice_size:?} pixels"
    )]
    GeometryTooSmall {
        path: PathBuf,
        image_size: [u32; 2],
        slice_size: [usize; 2],
        depth: usize,
    },

    /// A user-provided field does not match the grid
    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatch),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = Parameters::default();
        params.validate().unwrap();
        assert_eq!(params.s2_duration(), params.time_step);
    }

    #[test]
    fn properties_override_defaults() {
        let params = Parameters::from_properties([
            ("width", "8"),
            ("height", "16"),
            ("depth", "4"),
            ("dx", "0.5"),
            ("dt", "0.05"),
            ("diff", "0.75"),
            ("samples", "42"),
            ("s2_time", "190"),
            ("Mx", "16"),
            ("My", "8"),
        ])
        .unwrap();
        assert_eq!(params.shape, [8, 16, 4]);
        assert_eq!(params.spacing, [0.5, 1.0, 1.0]);
        assert_eq!(params.time_step, 0.05);
        assert_eq!(params.diffusion, 0.75);
        assert_eq!(params.samples, 42);
        assert_eq!(params.s2_time, 190.0);
        assert_eq!(params.block_averaging, [16, 8]);
        assert_eq!(params.s2_duration(), 0.05);
        assert_eq!(params.dt_per_plot, Parameters::default().dt_per_plot);
    }

    #[test]
    fn unrecognized_keys_are_ignored() {
        let params = Parameters::from_properties([("colour", "blue"), ("depth", "3")]).unwrap();
        assert_eq!(params.shape[2], 3);
        let mut params = Parameters::default();
        assert!(!params.set("colour", "blue").unwrap());
        assert_eq!(params, Parameters::default());
    }

    #[test]
    fn empty_fname_means_no_geometry() {
        let params = Parameters::from_properties([("fname", "")]).unwrap();
        assert_eq!(params.geometry_file, None);
        let params = Parameters::from_properties([("fname", "heart.png")]).unwrap();
        assert_eq!(params.geometry_file, Some(PathBuf::from("heart.png")));
    }

    #[test]
    fn invalid_values_fail_fast() {
        assert!(matches!(
            Parameters::from_properties([("width", "wide")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Parameters::from_properties([("depth", "0")]),
            Err(ConfigError::InvalidDimension { axis: "depth", .. })
        ));
        assert!(matches!(
            Parameters::from_properties([("dy", "-1")]),
            Err(ConfigError::NonPositiveSpacing { axis: "height", .. })
        ));
        assert!(matches!(
            Parameters::from_properties([("dt", "0")]),
            Err(ConfigError::NonPositiveTimeStep(_))
        ));
        assert!(matches!(
            Parameters::from_properties([("dt_per_plot", "0")]),
            Err(ConfigError::ZeroPlotCadence)
        ));
        assert!(matches!(
            Parameters::from_properties([("diff", "-0.5")]),
            Err(ConfigError::NegativeConductivity(_))
        ));
        assert!(matches!(
            Parameters::from_properties([("Mx", "0")]),
            Err(ConfigError::InvalidBlockAveraging { axis: "Mx" })
        ));
        assert!(matches!(
            Parameters::from_properties([("min_v", "2")]),
            Err(ConfigError::InvalidPotentialRange { .. })
        ));
    }

    #[test]
    fn properties_round_trip() {
        let params = Parameters {
            geometry_file: Some("structure.png".into()),
            s2_duration: Some(2.0),
            samples: 17,
            ..Default::default()
        };
        assert_eq!(Parameters::from_properties(params.properties()).unwrap(), params);
    }
}
