//! Timed, spatially masked stimuli
//!
//! A stimulus raises the membrane potential of a region of the tissue
//! towards a prescribed intensity during a set of time windows. Windows are
//! tracked as ranges of time step indices, so that whether a stimulus is
//! active never depends on accumulated floating-point time.

use data::{
    geometry::Domain,
    grid::{Grid, ShapeMismatch},
    parameters::{ConfigError, Parameters},
    Precision, ScalarField, ScalarFieldViewMut,
};
use ndarray::{s, Zip};

/// Distance to a step boundary, in time steps, below which a time is
/// considered to lie on that boundary
///
/// Absorbs the rounding error of times computed as `step · dt` or
/// accumulated over a few hundred steps.
const STEP_SNAP_TOLERANCE: f64 = 0.05;

/// When a stimulus is active
///
/// Pulse `k` (for `k` in `0..pulses`) is active during the time steps of
/// `[start + k·period, start + k·period + duration)`, with all durations
/// converted to a whole number of time steps by rounding.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Schedule {
    /// Index of the first active time step
    start_step: i64,

    /// Number of pulses
    pulses: usize,

    /// Number of time steps between the starts of two pulses
    period_steps: u64,

    /// Number of time steps during which a pulse is active
    duration_steps: u64,

    /// Time step
    time_step: Precision,
}
//
impl Schedule {
    /// Set up a stimulus schedule
    ///
    /// Times are expressed in the same unit as `time_step`. Durations that
    /// round to less than one time step are extended to one time step.
    pub fn new(
        start: Precision,
        pulses: usize,
        period: Precision,
        duration: Precision,
        time_step: Precision,
    ) -> Result<Self, ConfigError> {
        if !(time_step.is_finite() && time_step > 0.0) {
            return Err(ConfigError::NonPositiveTimeStep(time_step));
        }
        if !(period.is_finite() && period > 0.0) {
            return Err(ConfigError::InvalidPulsePeriod(period));
        }
        if !(duration.is_finite() && duration > 0.0) {
            return Err(ConfigError::InvalidPulseDuration(duration));
        }
        if !start.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "stimulus start".to_string(),
                value: start.to_string(),
            });
        }
        let to_steps = |t: Precision| (f64::from(t) / f64::from(time_step)).round();
        let period_steps = to_steps(period).max(1.0) as u64;
        let duration_steps = to_steps(duration).max(1.0) as u64;
        if pulses > 1 && duration_steps > period_steps {
            return Err(ConfigError::InvalidPulseDuration(duration));
        }
        Ok(Self {
            start_step: to_steps(start) as i64,
            pulses,
            period_steps,
            duration_steps,
            time_step,
        })
    }

    /// Index of the first active time step
    pub fn start_step(&self) -> i64 {
        self.start_step
    }

    /// Number of time steps during which a pulse is active
    pub fn duration_steps(&self) -> u64 {
        self.duration_steps
    }

    /// Truth that the stimulus is active at a given time step
    pub fn is_active_at_step(&self, step: usize) -> bool {
        let Some(elapsed) = (step as i64).checked_sub(self.start_step) else {
            return false;
        };
        let Ok(elapsed) = u64::try_from(elapsed) else {
            return false;
        };
        let pulse = elapsed / self.period_steps;
        pulse < self.pulses as u64 && elapsed % self.period_steps < self.duration_steps
    }

    /// Truth that the stimulus is active at a given simulated time
    ///
    /// Times that lie within floating-point error of a step boundary are
    /// snapped to it, so this agrees with [`Schedule::is_active_at_step()`]
    /// for `time = step · dt`. Other times belong to the step that contains
    /// them. Negative times and NaN are never active.
    pub fn is_active_at_time(&self, time: Precision) -> bool {
        let steps = f64::from(time) / f64::from(self.time_step);
        let nearest = steps.round();
        let step = if (steps - nearest).abs() < STEP_SNAP_TOLERANCE {
            nearest
        } else {
            steps.floor()
        };
        // Written this way so that NaN is rejected
        if !(step >= 0.0) {
            return false;
        }
        self.is_active_at_step(step as usize)
    }
}

/// Stimulus applied to a region of the tissue on a schedule
#[derive(Clone, Debug, PartialEq)]
pub struct Stimulus {
    /// Intensity towards which the potential of each cell is raised
    region: ScalarField,

    /// Active time windows
    schedule: Schedule,
}
//
impl Stimulus {
    /// Set up a stimulus
    pub fn new(
        grid: &Grid,
        region: ScalarField,
        schedule: Schedule,
    ) -> Result<Self, ShapeMismatch> {
        grid.check("stimulus region", region.shape())?;
        Ok(Self { region, schedule })
    }

    /// Set up the S2 stimulus of a simulation
    ///
    /// With a loaded geometry, the stimulated region is the tissue of the
    /// upper half of the grid (`y ≥ height/2`). Without one, it is the
    /// `x < width/2, y < height/2` quadrant of the box. Stimulated cells are
    /// raised to `max_v`, others to `min_v`.
    pub fn s2(domain: &Domain, params: &Parameters) -> Result<Self, ConfigError> {
        let grid = domain.grid();
        let [width, height, _depth] = grid.shape();
        let region = if params.geometry_file.is_some() {
            let mut region = domain
                .mask()
                .mapv(|m| m * (params.max_v - params.min_v) + params.min_v);
            region.slice_mut(s![.., ..height / 2, ..]).fill(params.min_v);
            region
        } else {
            let mut region = grid.filled(params.min_v);
            region
                .slice_mut(s![..width / 2, ..height / 2, ..])
                .fill(params.max_v);
            region
        };
        let schedule = Schedule::new(
            params.s2_time,
            params.s2_pulses,
            params.s2_period,
            params.s2_duration(),
            params.time_step,
        )?;
        Ok(Self::new(grid, region, schedule)?)
    }

    /// Stimulated region
    pub fn region(&self) -> &ScalarField {
        &self.region
    }

    /// Active time windows
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Raise a potential field to the stimulus intensity, regardless of time
    ///
    /// The potential of a cell never decreases, and applying the stimulus
    /// twice has the same effect as applying it once.
    pub fn apply(&self, mut potential: ScalarFieldViewMut<'_>) -> Result<(), ShapeMismatch> {
        if potential.shape() != self.region.shape() {
            let (width, height, depth) = self.region.dim();
            return Err(ShapeMismatch {
                field: "stimulated potential",
                expected: [width, height, depth],
                actual: potential.shape().to_vec(),
            });
        }
        Zip::from(&mut potential)
            .and(&self.region)
            .for_each(|u, &r| {
                if r > *u {
                    *u = r;
                }
            });
        Ok(())
    }

    /// Apply the stimulus if it is active at a given time step
    ///
    /// Returns the truth that the stimulus was active.
    pub fn apply_at_step(
        &self,
        step: usize,
        potential: ScalarFieldViewMut<'_>,
    ) -> Result<bool, ShapeMismatch> {
        if self.schedule.is_active_at_step(step) {
            self.apply(potential)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Set of stimuli applied to the tissue over the course of a simulation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Protocol(Vec<Stimulus>);
//
impl Protocol {
    /// Protocol without any stimulus
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stimulus to the protocol
    pub fn push(&mut self, stimulus: Stimulus) {
        self.0.push(stimulus);
    }

    /// Stimuli of the protocol
    pub fn stimuli(&self) -> &[Stimulus] {
        &self.0
    }

    /// Apply every stimulus that is active at a given time step
    pub fn apply(
        &self,
        step: usize,
        mut potential: ScalarFieldViewMut<'_>,
    ) -> Result<(), ShapeMismatch> {
        for stimulus in &self.0 {
            if stimulus.apply_at_step(step, potential.view_mut())? {
                log::debug!("Stimulus applied at step {step}");
            }
        }
        Ok(())
    }
}
//
impl FromIterator<Stimulus> for Protocol {
    fn from_iter<I: IntoIterator<Item = Stimulus>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
