//! Interface to the external network simulator.
//!
//! The simulator itself is an opaque collaborator: given a configuration, it
//! builds and connects a network, advances it through time, and leaves one
//! voltage recording file per population on disk. This module defines the
//! configuration values handed to it, the [`Simulator`] trait it is driven
//! through, and [`drive`], which runs the settling phase followed by the
//! measurement phase.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::LfpError;
use crate::NUM_POPULATIONS;

/// Thalamic stimulation parameters for one run.
///
/// A rate of zero disables the thalamic input entirely.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct StimulusConfig {
    /// The index of the stimulated population.
    population: usize,
    /// The stimulation rate, in Hz.
    rate: f64,
    /// The stimulation onset, in milliseconds after the end of settling.
    start: f64,
    /// The stimulation duration, in milliseconds.
    duration: f64,
}

impl StimulusConfig {
    /// Create a stimulus configuration with the specified parameters.
    /// The function returns an error for invalid parameters.
    pub fn build(
        population: usize,
        rate: f64,
        start: f64,
        duration: f64,
    ) -> Result<Self, LfpError> {
        if population >= NUM_POPULATIONS {
            return Err(LfpError::InvalidParameter(format!(
                "population index must be less than {}, got {}",
                NUM_POPULATIONS, population
            )));
        }
        if !rate.is_finite() || rate < 0.0 {
            return Err(LfpError::InvalidParameter(
                "stimulation rate must be non-negative".to_string(),
            ));
        }
        if !start.is_finite() || start < 0.0 {
            return Err(LfpError::InvalidParameter(
                "stimulation start must be non-negative".to_string(),
            ));
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(LfpError::InvalidParameter(
                "stimulation duration must be non-negative".to_string(),
            ));
        }

        Ok(StimulusConfig {
            population,
            rate,
            start,
            duration,
        })
    }

    /// Returns the index of the stimulated population.
    pub fn population(&self) -> usize {
        self.population
    }

    /// Returns the stimulation rate, in Hz.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Returns the stimulation onset, in milliseconds after the end of settling.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Returns the stimulation duration, in milliseconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Returns whether the thalamic input is active at all.
    pub fn is_enabled(&self) -> bool {
        self.rate != 0.0
    }
}

/// Per-run simulation parameters.
///
/// A configuration is constructed fresh for every run and passed by value,
/// so no simulator state leaks from one run into the next.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// The seed of the simulator random number generator.
    seed: u64,
    /// The directory the simulator writes its recording files to.
    data_path: PathBuf,
    /// The duration of the settling phase preceding the measurement, in milliseconds.
    settling_duration: f64,
    /// The sampling resolution, in milliseconds.
    resolution: f64,
}

impl SimulationConfig {
    /// Create a simulation configuration with the specified parameters.
    /// The function returns an error for invalid parameters.
    pub fn build<P: AsRef<Path>>(
        seed: u64,
        data_path: P,
        settling_duration: f64,
        resolution: f64,
    ) -> Result<Self, LfpError> {
        if !settling_duration.is_finite() || settling_duration < 0.0 {
            return Err(LfpError::InvalidParameter(
                "settling duration must be non-negative".to_string(),
            ));
        }
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(LfpError::InvalidParameter(
                "sampling resolution must be positive".to_string(),
            ));
        }

        Ok(SimulationConfig {
            seed,
            data_path: data_path.as_ref().to_path_buf(),
            settling_duration,
            resolution,
        })
    }

    /// Returns the seed of the simulator random number generator.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the directory the simulator writes its recording files to.
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Returns the duration of the settling phase, in milliseconds.
    pub fn settling_duration(&self) -> f64 {
        self.settling_duration
    }

    /// Returns the sampling resolution, in milliseconds.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }
}

/// The external network simulator, driven through a fixed phase sequence.
///
/// Calling a run twice with the same seed and configuration must reproduce
/// bit-identical recordings; determinism is the implementor's responsibility.
/// Phase failures are surfaced as
/// [`SimulationFailure`](LfpError::SimulationFailure) and are never retried.
pub trait Simulator {
    /// Instantiate the node populations and recording devices.
    fn build(&mut self) -> Result<(), LfpError>;

    /// Wire the populations together, including the thalamic input.
    fn connect(&mut self) -> Result<(), LfpError>;

    /// Advance the simulation by the given duration, in milliseconds.
    /// Recording files are complete on disk when the call returns.
    fn simulate(&mut self, duration: f64) -> Result<(), LfpError>;

    /// The path of the voltage recording written for the given population.
    fn recording_path(&self, population: usize) -> PathBuf;
}

/// Run a full two-phase simulation: build, connect, settle, then measure.
///
/// Any phase failure propagates to the caller and aborts the run; there is no
/// partial-result salvage.
pub fn drive<S: Simulator>(
    simulator: &mut S,
    config: &SimulationConfig,
    duration: f64,
) -> Result<(), LfpError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(LfpError::InvalidParameter(
            "measurement duration must be positive".to_string(),
        ));
    }

    log::info!("Building and connecting the network...");
    simulator.build()?;
    simulator.connect()?;

    log::info!("Settling for {} ms...", config.settling_duration());
    simulator.simulate(config.settling_duration())?;

    log::info!("Measuring for {} ms...", duration);
    simulator.simulate(duration)?;

    log::info!("Simulation completed successfully!");
    Ok(())
}
