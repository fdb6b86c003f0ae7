//! A self-contained surrogate simulator.
//!
//! The surrogate stands in for the full biophysical simulator: it produces
//! voltmeter recording files of the exact shape the aggregation pipeline
//! consumes, from a deliberately simple membrane model. Each neuron relaxes
//! toward its resting potential with Gaussian noise added at every step, and
//! the stimulated population receives an extra depolarizing drive during the
//! stimulation window. All randomness comes from a single seeded generator,
//! so a run is reproducible bit for bit.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::LfpError;
use crate::simulator::{SimulationConfig, Simulator, StimulusConfig};
use crate::NUM_POPULATIONS;

/// The device id of the first population's voltmeter, used in file names.
pub const BASE_DEVICE_ID: usize = 7718;

/// The membrane resting potential, in millivolts.
const RESTING_POTENTIAL: f64 = -65.0;
/// The membrane time constant, in milliseconds.
const MEMBRANE_TAU: f64 = 10.0;
/// The standard deviation of the per-step membrane noise, in millivolts.
const NOISE_SD: f64 = 0.5;
/// The depolarizing drive per Hz of thalamic input, in millivolts per millisecond.
const DRIVE_PER_HZ: f64 = 0.02;

/// A surrogate network simulator writing one voltmeter file per population.
#[derive(Debug, Clone)]
pub struct SurrogateSimulator {
    config: SimulationConfig,
    stimulus: StimulusConfig,
    neurons_per_population: usize,
    rng: ChaCha8Rng,
    noise: Normal<f64>,
    /// Membrane voltages, population-major.
    voltages: Vec<f64>,
    /// Recorded samples per population, as (sender, time, voltage) rows.
    samples: Vec<Vec<(u64, f64, f64)>>,
    /// Extra drive per population while the stimulus window is active.
    thalamic_drive: Vec<f64>,
    time: f64,
    built: bool,
    connected: bool,
}

impl SurrogateSimulator {
    /// Create a surrogate simulator for the given run configuration.
    pub fn new(
        config: SimulationConfig,
        stimulus: StimulusConfig,
        neurons_per_population: usize,
    ) -> Self {
        let seed = config.seed();
        SurrogateSimulator {
            config,
            stimulus,
            neurons_per_population,
            rng: ChaCha8Rng::seed_from_u64(seed),
            noise: Normal::new(0.0, NOISE_SD).unwrap(),
            voltages: vec![],
            samples: vec![],
            thalamic_drive: vec![],
            time: 0.0,
            built: false,
            connected: false,
        }
    }

    // Rewrite all recording files from the samples collected so far, so the
    // files on disk are complete whenever a simulation phase returns.
    fn flush(&self) -> Result<(), LfpError> {
        for population in 0..NUM_POPULATIONS {
            let path = self.recording_path(population);
            self.write_recording(&path, &self.samples[population])
                .map_err(|e| {
                    LfpError::SimulationFailure(format!("{}: {}", path.display(), e))
                })?;
        }
        Ok(())
    }

    fn write_recording(&self, path: &Path, samples: &[(u64, f64, f64)]) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        write!(
            writer,
            "# cortical_lfp surrogate recording\n# seed {}\n# sender time_ms V_m\n",
            self.config.seed()
        )?;
        for (sender, time, voltage) in samples {
            writeln!(writer, "{}\t{}\t{}", sender, time, voltage)?;
        }
        writer.flush()
    }
}

impl Simulator for SurrogateSimulator {
    fn build(&mut self) -> Result<(), LfpError> {
        if self.neurons_per_population == 0 {
            return Err(LfpError::SimulationFailure(
                "at least one neuron per population is required".to_string(),
            ));
        }

        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed());
        self.voltages = vec![RESTING_POTENTIAL; NUM_POPULATIONS * self.neurons_per_population];
        self.samples = vec![Vec::new(); NUM_POPULATIONS];
        self.time = 0.0;

        fs::create_dir_all(self.config.data_path()).map_err(|e| {
            LfpError::SimulationFailure(format!(
                "{}: {}",
                self.config.data_path().display(),
                e
            ))
        })?;

        self.built = true;
        Ok(())
    }

    fn connect(&mut self) -> Result<(), LfpError> {
        if !self.built {
            return Err(LfpError::SimulationFailure(
                "the network has not been built".to_string(),
            ));
        }

        // Only the targeted population receives the thalamic projection
        self.thalamic_drive = (0..NUM_POPULATIONS)
            .map(|population| {
                if self.stimulus.is_enabled() && population == self.stimulus.population() {
                    self.stimulus.rate() * DRIVE_PER_HZ
                } else {
                    0.0
                }
            })
            .collect();

        self.connected = true;
        Ok(())
    }

    fn simulate(&mut self, duration: f64) -> Result<(), LfpError> {
        if !self.connected {
            return Err(LfpError::SimulationFailure(
                "the network has not been connected".to_string(),
            ));
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(LfpError::SimulationFailure(
                "simulation duration must be non-negative".to_string(),
            ));
        }

        let dt = self.config.resolution();
        let num_steps = (duration / dt).round() as usize;
        let stimulus_start = self.config.settling_duration() + self.stimulus.start();
        let stimulus_end = stimulus_start + self.stimulus.duration();

        for _ in 0..num_steps {
            self.time += dt;
            let stimulated = self.time > stimulus_start && self.time <= stimulus_end;
            for population in 0..NUM_POPULATIONS {
                let drive = match stimulated {
                    true => self.thalamic_drive[population],
                    false => 0.0,
                };
                for k in 0..self.neurons_per_population {
                    let idx = population * self.neurons_per_population + k;
                    let leak = (RESTING_POTENTIAL - self.voltages[idx]) / MEMBRANE_TAU * dt;
                    self.voltages[idx] += leak + drive * dt + self.noise.sample(&mut self.rng);
                    self.samples[population].push((idx as u64 + 1, self.time, self.voltages[idx]));
                }
            }
        }

        self.flush()
    }

    fn recording_path(&self, population: usize) -> PathBuf {
        self.config
            .data_path()
            .join(format!("voltmeter-{}-0.dat", BASE_DEVICE_ID + population))
    }
}
