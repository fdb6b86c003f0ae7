//! End-to-end orchestration of a simulation run into per-population LFP traces.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::LfpError;
use crate::recording::VoltageRecording;
use crate::simulator::{drive, SimulationConfig, Simulator};
use crate::NUM_POPULATIONS;

/// The smoothed population-average traces of one simulation run, indexed by
/// population. Immutable after construction.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct LfpTraces {
    traces: Vec<Vec<f64>>,
}

impl LfpTraces {
    /// Create a trace collection, one trace per population.
    /// The function returns an error if the number of traces is wrong.
    pub fn build(traces: Vec<Vec<f64>>) -> Result<Self, LfpError> {
        if traces.len() != NUM_POPULATIONS {
            return Err(LfpError::InvalidParameter(format!(
                "expected {} traces, got {}",
                NUM_POPULATIONS,
                traces.len()
            )));
        }
        Ok(LfpTraces { traces })
    }

    /// The number of populations.
    pub fn num_populations(&self) -> usize {
        self.traces.len()
    }

    /// The trace of the given population, if the index is valid.
    pub fn trace(&self, population: usize) -> Option<&[f64]> {
        self.traces.get(population).map(|trace| trace.as_slice())
    }

    /// An iterator over the traces, in population order.
    pub fn iter(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.traces.iter().map(|trace| trace.as_slice())
    }

    /// Save the traces to a JSON file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), LfpError> {
        let file =
            File::create(&path).map_err(|e| LfpError::IoError(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| LfpError::IoError(e.to_string()))?;
        writer.flush().map_err(|e| LfpError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load traces from a JSON file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<LfpTraces, LfpError> {
        let file = File::open(&path).map_err(|e| LfpError::IoError(e.to_string()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| LfpError::IoError(e.to_string()))
    }
}

/// Run a full simulation and reduce its recordings to per-population LFP traces.
///
/// The simulator is driven through its settling and measurement phases first;
/// only then is each population's recording file aggregated, since the files
/// are complete on disk at that point. Aggregation runs in parallel across
/// populations, which share no state. If any population fails, the run fails
/// with the lowest failing population's error, tagged with its index; no
/// partial result is returned.
///
/// # Examples
///
/// ```rust
/// use cortical_lfp::pipeline::run;
/// use cortical_lfp::simulator::{SimulationConfig, StimulusConfig};
/// use cortical_lfp::surrogate::SurrogateSimulator;
///
/// let dir = tempfile::tempdir().unwrap();
/// let config = SimulationConfig::build(55, dir.path(), 10.0, 1.0).unwrap();
/// let stimulus = StimulusConfig::build(0, 15.0, 5.0, 10.0).unwrap();
///
/// let mut simulator = SurrogateSimulator::new(config.clone(), stimulus, 5);
/// let traces = run(&mut simulator, &config, 50.0).unwrap();
/// assert_eq!(traces.num_populations(), 8);
/// ```
pub fn run<S: Simulator>(
    simulator: &mut S,
    config: &SimulationConfig,
    duration: f64,
) -> Result<LfpTraces, LfpError> {
    drive(simulator, config, duration)?;

    log::info!("Collecting voltage recordings...");
    let paths: Vec<_> = (0..NUM_POPULATIONS)
        .map(|population| simulator.recording_path(population))
        .collect();
    let results: Vec<Result<Vec<f64>, LfpError>> = paths
        .par_iter()
        .enumerate()
        .map(|(population, path)| {
            VoltageRecording::from_file(path)
                .and_then(|recording| recording.lfp_trace())
                .map_err(|e| LfpError::Population {
                    population,
                    source: Box::new(e),
                })
        })
        .collect();

    // Results are re-checked in population order, so the reported failure is
    // always the lowest failing index
    let mut traces = Vec::with_capacity(NUM_POPULATIONS);
    for result in results {
        traces.push(result?);
    }
    LfpTraces::build(traces)
}
