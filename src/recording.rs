//! Parsing and aggregation of per-population membrane voltage recordings.
//!
//! A recording file is the textual output of one voltmeter: a fixed
//! [`HEADER_LINES`]-line header followed by whitespace-delimited rows, one per
//! recorded sample,
//!
//! ```text
//! # version line
//! # backend line
//! # sender time_ms V_m
//! 1   1.0   -64.9
//! 2   1.0   -65.1
//! 1   2.0   -64.7
//! ```
//!
//! Samples are interleaved across neurons and share timestamps, one row per
//! neuron per timestep. Aggregation reconstructs a dense per-millisecond
//! series by summing voltages into integer-millisecond bins, dividing by the
//! number of distinct recorded neurons, and smoothing with a running mean of
//! [`LFP_WINDOW`](crate::LFP_WINDOW) samples.

use itertools::Itertools;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::LfpError;
use crate::filter::running_mean;
use crate::LFP_WINDOW;

/// The number of metadata lines at the top of every recording file.
pub const HEADER_LINES: usize = 3;

/// One parsed data row of a recording file.
///
/// The sender column may be absent from a row, in which case the sample still
/// contributes voltage to its timestep but no neuron identity.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct RawRecord {
    /// The id of the recorded neuron, if the row carries one.
    pub neuron_id: Option<u64>,
    /// The sample time, in milliseconds.
    pub time: f64,
    /// The membrane voltage, in millivolts.
    pub voltage: f64,
}

/// The parsed record set of one population's recording file.
#[derive(Debug, PartialEq, Clone)]
pub struct VoltageRecording {
    records: Vec<RawRecord>,
}

impl VoltageRecording {
    /// Create a recording from already-parsed records.
    pub fn new(records: Vec<RawRecord>) -> Self {
        VoltageRecording { records }
    }

    /// Parse a recording from a reader, skipping the fixed header.
    /// The function returns an error if the header is incomplete or any
    /// non-blank data row cannot be parsed.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, LfpError> {
        let mut lines = Vec::new();
        for line in reader.lines() {
            lines.push(line.map_err(|e| LfpError::IoError(e.to_string()))?);
        }

        if lines.len() < HEADER_LINES {
            return Err(LfpError::MalformedRecording(format!(
                "expected a {}-line header, found only {} lines",
                HEADER_LINES,
                lines.len()
            )));
        }

        let mut records = Vec::new();
        for (number, line) in lines.iter().enumerate().skip(HEADER_LINES) {
            if line.trim().is_empty() {
                continue;
            }
            records.push(parse_record(line, number + 1)?);
        }

        Ok(VoltageRecording { records })
    }

    /// Parse a recording from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LfpError> {
        let file = File::open(&path).map_err(|e| {
            LfpError::IoError(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// The parsed records, in file order.
    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    /// The number of distinct neuron ids in the recording.
    pub fn num_neurons(&self) -> usize {
        self.records
            .iter()
            .filter_map(|record| record.neuron_id)
            .unique()
            .count()
    }

    /// The minimum and maximum timestamps of the recording, if any.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        self.records.iter().fold(None, |span, record| match span {
            None => Some((record.time, record.time)),
            Some((min_t, max_t)) => Some((min_t.min(record.time), max_t.max(record.time))),
        })
    }

    /// The dense per-millisecond average voltage across the recorded neurons.
    ///
    /// The result has one bin per integer millisecond from the minimum to the
    /// maximum observed timestamp. Every record adds its voltage to the bin at
    /// the truncated offset from the minimum timestamp; each bin is then
    /// divided by the number of distinct neuron ids. Timestamps are assumed to
    /// be aligned to the 1 ms sampling resolution already; fractional offsets
    /// are truncated, not interpolated, and reported through a warning.
    pub fn population_average(&self) -> Result<Vec<f64>, LfpError> {
        let (min_t, max_t) = self.time_span().ok_or(LfpError::EmptyRecording)?;
        let num_neurons = self.num_neurons();
        if num_neurons == 0 {
            return Err(LfpError::DivisionByZero);
        }

        let num_bins = (max_t - min_t).floor() as usize + 1;
        let mut bins = vec![0.0; num_bins];
        let mut num_truncated = 0_usize;
        for record in &self.records {
            let offset = record.time - min_t;
            if offset.fract() != 0.0 {
                num_truncated += 1;
            }
            bins[offset as usize] += record.voltage;
        }
        if num_truncated > 0 {
            log::warn!(
                "{} of {} records are not aligned to the 1 ms resolution; their timestamps were truncated",
                num_truncated,
                self.records.len()
            );
        }

        for bin in bins.iter_mut() {
            *bin /= num_neurons as f64;
        }
        Ok(bins)
    }

    /// The low-pass-filtered population average, i.e., the LFP proxy signal.
    ///
    /// The function returns an error if the recorded interval spans fewer
    /// than [`LFP_WINDOW`](crate::LFP_WINDOW) milliseconds.
    pub fn lfp_trace(&self) -> Result<Vec<f64>, LfpError> {
        running_mean(&self.population_average()?, LFP_WINDOW)
    }
}

fn parse_record(line: &str, line_number: usize) -> Result<RawRecord, LfpError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields[..] {
        [id, time, voltage] => Ok(RawRecord {
            neuron_id: Some(parse_neuron_id(id, line_number)?),
            time: parse_value(time, "timestamp", line_number)?,
            voltage: parse_value(voltage, "voltage", line_number)?,
        }),
        [time, voltage] => Ok(RawRecord {
            neuron_id: None,
            time: parse_value(time, "timestamp", line_number)?,
            voltage: parse_value(voltage, "voltage", line_number)?,
        }),
        _ => Err(LfpError::MalformedRecording(format!(
            "expected 2 or 3 columns on line {}, found {}",
            line_number,
            fields.len()
        ))),
    }
}

// Neuron ids are integers, but some writers emit them as reals (e.g. "12.0").
fn parse_neuron_id(field: &str, line_number: usize) -> Result<u64, LfpError> {
    if let Ok(id) = field.parse::<u64>() {
        return Ok(id);
    }
    match field.parse::<f64>() {
        Ok(id) if id.is_finite() && id >= 0.0 => Ok(id as u64),
        _ => Err(LfpError::MalformedRecording(format!(
            "invalid neuron id '{}' on line {}",
            field, line_number
        ))),
    }
}

fn parse_value(field: &str, name: &str, line_number: usize) -> Result<f64, LfpError> {
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(LfpError::MalformedRecording(format!(
            "invalid {} '{}' on line {}",
            name, field, line_number
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const HEADER: &str = "# generator version\n# backend version\n# sender time_ms V_m\n";

    fn recording_from(content: &str) -> Result<VoltageRecording, LfpError> {
        VoltageRecording::from_reader(content.as_bytes())
    }

    #[test]
    fn test_parse_records() {
        let content = format!("{}1 1.0 -65.0\n2\t1.0\t-64.5\n1 2.0 -65.2\n", HEADER);
        let recording = recording_from(&content).unwrap();
        assert_eq!(
            recording.records(),
            &[
                RawRecord {
                    neuron_id: Some(1),
                    time: 1.0,
                    voltage: -65.0
                },
                RawRecord {
                    neuron_id: Some(2),
                    time: 1.0,
                    voltage: -64.5
                },
                RawRecord {
                    neuron_id: Some(1),
                    time: 2.0,
                    voltage: -65.2
                },
            ]
        );
        assert_eq!(recording.num_neurons(), 2);
        assert_eq!(recording.time_span(), Some((1.0, 2.0)));
    }

    #[test]
    fn test_parse_real_valued_ids() {
        let content = format!("{}7.0 1.0 -65.0\n7 2.0 -65.0\n", HEADER);
        let recording = recording_from(&content).unwrap();
        assert_eq!(recording.num_neurons(), 1);
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let content = format!("{}1 1.0 -65.0\n\n1 2.0 -65.0\n\n", HEADER);
        let recording = recording_from(&content).unwrap();
        assert_eq!(recording.records().len(), 2);
    }

    #[test]
    fn test_short_file() {
        let result = recording_from("# generator version\n# backend version\n");
        assert_eq!(
            result,
            Err(LfpError::MalformedRecording(
                "expected a 3-line header, found only 2 lines".to_string()
            ))
        );
    }

    #[test]
    fn test_malformed_rows() {
        // Non-numeric voltage
        let content = format!("{}1 1.0 not-a-number\n", HEADER);
        assert!(matches!(
            recording_from(&content),
            Err(LfpError::MalformedRecording(_))
        ));

        // Too many columns
        let content = format!("{}1 1.0 -65.0 extra\n", HEADER);
        assert!(matches!(
            recording_from(&content),
            Err(LfpError::MalformedRecording(_))
        ));

        // Non-finite voltage
        let content = format!("{}1 1.0 inf\n", HEADER);
        assert!(matches!(
            recording_from(&content),
            Err(LfpError::MalformedRecording(_))
        ));
    }

    #[test]
    fn test_population_average_two_constant_neurons() {
        // Both neurons report 10.0 mV at every timestamp from 0 to 5
        let mut content = HEADER.to_string();
        for t in 0..=5 {
            content.push_str(&format!("1 {}.0 10.0\n2 {}.0 10.0\n", t, t));
        }
        let recording = recording_from(&content).unwrap();

        let average = recording.population_average().unwrap();
        assert_eq!(average.len(), 6);
        for value in &average {
            assert_relative_eq!(*value, 10.0);
        }

        let trace = recording.lfp_trace().unwrap();
        assert_eq!(trace.len(), 4);
        for value in &trace {
            assert_relative_eq!(*value, 10.0);
        }
    }

    #[test]
    fn test_population_average_bins_by_offset() {
        let content = format!("{}1 100.0 1.0\n1 101.0 2.0\n1 103.0 4.0\n", HEADER);
        let recording = recording_from(&content).unwrap();
        let average = recording.population_average().unwrap();
        assert_eq!(average, vec![1.0, 2.0, 0.0, 4.0]);
    }

    #[test]
    fn test_population_average_truncates_fractional_offsets() {
        let content = format!("{}1 0.0 1.0\n1 1.5 2.0\n1 2.0 4.0\n", HEADER);
        let recording = recording_from(&content).unwrap();
        let average = recording.population_average().unwrap();
        assert_eq!(average, vec![1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_empty_recording() {
        let recording = recording_from(HEADER).unwrap();
        assert_eq!(recording.population_average(), Err(LfpError::EmptyRecording));
        assert_eq!(recording.lfp_trace(), Err(LfpError::EmptyRecording));
    }

    #[test]
    fn test_division_by_zero_without_neuron_ids() {
        // Rows carrying only (time, voltage) leave nothing to average over
        let content = format!("{}0.0 10.0\n1.0 10.0\n2.0 10.0\n", HEADER);
        let recording = recording_from(&content).unwrap();
        assert_eq!(recording.population_average(), Err(LfpError::DivisionByZero));
    }

    #[test]
    fn test_lfp_trace_minimal_span() {
        // A 3 ms recording is the shortest that survives the smoothing window
        let content = format!("{}1 0.0 1.0\n1 1.0 2.0\n1 2.0 3.0\n", HEADER);
        let recording = recording_from(&content).unwrap();
        assert_eq!(recording.lfp_trace().unwrap(), vec![2.0]);

        // A 2 ms recording does not
        let content = format!("{}1 0.0 1.0\n1 1.0 2.0\n", HEADER);
        let recording = recording_from(&content).unwrap();
        assert_eq!(
            recording.lfp_trace(),
            Err(LfpError::InvalidWindow {
                window: 3,
                num_samples: 2
            })
        );
    }
}
