//! This crate drives cortical microcircuit simulations and reduces their raw
//! membrane voltage recordings into per-population LFP proxy signals.
//!
//! The simulator itself is an external collaborator behind the
//! [`Simulator`](simulator::Simulator) trait; what lives here is the
//! data-reduction pipeline: parsing per-population voltage recordings,
//! averaging them onto a common millisecond time axis, and low-pass filtering
//! the result with a running mean.
//!
//! # Aggregating a Recording
//!
//! ```rust
//! use cortical_lfp::recording::VoltageRecording;
//!
//! let content = "\
//! # generator version
//! # backend version
//! # sender time_ms V_m
//! 1 0.0 10.0
//! 2 0.0 10.0
//! 1 1.0 10.0
//! 2 1.0 10.0
//! 1 2.0 10.0
//! 2 2.0 10.0
//! ";
//!
//! let recording = VoltageRecording::from_reader(content.as_bytes()).unwrap();
//! assert_eq!(recording.num_neurons(), 2);
//! assert_eq!(recording.population_average().unwrap(), vec![10.0, 10.0, 10.0]);
//! assert_eq!(recording.lfp_trace().unwrap(), vec![10.0]);
//! ```
//!
//! # Running a Full Pipeline
//!
//! ```rust
//! use cortical_lfp::display;
//! use cortical_lfp::pipeline::run;
//! use cortical_lfp::simulator::{SimulationConfig, StimulusConfig};
//! use cortical_lfp::surrogate::SurrogateSimulator;
//!
//! let dir = tempfile::tempdir().unwrap();
//!
//! // Stimulate population L4E at 15 Hz for 10 ms, starting 5 ms into the measurement
//! let config = SimulationConfig::build(55, dir.path(), 10.0, 1.0).unwrap();
//! let stimulus = StimulusConfig::build(2, 15.0, 5.0, 10.0).unwrap();
//!
//! let mut simulator = SurrogateSimulator::new(config.clone(), stimulus, 5);
//! let traces = run(&mut simulator, &config, 50.0).unwrap();
//! assert_eq!(traces.num_populations(), 8);
//!
//! // Prepare the traces for a stacked figure
//! let figure = display::stacked(&traces, display::DISPLAY_WINDOW, display::STACK_OFFSET).unwrap();
//! assert_eq!(figure.len(), 8);
//! ```

pub mod display;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod recording;
pub mod simulator;
pub mod surrogate;

/// The number of populations in the microcircuit.
pub const NUM_POPULATIONS: usize = 8;
/// The window of the low-pass running mean applied to population averages, in samples.
pub const LFP_WINDOW: usize = 3;
/// The layer/type labels of the populations, in index order.
pub const POPULATION_LABELS: [&str; NUM_POPULATIONS] = [
    "L2/3E", "L2/3I", "L4E", "L4I", "L5E", "L5I", "L6E", "L6I",
];
