//! Presentation helpers for stacked LFP figures.
//!
//! For display, every trace is demeaned, smoothed a second time, and shifted
//! vertically so the populations stack above each other. The re-smoothing is
//! independent of the pass inside aggregation: that one denoises the raw
//! per-millisecond average, this one only shapes the figure.

use crate::error::LfpError;
use crate::filter::running_mean;
use crate::pipeline::LfpTraces;

/// The default vertical offset between stacked traces, in millivolts.
pub const STACK_OFFSET: f64 = 10.0;
/// The default window of the cosmetic re-smoothing pass, in samples.
pub const DISPLAY_WINDOW: usize = 3;

/// Returns the traces prepared for stacked plotting.
///
/// The trace of population `i` is demeaned, smoothed with the given window,
/// and shifted by `offset * i`. The smoothing error propagates if any trace
/// is shorter than the window.
pub fn stacked(
    traces: &LfpTraces,
    window: usize,
    offset: f64,
) -> Result<Vec<Vec<f64>>, LfpError> {
    traces
        .iter()
        .enumerate()
        .map(|(population, trace)| {
            let smoothed = running_mean(trace, window)?;
            let mean = trace.iter().sum::<f64>() / trace.len() as f64;
            Ok(smoothed
                .into_iter()
                .map(|value| value - mean + offset * population as f64)
                .collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NUM_POPULATIONS;
    use approx::assert_relative_eq;

    #[test]
    fn test_stacked_offsets_constant_traces() {
        let traces = LfpTraces::build(vec![vec![-65.0; 10]; NUM_POPULATIONS]).unwrap();
        let stacked = stacked(&traces, DISPLAY_WINDOW, STACK_OFFSET).unwrap();

        assert_eq!(stacked.len(), NUM_POPULATIONS);
        for (population, trace) in stacked.iter().enumerate() {
            assert_eq!(trace.len(), 10 - DISPLAY_WINDOW + 1);
            // Demeaning removes the constant level, leaving only the offset
            for value in trace {
                assert_relative_eq!(*value, STACK_OFFSET * population as f64);
            }
        }
    }

    #[test]
    fn test_stacked_demeans() {
        let mut traces = vec![vec![0.0; 5]; NUM_POPULATIONS];
        traces[0] = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let traces = LfpTraces::build(traces).unwrap();

        let stacked = stacked(&traces, 3, 0.0).unwrap();
        assert_eq!(stacked[0], vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_stacked_short_trace() {
        let traces = LfpTraces::build(vec![vec![0.0; 2]; NUM_POPULATIONS]).unwrap();
        assert_eq!(
            stacked(&traces, 3, STACK_OFFSET),
            Err(LfpError::InvalidWindow {
                window: 3,
                num_samples: 2
            })
        );
    }
}
