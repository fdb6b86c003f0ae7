//! Moving-average filtering of sampled signals.

use crate::error::LfpError;

/// Returns the running mean of the values over a sliding window.
///
/// The output has length `values.len() - window + 1`, with `output[i]` being the
/// mean of `values[i..i + window]`. The computation goes through a cumulative sum
/// with a leading zero, so its cost is independent of the window size.
/// The function returns an error if the window is zero or exceeds the number of samples.
///
/// # Examples
///
/// ```rust
/// use cortical_lfp::filter::running_mean;
///
/// let smoothed = running_mean(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
/// assert_eq!(smoothed, vec![1.5, 2.5, 3.5]);
/// ```
pub fn running_mean(values: &[f64], window: usize) -> Result<Vec<f64>, LfpError> {
    if window == 0 || window > values.len() {
        return Err(LfpError::InvalidWindow {
            window,
            num_samples: values.len(),
        });
    }

    let mut cumsum = Vec::with_capacity(values.len() + 1);
    let mut acc = 0.0;
    cumsum.push(acc);
    for value in values {
        acc += value;
        cumsum.push(acc);
    }

    Ok((window..cumsum.len())
        .map(|i| (cumsum[i] - cumsum[i - window]) / window as f64)
        .collect())
}
