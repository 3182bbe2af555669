use crate::error::{Result, VigilError};
use serde::{Deserialize, Serialize};

/// Placement of the moving-average window relative to each output sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMode {
    /// The sample and up to `window - 1` predecessors.
    #[default]
    Trailing,
    /// Window centred on the sample, clipped at both ends.
    Centered,
}

/// Trailing moving average, same length as the input.
pub fn smooth(series: &[f64], window: usize) -> Result<Vec<f64>> {
    smooth_with(series, window, SmoothingMode::Trailing)
}

/// Moving average with a clipped window; non-finite samples are left out of each mean.
pub fn smooth_with(series: &[f64], window: usize, mode: SmoothingMode) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(VigilError::InvalidParameter(
            "smoothing window must be at least 1".into(),
        ));
    }
    if window == 1 {
        return Ok(series.to_vec());
    }

    let n = series.len();
    let (behind, ahead) = match mode {
        SmoothingMode::Trailing => (window - 1, 0),
        SmoothingMode::Centered => ((window - 1) / 2, window / 2),
    };
    Ok((0..n)
        .map(|i| {
            let lo = i.saturating_sub(behind);
            let hi = (i + ahead + 1).min(n);
            let (sum, count) = series[lo..hi]
                .iter()
                .filter(|v| v.is_finite())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_of_one_is_identity() {
        let x = vec![3.0, -1.0, 2.5, f64::MAX, 0.0];
        assert_eq!(smooth(&x, 1).unwrap(), x);
    }

    #[test]
    fn trailing_window_clips_at_start() {
        let y = smooth(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(y, vec![1.0, 1.5, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn centered_window_clips_both_ends() {
        let y = smooth_with(&[1.0, 2.0, 3.0, 4.0, 5.0], 3, SmoothingMode::Centered).unwrap();
        assert_eq!(y, vec![1.5, 2.0, 3.0, 4.0, 4.5]);
    }

    #[test]
    fn window_longer_than_series() {
        let y = smooth(&[2.0, 4.0], 50).unwrap();
        assert_eq!(y, vec![2.0, 3.0]);
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(matches!(
            smooth(&[1.0], 0).unwrap_err(),
            VigilError::InvalidParameter(_)
        ));
    }

    #[test]
    fn skips_missing_samples() {
        let y = smooth(&[f64::NAN, 2.0, f64::NAN, 4.0], 2).unwrap();
        assert!(y[0].is_nan());
        assert_eq!(&y[1..], &[2.0, 2.0, 4.0]);
    }
}
