//! Quantile-derived bounds and extreme-value crossing checks.
//!
//! Bounds are computed from the very series they are later tested against, so
//! any series with spread and more than about twenty samples crosses both of
//! them. Treat the flags as a stability signal relative to the session itself,
//! not as an absolute anomaly detector.

use crate::error::{Result, VigilError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOW_QUANTILE: f64 = 0.05;
pub const DEFAULT_HIGH_QUANTILE: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Crossings {
    pub low_crossed: bool,
    pub high_crossed: bool,
}

impl Crossings {
    pub fn both(&self) -> bool {
        self.low_crossed && self.high_crossed
    }
}

fn finite_sorted(series: &[f64]) -> Result<Vec<f64>> {
    let mut values: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return Err(VigilError::EmptySeries(
            "no finite samples to derive thresholds from".into(),
        ));
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Ok(values)
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Inclusive empirical quantile with linear interpolation between order statistics.
pub fn quantile(series: &[f64], q: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&q) {
        return Err(VigilError::InvalidParameter(format!(
            "quantile {q} outside [0, 1]"
        )));
    }
    Ok(quantile_sorted(&finite_sorted(series)?, q))
}

/// 5th / 95th percentile bounds.
pub fn estimate(series: &[f64]) -> Result<Bounds> {
    estimate_with(series, DEFAULT_LOW_QUANTILE, DEFAULT_HIGH_QUANTILE)
}

pub fn estimate_with(series: &[f64], low_q: f64, high_q: f64) -> Result<Bounds> {
    if !(0.0 <= low_q && low_q < high_q && high_q <= 1.0) {
        return Err(VigilError::InvalidParameter(format!(
            "quantiles must satisfy 0 <= low ({low_q}) < high ({high_q}) <= 1"
        )));
    }
    let sorted = finite_sorted(series)?;
    Ok(Bounds {
        low: quantile_sorted(&sorted, low_q),
        high: quantile_sorted(&sorted, high_q),
    })
}

/// Whether the series minimum falls below `low` and its maximum rises above `high`.
pub fn crosses(series: &[f64], bounds: &Bounds) -> Crossings {
    let (min, max) = series
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    Crossings {
        low_crossed: min < bounds.low,
        high_crossed: max > bounds.high,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_series_has_flat_bounds() {
        let x = vec![5.0; 40];
        let bounds = estimate(&x).unwrap();
        assert_eq!(bounds, Bounds { low: 5.0, high: 5.0 });
        assert_eq!(crosses(&x, &bounds), Crossings::default());
    }

    #[test]
    fn percentiles_of_a_ramp() {
        let x: Vec<f64> = (0..=100).map(f64::from).collect();
        let bounds = estimate(&x).unwrap();
        assert!((bounds.low - 5.0).abs() < 1e-9);
        assert!((bounds.high - 95.0).abs() < 1e-9);
        let flags = crosses(&x, &bounds);
        assert!(flags.both());
    }

    #[test]
    fn interpolates_between_order_statistics() {
        assert!((quantile(&[1.0, 2.0, 3.0, 4.0], 0.5).unwrap() - 2.5).abs() < 1e-12);
        assert_eq!(quantile(&[4.0, 1.0, 3.0], 0.0).unwrap(), 1.0);
        assert_eq!(quantile(&[4.0, 1.0, 3.0], 1.0).unwrap(), 4.0);
    }

    #[test]
    fn bounds_on_tiny_series() {
        let x = [1.0, 2.0, 3.0];
        let bounds = estimate(&x).unwrap();
        assert!((bounds.low - 1.1).abs() < 1e-12);
        assert!((bounds.high - 2.9).abs() < 1e-12);
        assert!(crosses(&x, &bounds).both());
        let single = [7.0];
        let bounds = estimate(&single).unwrap();
        assert_eq!(crosses(&single, &bounds), Crossings::default());
    }

    #[test]
    fn empty_series_is_an_error() {
        assert!(matches!(
            estimate(&[]).unwrap_err(),
            VigilError::EmptySeries(_)
        ));
        assert!(matches!(
            estimate(&[f64::NAN]).unwrap_err(),
            VigilError::EmptySeries(_)
        ));
    }

    #[test]
    fn invalid_quantiles_are_rejected() {
        assert!(estimate_with(&[1.0], 0.9, 0.1).is_err());
        assert!(estimate_with(&[1.0], -0.1, 0.5).is_err());
        assert!(quantile(&[1.0], 1.5).is_err());
    }

    #[test]
    fn ignores_missing_values() {
        let x = [f64::NAN, 1.0, 2.0, f64::NAN, 3.0];
        let bounds = estimate_with(&x, 0.0, 1.0).unwrap();
        assert_eq!(bounds, Bounds { low: 1.0, high: 3.0 });
        assert_eq!(crosses(&x, &bounds), Crossings::default());
    }
}
