use crate::error::{Result, VigilError};
use realfft::RealFftPlanner;

/// One-sided periodogram: `(frequencies, powers)`.
pub fn periodogram(samples: &[f64], fs: f64) -> Result<(Vec<f64>, Vec<f64>)> {
    if !(fs.is_finite() && fs > 0.0) {
        return Err(VigilError::InvalidParameter(format!(
            "sampling rate must be positive, got {fs}"
        )));
    }
    let n = samples.len();
    if n == 0 {
        return Err(VigilError::EmptySeries("no samples for spectrum".into()));
    }
    let mean = samples.iter().sum::<f64>() / n as f64;
    let mut planner = RealFftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut buffer: Vec<f64> = samples.iter().map(|x| x - mean).collect();
    let mut spectrum = fft.make_output_vec();
    fft.process(&mut buffer, &mut spectrum)
        .map_err(|e| VigilError::InvalidParameter(format!("fft failed: {e}")))?;
    let freqs = (0..spectrum.len())
        .map(|k| k as f64 * fs / n as f64)
        .collect();
    let powers = spectrum.iter().map(|c| c.norm_sqr() / n as f64).collect();
    Ok((freqs, powers))
}

/// Summed periodogram power between `low_hz` and `high_hz` inclusive.
pub fn band_power(samples: &[f64], fs: f64, low_hz: f64, high_hz: f64) -> Result<f64> {
    let (freqs, powers) = periodogram(samples, fs)?;
    Ok(freqs
        .iter()
        .zip(&powers)
        .filter(|(f, _)| **f >= low_hz && **f <= high_hz)
        .map(|(_, p)| p)
        .sum())
}

/// Fraction of total (mean-removed) power inside the band; zero for a flat signal.
pub fn relative_band_power(samples: &[f64], fs: f64, low_hz: f64, high_hz: f64) -> Result<f64> {
    let (freqs, powers) = periodogram(samples, fs)?;
    let total: f64 = powers.iter().sum();
    if total <= 0.0 {
        return Ok(0.0);
    }
    let band: f64 = freqs
        .iter()
        .zip(&powers)
        .filter(|(f, _)| **f >= low_hz && **f <= high_hz)
        .map(|(_, p)| p)
        .sum();
    Ok(band / total)
}
