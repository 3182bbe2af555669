//! Zero-phase Butterworth band-pass filtering.
//!
//! The filter is designed as cascaded second-order sections (biquads): the
//! analog low-pass prototype is shifted to a band-pass, mapped to the z-plane
//! with the bilinear transform, and normalized to unit gain at the band
//! centre. Application runs forward then backward over an odd-extended copy
//! of the input so the output carries no phase lag.

use crate::error::{Result, VigilError};
use realfft::num_complex::Complex64;
use std::f64::consts::PI;

const REAL_POLE_EPS: f64 = 1e-12;

/// Second-order section coefficients, `a0` normalized to one.
///
/// H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Biquad {
    fn response(&self, z: Complex64) -> Complex64 {
        let zi = z.inv();
        let zi2 = zi * zi;
        (self.b0 + zi * self.b1 + zi2 * self.b2) / (1.0 + zi * self.a1 + zi2 * self.a2)
    }

    /// Direct Form II transposed state after a unit step has settled.
    fn step_state(&self) -> ([f64; 2], f64) {
        let dc = (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2);
        let z2 = self.b2 - self.a2 * dc;
        let z1 = self.b1 - self.a1 * dc + z2;
        ([z1, z2], dc)
    }
}

/// Butterworth band-pass as a cascade of biquads.
#[derive(Debug, Clone, PartialEq)]
pub struct BandPass {
    sections: Vec<Biquad>,
}

impl BandPass {
    /// Design a band-pass of `order` (2 * order poles) between `low_hz` and `high_hz`.
    pub fn design(fs: f64, low_hz: f64, high_hz: f64, order: usize) -> Result<Self> {
        validate(fs, low_hz, high_hz, order)?;

        // Pre-warped analog edges for s = (z - 1) / (z + 1).
        let wl = (PI * low_hz / fs).tan();
        let wh = (PI * high_hz / fs).tan();
        let bw = wh - wl;
        let w0 = (wl * wh).sqrt();

        let mut upper = Vec::with_capacity(order);
        let mut real = Vec::new();
        for k in 0..order {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            let proto = Complex64::from_polar(1.0, theta);
            let half = proto * (bw / 2.0);
            let disc = (half * half - w0 * w0).sqrt();
            for s in [half + disc, half - disc] {
                let z = (1.0 + s) / (1.0 - s);
                if z.im > REAL_POLE_EPS {
                    upper.push(z);
                } else if z.im.abs() <= REAL_POLE_EPS {
                    real.push(z.re);
                }
            }
        }
        real.sort_by(|a, b| a.total_cmp(b));

        // Every section carries one zero at z = 1 and one at z = -1.
        let mut sections: Vec<Biquad> = upper
            .iter()
            .map(|p| Biquad {
                b0: 1.0,
                b1: 0.0,
                b2: -1.0,
                a1: -2.0 * p.re,
                a2: p.norm_sqr(),
            })
            .collect();
        for pair in real.chunks(2) {
            let (a1, a2) = match pair {
                [r1, r2] => (-(r1 + r2), r1 * r2),
                [r] => (-r, 0.0),
                _ => continue,
            };
            sections.push(Biquad {
                b0: 1.0,
                b1: 0.0,
                b2: -1.0,
                a1,
                a2,
            });
        }

        let mut filter = Self { sections };
        let centre = Complex64::from_polar(1.0, 2.0 * w0.atan());
        let gain = filter.response(centre).norm();
        if !(gain.is_finite() && gain > 0.0) {
            return Err(VigilError::InvalidParameter(format!(
                "band {low_hz}-{high_hz} Hz at {fs} Hz produced a degenerate filter"
            )));
        }
        if let Some(first) = filter.sections.first_mut() {
            first.b0 /= gain;
            first.b1 /= gain;
            first.b2 /= gain;
        }
        Ok(filter)
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    /// Complex frequency response at `freq_hz`.
    pub fn response_at(&self, freq_hz: f64, fs: f64) -> Complex64 {
        self.response(Complex64::from_polar(1.0, 2.0 * PI * freq_hz / fs))
    }

    fn response(&self, z: Complex64) -> Complex64 {
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(z))
    }

    /// Edge padding used by [`BandPass::filtfilt`].
    pub fn padlen(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Steady-state step initial conditions for each section.
    fn step_states(&self) -> Vec<[f64; 2]> {
        let mut scale = 1.0;
        self.sections
            .iter()
            .map(|section| {
                let (state, dc) = section.step_state();
                let scaled = [state[0] * scale, state[1] * scale];
                scale *= dc;
                scaled
            })
            .collect()
    }

    fn run(&self, data: &mut [f64], zi: &[[f64; 2]], x0: f64) {
        let mut states: Vec<[f64; 2]> = zi.iter().map(|z| [z[0] * x0, z[1] * x0]).collect();
        for sample in data.iter_mut() {
            let mut x = *sample;
            for (section, state) in self.sections.iter().zip(states.iter_mut()) {
                let y = section.b0 * x + state[0];
                state[0] = section.b1 * x - section.a1 * y + state[1];
                state[1] = section.b2 * x - section.a2 * y;
                x = y;
            }
            *sample = x;
        }
    }

    /// Forward-backward filtering with odd-extension padding.
    pub fn filtfilt(&self, samples: &[f64]) -> Result<Vec<f64>> {
        let n = samples.len();
        let pad = self.padlen();
        if n <= pad {
            return Err(VigilError::InvalidParameter(format!(
                "input of {n} samples is too short for this filter (needs more than {pad})"
            )));
        }
        let first = samples[0];
        let last = samples[n - 1];
        let mut ext = Vec::with_capacity(n + 2 * pad);
        ext.extend((1..=pad).rev().map(|i| 2.0 * first - samples[i]));
        ext.extend_from_slice(samples);
        ext.extend((1..=pad).map(|i| 2.0 * last - samples[n - 1 - i]));

        let zi = self.step_states();
        let x0 = ext[0];
        self.run(&mut ext, &zi, x0);
        ext.reverse();
        let y0 = ext[0];
        self.run(&mut ext, &zi, y0);
        ext.reverse();
        Ok(ext[pad..pad + n].to_vec())
    }
}

fn validate(fs: f64, low_hz: f64, high_hz: f64, order: usize) -> Result<()> {
    if !(fs.is_finite() && fs > 0.0) {
        return Err(VigilError::InvalidParameter(format!(
            "sampling rate must be positive, got {fs}"
        )));
    }
    if order == 0 {
        return Err(VigilError::InvalidParameter(
            "filter order must be at least 1".into(),
        ));
    }
    let nyquist = fs / 2.0;
    if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
        return Err(VigilError::InvalidParameter(format!(
            "cutoffs must satisfy 0 < low ({low_hz}) < high ({high_hz}) < Nyquist ({nyquist})"
        )));
    }
    Ok(())
}

/// Zero-phase band-pass of a single channel.
pub fn bandpass_filtfilt(
    samples: &[f64],
    fs: f64,
    low_hz: f64,
    high_hz: f64,
    order: usize,
) -> Result<Vec<f64>> {
    BandPass::design(fs, low_hz, high_hz, order)?.filtfilt(samples)
}

/// Zero-phase band-pass applied independently to every channel.
pub fn filter_channels(
    channels: &[Vec<f64>],
    fs: f64,
    low_hz: f64,
    high_hz: f64,
    order: usize,
) -> Result<Vec<Vec<f64>>> {
    let filter = BandPass::design(fs, low_hz, high_hz, order)?;
    channels.iter().map(|ch| filter.filtfilt(ch)).collect()
}

/// Sample-wise mean across channels.
pub fn channel_mean(channels: &[Vec<f64>]) -> Result<Vec<f64>> {
    let first = channels
        .first()
        .ok_or_else(|| VigilError::MissingField("no channels to average".into()))?;
    if channels.iter().any(|ch| ch.len() != first.len()) {
        return Err(VigilError::InvalidParameter(
            "channels differ in length".into(),
        ));
    }
    let count = channels.len() as f64;
    Ok((0..first.len())
        .map(|i| channels.iter().map(|ch| ch[i]).sum::<f64>() / count)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    fn peak(data: &[f64]) -> f64 {
        data.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()))
    }

    #[test]
    fn passes_in_band_sine() {
        let x = sine(10.0, 256.0, 1024);
        let y = bandpass_filtfilt(&x, 256.0, 8.0, 12.0, 4).unwrap();
        assert_eq!(y.len(), x.len());
        let amp = peak(&y[256..768]);
        assert!((amp - 1.0).abs() < 0.05, "amplitude {amp}");
    }

    #[test]
    fn rejects_out_of_band_sine() {
        let x = sine(40.0, 256.0, 1024);
        let y = bandpass_filtfilt(&x, 256.0, 8.0, 12.0, 4).unwrap();
        assert!(peak(&y[256..768]) < 0.01);
    }

    #[test]
    fn zero_phase_keeps_peaks_in_place() {
        let x = sine(10.0, 256.0, 1024);
        let y = bandpass_filtfilt(&x, 256.0, 8.0, 12.0, 2).unwrap();
        for i in 300..700 {
            assert!((x[i] - y[i]).abs() < 0.05, "lag at sample {i}");
        }
    }

    #[test]
    fn unit_gain_at_band_centre() {
        let filter = BandPass::design(250.0, 8.0, 12.0, 4).unwrap();
        assert_eq!(filter.sections().len(), 4);
        let centre = filter.response_at(9.8, 250.0).norm();
        assert!((centre - 1.0).abs() < 0.01, "gain {centre}");
        assert!(filter.response_at(60.0, 250.0).norm() < 1e-3);
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let x: Vec<f64> = (0..500)
            .map(|i| (i as f64 * 0.37).sin() + 0.3 * (i as f64 * 1.9).cos())
            .collect();
        let a = bandpass_filtfilt(&x, 128.0, 8.0, 12.0, 4).unwrap();
        let b = bandpass_filtfilt(&x, 128.0, 8.0, 12.0, 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn odd_order_designs() {
        let filter = BandPass::design(100.0, 1.0, 40.0, 3).unwrap();
        assert_eq!(filter.sections().len(), 3);
        let x = sine(12.5, 100.0, 400);
        let y = filter.filtfilt(&x).unwrap();
        assert!((peak(&y[100..300]) - 1.0).abs() < 0.05);
    }

    #[test]
    fn invalid_cutoffs_are_rejected() {
        let x = vec![0.0; 200];
        for (low, high) in [(0.0, 12.0), (12.0, 8.0), (8.0, 64.0), (8.0, 80.0)] {
            let err = bandpass_filtfilt(&x, 128.0, low, high, 4).unwrap_err();
            assert!(matches!(err, VigilError::InvalidParameter(_)));
        }
        let err = bandpass_filtfilt(&x, 128.0, 8.0, 12.0, 0).unwrap_err();
        assert!(matches!(err, VigilError::InvalidParameter(_)));
    }

    #[test]
    fn short_input_is_rejected() {
        let x = vec![1.0; 27];
        let err = bandpass_filtfilt(&x, 128.0, 8.0, 12.0, 4).unwrap_err();
        assert!(matches!(err, VigilError::InvalidParameter(_)));
        assert!(bandpass_filtfilt(&vec![1.0; 28], 128.0, 8.0, 12.0, 4).is_ok());
    }

    #[test]
    fn channel_mean_requires_channels() {
        assert!(matches!(
            channel_mean(&[]).unwrap_err(),
            VigilError::MissingField(_)
        ));
        let mean = channel_mean(&[vec![1.0, 2.0], vec![3.0, 6.0]]).unwrap();
        assert_eq!(mean, vec![2.0, 4.0]);
    }

    #[test]
    fn filters_each_channel() {
        let channels = vec![sine(10.0, 256.0, 512), sine(40.0, 256.0, 512)];
        let out = filter_channels(&channels, 256.0, 8.0, 12.0, 4).unwrap();
        assert_eq!(out.len(), 2);
        assert!(peak(&out[0][192..320]) > 0.9);
        assert!(peak(&out[1][192..320]) < 0.05);
    }
}
