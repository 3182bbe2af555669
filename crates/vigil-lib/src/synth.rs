//! Deterministic synthetic sessions for demos and tests.

use crate::error::{Result, VigilError};
use crate::signal::{BrainRecording, GazeSample};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const CHANNEL_NAMES: [&str; 16] = [
    "Fp1", "Fp2", "F3", "F4", "C3", "C4", "P3", "P4", "O1", "O2", "F7", "F8", "T3", "T4", "T5",
    "T6",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    pub seed: u64,
    pub duration_s: f64,
    pub gaze_rate_hz: f64,
    pub eeg_fs: f64,
    pub channels: usize,
    pub alpha_hz: f64,
    /// Drive the left pupil above the normal range for the middle third of the session.
    pub dilated: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            duration_s: 20.0,
            gaze_rate_hz: 50.0,
            eeg_fs: 128.0,
            channels: 4,
            alpha_hz: 10.0,
            dilated: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticSession {
    pub gaze: Vec<GazeSample>,
    pub recording: BrainRecording,
}

impl SyntheticSession {
    pub fn generate(cfg: &SynthConfig) -> Result<Self> {
        for (name, value) in [
            ("duration_s", cfg.duration_s),
            ("gaze_rate_hz", cfg.gaze_rate_hz),
            ("eeg_fs", cfg.eeg_fs),
            ("alpha_hz", cfg.alpha_hz),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(VigilError::InvalidParameter(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if cfg.channels == 0 {
            return Err(VigilError::InvalidParameter(
                "at least one channel is required".into(),
            ));
        }
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let recording = synth_recording(cfg, &mut rng)?;
        let gaze = synth_gaze(cfg, &mut rng);
        Ok(Self { gaze, recording })
    }
}

fn channel_name(idx: usize) -> String {
    CHANNEL_NAMES
        .get(idx)
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("Ch{}", idx + 1))
}

fn synth_recording(cfg: &SynthConfig, rng: &mut StdRng) -> Result<BrainRecording> {
    let n = (cfg.duration_s * cfg.eeg_fs).round() as usize;
    let mut names = Vec::with_capacity(cfg.channels);
    let mut data = Vec::with_capacity(cfg.channels);
    for c in 0..cfg.channels {
        let phase = rng.gen_range(0.0..2.0 * PI);
        let channel = (0..n)
            .map(|i| {
                let t = i as f64 / cfg.eeg_fs;
                let envelope = 1.0 + 0.5 * (2.0 * PI * 0.1 * t + c as f64).sin();
                let alpha = 20.0 * envelope * (2.0 * PI * cfg.alpha_hz * t + phase).sin();
                let drift = 3.0 * (2.0 * PI * 0.05 * t).sin();
                alpha + drift + rng.gen_range(-5.0..5.0)
            })
            .collect();
        names.push(channel_name(c));
        data.push(channel);
    }
    BrainRecording::new(cfg.eeg_fs, names, data)
}

fn next_movement(current: i64, rng: &mut StdRng) -> i64 {
    let roll: f64 = rng.gen();
    match current {
        0 if roll < 0.09 => 1,
        0 if roll < 0.10 => 2,
        0 => 0,
        1 if roll < 0.6 => 0,
        1 => 1,
        _ if roll < 0.5 => 0,
        _ => 2,
    }
}

fn synth_gaze(cfg: &SynthConfig, rng: &mut StdRng) -> Vec<GazeSample> {
    let n = (cfg.duration_s * cfg.gaze_rate_hz).round() as usize;
    let mut movement = 0;
    let mut point = [0.5_f64, 0.5];
    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f64 / cfg.gaze_rate_hz;
        movement = next_movement(movement, rng);
        let step = if movement == 1 { 0.08 } else { 0.005 };
        for axis in point.iter_mut() {
            *axis = (*axis + rng.gen_range(-step..step)).clamp(0.0, 1.0);
        }

        let mut pupil = 4.0 + 0.3 * (2.0 * PI * 0.05 * t).sin() + rng.gen_range(-0.05..0.05);
        if cfg.dilated && i >= n / 3 && i < 2 * n / 3 {
            pupil += 3.2;
        }
        let found = movement != 2;

        let depth = 600.0 + rng.gen_range(-5.0..5.0);
        let gaze_3d = [(point[0] - 0.5) * 500.0, (point[1] - 0.5) * 300.0, depth];
        let dir = |offset: f64| {
            let x = gaze_3d[0] - offset;
            let norm = (x * x + gaze_3d[1] * gaze_3d[1] + depth * depth).sqrt();
            [x / norm, gaze_3d[1] / norm, depth / norm]
        };
        rows.push(GazeSample {
            timestamp: Some(t),
            gaze_point: point,
            gaze_point_3d: gaze_3d,
            gaze_direction_left: dir(-32.0),
            gaze_direction_right: dir(32.0),
            pupil_position_left: [-32.0, 0.0, 0.0],
            pupil_position_right: [32.0, 0.0, 0.0],
            pupil_diameter_left: found.then_some(pupil),
            pupil_diameter_right: found.then_some(pupil - 0.1),
            movement_type: movement,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_session() {
        let a = SyntheticSession::generate(&SynthConfig::default()).unwrap();
        let b = SyntheticSession::generate(&SynthConfig::default()).unwrap();
        assert_eq!(a.gaze, b.gaze);
        assert_eq!(a.recording.data, b.recording.data);
    }

    #[test]
    fn sizes_follow_rates() {
        let s = SyntheticSession::generate(&SynthConfig::default()).unwrap();
        assert_eq!(s.gaze.len(), 1000);
        assert_eq!(s.recording.sample_count(), 2560);
        assert_eq!(s.recording.channel_names, vec!["Fp1", "Fp2", "F3", "F4"]);
    }

    #[test]
    fn pupils_stay_in_range_unless_dilated() {
        let normal = SyntheticSession::generate(&SynthConfig::default()).unwrap();
        assert!(normal
            .gaze
            .iter()
            .filter_map(|g| g.pupil_diameter_left)
            .all(|p| (3.0..5.0).contains(&p)));
        let dilated = SyntheticSession::generate(&SynthConfig {
            dilated: true,
            ..SynthConfig::default()
        })
        .unwrap();
        assert!(dilated
            .gaze
            .iter()
            .filter_map(|g| g.pupil_diameter_left)
            .any(|p| p > 6.5));
    }

    #[test]
    fn gaze_points_stay_on_screen() {
        let s = SyntheticSession::generate(&SynthConfig::default()).unwrap();
        assert!(s
            .gaze
            .iter()
            .flat_map(|g| g.gaze_point)
            .all(|v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn rejects_zero_channels() {
        let cfg = SynthConfig {
            channels: 0,
            ..SynthConfig::default()
        };
        assert!(SyntheticSession::generate(&cfg).is_err());
    }
}
