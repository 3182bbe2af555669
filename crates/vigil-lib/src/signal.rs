use crate::error::{Result, VigilError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Basic typed time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    /// Sample times in seconds, starting at zero.
    pub fn times(&self) -> Vec<f64> {
        (0..self.data.len()).map(|i| i as f64 / self.fs).collect()
    }
}

/// One row of eye-tracking data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    /// Explicit time stamp (seconds). Exports without one use row order as time.
    pub timestamp: Option<f64>,
    pub gaze_point: [f64; 2],
    pub gaze_point_3d: [f64; 3],
    pub gaze_direction_left: [f64; 3],
    pub gaze_direction_right: [f64; 3],
    pub pupil_position_left: [f64; 3],
    pub pupil_position_right: [f64; 3],
    /// Pupil diameter in millimetres, `None` when the tracker lost the eye.
    pub pupil_diameter_left: Option<f64>,
    pub pupil_diameter_right: Option<f64>,
    pub movement_type: i64,
}

impl GazeSample {
    /// A sample with every coordinate zeroed and no pupil reading.
    pub fn empty(movement_type: i64) -> Self {
        Self {
            timestamp: None,
            gaze_point: [0.0; 2],
            gaze_point_3d: [0.0; 3],
            gaze_direction_left: [0.0; 3],
            gaze_direction_right: [0.0; 3],
            pupil_position_left: [0.0; 3],
            pupil_position_right: [0.0; 3],
            pupil_diameter_left: None,
            pupil_diameter_right: None,
            movement_type,
        }
    }
}

/// Left and right pupil diameters as columns, missing readings as NaN.
pub fn pupil_columns(samples: &[GazeSample]) -> (Vec<f64>, Vec<f64>) {
    samples
        .iter()
        .map(|s| {
            (
                s.pupil_diameter_left.unwrap_or(f64::NAN),
                s.pupil_diameter_right.unwrap_or(f64::NAN),
            )
        })
        .unzip()
}

/// Movement-type codes in row order.
pub fn movement_codes(samples: &[GazeSample]) -> Vec<i64> {
    samples.iter().map(|s| s.movement_type).collect()
}

/// Multichannel brain-signal recording, channel-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainRecording {
    pub fs: f64,
    pub channel_names: Vec<String>,
    pub data: Vec<Vec<f64>>,
    /// Explicit sample times; derived from `fs` when absent.
    pub timestamps: Option<Vec<f64>>,
}

impl BrainRecording {
    pub fn new(fs: f64, channel_names: Vec<String>, data: Vec<Vec<f64>>) -> Result<Self> {
        if !(fs.is_finite() && fs > 0.0) {
            return Err(VigilError::InvalidParameter(format!(
                "sampling frequency must be positive, got {fs}"
            )));
        }
        if channel_names.is_empty() {
            return Err(VigilError::MissingField(
                "recording has no channels".into(),
            ));
        }
        if channel_names.len() != data.len() {
            return Err(VigilError::InvalidParameter(format!(
                "{} channel names for {} data rows",
                channel_names.len(),
                data.len()
            )));
        }
        let mut seen = HashSet::new();
        for name in &channel_names {
            if !seen.insert(name.as_str()) {
                return Err(VigilError::InvalidParameter(format!(
                    "duplicate channel name {name}"
                )));
            }
        }
        let samples = data[0].len();
        if let Some((idx, _)) = data
            .iter()
            .enumerate()
            .find(|(_, channel)| channel.len() != samples)
        {
            return Err(VigilError::InvalidParameter(format!(
                "channel {} has {} samples, expected {}",
                channel_names[idx],
                data[idx].len(),
                samples
            )));
        }
        Ok(Self {
            fs,
            channel_names,
            data,
            timestamps: None,
        })
    }

    /// Attach explicit sample times; must match the sample count.
    pub fn with_timestamps(mut self, timestamps: Vec<f64>) -> Result<Self> {
        if timestamps.len() != self.sample_count() {
            return Err(VigilError::InvalidParameter(format!(
                "{} timestamps for {} samples",
                timestamps.len(),
                self.sample_count()
            )));
        }
        self.timestamps = Some(timestamps);
        Ok(self)
    }

    pub fn channel_count(&self) -> usize {
        self.data.len()
    }

    pub fn sample_count(&self) -> usize {
        self.data.first().map(Vec::len).unwrap_or(0)
    }

    pub fn times(&self) -> Vec<f64> {
        match &self.timestamps {
            Some(ts) => ts.clone(),
            None => (0..self.sample_count())
                .map(|i| i as f64 / self.fs)
                .collect(),
        }
    }

    pub fn channel(&self, name: &str) -> Option<TimeSeries> {
        let idx = self.channel_names.iter().position(|n| n == name)?;
        Some(TimeSeries {
            fs: self.fs,
            data: self.data[idx].clone(),
        })
    }
}
