use crate::threshold::Crossings;
use serde::{Deserialize, Serialize};

/// Smallest pupil diameter (mm) considered normal.
pub const PUPIL_MIN_MM: f64 = 2.0;
/// Largest pupil diameter (mm) considered normal.
pub const PUPIL_MAX_MM: f64 = 6.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PupilBounds {
    pub min_mm: f64,
    pub max_mm: f64,
}

impl Default for PupilBounds {
    fn default() -> Self {
        Self {
            min_mm: PUPIL_MIN_MM,
            max_mm: PUPIL_MAX_MM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PupilTooSmall,
    PupilTooDilated,
    BrainActivityLow,
    BrainActivityHigh,
    /// Both brain-activity bounds crossed; replaces the separate low/high alerts.
    BrainActivityUnstable,
}

impl AlertKind {
    pub fn message(&self) -> &'static str {
        match self {
            AlertKind::PupilTooSmall => "Pupil too small!",
            AlertKind::PupilTooDilated => "Pupil too dilated!",
            AlertKind::BrainActivityLow => "EEG Alpha activity too low!",
            AlertKind::BrainActivityHigh => "EEG Alpha activity too high!",
            AlertKind::BrainActivityUnstable => {
                "EEG Alpha activity fluctuating strongly! Check your concentration or take a short break!"
            }
        }
    }

    pub fn is_pupil(&self) -> bool {
        matches!(self, AlertKind::PupilTooSmall | AlertKind::PupilTooDilated)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub kind: AlertKind,
    pub text: String,
}

impl From<AlertKind> for AlertMessage {
    fn from(kind: AlertKind) -> Self {
        Self {
            kind,
            text: kind.message().to_string(),
        }
    }
}

fn finite_min(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .reduce(f64::min)
}

fn finite_max(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .reduce(f64::max)
}

/// Alerts for the default 2.0 / 6.5 mm pupil range.
pub fn classify(pupil_left: &[f64], pupil_right: &[f64], brain: Crossings) -> Vec<AlertMessage> {
    classify_with(pupil_left, pupil_right, brain, &PupilBounds::default())
}

/// Pupil alerts first, then at most one brain-activity alert.
pub fn classify_with(
    pupil_left: &[f64],
    pupil_right: &[f64],
    brain: Crossings,
    bounds: &PupilBounds,
) -> Vec<AlertMessage> {
    let mut kinds = Vec::new();

    let below = |side: &[f64]| finite_min(side).is_some_and(|m| m < bounds.min_mm);
    let above = |side: &[f64]| finite_max(side).is_some_and(|m| m > bounds.max_mm);
    if below(pupil_left) || below(pupil_right) {
        kinds.push(AlertKind::PupilTooSmall);
    }
    if above(pupil_left) || above(pupil_right) {
        kinds.push(AlertKind::PupilTooDilated);
    }

    if brain.both() {
        kinds.push(AlertKind::BrainActivityUnstable);
    } else if brain.low_crossed {
        kinds.push(AlertKind::BrainActivityLow);
    } else if brain.high_crossed {
        kinds.push(AlertKind::BrainActivityHigh);
    }

    kinds.into_iter().map(AlertMessage::from).collect()
}
