use crate::alert::PupilBounds;
use crate::error::VigilError;
use crate::smooth::SmoothingMode;
use crate::threshold::{DEFAULT_HIGH_QUANTILE, DEFAULT_LOW_QUANTILE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Band-pass applied to the brain signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    pub low_hz: f64,
    pub high_hz: f64,
    pub order: usize,
}

impl Default for BandConfig {
    fn default() -> Self {
        // Alpha band.
        Self {
            low_hz: 8.0,
            high_hz: 12.0,
            order: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub window: usize,
    pub mode: SmoothingMode,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: 50,
            mode: SmoothingMode::Trailing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantileConfig {
    pub low: f64,
    pub high: f64,
}

impl Default for QuantileConfig {
    fn default() -> Self {
        Self {
            low: DEFAULT_LOW_QUANTILE,
            high: DEFAULT_HIGH_QUANTILE,
        }
    }
}

/// Parameters of the session pipeline. Every field falls back to its default.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub band: BandConfig,
    pub smoothing: SmoothingConfig,
    pub quantiles: QuantileConfig,
    pub pupil: PupilBounds,
    /// Gaze sampling rate used when samples carry no time stamps.
    /// Without it the row index itself is the time axis.
    pub gaze_rate_hz: Option<f64>,
}

impl AnalysisConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("parsing analysis config")?;
        config.validate()?;
        Ok(config)
    }

    /// Cheap checks that do not depend on the data; the pipeline catches the rest.
    pub fn validate(&self) -> std::result::Result<(), VigilError> {
        if self.band.order == 0 {
            return Err(VigilError::InvalidParameter(
                "band.order must be at least 1".into(),
            ));
        }
        if !(self.band.low_hz > 0.0 && self.band.low_hz < self.band.high_hz) {
            return Err(VigilError::InvalidParameter(format!(
                "band must satisfy 0 < low_hz ({}) < high_hz ({})",
                self.band.low_hz, self.band.high_hz
            )));
        }
        if self.smoothing.window == 0 {
            return Err(VigilError::InvalidParameter(
                "smoothing.window must be at least 1".into(),
            ));
        }
        if !(0.0 <= self.quantiles.low
            && self.quantiles.low < self.quantiles.high
            && self.quantiles.high <= 1.0)
        {
            return Err(VigilError::InvalidParameter(format!(
                "quantiles must satisfy 0 <= low ({}) < high ({}) <= 1",
                self.quantiles.low, self.quantiles.high
            )));
        }
        if self.pupil.min_mm > self.pupil.max_mm {
            return Err(VigilError::InvalidParameter(format!(
                "pupil.min_mm ({}) exceeds pupil.max_mm ({})",
                self.pupil.min_mm, self.pupil.max_mm
            )));
        }
        if let Some(rate) = self.gaze_rate_hz {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(VigilError::InvalidParameter(format!(
                    "gaze_rate_hz must be positive, got {rate}"
                )));
            }
        }
        Ok(())
    }
}

pub fn read_config(path: &Path) -> Result<AnalysisConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    AnalysisConfig::from_toml_str(&contents)
        .with_context(|| format!("loading config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_alpha_pipeline() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.band.low_hz, 8.0);
        assert_eq!(cfg.band.high_hz, 12.0);
        assert_eq!(cfg.band.order, 4);
        assert_eq!(cfg.smoothing.window, 50);
        assert_eq!(cfg.quantiles.low, 0.05);
        assert_eq!(cfg.quantiles.high, 0.95);
        assert_eq!(cfg.pupil.min_mm, 2.0);
        assert_eq!(cfg.pupil.max_mm, 6.5);
        assert!(cfg.gaze_rate_hz.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = AnalysisConfig::from_toml_str(
            r#"
gaze_rate_hz = 60.0

[band]
low_hz = 4.0
high_hz = 8.0

[smoothing]
mode = "centered"
"#,
        )
        .unwrap();
        assert_eq!(cfg.band.low_hz, 4.0);
        assert_eq!(cfg.band.order, 4);
        assert_eq!(cfg.smoothing.window, 50);
        assert_eq!(cfg.smoothing.mode, SmoothingMode::Centered);
        assert_eq!(cfg.gaze_rate_hz, Some(60.0));
        assert_eq!(cfg.pupil, PupilBounds::default());
    }

    #[test]
    fn rejects_inverted_band() {
        let err = AnalysisConfig::from_toml_str("[band]\nlow_hz = 12.0\nhigh_hz = 8.0\n")
            .unwrap_err();
        assert!(err.downcast_ref::<VigilError>().is_some());
    }

    #[test]
    fn reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pupil]\nmin_mm = 2.5\nmax_mm = 6.0").unwrap();
        let cfg = read_config(file.path()).unwrap();
        assert_eq!(cfg.pupil.min_mm, 2.5);
        assert_eq!(cfg.pupil.max_mm, 6.0);
    }
}
