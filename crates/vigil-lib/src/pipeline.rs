use crate::{
    alert::{classify_with, AlertMessage},
    align::{align, overlap, SampledTable},
    config::AnalysisConfig,
    error::{Result, VigilError},
    filter::{channel_mean, filter_channels},
    signal::{pupil_columns, BrainRecording, GazeSample},
    smooth::smooth_with,
    spectrum::relative_band_power,
    threshold::{crosses, estimate_with, Bounds, Crossings},
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Everything the presentation layer needs for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub time: Vec<f64>,
    pub pupil_left: Vec<f64>,
    pub pupil_right: Vec<f64>,
    /// Band-passed, channel-averaged and smoothed brain activity.
    pub activity: Vec<f64>,
    pub activity_bounds: Bounds,
    pub activity_crossings: Crossings,
    pub alerts: Vec<AlertMessage>,
    /// Share of the channel-mean power inside the band.
    pub band_relative_power: f64,
    /// Rate of the common grid, `None` when the grid has a single point.
    pub grid_rate_hz: Option<f64>,
    pub time_axis: TimeAxis,
    pub config: AnalysisConfig,
}

/// Unit of the common time grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeAxis {
    Seconds,
    /// Gaze rows without time stamps or rate: one unit per row.
    RowIndex,
}

impl TimeAxis {
    pub fn label(&self) -> &'static str {
        match self {
            TimeAxis::Seconds => "Time (s)",
            TimeAxis::RowIndex => "Time Index",
        }
    }
}

/// Time axis for the gaze table.
///
/// Explicit time stamps win when every sample has one; otherwise rows are
/// spaced by `gaze_rate_hz`, or by one unit per row when no rate is known.
pub fn gaze_time_axis(samples: &[GazeSample], gaze_rate_hz: Option<f64>) -> (TimeAxis, Vec<f64>) {
    let explicit: Option<Vec<f64>> = samples.iter().map(|s| s.timestamp).collect();
    match (explicit, gaze_rate_hz) {
        (Some(ts), _) if !ts.is_empty() => (TimeAxis::Seconds, ts),
        (_, Some(rate)) => (
            TimeAxis::Seconds,
            (0..samples.len()).map(|i| i as f64 / rate).collect(),
        ),
        _ => (
            TimeAxis::RowIndex,
            (0..samples.len()).map(|i| i as f64).collect(),
        ),
    }
}

/// Align gaze and brain signal, derive brain-activity bounds and classify alerts.
pub fn analyze_session(
    gaze: &[GazeSample],
    recording: &BrainRecording,
    config: &AnalysisConfig,
) -> Result<SessionReport> {
    config.validate()?;
    if gaze.is_empty() {
        return Err(VigilError::EmptySeries("gaze table has no samples".into()));
    }
    if recording.channel_count() == 0 {
        return Err(VigilError::MissingField("recording has no channels".into()));
    }

    let (left, right) = pupil_columns(gaze);
    let (time_axis, gaze_time) = gaze_time_axis(gaze, config.gaze_rate_hz);
    let gaze_table = SampledTable::new(gaze_time, vec![left, right])?;
    let times = recording.times();
    overlap(&gaze_table, &SampledTable::new(times.clone(), Vec::new())?)?;

    // Band-pass at the recording rate, then resample the channel mean onto the grid.
    let band = &config.band;
    let filtered = filter_channels(
        &recording.data,
        recording.fs,
        band.low_hz,
        band.high_hz,
        band.order,
    )?;
    let mean = channel_mean(&filtered)?;
    let band_relative_power =
        relative_band_power(&mean, recording.fs, band.low_hz, band.high_hz)?;
    let brain_table = SampledTable::single(times, mean)?;
    let aligned = align(&gaze_table, &brain_table)?;
    let grid_rate = aligned.effective_rate();
    debug!(
        "aligned {} gaze rows with {} channels filtered at {} Hz, grid rate {:?}",
        gaze.len(),
        recording.channel_count(),
        recording.fs,
        grid_rate
    );

    let brain = aligned.b.first().map(Vec::as_slice).unwrap_or_default();
    let activity = smooth_with(brain, config.smoothing.window, config.smoothing.mode)?;

    let bounds = estimate_with(&activity, config.quantiles.low, config.quantiles.high)?;
    let crossings = crosses(&activity, &bounds);
    debug!(
        "activity bounds [{:.4}, {:.4}], crossed low={} high={}",
        bounds.low, bounds.high, crossings.low_crossed, crossings.high_crossed
    );

    let mut pupils = aligned.a.into_iter();
    let pupil_left = pupils.next().unwrap_or_default();
    let pupil_right = pupils.next().unwrap_or_default();
    let alerts = classify_with(&pupil_left, &pupil_right, crossings, &config.pupil);
    for alert in &alerts {
        info!("{}", alert.text);
    }

    Ok(SessionReport {
        time: aligned.time,
        pupil_left,
        pupil_right,
        activity,
        activity_bounds: bounds,
        activity_crossings: crossings,
        alerts,
        band_relative_power,
        grid_rate_hz: grid_rate,
        time_axis,
        config: *config,
    })
}
