use crate::alert::AlertKind;
use crate::error::{Result, VigilError};
use crate::movement::{label, MarkerColor};
use crate::pipeline::SessionReport;
use crate::signal::{BrainRecording, GazeSample};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const BLUE: Color = Color(0x0000FF);
    pub const RED: Color = Color(0xFF0000);
    pub const ORANGE: Color = Color(0xFFA500);
    pub const GREEN: Color = Color(0x008000);

    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

impl From<MarkerColor> for Color {
    fn from(marker: MarkerColor) -> Self {
        Color(marker.rgb())
    }
}

const DASHED: Option<[f32; 2]> = Some([6.0, 4.0]);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

/// Horizontal reference line spanning the whole x range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HLine {
    pub name: String,
    pub y: f64,
    pub style: Style,
}

/// Unconnected markers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub color: Color,
    pub radius: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    HLine(HLine),
    Scatter(ScatterSeries),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn with_labels(mut self, x: &str, y: &str) -> Self {
        self.x.label = Some(x.into());
        self.y.label = Some(y.into());
        self
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    pub fn lines(&self) -> impl Iterator<Item = &LineSeries> {
        self.series.iter().filter_map(|s| match s {
            Series::Line(line) => Some(line),
            _ => None,
        })
    }

    pub fn hlines(&self) -> impl Iterator<Item = &HLine> {
        self.series.iter().filter_map(|s| match s {
            Series::HLine(h) => Some(h),
            _ => None,
        })
    }

    pub fn scatters(&self) -> impl Iterator<Item = &ScatterSeries> {
        self.series.iter().filter_map(|s| match s {
            Series::Scatter(sc) => Some(sc),
            _ => None,
        })
    }

    fn points(&self) -> impl Iterator<Item = &[f64; 2]> {
        self.lines()
            .flat_map(|l| l.points.iter())
            .chain(self.scatters().flat_map(|sc| sc.points.iter()))
    }

    /// Data extent over every series, hlines included. `None` for an empty figure.
    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        let x = min_max(self.points().map(|p| p[0]))?;
        let ys = self
            .points()
            .map(|p| p[1])
            .chain(self.hlines().map(|h| h.y));
        let y = min_max(ys)?;
        Some((x, y))
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<[f64; 2]> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some([v, v]),
            Some([lo, hi]) => Some([lo.min(v), hi.max(v)]),
        })
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

fn trace(name: &str, time: &[f64], values: &[f64], color: Color, max_points: usize) -> Series {
    let points: Vec<[f64; 2]> = time
        .iter()
        .zip(values)
        .filter(|(_, v)| v.is_finite())
        .map(|(t, v)| [*t, *v])
        .collect();
    Series::Line(LineSeries {
        name: name.into(),
        points: decimate_points(&points, max_points),
        style: Style {
            width: 1.4,
            dash: None,
            color,
        },
    })
}

fn threshold(name: &str, y: f64, color: Color) -> Series {
    Series::HLine(HLine {
        name: name.into(),
        y,
        style: Style {
            width: 1.0,
            dash: DASHED,
            color,
        },
    })
}

/// Left/right pupil traces plus a dashed bound for every pupil alert raised.
pub fn pupil_figure(report: &SessionReport, max_points: usize) -> Figure {
    let mut fig = Figure::new(Some("Changes in Pupil Diameter Over Time".to_string()))
        .with_labels(report.time_axis.label(), "Pupil Diameter (mm)");
    fig.add_series(trace(
        "Left pupil",
        &report.time,
        &report.pupil_left,
        Color::BLUE,
        max_points,
    ));
    fig.add_series(trace(
        "Right pupil",
        &report.time,
        &report.pupil_right,
        Color::RED,
        max_points,
    ));
    let bounds = &report.config.pupil;
    for alert in report.alerts.iter().filter(|a| a.kind.is_pupil()) {
        match alert.kind {
            AlertKind::PupilTooSmall => {
                fig.add_series(threshold("Too small pupil", bounds.min_mm, Color::RED))
            }
            AlertKind::PupilTooDilated => {
                fig.add_series(threshold("Too large pupil", bounds.max_mm, Color::ORANGE))
            }
            _ => {}
        }
    }
    fig
}

/// Smoothed band activity with the threshold line matching the brain alert.
pub fn activity_figure(report: &SessionReport, max_points: usize) -> Figure {
    let mut fig = Figure::new(Some("Changes in EEG Alpha Waves Over Time".to_string()))
        .with_labels(report.time_axis.label(), "EEG Alpha Waves");
    fig.add_series(trace(
        "Filtered Alpha Activity",
        &report.time,
        &report.activity,
        Color::GREEN,
        max_points,
    ));
    let b = report.activity_bounds;
    let line = report.alerts.iter().find_map(|alert| match alert.kind {
        AlertKind::BrainActivityUnstable => Some((b.high, Color::RED)),
        AlertKind::BrainActivityLow => Some((b.low, Color::RED)),
        AlertKind::BrainActivityHigh => Some((b.high, Color::ORANGE)),
        _ => None,
    });
    if let Some((y, color)) = line {
        fig.add_series(threshold("EEG Activity Threshold", y, color));
    }
    fig
}

/// Normalized gaze points, one marker series per movement type.
pub fn gaze_figure(samples: &[GazeSample], max_points: usize) -> Figure {
    let mut groups: BTreeMap<&'static str, (MarkerColor, Vec<[f64; 2]>)> = BTreeMap::new();
    for sample in samples {
        let [x, y] = sample.gaze_point;
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        let (name, color) = label(sample.movement_type);
        groups
            .entry(name)
            .or_insert_with(|| (color, Vec::new()))
            .1
            .push([x, y]);
    }
    let mut fig = Figure::new(Some("Gaze Points by Movement Type".to_string()))
        .with_labels("Gaze X (normalized)", "Gaze Y (normalized)");
    for (name, (color, points)) in groups {
        fig.add_series(Series::Scatter(ScatterSeries {
            name: name.into(),
            points: decimate_points(&points, max_points),
            color: color.into(),
            radius: 3,
        }));
    }
    fig
}

/// Raw trace of one named channel.
pub fn channel_figure(
    recording: &BrainRecording,
    name: &str,
    max_points: usize,
) -> Result<Figure> {
    let channel = recording
        .channel(name)
        .ok_or_else(|| VigilError::MissingField(format!("channel '{name}'")))?;
    let mut fig = Figure::new(Some(format!("EEG Signal: {name}")))
        .with_labels("Time (s)", "Amplitude");
    fig.add_series(trace(
        name,
        &channel.times(),
        &channel.data,
        Color::BLUE,
        max_points,
    ));
    Ok(fig)
}
