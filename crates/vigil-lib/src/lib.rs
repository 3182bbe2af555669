//! Gaze and brain-signal session analysis: alignment onto a shared timeline,
//! band-pass filtering, smoothing, quantile thresholds and alert rules.

pub mod alert;
pub mod align;
pub mod config;
pub mod error;
pub mod filter;
pub mod io;
pub mod movement;
pub mod pipeline;
pub mod plot;
pub mod signal;
pub mod smooth;
pub mod spectrum;
pub mod synth;
pub mod threshold;

pub use alert::{classify, AlertKind, AlertMessage, PupilBounds};
pub use config::AnalysisConfig;
pub use error::{Result, VigilError};
pub use pipeline::{analyze_session, SessionReport, TimeAxis};
pub use signal::*;
