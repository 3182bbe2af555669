use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use plotters::coord::{types::RangedCoordf64, Shift};
use plotters::prelude::*;
use serde_json::json;
use std::{
    collections::BTreeMap,
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};
use vigil_lib::{
    analyze_session,
    config::{read_config, AnalysisConfig},
    filter::bandpass_filtfilt,
    io::{eeg as eeg_io, eye as eye_io, text as text_io},
    movement::{count_types, label, tally},
    plot::{
        activity_figure, channel_figure, gaze_figure, pupil_figure, Figure, Series, Style,
    },
    signal::{movement_codes, BrainRecording},
    smooth::{smooth_with, SmoothingMode},
    synth::{SynthConfig, SyntheticSession},
    threshold::{crosses, estimate_with, DEFAULT_HIGH_QUANTILE, DEFAULT_LOW_QUANTILE},
};

const MAX_PLOT_POINTS: usize = 2048;

#[derive(Parser)]
#[command(
    name = "vigil",
    version,
    about = "Vigil: correlate gaze and EEG recordings and flag abnormal intervals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align a gaze export with an EEG recording and report alerts as JSON
    Analyze {
        #[arg(long)]
        gaze: PathBuf,
        /// EDF file, or CSV with a time column and one column per channel
        #[arg(long)]
        eeg: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        gaze_has_headers: bool,
        /// Gaze sampling rate, for exports without a time column
        #[arg(long)]
        gaze_rate_hz: Option<f64>,
        #[arg(long, default_value = "time")]
        eeg_time_column: String,
        /// Override the rate inferred from the EEG CSV time column
        #[arg(long)]
        eeg_fs: Option<f64>,
        /// Render pupil and activity panels to a PNG
        #[arg(long)]
        plot: Option<PathBuf>,
        /// Add a raw trace of this EEG channel to the plot
        #[arg(long, requires = "plot")]
        channel: Option<String>,
    },
    /// Zero-phase Butterworth band-pass of newline-delimited samples
    Filter {
        #[arg(long)]
        fs: f64,
        #[arg(long, default_value_t = 8.0)]
        low_hz: f64,
        #[arg(long, default_value_t = 12.0)]
        high_hz: f64,
        #[arg(long, default_value_t = 4)]
        order: usize,
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Moving-average smoothing of newline-delimited samples
    Smooth {
        #[arg(long, default_value_t = 50)]
        window: usize,
        #[arg(long)]
        centered: bool,
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Quantile bounds of a series and whether its extremes cross them
    Thresholds {
        #[arg(long, default_value_t = DEFAULT_LOW_QUANTILE)]
        low_q: f64,
        #[arg(long, default_value_t = DEFAULT_HIGH_QUANTILE)]
        high_q: f64,
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Movement-type counts and transition flows of a gaze export
    Movement {
        #[arg(long)]
        gaze: PathBuf,
        #[arg(long)]
        gaze_has_headers: bool,
        /// Render gaze points coloured by movement type to a PNG
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Write a synthetic gaze/EEG session (gaze.csv, eeg.csv)
    Simulate {
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        #[arg(long, default_value_t = 20.0)]
        duration_s: f64,
        #[arg(long)]
        dilated: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            gaze,
            eeg,
            config,
            gaze_has_headers,
            gaze_rate_hz,
            eeg_time_column,
            eeg_fs,
            plot,
            channel,
        } => cmd_analyze(
            &gaze,
            &eeg,
            config.as_deref(),
            gaze_has_headers,
            gaze_rate_hz,
            &eeg_time_column,
            eeg_fs,
            plot.as_deref(),
            channel.as_deref(),
        )?,
        Commands::Filter {
            fs,
            low_hz,
            high_hz,
            order,
            input,
        } => cmd_filter(fs, low_hz, high_hz, order, input.as_deref())?,
        Commands::Smooth {
            window,
            centered,
            input,
        } => cmd_smooth(window, centered, input.as_deref())?,
        Commands::Thresholds {
            low_q,
            high_q,
            input,
        } => cmd_thresholds(low_q, high_q, input.as_deref())?,
        Commands::Movement {
            gaze,
            gaze_has_headers,
            plot,
        } => cmd_movement(&gaze, gaze_has_headers, plot.as_deref())?,
        Commands::Simulate {
            out_dir,
            seed,
            duration_s,
            dilated,
        } => cmd_simulate(&out_dir, seed, duration_s, dilated)?,
    }
    Ok(())
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_f64_series(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_f64_series(&buf)
        }
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn gaze_delimiter(path: &Path) -> u8 {
    if has_extension(path, "tsv") {
        b'\t'
    } else {
        b','
    }
}

fn load_recording(path: &Path, time_column: &str, fs: Option<f64>) -> Result<BrainRecording> {
    if has_extension(path, "edf") {
        eeg_io::load_edf_recording(path)
    } else {
        eeg_io::read_eeg_csv(path, time_column, fs)
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_analyze(
    gaze_path: &Path,
    eeg_path: &Path,
    config_path: Option<&Path>,
    gaze_has_headers: bool,
    gaze_rate_hz: Option<f64>,
    eeg_time_column: &str,
    eeg_fs: Option<f64>,
    plot: Option<&Path>,
    channel: Option<&str>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => read_config(path)?,
        None => AnalysisConfig::default(),
    };
    if gaze_rate_hz.is_some() {
        config.gaze_rate_hz = gaze_rate_hz;
    }
    let gaze = eye_io::read_gaze_csv(gaze_path, gaze_has_headers, gaze_delimiter(gaze_path))?;
    let recording = load_recording(eeg_path, eeg_time_column, eeg_fs)?;
    info!(
        "{} gaze rows, {} EEG channels x {} samples at {} Hz",
        gaze.len(),
        recording.channel_count(),
        recording.sample_count(),
        recording.fs
    );
    let report = analyze_session(&gaze, &recording, &config).with_context(|| {
        format!(
            "analyzing {} against {}",
            gaze_path.display(),
            eeg_path.display()
        )
    })?;
    if let Some(out) = plot {
        let mut figures = vec![
            pupil_figure(&report, MAX_PLOT_POINTS),
            activity_figure(&report, MAX_PLOT_POINTS),
        ];
        if let Some(name) = channel {
            figures.push(channel_figure(&recording, name, MAX_PLOT_POINTS)?);
        }
        draw_plotters_figures(out, &figures)?;
    }
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn cmd_filter(
    fs: f64,
    low_hz: f64,
    high_hz: f64,
    order: usize,
    input: Option<&Path>,
) -> Result<()> {
    let samples = read_samples(input)?;
    let filtered = bandpass_filtfilt(&samples, fs, low_hz, high_hz, order)?;
    println!("{}", serde_json::to_string(&filtered)?);
    Ok(())
}

fn cmd_smooth(window: usize, centered: bool, input: Option<&Path>) -> Result<()> {
    let samples = read_samples(input)?;
    let mode = if centered {
        SmoothingMode::Centered
    } else {
        SmoothingMode::Trailing
    };
    let smoothed = smooth_with(&samples, window, mode)?;
    println!("{}", serde_json::to_string(&smoothed)?);
    Ok(())
}

fn cmd_thresholds(low_q: f64, high_q: f64, input: Option<&Path>) -> Result<()> {
    let samples = read_samples(input)?;
    let bounds = estimate_with(&samples, low_q, high_q)?;
    let crossings = crosses(&samples, &bounds);
    let js = json!({ "bounds": bounds, "crossings": crossings });
    println!("{}", js);
    Ok(())
}

fn cmd_movement(path: &Path, has_headers: bool, plot: Option<&Path>) -> Result<()> {
    let gaze = eye_io::read_gaze_csv(path, has_headers, gaze_delimiter(path))?;
    let codes = movement_codes(&gaze);
    let transitions = tally(&codes);
    if let Some(out) = plot {
        draw_plotters_figures(out, &[gaze_figure(&gaze, MAX_PLOT_POINTS)])?;
    }
    let colors: BTreeMap<&str, &str> = codes
        .iter()
        .map(|&code| {
            let (name, color) = label(code);
            (name, color.hex())
        })
        .collect();
    let js = json!({
        "counts": count_types(&codes),
        "colors": colors,
        "transitions": transitions.total(),
        "flows": transitions.flows(),
    });
    println!("{}", js);
    Ok(())
}

fn cmd_simulate(out_dir: &Path, seed: u64, duration_s: f64, dilated: bool) -> Result<()> {
    let cfg = SynthConfig {
        seed,
        duration_s,
        dilated,
        ..SynthConfig::default()
    };
    let session = SyntheticSession::generate(&cfg)?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let gaze_path = out_dir.join("gaze.csv");
    let eeg_path = out_dir.join("eeg.csv");
    eye_io::write_gaze_csv(&gaze_path, &session.gaze)?;
    eeg_io::write_eeg_csv(&eeg_path, &session.recording)?;
    let js = json!({
        "gaze": gaze_path,
        "eeg": eeg_path,
        "gaze_rate_hz": cfg.gaze_rate_hz,
        "gaze_rows": session.gaze.len(),
        "eeg_channels": session.recording.channel_count(),
        "eeg_samples": session.recording.sample_count(),
    });
    println!("{}", js);
    Ok(())
}

fn draw_plotters_figures(path: &Path, figures: &[Figure]) -> Result<()> {
    let backend = BitMapBackend::new(path, (900, 360 * figures.len() as u32));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    for (area, fig) in root.split_evenly((figures.len(), 1)).iter().zip(figures) {
        draw_plotters_figure(area, fig)?;
    }
    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn padded(range: [f64; 2], frac: f64) -> std::ops::Range<f64> {
    let span = range[1] - range[0];
    let pad = if span > f64::EPSILON { span * frac } else { 1.0 };
    (range[0] - pad)..(range[1] + pad)
}

fn draw_plotters_figure(area: &DrawingArea<BitMapBackend<'_>, Shift>, fig: &Figure) -> Result<()> {
    let (x_range, y_range) = fig.bounds().unwrap_or(([0.0, 1.0], [0.0, 1.0]));
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 20),
        )
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(padded(x_range, 0.0), padded(y_range, 0.05))?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let points = line.points.iter().map(|p| (p[0], p[1])).collect();
                draw_line(&mut chart, &line.name, points, &line.style)?;
            }
            Series::HLine(h) => {
                let points = vec![(x_range[0], h.y), (x_range[1], h.y)];
                draw_line(&mut chart, &h.name, points, &h.style)?;
            }
            Series::Scatter(sc) => {
                let (r, g, b) = sc.color.rgb();
                let color = RGBColor(r, g, b);
                let radius = sc.radius;
                chart
                    .draw_series(
                        sc.points
                            .iter()
                            .map(|p| Circle::new((p[0], p[1]), radius, color.filled())),
                    )?
                    .label(sc.name.as_str())
                    .legend(move |(x, y)| Circle::new((x + 10, y), radius, color.filled()));
            }
        }
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

type Chart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_line(
    chart: &mut Chart<'_, '_>,
    name: &str,
    points: Vec<(f64, f64)>,
    style: &Style,
) -> Result<()> {
    let (r, g, b) = style.color.rgb();
    let color = RGBColor(r, g, b);
    let width = style.width.round().max(1.0) as u32;
    let stroke = color.stroke_width(width);
    let anno = match style.dash {
        Some([on, off]) => chart.draw_series(DashedLineSeries::new(points, on, off, stroke))?,
        None => chart.draw_series(plotters::series::LineSeries::new(points, stroke))?,
    };
    anno.label(name)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], stroke));
    Ok(())
}
