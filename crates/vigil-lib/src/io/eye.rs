use crate::error::VigilError;
use crate::signal::GazeSample;
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::File;
use std::path::Path;

/// Column names of the eye-tracker export, in file order.
pub const GAZE_COLUMNS: [&str; 20] = [
    "Gaze point X",
    "Gaze point Y",
    "Gaze point 3D X",
    "Gaze point 3D Y",
    "Gaze point 3D Z",
    "Gaze direction left X",
    "Gaze direction left Y",
    "Gaze direction left Z",
    "Gaze direction right X",
    "Gaze direction right Y",
    "Gaze direction right Z",
    "Pupil position left X",
    "Pupil position left Y",
    "Pupil position left Z",
    "Pupil position right X",
    "Pupil position right Y",
    "Pupil position right Z",
    "Pupil diameter left",
    "Pupil diameter right",
    "Eye movement type index",
];

const TIME_COLUMNS: [&str; 2] = ["timestamp", "time"];

/// Field positions of one gaze export layout.
struct Layout {
    fields: [usize; 20],
    timestamp: Option<usize>,
}

impl Layout {
    fn positional() -> Self {
        let mut fields = [0; 20];
        for (i, slot) in fields.iter_mut().enumerate() {
            *slot = i;
        }
        Self {
            fields,
            timestamp: None,
        }
    }

    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let mut fields = [0; 20];
        for (slot, name) in fields.iter_mut().zip(GAZE_COLUMNS) {
            *slot = locate_column(headers, name)?;
        }
        let timestamp = TIME_COLUMNS
            .iter()
            .find_map(|name| locate_column(headers, name).ok());
        Ok(Self { fields, timestamp })
    }
}

/// Read a gaze export. Headerless files are positional (the tracker's native
/// layout); files with a header row are matched by column name.
pub fn read_gaze_csv(path: &Path, has_headers: bool, delimiter: u8) -> Result<Vec<GazeSample>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    let layout = if has_headers {
        let headers = reader.headers().context("reading header")?.clone();
        Layout::from_headers(&headers)?
    } else {
        Layout::positional()
    };

    let mut samples = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("reading gaze row {}", idx + 1))?;
        let sample = parse_row(&record, &layout)
            .with_context(|| format!("parsing gaze row {} of {}", idx + 1, path.display()))?;
        samples.push(sample);
    }
    Ok(samples)
}

fn parse_row(record: &StringRecord, layout: &Layout) -> Result<GazeSample> {
    let cell = |column: usize| -> Result<&str> {
        let idx = layout.fields[column];
        record.get(idx).ok_or_else(|| {
            anyhow!(VigilError::MissingField(format!(
                "{} (field {})",
                GAZE_COLUMNS[column],
                idx + 1
            )))
        })
    };
    let number = |column: usize| -> Result<f64> { Ok(parse_or_nan(cell(column)?)) };
    let triple = |first: usize| -> Result<[f64; 3]> {
        Ok([number(first)?, number(first + 1)?, number(first + 2)?])
    };

    let timestamp = match layout.timestamp {
        Some(idx) => Some(
            record
                .get(idx)
                .ok_or_else(|| anyhow!(VigilError::MissingField("timestamp".into())))?
                .parse::<f64>()
                .context("parsing timestamp")?,
        ),
        None => None,
    };

    Ok(GazeSample {
        timestamp,
        gaze_point: [number(0)?, number(1)?],
        gaze_point_3d: triple(2)?,
        gaze_direction_left: triple(5)?,
        gaze_direction_right: triple(8)?,
        pupil_position_left: triple(11)?,
        pupil_position_right: triple(14)?,
        pupil_diameter_left: parse_pupil(cell(17)?),
        pupil_diameter_right: parse_pupil(cell(18)?),
        movement_type: parse_movement(cell(19)?)?,
    })
}

fn parse_or_nan(value: &str) -> f64 {
    value.parse::<f64>().unwrap_or(f64::NAN)
}

/// Trackers mark lost pupils with blanks or negative sentinels.
fn parse_pupil(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn parse_movement(value: &str) -> Result<i64> {
    if value.is_empty() {
        return Ok(-1);
    }
    if let Ok(code) = value.parse::<i64>() {
        return Ok(code);
    }
    let float = value
        .parse::<f64>()
        .with_context(|| format!("movement type {value:?} is not a number"))?;
    if float.fract() != 0.0 || !float.is_finite() {
        return Err(anyhow!("movement type {value:?} is not an integer code"));
    }
    Ok(float as i64)
}

fn locate_column(headers: &StringRecord, requested: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| anyhow!(VigilError::MissingField(format!("column {requested}"))))
}

/// Write samples in the headerless 20-column layout; time stamps are not stored.
pub fn write_gaze_csv(path: &Path, samples: &[GazeSample]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    let fmt_pupil = |v: Option<f64>| v.map(|d| d.to_string()).unwrap_or_default();
    for s in samples {
        let mut row: Vec<String> = Vec::with_capacity(20);
        row.extend(s.gaze_point.iter().map(f64::to_string));
        for triple in [
            &s.gaze_point_3d,
            &s.gaze_direction_left,
            &s.gaze_direction_right,
            &s.pupil_position_left,
            &s.pupil_position_right,
        ] {
            row.extend(triple.iter().map(f64::to_string));
        }
        row.push(fmt_pupil(s.pupil_diameter_left));
        row.push(fmt_pupil(s.pupil_diameter_right));
        row.push(s.movement_type.to_string());
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_data(name: &str) -> PathBuf {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        manifest_dir
            .parent()
            .and_then(|p| p.parent())
            .expect("workspace")
            .join("test_data")
            .join(name)
    }

    #[test]
    fn reads_headerless_export() {
        let samples = read_gaze_csv(&test_data("gaze_sample.csv"), false, b',').unwrap();
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0].gaze_point, [0.512, 0.433]);
        assert_eq!(samples[0].pupil_diameter_left, Some(3.81));
        assert_eq!(samples[0].movement_type, 0);
        assert!(samples[0].timestamp.is_none());
        assert_eq!(samples[2].movement_type, 2);
        assert!(samples[2].pupil_diameter_left.is_none());
        assert!(samples[2].pupil_diameter_right.is_none());
        assert_eq!(samples[4].movement_type, 1);
    }

    #[test]
    fn reads_named_columns_with_time() {
        let samples = read_gaze_csv(&test_data("gaze_with_header.tsv"), true, b'\t').unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1].timestamp, Some(0.02));
        assert_eq!(samples[1].pupil_diameter_right, Some(4.02));
        assert_eq!(samples[2].movement_type, 1);
    }

    #[test]
    fn short_rows_are_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.csv");
        std::fs::write(&path, "0.1,0.2,0.3\n").unwrap();
        let err = read_gaze_csv(&path, false, b',').unwrap_err();
        assert!(err
            .chain()
            .any(|e| matches!(e.downcast_ref::<VigilError>(), Some(VigilError::MissingField(_)))));
    }

    #[test]
    fn missing_header_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "Gaze point X,Gaze point Y\n0.1,0.2\n").unwrap();
        let err = read_gaze_csv(&path, true, b',').unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VigilError>(),
            Some(VigilError::MissingField(_))
        ));
    }

    #[test]
    fn written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gaze.csv");
        let mut sample = GazeSample::empty(1);
        sample.pupil_diameter_left = Some(3.5);
        sample.gaze_point = [0.25, 0.75];
        write_gaze_csv(&path, &[sample.clone(), GazeSample::empty(2)]).unwrap();
        let back = read_gaze_csv(&path, false, b',').unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0], sample);
        assert_eq!(back[1].movement_type, 2);
    }

    #[test]
    fn movement_codes_accept_integral_floats() {
        assert_eq!(parse_movement("1.0").unwrap(), 1);
        assert_eq!(parse_movement("").unwrap(), -1);
        assert!(parse_movement("1.5").is_err());
        assert!(parse_movement("fixation").is_err());
    }
}
