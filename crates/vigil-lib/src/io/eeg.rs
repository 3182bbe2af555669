use crate::error::VigilError;
use crate::signal::BrainRecording;
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use edf_reader::file_reader::SyncFileReader;
use edf_reader::sync_reader::SyncEDFReader;
use log::debug;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Helper implementing the EDF reader trait for on-disk files.
struct DiskFileReader {
    path: PathBuf,
}

impl DiskFileReader {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl SyncFileReader for DiskFileReader {
    fn read(&self, offset: u64, length: u64) -> Result<Vec<u8>, std::io::Error> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Load every channel of an EDF file. All channels must share one sampling rate.
pub fn load_edf_recording(path: &Path) -> Result<BrainRecording> {
    let reader = SyncEDFReader::init_with_file_reader(DiskFileReader::new(path))
        .with_context(|| format!("opening EDF {}", path.display()))?;
    let header = &reader.edf_header;
    if header.channels.is_empty() {
        return Err(anyhow!(VigilError::MissingField(format!(
            "{} has no signals",
            path.display()
        ))));
    }
    if header.block_duration == 0 {
        return Err(anyhow!(VigilError::InvalidParameter(
            "EDF data records have zero duration".into()
        )));
    }

    let block_ms = header.block_duration as f64;
    let rates: Vec<f64> = header
        .channels
        .iter()
        .map(|ch| ch.number_of_samples_in_data_record as f64 * 1000.0 / block_ms)
        .collect();
    let fs = rates[0];
    if let Some((idx, rate)) = rates.iter().enumerate().find(|(_, rate)| **rate != fs) {
        return Err(anyhow!(VigilError::InvalidParameter(format!(
            "channel {} is sampled at {} Hz, expected {} Hz",
            header.channels[idx].label.trim(),
            rate,
            fs
        ))));
    }

    let total_duration = header.block_duration * header.number_of_blocks;
    let data_matrix = reader.read_data_window(0, total_duration)?;
    let names = header
        .channels
        .iter()
        .map(|ch| ch.label.trim().to_string())
        .collect();
    let data = data_matrix
        .into_iter()
        .map(|channel| channel.into_iter().map(f64::from).collect())
        .collect();
    debug!(
        "loaded {} EDF channels at {} Hz from {}",
        header.channels.len(),
        fs,
        path.display()
    );
    Ok(BrainRecording::new(fs, names, data)?)
}

/// Load a CSV recording: one time column plus one column per channel.
///
/// Without `fs` the rate is inferred from the mean spacing of the time column.
pub fn read_eeg_csv(path: &Path, time_column: &str, fs: Option<f64>) -> Result<BrainRecording> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader.headers().context("reading header")?.clone();
    let time_idx = headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(time_column))
        .ok_or_else(|| anyhow!(VigilError::MissingField(time_column.to_string())))?;
    let channel_idx: Vec<usize> = (0..headers.len()).filter(|&i| i != time_idx).collect();
    let names: Vec<String> = channel_idx
        .iter()
        .map(|&i| headers[i].to_string())
        .collect();

    let mut times = Vec::new();
    let mut data = vec![Vec::new(); channel_idx.len()];
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("reading EEG row {}", row + 1))?;
        let field = |idx: usize| -> Result<f64> {
            record
                .get(idx)
                .ok_or_else(|| anyhow!("row {} is missing column {}", row + 1, &headers[idx]))?
                .parse::<f64>()
                .with_context(|| format!("parsing {} in row {}", &headers[idx], row + 1))
        };
        times.push(field(time_idx)?);
        for (channel, &idx) in data.iter_mut().zip(&channel_idx) {
            channel.push(field(idx)?);
        }
    }

    let fs = match fs {
        Some(fs) => fs,
        None => infer_rate(&times)?,
    };
    Ok(BrainRecording::new(fs, names, data)?.with_timestamps(times)?)
}

fn infer_rate(times: &[f64]) -> Result<f64> {
    let (first, last) = match (times.first(), times.last()) {
        (Some(first), Some(last)) if times.len() >= 2 => (*first, *last),
        _ => {
            return Err(anyhow!(VigilError::EmptySeries(
                "need at least two time stamps to infer a sampling rate".into()
            )))
        }
    };
    let step = (last - first) / (times.len() - 1) as f64;
    if !(step.is_finite() && step > 0.0) {
        return Err(anyhow!(VigilError::InvalidParameter(format!(
            "time column does not increase ({first} .. {last})"
        ))));
    }
    Ok(1.0 / step)
}

/// Write a recording as `time,<channel>...` with one row per sample.
pub fn write_eeg_csv(path: &Path, recording: &BrainRecording) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().from_writer(file);
    let mut header = vec!["time".to_string()];
    header.extend(recording.channel_names.iter().cloned());
    writer.write_record(&header)?;
    for (i, t) in recording.times().into_iter().enumerate() {
        let mut row = Vec::with_capacity(recording.channel_count() + 1);
        row.push(t.to_string());
        row.extend(recording.data.iter().map(|channel| channel[i].to_string()));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_data(name: &str) -> PathBuf {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        manifest_dir
            .parent()
            .and_then(|p| p.parent())
            .expect("workspace root")
            .join("test_data")
            .join(name)
    }

    #[test]
    fn reads_csv_and_infers_rate() {
        let rec = read_eeg_csv(&test_data("eeg_sample.csv"), "time", None).unwrap();
        assert_eq!(rec.channel_names, vec!["Fp1", "Fp2", "O1"]);
        assert_eq!(rec.sample_count(), 6);
        assert!((rec.fs - 250.0).abs() < 1e-9);
        assert_eq!(rec.timestamps.as_ref().map(Vec::len), Some(6));
        assert_eq!(rec.data[2][0], 12.5);
    }

    #[test]
    fn explicit_rate_wins() {
        let rec = read_eeg_csv(&test_data("eeg_sample.csv"), "TIME", Some(256.0)).unwrap();
        assert_eq!(rec.fs, 256.0);
    }

    #[test]
    fn missing_time_column() {
        let err = read_eeg_csv(&test_data("eeg_sample.csv"), "seconds", None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<VigilError>(),
            Some(&VigilError::MissingField("seconds".into()))
        );
    }

    #[test]
    fn written_recording_reads_back() {
        let rec = BrainRecording::new(
            4.0,
            vec!["C3".into(), "C4".into()],
            vec![vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.5]],
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eeg.csv");
        write_eeg_csv(&path, &rec).unwrap();
        let back = read_eeg_csv(&path, "time", None).unwrap();
        assert_eq!(back.channel_names, rec.channel_names);
        assert_eq!(back.data, rec.data);
        assert!((back.fs - 4.0).abs() < 1e-9);
    }

    #[test]
    fn missing_edf_file_is_an_error() {
        assert!(load_edf_recording(&test_data("does_not_exist.edf")).is_err());
    }
}
