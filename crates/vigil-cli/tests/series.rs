use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::error::Error;
use std::path::PathBuf;

fn stdout_json(args: &[&str], stdin: &str) -> Result<Value, Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("vigil");
    cmd.args(args).write_stdin(stdin.to_string());
    let output = cmd.assert().success().get_output().stdout.clone();
    Ok(serde_json::from_slice(&output)?)
}

fn as_vec(value: &Value) -> Vec<f64> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}

#[test]
fn thresholds_from_stdin() -> Result<(), Box<dyn Error>> {
    let js = stdout_json(&["thresholds"], "1\n2\n3\n4\n5\n")?;
    let low = js["bounds"]["low"].as_f64().ok_or("low")?;
    let high = js["bounds"]["high"].as_f64().ok_or("high")?;
    assert!((low - 1.2).abs() < 1e-9);
    assert!((high - 4.8).abs() < 1e-9);
    assert_eq!(js["crossings"]["low_crossed"].as_bool(), Some(true));
    assert_eq!(js["crossings"]["high_crossed"].as_bool(), Some(true));
    Ok(())
}

#[test]
fn smooth_trailing_and_centered() -> Result<(), Box<dyn Error>> {
    let trailing = stdout_json(&["smooth", "--window", "2"], "1\n3\n5\n")?;
    assert_eq!(as_vec(&trailing), vec![1.0, 2.0, 4.0]);
    let centered = stdout_json(&["smooth", "--window", "3", "--centered"], "1\n3\n5\n")?;
    assert_eq!(as_vec(&centered), vec![2.0, 3.0, 4.0]);
    Ok(())
}

#[test]
fn smooth_rejects_zero_window() {
    let mut cmd = cargo_bin_cmd!("vigil");
    cmd.args(["smooth", "--window", "0"]).write_stdin("1\n2\n");
    cmd.assert().failure();
}

#[test]
fn filter_keeps_length_and_alpha_content() -> Result<(), Box<dyn Error>> {
    let fs = 250.0;
    let input: String = (0..500)
        .map(|i| {
            let t = i as f64 / fs;
            format!("{}\n", (2.0 * std::f64::consts::PI * 10.0 * t).sin())
        })
        .collect();
    let js = stdout_json(&["filter", "--fs", "250"], &input)?;
    let out = as_vec(&js);
    assert_eq!(out.len(), 500);
    let peak = out[200..300].iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    assert!(peak > 0.9 && peak < 1.1);
    Ok(())
}

#[test]
fn movement_counts_and_flows() -> Result<(), Box<dyn Error>> {
    let gaze = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .ok_or("workspace root")?
        .join("test_data/gaze_sample.csv");
    let mut cmd = cargo_bin_cmd!("vigil");
    cmd.args(["movement", "--gaze", gaze.to_str().ok_or("utf8 path")?]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let js: Value = serde_json::from_slice(&output)?;

    assert_eq!(js["counts"]["Fixation"].as_u64(), Some(3));
    assert_eq!(js["counts"]["Saccade"].as_u64(), Some(1));
    assert_eq!(js["counts"]["NotFound"].as_u64(), Some(1));
    assert_eq!(js["transitions"].as_u64(), Some(4));
    let flows = js["flows"].as_array().ok_or("flows")?;
    assert_eq!(flows.len(), 4);
    assert!(flows
        .iter()
        .any(|f| f["label"].as_str() == Some("Fixation → NotFound")));
    assert_eq!(js["colors"]["Saccade"].as_str(), Some("#d62728"));
    Ok(())
}

#[test]
fn movement_plot_is_written() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let plot = dir.path().join("gaze.png");
    let gaze = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .ok_or("workspace root")?
        .join("test_data/gaze_sample.csv");
    let mut cmd = cargo_bin_cmd!("vigil");
    cmd.args([
        "movement",
        "--gaze",
        gaze.to_str().ok_or("utf8 path")?,
        "--plot",
        plot.to_str().ok_or("utf8 path")?,
    ]);
    cmd.assert().success();
    assert!(std::fs::metadata(&plot)?.len() > 0);
    Ok(())
}
