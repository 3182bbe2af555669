use crate::error::VigilError;
use anyhow::{anyhow, Context, Result};
use std::path::Path;

/// Parse one value per line; blank lines and `#` comments are skipped.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let val: f64 = trimmed
            .parse()
            .with_context(|| format!("line {}: {:?} is not a number", idx + 1, trimmed))?;
        out.push(val);
    }
    if out.is_empty() {
        return Err(anyhow!(VigilError::EmptySeries("input has no samples".into())));
    }
    Ok(out)
}

pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_f64_series(&text)
}
