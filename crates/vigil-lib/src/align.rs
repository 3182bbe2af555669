//! Resampling two independently sampled tables onto one shared time grid.

use crate::error::{Result, VigilError};
use log::debug;
use serde::{Deserialize, Serialize};

/// Time vector plus one or more value columns of equal length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledTable {
    pub time: Vec<f64>,
    pub columns: Vec<Vec<f64>>,
}

impl SampledTable {
    pub fn new(time: Vec<f64>, columns: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(col) = columns.iter().find(|c| c.len() != time.len()) {
            return Err(VigilError::InvalidParameter(format!(
                "column of {} values against {} time stamps",
                col.len(),
                time.len()
            )));
        }
        if time.iter().any(|t| !t.is_finite()) {
            return Err(VigilError::InvalidParameter(
                "time stamps must be finite".into(),
            ));
        }
        if time.windows(2).any(|w| w[1] < w[0]) {
            return Err(VigilError::InvalidParameter(
                "time stamps must be non-decreasing".into(),
            ));
        }
        Ok(Self { time, columns })
    }

    pub fn single(time: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        Self::new(time, vec![values])
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// First and last time stamp.
    pub fn span(&self) -> Option<(f64, f64)> {
        Some((*self.time.first()?, *self.time.last()?))
    }
}

/// Both tables resampled onto `time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    pub time: Vec<f64>,
    pub a: Vec<Vec<f64>>,
    pub b: Vec<Vec<f64>>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Sampling rate of the common grid, `None` when it has no extent.
    pub fn effective_rate(&self) -> Option<f64> {
        let n = self.time.len();
        if n < 2 {
            return None;
        }
        let span = self.time[n - 1] - self.time[0];
        (span > 0.0).then(|| (n - 1) as f64 / span)
    }
}

/// Intersection of the two tables' time domains.
pub fn overlap(a: &SampledTable, b: &SampledTable) -> Result<(f64, f64)> {
    let ((a0, a1), (b0, b1)) = match (a.span(), b.span()) {
        (Some(sa), Some(sb)) => (sa, sb),
        _ => {
            return Err(VigilError::NoOverlap(
                "one of the series has no samples".into(),
            ))
        }
    };
    let start = a0.max(b0);
    let end = a1.min(b1);
    if start > end {
        return Err(VigilError::NoOverlap(format!(
            "[{a0}, {a1}] and [{b0}, {b1}] are disjoint"
        )));
    }
    Ok((start, end))
}

/// `n` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Linear interpolation of `(time, values)` at each query time.
///
/// Non-finite values are skipped so gaps are bridged; queries outside the
/// finite support take the nearest finite sample.
pub fn interp_linear(time: &[f64], values: &[f64], queries: &[f64]) -> Vec<f64> {
    let points: Vec<(f64, f64)> = time
        .iter()
        .zip(values)
        .filter(|(_, v)| v.is_finite())
        .map(|(t, v)| (*t, *v))
        .collect();
    let (first, last) = match (points.first(), points.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return vec![f64::NAN; queries.len()],
    };

    let mut out = Vec::with_capacity(queries.len());
    let mut idx = 0;
    for &q in queries {
        if q <= first.0 {
            out.push(first.1);
            continue;
        }
        if q >= last.0 {
            out.push(last.1);
            continue;
        }
        // Queries are usually sorted; restart the scan when they are not.
        if points[idx].0 > q {
            idx = 0;
        }
        while idx + 1 < points.len() && points[idx + 1].0 <= q {
            idx += 1;
        }
        let (t0, v0) = points[idx];
        let (t1, v1) = points[(idx + 1).min(points.len() - 1)];
        let value = if t1 > t0 {
            v0 + (v1 - v0) * (q - t0) / (t1 - t0)
        } else {
            v0
        };
        out.push(value);
    }
    out
}

/// Resample both tables onto a grid of `a.len()` points spanning their overlap.
pub fn align(a: &SampledTable, b: &SampledTable) -> Result<AlignedSeries> {
    let (start, end) = overlap(a, b)?;
    let time = linspace(start, end, a.len());
    debug!(
        "aligning {} x {} onto {} points over [{start}, {end}]",
        a.len(),
        b.len(),
        time.len()
    );
    let resample = |table: &SampledTable| -> Vec<Vec<f64>> {
        table
            .columns
            .iter()
            .map(|col| interp_linear(&table.time, col, &time))
            .collect()
    };
    let a_cols = resample(a);
    let b_cols = resample(b);
    Ok(AlignedSeries {
        time,
        a: a_cols,
        b: b_cols,
    })
}

/// Scalar convenience over [`align`]: returns `(a', b', common_time)`.
pub fn align_series(
    time_a: &[f64],
    a: &[f64],
    time_b: &[f64],
    b: &[f64],
) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    let ta = SampledTable::single(time_a.to_vec(), a.to_vec())?;
    let tb = SampledTable::single(time_b.to_vec(), b.to_vec())?;
    let mut aligned = align(&ta, &tb)?;
    let b_out = aligned.b.pop().unwrap_or_default();
    let a_out = aligned.a.pop().unwrap_or_default();
    Ok((a_out, b_out, aligned.time))
}
