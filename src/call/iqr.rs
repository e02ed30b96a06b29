//! Outlier calling against a per-row median ± k·IQR threshold.
//!
//! For each row the median and interquartile range are computed over the
//! reference samples, ignoring missing values. A value is an outlier when it
//! is strictly above `median + k·IQR` (up) or strictly below
//! `median - k·IQR` (down). Missing values stay missing.
//!
//! Quantiles use linear interpolation between closest ranks, so for
//! `[1, 2, 3, 100]` the quartiles are 1.75 and 27.25.

use crate::data::ValuesMatrix;
use crate::error::{DevaError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which tail of the row distribution counts as an outlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Above the median.
    #[default]
    Up,
    /// Below the median.
    Down,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = DevaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(DevaError::config(
                "direction",
                format!("'{}' is not one of up, down", s),
            )),
        }
    }
}

/// Robust statistics of one row over the reference samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowThreshold {
    pub median: f64,
    pub iqr: f64,
    /// `median ± k·IQR`, NaN when the row has no reference values.
    pub bound: f64,
}

/// Ternary outlier calls: `Some(true)` outlier, `Some(false)` not, `None` missing.
#[derive(Debug, Clone)]
pub struct OutlierMatrix {
    calls: DMatrix<Option<bool>>,
    feature_ids: Vec<String>,
    sample_ids: Vec<String>,
    thresholds: Vec<RowThreshold>,
    direction: Direction,
    iqrs: f64,
}

impl OutlierMatrix {
    /// Call at (row, col).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<bool> {
        self.calls[(row, col)]
    }

    /// Number of rows.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.calls.nrows()
    }

    /// Number of samples.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.calls.ncols()
    }

    /// Feature identifiers.
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Samples the calls were made for.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Per-row median, IQR and bound.
    pub fn thresholds(&self) -> &[RowThreshold] {
        &self.thresholds
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// IQR multiplier used for the calls.
    pub fn iqrs(&self) -> f64 {
        self.iqrs
    }

    /// Total number of outlier calls.
    pub fn n_outliers(&self) -> usize {
        self.calls.iter().filter(|c| **c == Some(true)).count()
    }
}

/// Call outliers in `values` relative to the distribution over `samples`.
///
/// # Arguments
/// * `values` - Values matrix (features × samples)
/// * `samples` - Reference samples; also the columns of the output
/// * `iqrs` - IQR multiplier, must be positive
/// * `direction` - Whether to call values above or below the median
///
/// # Errors
/// `Configuration` if `iqrs` is not positive, `EmptyData` if `samples` is
/// empty, `SampleMismatch` if a sample is not in `values`.
pub fn call_outliers(
    values: &ValuesMatrix,
    samples: &[String],
    iqrs: f64,
    direction: Direction,
) -> Result<OutlierMatrix> {
    if !(iqrs > 0.0) || !iqrs.is_finite() {
        return Err(DevaError::config(
            "iqrs",
            format!("must be a positive number, got {}", iqrs),
        ));
    }
    if samples.is_empty() {
        return Err(DevaError::EmptyData(
            "No samples to call outliers on".to_string(),
        ));
    }
    let cols = values.sample_positions(samples)?;

    let rows: Vec<(RowThreshold, Vec<Option<bool>>)> = (0..values.n_features())
        .into_par_iter()
        .map(|row| call_row(&values.row_values(row, &cols), iqrs, direction))
        .collect();

    let n_rows = rows.len();
    let mut calls = DMatrix::from_element(n_rows, cols.len(), None);
    let mut thresholds = Vec::with_capacity(n_rows);
    for (r, (threshold, row_calls)) in rows.into_iter().enumerate() {
        for (c, call) in row_calls.into_iter().enumerate() {
            calls[(r, c)] = call;
        }
        thresholds.push(threshold);
    }

    Ok(OutlierMatrix {
        calls,
        feature_ids: values.feature_ids().to_vec(),
        sample_ids: samples.to_vec(),
        thresholds,
        direction,
        iqrs,
    })
}

fn call_row(row: &[f64], iqrs: f64, direction: Direction) -> (RowThreshold, Vec<Option<bool>>) {
    let mut present: Vec<f64> = row.iter().copied().filter(|v| !v.is_nan()).collect();
    present.sort_by(|a, b| a.total_cmp(b));

    let median = quantile_sorted(&present, 0.5);
    let iqr = quantile_sorted(&present, 0.75) - quantile_sorted(&present, 0.25);
    let bound = match direction {
        Direction::Up => median + iqrs * iqr,
        Direction::Down => median - iqrs * iqr,
    };

    let calls = row
        .iter()
        .map(|&v| {
            if v.is_nan() {
                None
            } else {
                Some(match direction {
                    Direction::Up => v > bound,
                    Direction::Down => v < bound,
                })
            }
        })
        .collect();

    (RowThreshold { median, iqr, bound }, calls)
}

/// Quantile of sorted values by linear interpolation; NaN when empty.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}
