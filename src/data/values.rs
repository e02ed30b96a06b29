//! Dense values matrix for quantitative profiling data.

use crate::data::table::{format_float, is_missing, read_table, tsv_writer};
use crate::error::{DevaError, Result};
use nalgebra::DMatrix;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A dense matrix of measurements with missing values.
///
/// Rows represent features (sites/genes), columns represent samples.
/// Missing values are stored as NaN.
#[derive(Debug, Clone)]
pub struct ValuesMatrix {
    /// Dense matrix (features × samples)
    data: DMatrix<f64>,
    /// Feature identifiers (row names)
    feature_ids: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
    /// Sample identifier -> column index
    sample_index: HashMap<String, usize>,
}

impl ValuesMatrix {
    /// Create a new ValuesMatrix from a dense matrix and identifiers.
    pub fn new(data: DMatrix<f64>, feature_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != feature_ids.len() {
            return Err(DevaError::DimensionMismatch {
                expected: nrows,
                actual: feature_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(DevaError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        ensure_unique(&feature_ids, "feature")?;
        ensure_unique(&sample_ids, "sample")?;

        let sample_index = sample_ids
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        Ok(Self {
            data,
            feature_ids,
            sample_ids,
            sample_index,
        })
    }

    /// Build from row-major values, `None` meaning missing.
    pub fn from_rows(
        rows: Vec<Vec<Option<f64>>>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let n_samples = sample_ids.len();
        let mut data = DMatrix::from_element(rows.len(), n_samples, f64::NAN);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != n_samples {
                return Err(DevaError::DimensionMismatch {
                    expected: n_samples,
                    actual: row.len(),
                });
            }
            for (c, value) in row.iter().enumerate() {
                data[(r, c)] = value.unwrap_or(f64::NAN);
            }
        }
        Self::new(data, feature_ids, sample_ids)
    }

    /// Load a values table from a `.tsv`/`.csv` file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first cell is the identifier header, may be empty)
    /// - Subsequent rows: feature ID followed by values; missing tokens become NaN
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let table = read_table(path)?;
        if table.rows.is_empty() {
            return Err(DevaError::EmptyData("No features in values table".to_string()));
        }

        let n_samples = table.header.len();
        let mut data = DMatrix::from_element(table.rows.len(), n_samples, f64::NAN);
        let mut feature_ids = Vec::with_capacity(table.rows.len());

        for (row_idx, (feature_id, cells)) in table.rows.into_iter().enumerate() {
            for (col_idx, raw) in cells.iter().enumerate().take(n_samples) {
                if is_missing(raw) {
                    continue;
                }
                let value: f64 = raw.trim().parse().map_err(|_| DevaError::InvalidValue {
                    value: raw.clone(),
                    row: row_idx,
                    col: col_idx,
                })?;
                data[(row_idx, col_idx)] = value;
            }
            feature_ids.push(feature_id);
        }

        Self::new(data, feature_ids, table.header)
    }

    /// Write the values matrix to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = tsv_writer(path)?;
        let mut header = vec![String::new()];
        header.extend(self.sample_ids.iter().cloned());
        writer.write_record(&header)?;

        for (row, feature_id) in self.feature_ids.iter().enumerate() {
            let mut record = vec![feature_id.clone()];
            record.extend((0..self.n_samples()).map(|col| format_float(self.get(row, col))));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Get the value at (row, col); NaN when missing.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Number of features (rows).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Feature identifiers.
    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column index of a sample.
    pub fn sample_position(&self, sample_id: &str) -> Option<usize> {
        self.sample_index.get(sample_id).copied()
    }

    /// Resolve sample identifiers to column indices, failing on unknown samples.
    pub fn sample_positions(&self, samples: &[String]) -> Result<Vec<usize>> {
        samples
            .iter()
            .map(|s| {
                self.sample_position(s).ok_or_else(|| {
                    DevaError::SampleMismatch(format!("Sample '{}' not found in values table", s))
                })
            })
            .collect()
    }

    /// Values of one row restricted to the given column indices.
    pub fn row_values(&self, row: usize, cols: &[usize]) -> Vec<f64> {
        cols.iter().map(|&c| self.data[(row, c)]).collect()
    }

    /// Number of missing cells.
    pub fn n_missing(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }
}

fn ensure_unique(ids: &[String], what: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(DevaError::DataShape(format!(
                "Duplicate {} identifier '{}'",
                what, id
            )));
        }
    }
    Ok(())
}
