//! Outlier count table with sparse storage.

use crate::data::naming::ColumnNaming;
use crate::data::table::{format_float, is_missing, read_table, tsv_writer};
use crate::error::{DevaError, Result};
use nalgebra::DMatrix;
use sprs::{CsMat, TriMat};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Outlier and not-outlier counts per (row, sample).
///
/// Rows are features (possibly aggregated), columns are samples. Both count
/// matrices are stored in CSR format; outlier counts are mostly zero.
#[derive(Debug, Clone)]
pub struct CountTable {
    /// Outlier counts (rows × samples)
    outliers: CsMat<u64>,
    /// Not-outlier counts (rows × samples)
    not_outliers: CsMat<u64>,
    /// Row identifiers
    row_ids: Vec<String>,
    /// Sample identifiers
    sample_ids: Vec<String>,
    /// Sample identifier -> column index
    sample_index: HashMap<String, usize>,
}

impl CountTable {
    /// Create a new CountTable from the two count matrices and identifiers.
    pub fn new(
        outliers: CsMat<u64>,
        not_outliers: CsMat<u64>,
        row_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let shape = (row_ids.len(), sample_ids.len());
        for mat in [&outliers, &not_outliers] {
            if mat.rows() != shape.0 {
                return Err(DevaError::DimensionMismatch {
                    expected: mat.rows(),
                    actual: shape.0,
                });
            }
            if mat.cols() != shape.1 {
                return Err(DevaError::DimensionMismatch {
                    expected: mat.cols(),
                    actual: shape.1,
                });
            }
        }
        let sample_index = sample_ids
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        Ok(Self {
            outliers: outliers.to_csr(),
            not_outliers: not_outliers.to_csr(),
            row_ids,
            sample_ids,
            sample_index,
        })
    }

    /// Build from (row, col, outliers, not_outliers) cells; absent cells are (0, 0).
    pub fn from_cells<I>(cells: I, row_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, u64, u64)>,
    {
        let shape = (row_ids.len(), sample_ids.len());
        let mut out_tri = TriMat::new(shape);
        let mut not_tri = TriMat::new(shape);
        for (row, col, n_out, n_not) in cells {
            if row >= shape.0 || col >= shape.1 {
                return Err(DevaError::DataShape(format!(
                    "Count cell ({}, {}) outside a {} x {} table",
                    row, col, shape.0, shape.1
                )));
            }
            if n_out > 0 {
                out_tri.add_triplet(row, col, n_out);
            }
            if n_not > 0 {
                not_tri.add_triplet(row, col, n_not);
            }
        }
        Self::new(out_tri.to_csr(), not_tri.to_csr(), row_ids, sample_ids)
    }

    /// Load a count table, recovering samples from `{sample}_outliers` /
    /// `{sample}_notOutliers` headers. Samples are sorted; missing cells count as 0.
    pub fn from_path<P: AsRef<Path>>(path: P, naming: &ColumnNaming) -> Result<Self> {
        let table = read_table(path)?;

        let mut samples: BTreeSet<&str> = BTreeSet::new();
        let mut column_map: HashMap<(&str, bool), usize> = HashMap::new();
        for (idx, column) in table.header.iter().enumerate() {
            if let Some((sample, is_outlier)) = naming.parse_count_column(column) {
                samples.insert(sample);
                column_map.insert((sample, is_outlier), idx);
            }
        }
        if samples.is_empty() {
            return Err(DevaError::DataShape(
                "No outlier count columns found in count table".to_string(),
            ));
        }
        let sample_ids: Vec<String> = samples.iter().map(|s| s.to_string()).collect();

        let mut column_pairs = Vec::with_capacity(sample_ids.len());
        for sample in &samples {
            let out_col = column_map.get(&(*sample, true));
            let not_col = column_map.get(&(*sample, false));
            match (out_col, not_col) {
                (Some(&o), Some(&n)) => column_pairs.push((o, n)),
                _ => {
                    return Err(DevaError::DataShape(format!(
                        "Sample '{}' lacks one of its outlier/not-outlier columns",
                        sample
                    )))
                }
            }
        }

        let mut cells = Vec::new();
        let mut row_ids = Vec::with_capacity(table.rows.len());
        for (row_idx, (row_id, raw)) in table.rows.iter().enumerate() {
            for (col_idx, &(o, n)) in column_pairs.iter().enumerate() {
                let n_out = parse_count(&raw[o], row_idx, o)?;
                let n_not = parse_count(&raw[n], row_idx, n)?;
                cells.push((row_idx, col_idx, n_out, n_not));
            }
            row_ids.push(row_id.clone());
        }

        Self::from_cells(cells, row_ids, sample_ids)
    }

    /// Write the count table as TSV with one outlier/not-outlier column pair per sample.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P, naming: &ColumnNaming) -> Result<()> {
        let mut writer = tsv_writer(path)?;
        let mut header = vec![String::new()];
        for sample in &self.sample_ids {
            header.push(naming.outlier_column(sample));
            header.push(naming.not_outlier_column(sample));
        }
        writer.write_record(&header)?;

        for (row, row_id) in self.row_ids.iter().enumerate() {
            let mut record = Vec::with_capacity(1 + 2 * self.n_samples());
            record.push(row_id.clone());
            for col in 0..self.n_samples() {
                record.push(self.outliers_at(row, col).to_string());
                record.push(self.not_outliers_at(row, col).to_string());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Outlier count at (row, col).
    #[inline]
    pub fn outliers_at(&self, row: usize, col: usize) -> u64 {
        self.outliers.get(row, col).copied().unwrap_or(0)
    }

    /// Not-outlier count at (row, col).
    #[inline]
    pub fn not_outliers_at(&self, row: usize, col: usize) -> u64 {
        self.not_outliers.get(row, col).copied().unwrap_or(0)
    }

    /// Number of non-missing values that contributed to (row, col).
    #[inline]
    pub fn total_at(&self, row: usize, col: usize) -> u64 {
        self.outliers_at(row, col) + self.not_outliers_at(row, col)
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.row_ids.len()
    }

    /// Number of samples.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Row identifiers.
    #[inline]
    pub fn row_ids(&self) -> &[String] {
        &self.row_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Check if a sample has count columns.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.sample_index.contains_key(sample_id)
    }

    /// Resolve sample identifiers to column indices, failing on unknown samples.
    pub fn sample_positions(&self, samples: &[String]) -> Result<Vec<usize>> {
        samples
            .iter()
            .map(|s| {
                self.sample_index.get(s).copied().ok_or_else(|| {
                    DevaError::SampleMismatch(format!("Sample '{}' not found in count table", s))
                })
            })
            .collect()
    }

    /// Summed (outliers, not_outliers) of a row over the given columns.
    pub fn group_sums(&self, row: usize, cols: &[usize]) -> (u64, u64) {
        cols.iter().fold((0, 0), |(o, n), &c| {
            (o + self.outliers_at(row, c), n + self.not_outliers_at(row, c))
        })
    }

    /// Number of the given columns with at least one outlier in a row.
    pub fn n_with_outliers(&self, row: usize, cols: &[usize]) -> usize {
        cols.iter().filter(|&&c| self.outliers_at(row, c) > 0).count()
    }

    /// Subset the table to include only specified rows (by index).
    pub fn subset_rows(&self, indices: &[usize]) -> Result<Self> {
        let mut cells = Vec::new();
        let mut new_row_ids = Vec::with_capacity(indices.len());
        for (new_row, &old_row) in indices.iter().enumerate() {
            if old_row >= self.n_rows() {
                return Err(DevaError::DataShape(format!(
                    "Row index {} out of bounds",
                    old_row
                )));
            }
            new_row_ids.push(self.row_ids[old_row].clone());
            for col in 0..self.n_samples() {
                cells.push((
                    new_row,
                    col,
                    self.outliers_at(old_row, col),
                    self.not_outliers_at(old_row, col),
                ));
            }
        }
        Self::from_cells(cells, new_row_ids, self.sample_ids.clone())
    }

    /// Fraction of outliers per (row, sample); NaN where no values contributed.
    pub fn fraction_table(&self) -> FractionTable {
        let mut data = DMatrix::from_element(self.n_rows(), self.n_samples(), f64::NAN);
        for row in 0..self.n_rows() {
            for col in 0..self.n_samples() {
                let total = self.total_at(row, col);
                if total > 0 {
                    data[(row, col)] = self.outliers_at(row, col) as f64 / total as f64;
                }
            }
        }
        FractionTable {
            data,
            row_ids: self.row_ids.clone(),
            sample_ids: self.sample_ids.clone(),
        }
    }
}

fn parse_count(raw: &str, row: usize, col: usize) -> Result<u64> {
    if is_missing(raw) {
        return Ok(0);
    }
    let invalid = || DevaError::InvalidValue {
        value: raw.to_string(),
        row,
        col,
    };
    let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
        return Err(invalid());
    }
    Ok(value as u64)
}

/// Fraction of outlier values per (row, sample), for visualization only.
#[derive(Debug, Clone)]
pub struct FractionTable {
    data: DMatrix<f64>,
    row_ids: Vec<String>,
    sample_ids: Vec<String>,
}

impl FractionTable {
    /// Fraction at (row, col); NaN when no values contributed.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Row identifiers.
    pub fn row_ids(&self) -> &[String] {
        &self.row_ids
    }

    /// Sample identifiers.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Write the fraction table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = tsv_writer(path)?;
        let mut header = vec![String::new()];
        header.extend(self.sample_ids.iter().cloned());
        writer.write_record(&header)?;

        for (row, row_id) in self.row_ids.iter().enumerate() {
            let mut record = vec![row_id.clone()];
            record.extend((0..self.sample_ids.len()).map(|col| format_float(self.get(row, col))));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}
