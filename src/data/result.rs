//! Result types for outlier enrichment comparisons.

use crate::data::naming::{ColumnNaming, ComparisonKey, StatKind};
use crate::data::table::{format_float, is_missing, read_table, tsv_writer};
use crate::error::{DevaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Per-row contingency counts and raw p-value from one directional test.
///
/// Group 0 is the group tested for enrichment, group 1 the outgroup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FisherRow {
    /// Row identifier.
    pub row_id: String,
    /// Summed outliers in group 0.
    pub outliers_0: u64,
    /// Summed outliers in group 1.
    pub outliers_1: u64,
    /// Summed not-outliers in group 0.
    pub not_outliers_0: u64,
    /// Summed not-outliers in group 1.
    pub not_outliers_1: u64,
    /// Two-sided Fisher exact p-value.
    pub p_value: f64,
}

/// Why a comparison (or one direction of it) produced no column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The annotation column does not hold exactly two values.
    NotTwoGroups { n_values: usize },
    /// A group has fewer than two samples present in the count table.
    TooFewSamples { group_label: String, n_samples: usize },
    /// No row passed the enrichment filters for this group.
    NoTestableRows { group_label: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotTwoGroups { n_values } => {
                write!(f, "{} distinct values, exactly 2 required", n_values)
            }
            SkipReason::TooFewSamples {
                group_label,
                n_samples,
            } => write!(
                f,
                "group {} has {} sample(s), at least 2 required",
                group_label, n_samples
            ),
            SkipReason::NoTestableRows { group_label } => {
                write!(f, "no rows tested for group {}", group_label)
            }
        }
    }
}

/// A comparison that was not (fully) tested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedComparison {
    pub comparison: String,
    pub reason: SkipReason,
}

/// Wide table of q-values: rows are features, one column per
/// (comparison, group label).
#[derive(Debug, Clone, Default)]
pub struct QValueTable {
    row_ids: Vec<String>,
    row_index: HashMap<String, usize>,
    columns: Vec<ComparisonKey>,
    /// Column-major values, NaN where a row was not tested.
    values: Vec<Vec<f64>>,
    comparisons: Vec<String>,
    skipped: Vec<SkippedComparison>,
    frac_filter: Option<f64>,
}

impl QValueTable {
    /// Create an empty table over the given rows.
    pub fn new(row_ids: Vec<String>, frac_filter: Option<f64>) -> Self {
        let row_index = row_ids
            .iter()
            .enumerate()
            .map(|(i, r)| (r.clone(), i))
            .collect();
        Self {
            row_ids,
            row_index,
            frac_filter,
            ..Default::default()
        }
    }

    /// Load a q-value table; every column must parse as a result column.
    pub fn from_path<P: AsRef<Path>>(path: P, naming: &ColumnNaming) -> Result<Self> {
        let table = read_table(path)?;
        let columns: Vec<ComparisonKey> = table
            .header
            .iter()
            .map(|c| {
                naming.parse(c).ok_or_else(|| {
                    DevaError::DataShape(format!("Column '{}' is not a q-value column", c))
                })
            })
            .collect::<Result<_>>()?;

        let mut result = Self::new(table.rows.iter().map(|(id, _)| id.clone()).collect(), None);
        for (col_idx, key) in columns.into_iter().enumerate() {
            let mut values = Vec::with_capacity(table.rows.len());
            for (row_idx, (_, cells)) in table.rows.iter().enumerate() {
                let raw = &cells[col_idx];
                let value = if is_missing(raw) {
                    f64::NAN
                } else {
                    raw.trim().parse().map_err(|_| DevaError::InvalidValue {
                        value: raw.clone(),
                        row: row_idx,
                        col: col_idx,
                    })?
                };
                values.push(value);
            }
            if !result.comparisons.contains(&key.comparison) {
                result.comparisons.push(key.comparison.clone());
            }
            result.columns.push(key);
            result.values.push(values);
        }
        Ok(result)
    }

    /// Outer-join a column of (row, value) pairs into the table.
    ///
    /// Rows not yet present are appended; rows absent from `entries` stay NaN.
    pub fn merge_column<I, S>(&mut self, key: ComparisonKey, entries: I)
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut column = vec![f64::NAN; self.row_ids.len()];
        for (row_id, value) in entries {
            let row = match self.row_index.get(row_id.as_ref()) {
                Some(&r) => r,
                None => {
                    let r = self.row_ids.len();
                    self.row_ids.push(row_id.as_ref().to_string());
                    self.row_index.insert(row_id.as_ref().to_string(), r);
                    for existing in self.values.iter_mut() {
                        existing.push(f64::NAN);
                    }
                    column.push(f64::NAN);
                    r
                }
            };
            column[row] = value;
        }
        if let Some(pos) = self.columns.iter().position(|k| *k == key) {
            self.values[pos] = column;
        } else {
            self.columns.push(key);
            self.values.push(column);
        }
    }

    /// Record that a comparison was evaluated.
    pub fn record_comparison(&mut self, comparison: &str) {
        if !self.comparisons.iter().any(|c| c == comparison) {
            self.comparisons.push(comparison.to_string());
        }
    }

    /// Record a skipped comparison or direction.
    pub fn record_skip(&mut self, comparison: &str, reason: SkipReason) {
        self.skipped.push(SkippedComparison {
            comparison: comparison.to_string(),
            reason,
        });
    }

    /// Drop rows that are NaN in every column.
    pub fn drop_untested_rows(&mut self) {
        let keep: Vec<usize> = (0..self.row_ids.len())
            .filter(|&r| self.values.iter().any(|col| !col[r].is_nan()))
            .collect();
        self.row_ids = keep.iter().map(|&r| self.row_ids[r].clone()).collect();
        for col in self.values.iter_mut() {
            *col = keep.iter().map(|&r| col[r]).collect();
        }
        self.row_index = self
            .row_ids
            .iter()
            .enumerate()
            .map(|(i, r)| (r.clone(), i))
            .collect();
    }

    /// Row identifiers.
    pub fn row_ids(&self) -> &[String] {
        &self.row_ids
    }

    /// Column keys in insertion order.
    pub fn columns(&self) -> &[ComparisonKey] {
        &self.columns
    }

    /// Comparisons evaluated to build this table.
    pub fn comparisons(&self) -> &[String] {
        &self.comparisons
    }

    /// Comparisons or directions that produced no column.
    pub fn skipped(&self) -> &[SkippedComparison] {
        &self.skipped
    }

    /// Fraction filter used for the comparisons.
    pub fn frac_filter(&self) -> Option<f64> {
        self.frac_filter
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.row_ids.len()
    }

    /// Values of one column, aligned with `row_ids()`.
    pub fn column(&self, key: &ComparisonKey) -> Option<&[f64]> {
        let pos = self.columns.iter().position(|k| k == key)?;
        Some(&self.values[pos])
    }

    /// Value for a row and column; NaN when the row was not tested.
    pub fn get(&self, row_id: &str, key: &ComparisonKey) -> Option<f64> {
        let row = *self.row_index.get(row_id)?;
        self.column(key).map(|col| col[row])
    }

    /// Rows with a value strictly below `fdr` in the given column.
    pub fn significant(&self, key: &ComparisonKey, fdr: f64) -> Vec<&str> {
        match self.column(key) {
            Some(col) => self
                .row_ids
                .iter()
                .zip(col)
                .filter(|(_, &q)| q < fdr)
                .map(|(r, _)| r.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of significant rows per column at `fdr`.
    pub fn n_significant(&self, fdr: f64) -> Vec<(ComparisonKey, usize)> {
        self.columns
            .iter()
            .map(|k| (k.clone(), self.significant(k, fdr).len()))
            .collect()
    }

    /// Write one significant-row list per column.
    ///
    /// Files are named `{prefix}.{column}.sig_genes.fdr{fdr}.txt`. When
    /// `comparisons` is given, only columns of those comparisons are written.
    pub fn write_gene_lists(
        &self,
        fdr: f64,
        prefix: &str,
        comparisons: Option<&[String]>,
        naming: &ColumnNaming,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for key in &self.columns {
            if let Some(subset) = comparisons {
                if !subset.iter().any(|c| *c == key.comparison) {
                    continue;
                }
            }
            let path = PathBuf::from(format!(
                "{}.{}.sig_genes.fdr{}.txt",
                prefix,
                naming.format(key),
                fdr
            ));
            write_list(&path, self.significant(key, fdr))?;
            written.push(path);
        }
        Ok(written)
    }

    /// Signed log10 q-values, one column per comparison.
    ///
    /// For groups (a, b) in column order the value is
    /// `log10(q_a) - log10(q_b)`, a missing side contributing 0 and both
    /// missing giving NaN; positive values favour `b`, and the column is
    /// named `{comparison}_{b}`. A comparison with one column gives
    /// `-log10(q)` named after that group.
    pub fn signed_log_qvalues(&self) -> Vec<(String, Vec<f64>)> {
        let mut by_comparison: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, key) in self.columns.iter().enumerate() {
            if key.stat_kind == StatKind::FisherFdr {
                by_comparison.entry(key.comparison.as_str()).or_default().push(i);
            }
        }

        let mut signed = Vec::new();
        for (comparison, cols) in by_comparison {
            match cols.as_slice() {
                [only] => {
                    // -log10(q) rather than raw q, so the sign reads the same
                    // as the two-column case: positive means this group.
                    let name = format!("{}_{}", comparison, self.columns[*only].group_label);
                    let values = self.values[*only].iter().map(|q| -q.log10()).collect();
                    signed.push((name, values));
                }
                [a, b] => {
                    let name = format!("{}_{}", comparison, self.columns[*b].group_label);
                    let values = self.values[*a]
                        .iter()
                        .zip(&self.values[*b])
                        .map(|(&qa, &qb)| match (qa.is_nan(), qb.is_nan()) {
                            (true, true) => f64::NAN,
                            (false, true) => qa.log10(),
                            (true, false) => -qb.log10(),
                            (false, false) => qa.log10() - qb.log10(),
                        })
                        .collect();
                    signed.push((name, values));
                }
                _ => {
                    log::warn!(
                        "Excluding {}: {} columns are associated with it, need 1 or 2",
                        comparison,
                        cols.len()
                    );
                }
            }
        }
        signed
    }

    /// Write signed log10 q-values to a TSV file.
    pub fn signed_log_qvalues_to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let signed = self.signed_log_qvalues();
        let mut writer = tsv_writer(path)?;
        let mut header = vec![String::new()];
        header.extend(signed.iter().map(|(name, _)| name.clone()));
        writer.write_record(&header)?;
        for (row, row_id) in self.row_ids.iter().enumerate() {
            let mut record = vec![row_id.clone()];
            record.extend(signed.iter().map(|(_, values)| format_float(values[row])));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the q-value table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P, naming: &ColumnNaming) -> Result<()> {
        let mut writer = tsv_writer(path)?;
        let mut header = vec![String::new()];
        header.extend(self.columns.iter().map(|k| naming.format(k)));
        writer.write_record(&header)?;

        for (row, row_id) in self.row_ids.iter().enumerate() {
            let mut record = vec![row_id.clone()];
            record.extend(self.values.iter().map(|col| format_float(col[row])));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Both directions of one comparison, for per-comparison summary tables.
#[derive(Debug, Clone)]
pub struct ComparisonSummary {
    pub comparison: String,
    pub label0: String,
    pub label1: String,
    /// Rows tested for `label0` enrichment.
    pub rows0: Vec<FisherRow>,
    /// Rows tested for `label1` enrichment.
    pub rows1: Vec<FisherRow>,
}

impl ComparisonSummary {
    /// Whether neither direction tested any row.
    pub fn is_empty(&self) -> bool {
        self.rows0.is_empty() && self.rows1.is_empty()
    }

    /// Write counts, p-values and q-values of both directions, rows sorted.
    pub fn to_tsv<P: AsRef<Path>>(
        &self,
        path: P,
        qvalues: &QValueTable,
        naming: &ColumnNaming,
    ) -> Result<()> {
        let labels = [self.label0.as_str(), self.label1.as_str()];
        let kinds = [
            StatKind::OutlierCount,
            StatKind::NotOutlierCount,
            StatKind::FisherP,
            StatKind::FisherFdr,
        ];
        let keys: Vec<ComparisonKey> = kinds
            .iter()
            .flat_map(|&kind| {
                labels
                    .iter()
                    .map(move |label| ComparisonKey::new(&self.comparison, label, kind))
            })
            .collect();

        // Each row maps to [out_0, out_1, not_0, not_1, p_0, p_1] in label order
        let mut rows: BTreeMap<&str, [f64; 6]> = BTreeMap::new();
        for (direction, fisher_rows) in [&self.rows0, &self.rows1].into_iter().enumerate() {
            for r in fisher_rows {
                let entry = rows.entry(r.row_id.as_str()).or_insert([f64::NAN; 6]);
                let (own, other) = if direction == 0 { (0, 1) } else { (1, 0) };
                entry[own] = r.outliers_0 as f64;
                entry[other] = r.outliers_1 as f64;
                entry[2 + own] = r.not_outliers_0 as f64;
                entry[2 + other] = r.not_outliers_1 as f64;
                entry[4 + own] = r.p_value;
            }
        }

        let mut writer = tsv_writer(path)?;
        let mut header = vec![String::new()];
        header.extend(keys.iter().map(|k| naming.format(k)));
        writer.write_record(&header)?;
        for (row_id, stats) in rows {
            let mut record = vec![row_id.to_string()];
            record.extend(stats.iter().map(|&v| format_float(v)));
            for key in &keys[6..] {
                let q = qvalues.get(row_id, key).unwrap_or(f64::NAN);
                record.push(format_float(q));
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Write one value per line.
pub fn write_list<P, I, S>(path: P, items: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: fmt::Display,
{
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        writeln!(writer, "{}", item)?;
    }
    writer.flush()?;
    Ok(())
}
