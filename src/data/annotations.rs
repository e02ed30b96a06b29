//! Sample annotations and two-group resolution.

use crate::data::table::{is_missing, read_table, tsv_writer};
use crate::error::{DevaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Prefix of the outgroup label produced by binarization.
const OUTGROUP_PREFIX: &str = "not-";

/// A categorical annotation value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Annotation {
    /// Category label.
    Value(String),
    /// Missing value.
    Missing,
}

impl Annotation {
    /// Parse a raw cell, mapping missing tokens to `Missing`.
    pub fn parse(raw: &str) -> Self {
        if is_missing(raw) {
            Annotation::Missing
        } else {
            Annotation::Value(raw.trim().to_string())
        }
    }

    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Annotation::Missing)
    }

    /// Try to get the category label.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Annotation::Value(s) => Some(s),
            Annotation::Missing => None,
        }
    }
}

/// Two sample groups resolved from one annotation column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleGroups {
    /// Annotation column the groups come from.
    pub comparison: String,
    /// Label of the more frequent value.
    pub label0: String,
    /// Samples carrying `label0`, in table order.
    pub group0: Vec<String>,
    /// Label of the less frequent value.
    pub label1: String,
    /// Samples carrying `label1`, in table order.
    pub group1: Vec<String>,
}

impl SampleGroups {
    /// Keep only samples accepted by `keep`, returning the dropped ones.
    pub fn retain_samples<F>(&mut self, keep: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let mut dropped = Vec::new();
        for group in [&mut self.group0, &mut self.group1] {
            group.retain(|s| {
                let ok = keep(s.as_str());
                if !ok {
                    dropped.push(s.clone());
                }
                ok
            });
        }
        dropped
    }
}

/// Sample annotations: rows are samples, columns are categorical labels.
#[derive(Debug, Clone)]
pub struct AnnotationTable {
    /// Sample IDs in order.
    sample_ids: Vec<String>,
    /// Column names.
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> Annotation.
    data: HashMap<String, HashMap<String, Annotation>>,
}

impl AnnotationTable {
    /// Create an annotation table from row-major cells (`None` meaning missing).
    pub fn new(
        sample_ids: Vec<String>,
        column_names: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    ) -> Result<Self> {
        if rows.len() != sample_ids.len() {
            return Err(DevaError::DimensionMismatch {
                expected: sample_ids.len(),
                actual: rows.len(),
            });
        }
        let mut data = HashMap::with_capacity(sample_ids.len());
        for (sample_id, row) in sample_ids.iter().zip(rows) {
            if row.len() != column_names.len() {
                return Err(DevaError::DimensionMismatch {
                    expected: column_names.len(),
                    actual: row.len(),
                });
            }
            let sample_data: HashMap<String, Annotation> = column_names
                .iter()
                .cloned()
                .zip(row.into_iter().map(|cell| match cell {
                    Some(v) => Annotation::parse(&v),
                    None => Annotation::Missing,
                }))
                .collect();
            if data.insert(sample_id.clone(), sample_data).is_some() {
                return Err(DevaError::DataShape(format!(
                    "Duplicate sample identifier '{}' in annotations",
                    sample_id
                )));
            }
        }
        Ok(Self {
            sample_ids,
            column_names,
            data,
        })
    }

    /// Load annotations from a `.tsv`/`.csv` file.
    ///
    /// Expected format:
    /// - First row: header with column names (first column is sample ID)
    /// - Subsequent rows: sample ID followed by annotation values
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let table = read_table(path)?;
        if table.rows.is_empty() {
            return Err(DevaError::EmptyData("No samples in annotations".to_string()));
        }
        let (sample_ids, rows): (Vec<String>, Vec<Vec<Option<String>>>) = table
            .rows
            .into_iter()
            .map(|(id, cells)| (id, cells.into_iter().map(Some).collect()))
            .unzip();
        Self::new(sample_ids, table.header, rows)
    }

    /// Write the annotations to a TSV file; missing values are written empty.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = tsv_writer(path)?;
        let mut header = vec![String::new()];
        header.extend(self.column_names.iter().cloned());
        writer.write_record(&header)?;

        for sample_id in &self.sample_ids {
            let mut record = vec![sample_id.clone()];
            for column in &self.column_names {
                let cell = self
                    .get(sample_id, column)
                    .and_then(Annotation::as_str)
                    .unwrap_or("");
                record.push(cell.to_string());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Number of annotation columns.
    pub fn n_columns(&self) -> usize {
        self.column_names.len()
    }

    /// Get the annotation for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Annotation> {
        self.data.get(sample_id).and_then(|m| m.get(column))
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Get all values for a column, in sample order.
    pub fn column(&self, column: &str) -> Result<Vec<&Annotation>> {
        if !self.has_column(column) {
            return Err(DevaError::MissingColumn(column.to_string()));
        }
        Ok(self
            .sample_ids
            .iter()
            .map(|sid| {
                self.data
                    .get(sid)
                    .and_then(|m| m.get(column))
                    .unwrap_or(&Annotation::Missing)
            })
            .collect())
    }

    /// Count non-missing values of a column.
    ///
    /// Ordered by descending count; ties keep first-appearance order.
    pub fn value_counts(&self, column: &str) -> Result<Vec<(String, usize)>> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for value in self.column(column)?.into_iter().filter_map(Annotation::as_str) {
            match counts.iter_mut().find(|(v, _)| v == value) {
                Some((_, n)) => *n += 1,
                None => counts.push((value.to_string(), 1)),
            }
        }
        // sort_by is stable, so equal counts keep first-appearance order
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(counts)
    }

    /// Samples whose value in `column` equals `label`, in table order.
    pub fn samples_with(&self, column: &str, label: &str) -> Result<Vec<String>> {
        Ok(self
            .sample_ids
            .iter()
            .zip(self.column(column)?)
            .filter(|(_, v)| v.as_str() == Some(label))
            .map(|(s, _)| s.clone())
            .collect())
    }

    /// Expand annotations so that every column has exactly two values.
    ///
    /// Two-valued columns are kept as they are. A column with more values
    /// yields one `{column}_{value}` column per value, holding the value or
    /// `not-{value}`; underscores in values become `-`. Columns with fewer
    /// than two values are dropped. Missing values stay missing.
    pub fn binarize(&self) -> Result<Self> {
        let mut column_names = Vec::new();
        let mut new_columns: Vec<Vec<Annotation>> = Vec::new();

        for column in &self.column_names {
            let levels = self.value_counts(column)?;
            let values = self.column(column)?;
            match levels.len() {
                0 | 1 => continue,
                2 => {
                    column_names.push(column.clone());
                    new_columns.push(values.into_iter().cloned().collect());
                }
                _ => {
                    for (level, _) in &levels {
                        let label = level.replace('_', "-");
                        column_names.push(format!("{}_{}", column, label));
                        new_columns.push(
                            values
                                .iter()
                                .map(|v| match v.as_str() {
                                    None => Annotation::Missing,
                                    Some(s) if s == level => Annotation::Value(label.clone()),
                                    Some(_) => {
                                        Annotation::Value(format!("{}{}", OUTGROUP_PREFIX, label))
                                    }
                                })
                                .collect(),
                        );
                    }
                }
            }
        }

        let data = self
            .sample_ids
            .iter()
            .enumerate()
            .map(|(i, sid)| {
                let sample_data = column_names
                    .iter()
                    .cloned()
                    .zip(new_columns.iter().map(|col| col[i].clone()))
                    .collect();
                (sid.clone(), sample_data)
            })
            .collect();

        Ok(Self {
            sample_ids: self.sample_ids.clone(),
            column_names,
            data,
        })
    }
}

/// Partition samples into two groups using one annotation column.
///
/// Returns `Ok(None)` when the column does not hold exactly two distinct
/// non-missing values; this is a skip signal, not an error. `label0` is the
/// more frequent value (ties: the value appearing first in the table).
pub fn resolve_groups(annotations: &AnnotationTable, column: &str) -> Result<Option<SampleGroups>> {
    let levels = annotations.value_counts(column)?;
    if levels.len() != 2 {
        return Ok(None);
    }
    let label0 = levels[0].0.clone();
    let label1 = levels[1].0.clone();
    let group0 = annotations.samples_with(column, &label0)?;
    let group1 = annotations.samples_with(column, &label1)?;

    Ok(Some(SampleGroups {
        comparison: column.to_string(),
        label0,
        group0,
        label1,
        group1,
    }))
}
