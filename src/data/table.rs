//! Shared helpers for delimited text tables.

use crate::error::{DevaError, Result};
use std::fs::File;
use std::path::Path;

/// Tokens read as a missing value.
const MISSING_TOKENS: [&str; 7] = ["", "NA", "na", "NaN", "nan", "null", "None"];

/// A raw table: header cells after the index column, and rows of
/// (row identifier, cells).
pub(crate) struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<(String, Vec<String>)>,
}

/// Pick the field delimiter from the file extension.
pub(crate) fn delimiter_for(path: &Path) -> Result<u8> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => Ok(b','),
        Some("tsv") | Some("txt") => Ok(b'\t'),
        _ => Err(DevaError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Check whether a raw cell denotes a missing value.
pub(crate) fn is_missing(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw.trim())
}

/// Read a table whose first column holds row identifiers.
///
/// Rows shorter than the header are padded with empty (missing) cells.
/// Rows with an empty identifier are skipped with a warning; non-empty cells
/// beyond the header are a `DataShape` error.
pub(crate) fn read_table<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let delimiter = delimiter_for(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let header_record = reader.headers()?.clone();
    if header_record.len() < 2 {
        return Err(DevaError::EmptyData(format!(
            "{} must have an identifier column and at least one data column",
            path.display()
        )));
    }
    let header: Vec<String> = header_record
        .iter()
        .skip(1)
        .map(|s| s.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // Line 1 is the header
        let line = i + 2;
        let mut fields = record.iter();
        let row_id = match fields.next() {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => {
                log::warn!(
                    "Skipping line {} of {}: empty row identifier",
                    line,
                    path.display()
                );
                continue;
            }
        };
        let mut cells: Vec<String> = fields.map(|s| s.to_string()).collect();
        if cells[header.len().min(cells.len())..]
            .iter()
            .any(|c| !c.trim().is_empty())
        {
            return Err(DevaError::DataShape(format!(
                "Line {} of {} has {} data cells but the header has {}",
                line,
                path.display(),
                cells.len(),
                header.len()
            )));
        }
        // Short rows are padded with missing cells; trailing empty cells dropped
        cells.resize(header.len(), String::new());
        rows.push((row_id, cells));
    }

    Ok(RawTable { header, rows })
}

/// Open a tab-separated writer.
pub(crate) fn tsv_writer<P: AsRef<Path>>(path: P) -> Result<csv::Writer<File>> {
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?)
}

/// Format a float cell, writing NaN as an empty cell.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}
