//! Row filters applied before each enrichment test.
//!
//! Both filters work on column indices into a [`CountTable`] and return the
//! surviving row indices in table order.

use crate::data::CountTable;
use crate::error::{DevaError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Keep rows where at least `frac × len(group0)` of the group 0 samples
/// individually carry an outlier.
///
/// # Arguments
/// * `counts` - The count table
/// * `rows` - Candidate row indices
/// * `group0` - Column indices of the group tested for enrichment
/// * `frac` - Minimum fraction (0.0 to 1.0)
pub fn filter_outlier_fraction(
    counts: &CountTable,
    rows: &[usize],
    group0: &[usize],
    frac: f64,
) -> Result<Vec<usize>> {
    if !(0.0..=1.0).contains(&frac) {
        return Err(DevaError::config(
            "frac_filter",
            format!("must be between 0 and 1, got {}", frac),
        ));
    }

    let min_samples = frac * group0.len() as f64;
    Ok(rows
        .par_iter()
        .copied()
        .filter(|&row| counts.n_with_outliers(row, group0) as f64 >= min_samples)
        .collect())
}

/// Outlier rate of a row over the given columns: summed outliers divided by
/// summed outliers and not-outliers. NaN when no values contributed.
pub fn outlier_rate(counts: &CountTable, row: usize, cols: &[usize]) -> f64 {
    let (n_out, n_not) = counts.group_sums(row, cols);
    let total = n_out + n_not;
    if total == 0 {
        f64::NAN
    } else {
        n_out as f64 / total as f64
    }
}

/// Keep rows whose group 0 outlier rate strictly exceeds the group 1 rate.
///
/// A NaN rate on either side never passes.
pub fn filter_enriched(
    counts: &CountTable,
    rows: &[usize],
    group0: &[usize],
    group1: &[usize],
) -> Vec<usize> {
    rows.par_iter()
        .copied()
        .filter(|&row| outlier_rate(counts, row, group0) > outlier_rate(counts, row, group1))
        .collect()
}

/// Result of enrichment filtering with statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResult {
    /// Number of rows before filtering.
    pub n_before: usize,
    /// Rows left after the fraction filter.
    pub n_after_fraction: usize,
    /// Rows left after both filters.
    pub n_after: usize,
    /// Proportion of rows retained.
    pub retention_rate: f64,
}

impl std::fmt::Display for FilterResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Filter Result")?;
        writeln!(f, "  Before:    {} rows", self.n_before)?;
        writeln!(f, "  Fraction:  {} rows", self.n_after_fraction)?;
        writeln!(f, "  Enriched:  {} rows", self.n_after)?;
        writeln!(f, "  Retained:  {:.1}%", self.retention_rate * 100.0)?;
        Ok(())
    }
}

/// Apply the fraction filter (when given) then the enrichment filter.
pub fn filter_for_enrichment(
    counts: &CountTable,
    group0: &[usize],
    group1: &[usize],
    frac_filter: Option<f64>,
) -> Result<(Vec<usize>, FilterResult)> {
    let all_rows: Vec<usize> = (0..counts.n_rows()).collect();
    let rows = match frac_filter {
        Some(frac) => filter_outlier_fraction(counts, &all_rows, group0, frac)?,
        None => all_rows,
    };
    let n_after_fraction = rows.len();
    let rows = filter_enriched(counts, &rows, group0, group1);

    let n_before = counts.n_rows();
    let stats = FilterResult {
        n_before,
        n_after_fraction,
        n_after: rows.len(),
        retention_rate: if n_before == 0 {
            0.0
        } else {
            rows.len() as f64 / n_before as f64
        },
    };
    Ok((rows, stats))
}
