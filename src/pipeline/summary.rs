//! Run summary for reporting.

use crate::aggregate::OutlierTable;
use crate::call::Direction;
use crate::data::{ColumnNaming, QValueTable, SkippedComparison};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Number of rows below the FDR cutoff in one q-value column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantCount {
    pub column: String,
    pub n_significant: usize,
}

/// What a run did, in a form suitable for text, JSON or YAML output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub name: String,
    pub direction: Direction,
    pub iqrs: Option<f64>,
    /// Rows of the values matrix, when outliers were called in this run.
    pub n_input_rows: Option<usize>,
    /// Rows of the count table (after aggregation).
    pub n_count_rows: usize,
    pub n_samples: usize,
    /// Rows with at least one q-value.
    pub n_tested_rows: usize,
    pub comparisons: Vec<String>,
    pub skipped: Vec<SkippedComparison>,
    pub fdr: f64,
    pub significant: Vec<SignificantCount>,
}

impl RunSummary {
    pub fn new(
        name: &str,
        n_input_rows: Option<usize>,
        outliers: &OutlierTable,
        qvalues: &QValueTable,
        fdr: f64,
        naming: &ColumnNaming,
    ) -> Self {
        let significant = qvalues
            .n_significant(fdr)
            .into_iter()
            .map(|(key, n_significant)| SignificantCount {
                column: naming.format(&key),
                n_significant,
            })
            .collect();
        Self {
            name: name.to_string(),
            direction: outliers.direction(),
            iqrs: outliers.iqrs(),
            n_input_rows,
            n_count_rows: outliers.counts().n_rows(),
            n_samples: outliers.counts().n_samples(),
            n_tested_rows: qvalues.n_rows(),
            comparisons: qvalues.comparisons().to_vec(),
            skipped: qvalues.skipped().to_vec(),
            fdr,
            significant,
        }
    }

    /// Convert to JSON format for export.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Convert to YAML format for export.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Outlier Enrichment Summary: {}", self.name)?;
        writeln!(f, "==========================")?;
        match self.iqrs {
            Some(iqrs) => writeln!(f, "  Outliers:     {} ({} IQRs)", self.direction, iqrs)?,
            None => writeln!(f, "  Outliers:     {}", self.direction)?,
        }
        if let Some(n) = self.n_input_rows {
            writeln!(f, "  Input rows:   {}", n)?;
        }
        writeln!(f, "  Count rows:   {}", self.n_count_rows)?;
        writeln!(f, "  Samples:      {}", self.n_samples)?;
        writeln!(f, "  Tested rows:  {}", self.n_tested_rows)?;
        writeln!(f, "  Comparisons:  {}", self.comparisons.len())?;
        writeln!(f)?;

        if !self.significant.is_empty() {
            writeln!(f, "Significant rows (q < {}):", self.fdr)?;
            for s in &self.significant {
                writeln!(f, "  {:<40} {}", s.column, s.n_significant)?;
            }
        }
        if !self.skipped.is_empty() {
            writeln!(f, "Skipped:")?;
            for s in &self.skipped {
                writeln!(f, "  {}: {}", s.comparison, s.reason)?;
            }
        }
        Ok(())
    }
}
