//! Outlier counting and the outlier-table handle.

pub mod counts;
pub mod grouping;

pub use counts::count_outliers;
pub use grouping::{RowGrouping, SeparatorPrefix};

use crate::call::{call_outliers, Direction};
use crate::data::{ColumnNaming, CountTable, FractionTable, ValuesMatrix};
use crate::error::Result;
use std::path::Path;

/// Count table together with its fraction table and the calling parameters.
#[derive(Debug, Clone)]
pub struct OutlierTable {
    counts: CountTable,
    fractions: FractionTable,
    direction: Direction,
    /// Unknown when reloaded from disk.
    iqrs: Option<f64>,
}

impl OutlierTable {
    /// Wrap a count table, deriving its fraction table.
    pub fn new(counts: CountTable, direction: Direction, iqrs: Option<f64>) -> Self {
        let fractions = counts.fraction_table();
        Self {
            counts,
            fractions,
            direction,
            iqrs,
        }
    }

    /// Call outliers over `samples` and count them, aggregating rows when a
    /// grouping is given.
    pub fn from_values(
        values: &ValuesMatrix,
        samples: &[String],
        iqrs: f64,
        direction: Direction,
        grouping: Option<&dyn RowGrouping>,
    ) -> Result<Self> {
        log::info!(
            "Calling {} outliers for {} samples (iqrs = {})",
            direction,
            samples.len(),
            iqrs
        );
        let calls = call_outliers(values, samples, iqrs, direction)?;
        log::debug!(
            "{} outlier calls over {} rows",
            calls.n_outliers(),
            calls.n_features()
        );
        let counts = count_outliers(&calls, samples, grouping)?;
        Ok(Self::new(counts, direction, Some(iqrs)))
    }

    /// Reload a previously written count table.
    pub fn from_count_path<P: AsRef<Path>>(
        path: P,
        direction: Direction,
        naming: &ColumnNaming,
    ) -> Result<Self> {
        let counts = CountTable::from_path(path, naming)?;
        Ok(Self::new(counts, direction, None))
    }

    /// Record the IQR multiplier a reloaded table was called with.
    pub fn with_iqrs(mut self, iqrs: f64) -> Self {
        self.iqrs = Some(iqrs);
        self
    }

    pub fn counts(&self) -> &CountTable {
        &self.counts
    }

    pub fn fractions(&self) -> &FractionTable {
        &self.fractions
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn iqrs(&self) -> Option<f64> {
        self.iqrs
    }

    pub fn sample_ids(&self) -> &[String] {
        self.counts.sample_ids()
    }

    /// Write the count and fraction tables.
    pub fn write<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        count_path: P,
        fraction_path: Q,
        naming: &ColumnNaming,
    ) -> Result<()> {
        self.counts.to_tsv(count_path, naming)?;
        self.fractions.to_tsv(fraction_path)
    }
}
