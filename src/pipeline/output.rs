//! Output file naming and writing.

use crate::aggregate::OutlierTable;
use crate::call::Direction;
use crate::data::{ColumnNaming, ComparisonSummary, QValueTable};
use crate::error::Result;
use crate::pipeline::config::{OutputOptions, PipelineConfig};
use std::path::PathBuf;

/// File names of every output, built from a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    prefix: String,
}

impl OutputNaming {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `{prefix}.{direction}.count_table.tsv`
    pub fn count_table(&self, direction: Direction) -> PathBuf {
        PathBuf::from(format!("{}.{}.count_table.tsv", self.prefix, direction))
    }

    /// `{prefix}.{direction}.fraction_table.tsv`
    pub fn fraction_table(&self, direction: Direction) -> PathBuf {
        PathBuf::from(format!("{}.{}.fraction_table.tsv", self.prefix, direction))
    }

    /// `{prefix}.{direction}.qvalues.tsv`
    pub fn qvalues(&self, direction: Direction) -> PathBuf {
        PathBuf::from(format!("{}.{}.qvalues.tsv", self.prefix, direction))
    }

    /// `{prefix}.{direction}.{comparison}.qvalues.tsv`
    pub fn comparison(&self, direction: Direction, comparison: &str) -> PathBuf {
        PathBuf::from(format!(
            "{}.{}.{}.qvalues.tsv",
            self.prefix, direction, comparison
        ))
    }

    /// `{prefix}.{direction}.signed_log_qvalues.tsv`
    pub fn signed_log_qvalues(&self, direction: Direction) -> PathBuf {
        PathBuf::from(format!(
            "{}.{}.signed_log_qvalues.tsv",
            self.prefix, direction
        ))
    }

    /// `{prefix}.parameters.yaml`
    pub fn parameters(&self) -> PathBuf {
        PathBuf::from(format!("{}.parameters.yaml", self.prefix))
    }
}

/// Write the count and fraction tables as selected in `options`.
pub fn write_outlier_table(
    outliers: &OutlierTable,
    options: &OutputOptions,
    naming: &ColumnNaming,
) -> Result<Vec<PathBuf>> {
    let files = OutputNaming::new(&options.prefix);
    let direction = outliers.direction();
    let mut written = Vec::new();

    if options.save_frac_table {
        let path = files.fraction_table(direction);
        log::info!("Saving outlier fraction table to {}", path.display());
        outliers.fractions().to_tsv(&path)?;
        written.push(path);
    }
    if options.save_outlier_table {
        let path = files.count_table(direction);
        log::info!("Saving outlier table to {}", path.display());
        outliers.counts().to_tsv(&path, naming)?;
        written.push(path);
    }
    Ok(written)
}

/// Write q-values, comparison summaries, gene lists and signed log q-values
/// as selected in `options`.
pub fn write_comparison_outputs(
    qvalues: &QValueTable,
    summaries: &[ComparisonSummary],
    direction: Direction,
    fdr: f64,
    options: &OutputOptions,
    naming: &ColumnNaming,
) -> Result<Vec<PathBuf>> {
    let files = OutputNaming::new(&options.prefix);
    let mut written = Vec::new();

    if options.save_comparison_summaries {
        for summary in summaries.iter().filter(|s| !s.is_empty()) {
            let path = files.comparison(direction, &summary.comparison);
            summary.to_tsv(&path, qvalues, naming)?;
            written.push(path);
        }
    }
    if options.save_qvalues {
        let path = files.qvalues(direction);
        log::info!("Saving qvalues to {}", path.display());
        qvalues.to_tsv(&path, naming)?;
        written.push(path);
    }
    if options.save_gene_lists {
        written.extend(qvalues.write_gene_lists(fdr, files.prefix(), None, naming)?);
    }
    if options.save_signed_log_qvalues {
        let path = files.signed_log_qvalues(direction);
        qvalues.signed_log_qvalues_to_tsv(&path)?;
        written.push(path);
    }
    Ok(written)
}

/// Record the run parameters as YAML.
pub fn write_parameters(config: &PipelineConfig) -> Result<PathBuf> {
    let path = OutputNaming::new(&config.output.prefix).parameters();
    log::info!("Saving parameters to {}", path.display());
    config.to_file(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let files = OutputNaming::new("out/brca");
        assert_eq!(
            files.count_table(Direction::Up),
            PathBuf::from("out/brca.up.count_table.tsv")
        );
        assert_eq!(
            files.fraction_table(Direction::Down),
            PathBuf::from("out/brca.down.fraction_table.tsv")
        );
        assert_eq!(
            files.qvalues(Direction::Up),
            PathBuf::from("out/brca.up.qvalues.tsv")
        );
        assert_eq!(
            files.comparison(Direction::Up, "PAM50_LumA"),
            PathBuf::from("out/brca.up.PAM50_LumA.qvalues.tsv")
        );
        assert_eq!(files.parameters(), PathBuf::from("out/brca.parameters.yaml"));
    }
}
