//! Serializable run configuration.

use crate::call::Direction;
use crate::correct::CorrectionMethod;
use crate::error::{DevaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which optional output files a run writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Prefix for every output file.
    pub prefix: String,
    pub save_outlier_table: bool,
    pub save_frac_table: bool,
    pub save_qvalues: bool,
    pub save_comparison_summaries: bool,
    pub save_gene_lists: bool,
    pub save_signed_log_qvalues: bool,
    pub save_parameters: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            prefix: "outliers".to_string(),
            save_outlier_table: true,
            save_frac_table: false,
            save_qvalues: true,
            save_comparison_summaries: false,
            save_gene_lists: false,
            save_signed_log_qvalues: false,
            save_parameters: true,
        }
    }
}

/// Parameters of an outlier enrichment run.
///
/// Every field has a default, so a YAML file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the run.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Number of IQRs beyond the median a value must lie to be an outlier.
    pub iqrs: f64,
    pub direction: Direction,
    /// Sum counts over rows sharing the identifier prefix.
    pub aggregate: bool,
    /// Separator between the group key and the rest of a row identifier.
    pub id_separator: String,
    /// Minimum fraction of the group of interest with an outlier.
    pub frac_filter: Option<f64>,
    pub correction: CorrectionMethod,
    /// Q-value cutoff for gene lists and summaries.
    pub fdr: f64,
    pub output: OutputOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "deva".to_string(),
            description: None,
            iqrs: 1.5,
            direction: Direction::Up,
            aggregate: true,
            id_separator: "-".to_string(),
            frac_filter: Some(0.3),
            correction: CorrectionMethod::BenjaminiHochberg,
            fdr: 0.05,
            output: OutputOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(DevaError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(DevaError::from)
    }

    /// Load and validate a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Write as YAML.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if !(self.iqrs > 0.0) || !self.iqrs.is_finite() {
            return Err(DevaError::config(
                "iqrs",
                format!("must be a positive number, got {}", self.iqrs),
            ));
        }
        if let Some(frac) = self.frac_filter {
            if !(0.0..=1.0).contains(&frac) {
                return Err(DevaError::config(
                    "frac_filter",
                    format!("must be between 0 and 1, got {}", frac),
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.fdr) {
            return Err(DevaError::config(
                "fdr",
                format!("must be between 0 and 1, got {}", self.fdr),
            ));
        }
        if self.aggregate && self.id_separator.is_empty() {
            return Err(DevaError::config(
                "id_separator",
                "must be a non-empty string when aggregating",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.iqrs, 1.5);
        assert_eq!(config.direction, Direction::Up);
        assert!(config.aggregate);
        assert_eq!(config.id_separator, "-");
        assert_eq!(config.frac_filter, Some(0.3));
        assert_eq!(config.correction, CorrectionMethod::BenjaminiHochberg);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = PipelineConfig {
            name: "brca".to_string(),
            direction: Direction::Down,
            frac_filter: None,
            ..Default::default()
        };
        let yaml = config.to_yaml().unwrap();
        let parsed = PipelineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "name: partial\ndirection: down\ncorrection: bonferroni\n";
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.name, "partial");
        assert_eq!(config.direction, Direction::Down);
        assert_eq!(config.correction, CorrectionMethod::Bonferroni);
        assert_eq!(config.iqrs, 1.5);
        assert_eq!(config.output.prefix, "outliers");
    }

    #[test]
    fn test_validate_names_parameter() {
        let cases = [
            (
                PipelineConfig {
                    iqrs: 0.0,
                    ..Default::default()
                },
                "iqrs",
            ),
            (
                PipelineConfig {
                    frac_filter: Some(1.5),
                    ..Default::default()
                },
                "frac_filter",
            ),
            (
                PipelineConfig {
                    fdr: -0.1,
                    ..Default::default()
                },
                "fdr",
            ),
            (
                PipelineConfig {
                    id_separator: String::new(),
                    ..Default::default()
                },
                "id_separator",
            ),
        ];
        for (config, expected) in cases {
            match config.validate() {
                Err(DevaError::Configuration { parameter, .. }) => assert_eq!(parameter, expected),
                other => panic!("expected configuration error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_empty_separator_allowed_without_aggregation() {
        let config = PipelineConfig {
            aggregate: false,
            id_separator: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
