//! Multiple testing correction.

pub mod bh;
pub mod bonferroni;

pub use bh::adjust_bh;
pub use bonferroni::adjust_bonferroni;

use crate::error::{DevaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Multiple testing correction procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CorrectionMethod {
    #[default]
    BenjaminiHochberg,
    Bonferroni,
}

impl CorrectionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            CorrectionMethod::BenjaminiHochberg => "benjamini-hochberg",
            CorrectionMethod::Bonferroni => "bonferroni",
        }
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CorrectionMethod {
    type Err = DevaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bh" | "fdr_bh" | "benjamini-hochberg" => Ok(CorrectionMethod::BenjaminiHochberg),
            "bonferroni" => Ok(CorrectionMethod::Bonferroni),
            _ => Err(DevaError::config(
                "correction",
                format!("'{}' is not one of benjamini-hochberg, bonferroni", s),
            )),
        }
    }
}

/// Adjust p-values with the given method; order and NaNs are preserved.
pub fn correct(p_values: &[f64], method: CorrectionMethod) -> Vec<f64> {
    match method {
        CorrectionMethod::BenjaminiHochberg => adjust_bh(p_values),
        CorrectionMethod::Bonferroni => adjust_bonferroni(p_values),
    }
}
