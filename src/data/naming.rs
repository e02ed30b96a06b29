//! Column naming for serialized tables.
//!
//! Statistical code works with typed [`ComparisonKey`]s; the strings written
//! to disk are produced and parsed here only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistic stored in a per-comparison column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    /// FDR-adjusted Fisher p-value.
    FisherFdr,
    /// Raw Fisher p-value.
    FisherP,
    /// Summed outlier count for a group.
    OutlierCount,
    /// Summed not-outlier count for a group.
    NotOutlierCount,
}

impl StatKind {
    /// All kinds, in the order they are tried when parsing.
    pub const ALL: [StatKind; 4] = [
        StatKind::FisherFdr,
        StatKind::FisherP,
        StatKind::OutlierCount,
        StatKind::NotOutlierCount,
    ];
}

/// Identifies one result column: a comparison, one of its groups, and a statistic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComparisonKey {
    /// Annotation column the groups come from.
    pub comparison: String,
    /// Group label the statistic refers to.
    pub group_label: String,
    /// Statistic stored in the column.
    pub stat_kind: StatKind,
}

impl ComparisonKey {
    /// Key of the q-value column for a comparison group.
    pub fn fdr(comparison: &str, group_label: &str) -> Self {
        Self::new(comparison, group_label, StatKind::FisherFdr)
    }

    pub fn new(comparison: &str, group_label: &str, stat_kind: StatKind) -> Self {
        Self {
            comparison: comparison.to_string(),
            group_label: group_label.to_string(),
            stat_kind,
        }
    }
}

impl fmt::Display for ComparisonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ColumnNaming::default().format(self))
    }
}

/// Naming conventions for count-table and result columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNaming {
    /// Token joining name parts.
    pub separator: String,
    /// Suffix of per-sample outlier count columns.
    pub outlier_suffix: String,
    /// Suffix of per-sample not-outlier count columns.
    pub not_outlier_suffix: String,
    /// Prefix of q-value columns.
    pub fdr_prefix: String,
    /// Prefix of raw p-value columns.
    pub p_prefix: String,
    /// Prefix of summed outlier count columns.
    pub outlier_count_prefix: String,
    /// Prefix of summed not-outlier count columns.
    pub not_outlier_count_prefix: String,
}

impl Default for ColumnNaming {
    fn default() -> Self {
        Self {
            separator: "_".to_string(),
            outlier_suffix: "outliers".to_string(),
            not_outlier_suffix: "notOutliers".to_string(),
            fdr_prefix: "fisherFDR".to_string(),
            p_prefix: "fisherp".to_string(),
            outlier_count_prefix: "Outliers".to_string(),
            not_outlier_count_prefix: "NotOutlier".to_string(),
        }
    }
}

impl ColumnNaming {
    fn prefix(&self, kind: StatKind) -> &str {
        match kind {
            StatKind::FisherFdr => &self.fdr_prefix,
            StatKind::FisherP => &self.p_prefix,
            StatKind::OutlierCount => &self.outlier_count_prefix,
            StatKind::NotOutlierCount => &self.not_outlier_count_prefix,
        }
    }

    /// Column name for a key: `{prefix}{sep}{comparison}{sep}{group}`.
    pub fn format(&self, key: &ComparisonKey) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.prefix(key.stat_kind),
            key.comparison,
            key.group_label,
            sep = self.separator
        )
    }

    /// Parse a column name back into a key.
    ///
    /// The group label is everything after the last separator, so it must
    /// not itself contain the separator; the comparison may.
    pub fn parse(&self, column: &str) -> Option<ComparisonKey> {
        StatKind::ALL.iter().find_map(|&kind| {
            let rest = column
                .strip_prefix(self.prefix(kind))?
                .strip_prefix(self.separator.as_str())?;
            let (comparison, group) = rest.rsplit_once(self.separator.as_str())?;
            if comparison.is_empty() || group.is_empty() {
                return None;
            }
            Some(ComparisonKey::new(comparison, group, kind))
        })
    }

    /// Whether a group label survives a format/parse round-trip.
    pub fn is_lossless_label(&self, group_label: &str) -> bool {
        !group_label.is_empty() && !group_label.contains(self.separator.as_str())
    }

    /// Name of a sample's outlier count column.
    pub fn outlier_column(&self, sample: &str) -> String {
        format!("{}{}{}", sample, self.separator, self.outlier_suffix)
    }

    /// Name of a sample's not-outlier count column.
    pub fn not_outlier_column(&self, sample: &str) -> String {
        format!("{}{}{}", sample, self.separator, self.not_outlier_suffix)
    }

    /// Split a count column into (sample, is_outlier_column).
    pub fn parse_count_column<'a>(&self, column: &'a str) -> Option<(&'a str, bool)> {
        let (sample, suffix) = column.rsplit_once(self.separator.as_str())?;
        if sample.is_empty() {
            None
        } else if suffix == self.outlier_suffix {
            Some((sample, true))
        } else if suffix == self.not_outlier_suffix {
            Some((sample, false))
        } else {
            None
        }
    }
}
