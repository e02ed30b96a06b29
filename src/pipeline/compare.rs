//! Group comparisons over every annotation column.

use crate::aggregate::OutlierTable;
use crate::correct::CorrectionMethod;
use crate::data::{
    resolve_groups, AnnotationTable, ComparisonKey, ComparisonSummary, CountTable, QValueTable,
    SampleGroups, SkipReason,
};
use crate::error::{DevaError, Result};
use crate::test::{test_enrichment, EnrichmentResult};
use rayon::prelude::*;

/// Q-values of every comparison plus the per-comparison Fisher details.
#[derive(Debug, Clone)]
pub struct GroupComparisons {
    pub qvalues: QValueTable,
    /// One entry per tested annotation column, in column order.
    pub summaries: Vec<ComparisonSummary>,
}

/// What happened to one annotation column.
#[derive(Debug)]
enum ColumnOutcome {
    NoGroups {
        n_values: usize,
    },
    TooFewSamples {
        dropped: Vec<String>,
        group_label: String,
        n_samples: usize,
    },
    Tested {
        groups: SampleGroups,
        dropped: Vec<String>,
        enriched0: EnrichmentResult,
        enriched1: EnrichmentResult,
    },
}

/// Test every two-valued annotation column for outlier enrichment in both
/// directions.
///
/// Columns run in parallel; results are merged serially in column order
/// by outer join on row identifier. Columns without exactly two values,
/// groups with fewer than two samples in the count table, and directions
/// with no testable rows are skipped and recorded in the table's metadata.
/// Rows never tested in any column are dropped at the end.
///
/// # Arguments
/// * `outliers` - Outlier table shared by every comparison
/// * `annotations` - Sample annotations; every column is a candidate comparison
/// * `frac_filter` - Minimum fraction of the group of interest with an outlier
/// * `method` - Multiple testing correction
pub fn compare_groups(
    outliers: &OutlierTable,
    annotations: &AnnotationTable,
    frac_filter: Option<f64>,
    method: CorrectionMethod,
) -> Result<GroupComparisons> {
    if let Some(frac) = frac_filter {
        if !(0.0..=1.0).contains(&frac) {
            return Err(DevaError::config(
                "frac_filter",
                format!("must be between 0 and 1, got {}", frac),
            ));
        }
    }

    let counts = outliers.counts();
    let outcomes: Vec<(String, ColumnOutcome)> = annotations
        .column_names()
        .par_iter()
        .map(|column| {
            let outcome = compare_column(counts, annotations, column, frac_filter, method)?;
            Ok((column.clone(), outcome))
        })
        .collect::<Result<_>>()?;

    let mut qvalues = QValueTable::new(counts.row_ids().to_vec(), frac_filter);
    let mut summaries = Vec::new();
    for (column, outcome) in outcomes {
        log::info!("Testing for enrichment in {} comparison", column);
        match outcome {
            ColumnOutcome::NoGroups { n_values } => {
                log::info!(
                    "There are not exactly 2 groups of samples, skipping {}",
                    column
                );
                qvalues.record_skip(&column, SkipReason::NotTwoGroups { n_values });
            }
            ColumnOutcome::TooFewSamples {
                dropped,
                group_label,
                n_samples,
            } => {
                warn_dropped(&dropped);
                log::error!(
                    "Group {} does not have at least two samples, skipping comparison {}",
                    group_label,
                    column
                );
                qvalues.record_skip(
                    &column,
                    SkipReason::TooFewSamples {
                        group_label,
                        n_samples,
                    },
                );
            }
            ColumnOutcome::Tested {
                groups,
                dropped,
                enriched0,
                enriched1,
            } => {
                warn_dropped(&dropped);
                qvalues.record_comparison(&column);
                for (label, result) in [(&groups.label0, &enriched0), (&groups.label1, &enriched1)]
                {
                    if result.is_empty() {
                        qvalues.record_skip(
                            &column,
                            SkipReason::NoTestableRows {
                                group_label: label.clone(),
                            },
                        );
                    } else {
                        qvalues.merge_column(
                            ComparisonKey::fdr(&column, label),
                            result.q_value_entries(),
                        );
                    }
                }
                summaries.push(ComparisonSummary {
                    comparison: column,
                    label0: groups.label0,
                    label1: groups.label1,
                    rows0: enriched0.rows,
                    rows1: enriched1.rows,
                });
            }
        }
    }

    qvalues.drop_untested_rows();
    Ok(GroupComparisons { qvalues, summaries })
}

fn compare_column(
    counts: &CountTable,
    annotations: &AnnotationTable,
    column: &str,
    frac_filter: Option<f64>,
    method: CorrectionMethod,
) -> Result<ColumnOutcome> {
    let mut groups = match resolve_groups(annotations, column)? {
        Some(groups) => groups,
        None => {
            return Ok(ColumnOutcome::NoGroups {
                n_values: annotations.value_counts(column)?.len(),
            })
        }
    };

    let dropped = groups.retain_samples(|s| counts.has_sample(s));
    let too_small = [(&groups.label0, &groups.group0), (&groups.label1, &groups.group1)]
        .into_iter()
        .find(|(_, group)| group.len() < 2)
        .map(|(label, group)| (label.clone(), group.len()));
    if let Some((group_label, n_samples)) = too_small {
        return Ok(ColumnOutcome::TooFewSamples {
            dropped,
            group_label,
            n_samples,
        });
    }

    let enriched0 = test_enrichment(counts, &groups.group0, &groups.group1, frac_filter, method)?;
    let enriched1 = test_enrichment(counts, &groups.group1, &groups.group0, frac_filter, method)?;
    Ok(ColumnOutcome::Tested {
        groups,
        dropped,
        enriched0,
        enriched1,
    })
}

fn warn_dropped(dropped: &[String]) {
    if !dropped.is_empty() {
        log::warn!(
            "These samples were not found in outliers table: {}, continuing without them",
            dropped.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Direction;
    use approx::assert_relative_eq;

    fn names(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    /// g1 enriched in s1, s2; g2 enriched in s3, s4; g3 never an outlier.
    fn create_test_outliers() -> OutlierTable {
        let mut cells = Vec::new();
        for col in 0..4 {
            let (g1, g2) = if col < 2 { ((3, 0), (0, 3)) } else { ((0, 3), (3, 0)) };
            cells.push((0, col, g1.0, g1.1));
            cells.push((1, col, g2.0, g2.1));
            cells.push((2, col, 0, 3));
        }
        let counts = CountTable::from_cells(
            cells,
            names(&["g1", "g2", "g3"]),
            names(&["s1", "s2", "s3", "s4"]),
        )
        .unwrap();
        OutlierTable::new(counts, Direction::Up, Some(1.5))
    }

    fn create_test_annotations() -> AnnotationTable {
        let v = |s: &str| Some(s.to_string());
        AnnotationTable::new(
            names(&["s1", "s2", "s3", "s4", "s9"]),
            names(&["subtype", "stage", "single"]),
            vec![
                vec![v("A"), v("I"), v("x")],
                vec![v("A"), v("II"), v("x")],
                vec![v("B"), v("III"), v("x")],
                vec![v("B"), v("I"), None],
                vec![v("B"), v("II"), v("x")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_two_directional_columns() {
        let result = compare_groups(
            &create_test_outliers(),
            &create_test_annotations(),
            Some(0.5),
            CorrectionMethod::BenjaminiHochberg,
        )
        .unwrap();
        let qvalues = &result.qvalues;

        // B has 3 samples in annotations, so it is label0
        let key_b = ComparisonKey::fdr("subtype", "B");
        let key_a = ComparisonKey::fdr("subtype", "A");
        assert_eq!(qvalues.columns(), &[key_b.clone(), key_a.clone()]);
        assert_eq!(qvalues.comparisons(), &["subtype"]);

        assert!(qvalues.get("g2", &key_b).unwrap() < 1.0);
        assert!(qvalues.get("g2", &key_a).unwrap().is_nan());
        assert!(qvalues.get("g1", &key_a).unwrap() < 1.0);
        assert!(qvalues.get("g1", &key_b).unwrap().is_nan());
        // g3 never tested
        assert_eq!(qvalues.row_ids(), &["g1", "g2"]);
    }

    #[test]
    fn test_skips_are_recorded() {
        let result = compare_groups(
            &create_test_outliers(),
            &create_test_annotations(),
            None,
            CorrectionMethod::BenjaminiHochberg,
        )
        .unwrap();
        let skipped = result.qvalues.skipped();

        assert!(skipped.iter().any(|s| s.comparison == "stage"
            && s.reason == SkipReason::NotTwoGroups { n_values: 3 }));
        assert!(skipped.iter().any(|s| s.comparison == "single"
            && s.reason == SkipReason::NotTwoGroups { n_values: 1 }));
        assert!(result
            .qvalues
            .columns()
            .iter()
            .all(|k| k.comparison == "subtype"));
    }

    #[test]
    fn test_too_few_samples_after_dropping() {
        let v = |s: &str| Some(s.to_string());
        let annotations = AnnotationTable::new(
            names(&["s1", "s2", "s3", "s9"]),
            names(&["batch"]),
            vec![
                vec![v("one")],
                vec![v("one")],
                vec![v("two")],
                vec![v("two")],
            ],
        )
        .unwrap();
        let result = compare_groups(
            &create_test_outliers(),
            &annotations,
            None,
            CorrectionMethod::BenjaminiHochberg,
        )
        .unwrap();

        assert!(result.qvalues.columns().is_empty());
        assert_eq!(result.qvalues.n_rows(), 0);
        assert_eq!(
            result.qvalues.skipped()[0].reason,
            SkipReason::TooFewSamples {
                group_label: "two".to_string(),
                n_samples: 1
            }
        );
    }

    #[test]
    fn test_summaries_follow_columns() {
        let result = compare_groups(
            &create_test_outliers(),
            &create_test_annotations(),
            None,
            CorrectionMethod::BenjaminiHochberg,
        )
        .unwrap();

        assert_eq!(result.summaries.len(), 1);
        let summary = &result.summaries[0];
        assert_eq!(summary.comparison, "subtype");
        assert_eq!(summary.rows0.len(), 1);
        assert_eq!(summary.rows0[0].row_id, "g2");
        assert_eq!(
            (summary.rows0[0].outliers_0, summary.rows0[0].not_outliers_1),
            (6, 6)
        );
        // [[6, 0], [0, 6]]
        assert_relative_eq!(summary.rows0[0].p_value, 2.0 / 924.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_fraction() {
        assert!(matches!(
            compare_groups(
                &create_test_outliers(),
                &create_test_annotations(),
                Some(-1.0),
                CorrectionMethod::BenjaminiHochberg,
            ),
            Err(DevaError::Configuration { .. })
        ));
    }
}
