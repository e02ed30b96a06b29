//! Outlier / not-outlier counting, optionally aggregated by row group.

use crate::aggregate::grouping::RowGrouping;
use crate::call::OutlierMatrix;
use crate::data::CountTable;
use crate::error::{DevaError, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Count outliers and not-outliers per row and sample.
///
/// Without a grouping each row keeps its identifier and order; a present
/// call contributes (1, 0) or (0, 1) and a missing call (0, 0). With a
/// grouping, rows sharing a group key are merged by summing those
/// contributions, and output rows are sorted by key.
///
/// # Arguments
/// * `outliers` - Outlier calls
/// * `samples` - Samples to count; must be columns of `outliers`
/// * `grouping` - Optional row grouping for aggregation
pub fn count_outliers(
    outliers: &OutlierMatrix,
    samples: &[String],
    grouping: Option<&dyn RowGrouping>,
) -> Result<CountTable> {
    let cols: Vec<usize> = samples
        .iter()
        .map(|s| {
            outliers
                .sample_ids()
                .iter()
                .position(|x| x == s)
                .ok_or_else(|| {
                    DevaError::SampleMismatch(format!("Sample '{}' has no outlier calls", s))
                })
        })
        .collect::<Result<_>>()?;

    let groups: Vec<(String, Vec<usize>)> = match grouping {
        None => outliers
            .feature_ids()
            .iter()
            .enumerate()
            .map(|(row, id)| (id.clone(), vec![row]))
            .collect(),
        Some(grouping) => {
            let mut by_key: BTreeMap<String, Vec<usize>> = BTreeMap::new();
            for (row, id) in outliers.feature_ids().iter().enumerate() {
                by_key.entry(grouping.group_key(id)).or_default().push(row);
            }
            by_key.into_iter().collect()
        }
    };

    let cells: Vec<(usize, usize, u64, u64)> = groups
        .par_iter()
        .enumerate()
        .flat_map_iter(|(new_row, (_, rows))| {
            cols.iter().enumerate().map(move |(new_col, &col)| {
                let (n_out, n_not) = rows.iter().fold((0u64, 0u64), |(o, n), &row| {
                    match outliers.get(row, col) {
                        Some(true) => (o + 1, n),
                        Some(false) => (o, n + 1),
                        None => (o, n),
                    }
                });
                (new_row, new_col, n_out, n_not)
            })
        })
        .collect();

    let row_ids = groups.into_iter().map(|(key, _)| key).collect();
    CountTable::from_cells(cells, row_ids, samples.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SeparatorPrefix;
    use crate::call::{call_outliers, Direction};
    use crate::data::ValuesMatrix;

    fn samples() -> Vec<String> {
        (1..=5).map(|i| format!("S{}", i)).collect()
    }

    fn create_test_calls() -> OutlierMatrix {
        let values = ValuesMatrix::from_rows(
            vec![
                vec![Some(1.0), Some(1.1), Some(0.9), Some(1.0), Some(50.0)],
                vec![Some(2.0), None, Some(2.1), Some(1.9), Some(40.0)],
                vec![Some(30.0), Some(1.0), Some(1.1), Some(0.9), Some(1.0)],
                vec![Some(5.0), Some(5.0), Some(5.0), Some(5.0), Some(5.0)],
            ],
            vec![
                "RAG2-S365".into(),
                "RAG2-T12".into(),
                "ATM-S1981".into(),
                "BRCA1".into(),
            ],
            samples(),
        )
        .unwrap();
        call_outliers(&values, &samples(), 1.5, Direction::Up).unwrap()
    }

    #[test]
    fn test_counts_without_aggregation() {
        let calls = create_test_calls();
        let counts = count_outliers(&calls, &samples(), None).unwrap();

        assert_eq!(counts.row_ids(), calls.feature_ids());
        assert_eq!((counts.outliers_at(0, 4), counts.not_outliers_at(0, 4)), (1, 0));
        assert_eq!((counts.outliers_at(0, 0), counts.not_outliers_at(0, 0)), (0, 1));
        // Missing call counts as neither
        assert_eq!(counts.total_at(1, 1), 0);
    }

    #[test]
    fn test_counts_with_aggregation() {
        let calls = create_test_calls();
        let grouping = SeparatorPrefix::new("-").unwrap();
        let counts = count_outliers(&calls, &samples(), Some(&grouping)).unwrap();

        assert_eq!(counts.row_ids(), &["ATM", "BRCA1", "RAG2"]);
        // RAG2: two sites, both outliers in S5
        assert_eq!(counts.outliers_at(2, 4), 2);
        assert_eq!(counts.not_outliers_at(2, 4), 0);
        // RAG2 in S2: one present, one missing
        assert_eq!(counts.outliers_at(2, 1), 0);
        assert_eq!(counts.not_outliers_at(2, 1), 1);
        // ATM outlier in S1
        assert_eq!(counts.outliers_at(0, 0), 1);
    }

    #[test]
    fn test_totals_match_present_values() {
        let calls = create_test_calls();
        let grouping = SeparatorPrefix::new("-").unwrap();
        let counts = count_outliers(&calls, &samples(), Some(&grouping)).unwrap();

        for (row, key) in counts.row_ids().iter().enumerate() {
            for col in 0..counts.n_samples() {
                let expected = calls
                    .feature_ids()
                    .iter()
                    .enumerate()
                    .filter(|(_, id)| grouping.group_key(id) == *key)
                    .filter(|(r, _)| calls.get(*r, col).is_some())
                    .count() as u64;
                assert_eq!(counts.total_at(row, col), expected);
            }
        }
    }

    #[test]
    fn test_sample_subset() {
        let calls = create_test_calls();
        let subset = vec!["S5".to_string(), "S1".to_string()];
        let counts = count_outliers(&calls, &subset, None).unwrap();
        assert_eq!(counts.sample_ids(), &["S5", "S1"]);
        assert_eq!(counts.outliers_at(0, 0), 1);
        assert!(count_outliers(&calls, &["S9".to_string()], None).is_err());
    }
}
