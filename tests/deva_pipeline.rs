//! Integration tests for the outlier enrichment pipeline.

use approx::assert_relative_eq;
use deva::prelude::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};

const N_SAMPLES: usize = 20;

fn sample_id(i: usize) -> String {
    format!("s{:02}", i + 1)
}

/// Write synthetic site-level values with known outliers.
///
/// Every value is 1.0 except the planted highs (51.0). No row has more
/// than four highs among 20 samples, so Q3 = 1.0, IQR = 0 and exactly the
/// highs are called.
/// - SIG-a: high in s01-s04, SIG-b: high in s05-s08 (treated)
/// - CTL-a: high in s09-s12 (control)
/// - NOISE-a: high in s01 and s09
/// - FLAT-a: never high
fn write_values(dir: &Path) -> PathBuf {
    let rows: [(&str, Vec<usize>); 5] = [
        ("SIG-a", vec![0, 1, 2, 3]),
        ("SIG-b", vec![4, 5, 6, 7]),
        ("CTL-a", vec![8, 9, 10, 11]),
        ("NOISE-a", vec![0, 8]),
        ("FLAT-a", vec![]),
    ];

    let path = dir.join("values.tsv");
    let mut file = fs::File::create(&path).unwrap();
    let header: Vec<String> = (0..N_SAMPLES).map(sample_id).collect();
    writeln!(file, "\t{}", header.join("\t")).unwrap();
    for (id, highs) in rows.iter() {
        let cells: Vec<&str> = (0..N_SAMPLES)
            .map(|i| if highs.contains(&i) { "51.0" } else { "1.0" })
            .collect();
        writeln!(file, "{}\t{}", id, cells.join("\t")).unwrap();
    }
    path
}

/// s01-s08 treated, s09-s20 control; `site` has three values.
fn write_annotations(dir: &Path) -> PathBuf {
    let path = dir.join("annotations.tsv");
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "sample\tarm\tsite").unwrap();
    for i in 0..N_SAMPLES {
        let arm = if i < 8 { "treated" } else { "control" };
        let site = ["A", "B", "C"][i % 3];
        writeln!(file, "{}\t{}\t{}", sample_id(i), arm, site).unwrap();
    }
    path
}

fn load_inputs(dir: &Path) -> (ValuesMatrix, AnnotationTable) {
    let values = ValuesMatrix::from_path(write_values(dir)).unwrap();
    let annotations = AnnotationTable::from_path(write_annotations(dir)).unwrap();
    (values, annotations)
}

fn prefix_in(dir: &Path, name: &str) -> String {
    dir.join(name).to_string_lossy().to_string()
}

/// One row: s1, s2 (group a) each one outlier; s3, s4 (group b) none.
fn two_by_two_inputs() -> (OutlierTable, AnnotationTable) {
    let mut counts = Builder::new().suffix(".tsv").tempfile().unwrap();
    writeln!(
        counts,
        "\ts1_outliers\ts1_notOutliers\ts2_outliers\ts2_notOutliers\t\
         s3_outliers\ts3_notOutliers\ts4_outliers\ts4_notOutliers"
    )
    .unwrap();
    writeln!(counts, "X\t1\t0\t1\t0\t0\t1\t0\t1").unwrap();
    counts.flush().unwrap();

    let mut annotations = Builder::new().suffix(".tsv").tempfile().unwrap();
    writeln!(annotations, "sample\tgrp").unwrap();
    for (sample, group) in [("s1", "a"), ("s2", "a"), ("s3", "b"), ("s4", "b")] {
        writeln!(annotations, "{}\t{}", sample, group).unwrap();
    }
    annotations.flush().unwrap();

    let outliers =
        OutlierTable::from_count_path(counts.path(), Direction::Up, &ColumnNaming::default())
            .unwrap();
    let annotations = AnnotationTable::from_path(annotations.path()).unwrap();
    (outliers, annotations)
}

#[test]
fn test_two_by_two_fixture() {
    let (outliers, annotations) = two_by_two_inputs();
    let result = compare_groups(
        &outliers,
        &annotations,
        Some(0.0),
        CorrectionMethod::BenjaminiHochberg,
    )
    .unwrap();

    // Tie in group sizes: the first value in the table is group 0
    let key = ComparisonKey::fdr("grp", "a");
    assert_eq!(result.qvalues.columns(), &[key.clone()]);
    assert_relative_eq!(
        result.qvalues.get("X", &key).unwrap(),
        1.0 / 3.0,
        epsilon = 1e-10
    );

    let summary = &result.summaries[0];
    assert_relative_eq!(summary.rows0[0].p_value, 1.0 / 3.0, epsilon = 1e-10);
    assert!(summary.rows1.is_empty());
    assert!(result.qvalues.skipped().iter().any(|s| s.reason
        == SkipReason::NoTestableRows {
            group_label: "b".to_string()
        }));
}

#[test]
fn test_single_row_threshold() {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, ",A,B,C,D").unwrap();
    writeln!(file, "ROW,1,2,3,100").unwrap();
    file.flush().unwrap();

    let values = ValuesMatrix::from_path(file.path()).unwrap();
    let outliers = Pipeline::new()
        .iqrs(1.5)
        .no_aggregate()
        .make_outlier_table(&values)
        .unwrap();
    let counts = outliers.counts();

    assert_eq!(
        (0..4).map(|c| counts.outliers_at(0, c)).collect::<Vec<_>>(),
        vec![0, 0, 0, 1]
    );
    assert_eq!(
        (0..4).map(|c| counts.not_outliers_at(0, c)).collect::<Vec<_>>(),
        vec![1, 1, 1, 0]
    );
}

#[test]
fn test_full_run_aggregated() {
    let dir = TempDir::new().unwrap();
    let (values, annotations) = load_inputs(dir.path());

    let output = Pipeline::new()
        .name("integration")
        .aggregate("-")
        .frac_filter(Some(0.3))
        .run(&values, &annotations)
        .unwrap();

    assert_eq!(
        output.outliers.counts().row_ids(),
        &["CTL", "FLAT", "NOISE", "SIG"]
    );

    // control has more samples, so it is group 0
    let control = ComparisonKey::fdr("arm", "control");
    let treated = ComparisonKey::fdr("arm", "treated");
    let qvalues = &output.qvalues;
    assert_eq!(qvalues.columns(), &[control.clone(), treated.clone()]);
    assert_eq!(qvalues.row_ids(), &["CTL", "SIG"]);

    // [[4, 0], [8, 8]]
    assert_relative_eq!(
        qvalues.get("CTL", &control).unwrap(),
        565.0 / 4845.0,
        epsilon = 1e-10
    );
    assert!(qvalues.get("SIG", &treated).unwrap() < 1e-3);
    assert!(qvalues.get("SIG", &control).unwrap().is_nan());

    // The three-valued column is skipped and the run carries on
    assert_eq!(qvalues.comparisons(), &["arm"]);
    assert!(qvalues
        .skipped()
        .iter()
        .any(|s| s.comparison == "site" && s.reason == SkipReason::NotTwoGroups { n_values: 3 }));

    assert_eq!(output.summary.n_input_rows, Some(5));
    assert_eq!(output.summary.n_tested_rows, 2);
}

#[test]
fn test_counts_cover_every_value() {
    let dir = TempDir::new().unwrap();
    let (values, _) = load_inputs(dir.path());

    let site_level = Pipeline::new().no_aggregate().make_outlier_table(&values).unwrap();
    let gene_level = Pipeline::new().aggregate("-").make_outlier_table(&values).unwrap();

    for outliers in [&site_level, &gene_level] {
        let counts = outliers.counts();
        let total: u64 = (0..counts.n_rows())
            .flat_map(|r| (0..counts.n_samples()).map(move |c| (r, c)))
            .map(|(r, c)| counts.total_at(r, c))
            .sum();
        assert_eq!(total as usize, values.n_features() * values.n_samples());
    }
}

#[test]
fn test_enrichment_is_one_directional() {
    let dir = TempDir::new().unwrap();
    let (values, annotations) = load_inputs(dir.path());

    let config = PipelineConfig {
        aggregate: false,
        frac_filter: None,
        ..Default::default()
    };
    let (_, qvalues) = deva(&values, &annotations, &config).unwrap();

    let control = ComparisonKey::fdr("arm", "control");
    let treated = ComparisonKey::fdr("arm", "treated");
    for row in qvalues.row_ids() {
        let q_control = qvalues.get(row, &control).unwrap();
        let q_treated = qvalues.get(row, &treated).unwrap();
        assert!(
            q_control.is_nan() || q_treated.is_nan(),
            "{} tested in both directions",
            row
        );
    }
    // Without the fraction filter NOISE-a is tested for treated (1/8 > 1/12)
    assert!(!qvalues.get("NOISE-a", &treated).unwrap().is_nan());
}

#[test]
fn test_reruns_write_identical_tables() {
    let dir = TempDir::new().unwrap();
    let (values, annotations) = load_inputs(dir.path());

    let run = |name: &str| {
        let options = OutputOptions {
            prefix: prefix_in(dir.path(), name),
            save_frac_table: true,
            save_comparison_summaries: true,
            save_signed_log_qvalues: true,
            save_parameters: false,
            ..Default::default()
        };
        Pipeline::new()
            .write_outputs(options)
            .run(&values, &annotations)
            .unwrap()
            .written
    };

    let first = run("first");
    let second = run("second");
    assert_eq!(first.len(), second.len());
    assert!(!first.is_empty());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(
            fs::read(a).unwrap(),
            fs::read(b).unwrap(),
            "{} differs from {}",
            a.display(),
            b.display()
        );
    }
}

#[test]
fn test_gene_lists() {
    let dir = TempDir::new().unwrap();
    let (values, annotations) = load_inputs(dir.path());
    let prefix = prefix_in(dir.path(), "lists");

    Pipeline::new()
        .fdr(0.05)
        .write_outputs(OutputOptions {
            prefix: prefix.clone(),
            save_gene_lists: true,
            ..Default::default()
        })
        .run(&values, &annotations)
        .unwrap();

    let treated =
        fs::read_to_string(format!("{}.fisherFDR_arm_treated.sig_genes.fdr0.05.txt", prefix))
            .unwrap();
    assert_eq!(treated.lines().collect::<Vec<_>>(), vec!["SIG"]);

    let control =
        fs::read_to_string(format!("{}.fisherFDR_arm_control.sig_genes.fdr0.05.txt", prefix))
            .unwrap();
    assert!(control.trim().is_empty());
}

#[test]
fn test_reloaded_count_table_gives_same_qvalues() {
    let dir = TempDir::new().unwrap();
    let (values, annotations) = load_inputs(dir.path());
    let prefix = prefix_in(dir.path(), "reload");

    let direct = Pipeline::new()
        .write_outputs(OutputOptions {
            prefix: prefix.clone(),
            save_qvalues: false,
            save_parameters: false,
            ..Default::default()
        })
        .run(&values, &annotations)
        .unwrap();

    let reloaded = OutlierTable::from_count_path(
        format!("{}.up.count_table.tsv", prefix),
        Direction::Up,
        &ColumnNaming::default(),
    )
    .unwrap();
    assert_eq!(reloaded.counts().row_ids(), direct.outliers.counts().row_ids());
    assert_eq!(reloaded.iqrs(), None);

    let again = Pipeline::new()
        .run_comparisons(reloaded.clone(), &annotations)
        .unwrap();
    assert_eq!(again.summary.iqrs, None);
    assert_eq!(again.qvalues.columns(), direct.qvalues.columns());
    for key in direct.qvalues.columns() {
        for row in direct.qvalues.row_ids() {
            let a = direct.qvalues.get(row, key).unwrap();
            let b = again.qvalues.get(row, key).unwrap();
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }
    }

    let recorded = Pipeline::new()
        .run_comparisons(reloaded.with_iqrs(1.5), &annotations)
        .unwrap();
    assert_eq!(recorded.summary.iqrs, Some(1.5));
}

#[test]
fn test_bonferroni_run() {
    let dir = TempDir::new().unwrap();
    let (values, annotations) = load_inputs(dir.path());

    let run = |method: CorrectionMethod| {
        Pipeline::new()
            .no_aggregate()
            .frac_filter(None)
            .correction(method)
            .run(&values, &annotations)
            .unwrap()
    };
    let bonferroni = run(CorrectionMethod::Bonferroni);
    let bh = run(CorrectionMethod::BenjaminiHochberg);

    let control = ComparisonKey::fdr("arm", "control");
    let treated = ComparisonKey::fdr("arm", "treated");

    // Treated: SIG-a and SIG-b on [[4, 0], [4, 12]] (p = 70/4845),
    // NOISE-a on [[1, 1], [7, 11]] (p = 1); three tests
    let summary = &bonferroni.summaries[0];
    let p_sig = 70.0 / 4845.0;
    let treated_rows: Vec<(&str, f64)> = summary
        .rows1
        .iter()
        .map(|r| (r.row_id.as_str(), r.p_value))
        .collect();
    assert_eq!(treated_rows.len(), 3);
    assert_eq!(treated_rows[0].0, "SIG-a");
    assert_relative_eq!(treated_rows[0].1, p_sig, epsilon = 1e-12);
    assert_relative_eq!(treated_rows[2].1, 1.0, epsilon = 1e-12);

    let q = &bonferroni.qvalues;
    assert_relative_eq!(q.get("SIG-a", &treated).unwrap(), 3.0 * p_sig, epsilon = 1e-12);
    assert_relative_eq!(q.get("SIG-b", &treated).unwrap(), 3.0 * p_sig, epsilon = 1e-12);
    assert_relative_eq!(q.get("NOISE-a", &treated).unwrap(), 1.0, epsilon = 1e-12);
    // A single test in the control direction is left as is
    assert_relative_eq!(
        q.get("CTL-a", &control).unwrap(),
        565.0 / 4845.0,
        epsilon = 1e-12
    );

    // BH on the same p-values: (3 / 2) * p for the tied pair
    assert_relative_eq!(
        bh.qvalues.get("SIG-a", &treated).unwrap(),
        1.5 * p_sig,
        epsilon = 1e-12
    );
    assert_eq!(bonferroni.summary.significant[1].n_significant, 2);
}

#[test]
fn test_signed_log_qvalues_single_column() {
    let (outliers, annotations) = two_by_two_inputs();
    let dir = TempDir::new().unwrap();
    let prefix = prefix_in(dir.path(), "signed");

    let output = Pipeline::new()
        .frac_filter(Some(0.0))
        .write_outputs(OutputOptions {
            prefix: prefix.clone(),
            save_outlier_table: false,
            save_qvalues: false,
            save_signed_log_qvalues: true,
            save_parameters: false,
            ..Default::default()
        })
        .run_comparisons(outliers, &annotations)
        .unwrap();

    // Only group a was tested; its column is -log10(1/3)
    let signed = output.qvalues.signed_log_qvalues();
    assert_eq!(signed.len(), 1);
    assert_eq!(signed[0].0, "grp_a");
    assert_relative_eq!(signed[0].1[0], 3.0f64.log10(), epsilon = 1e-10);

    let written = fs::read_to_string(format!("{}.up.signed_log_qvalues.tsv", prefix)).unwrap();
    let lines: Vec<Vec<&str>> = written.lines().map(|l| l.split('\t').collect()).collect();
    assert_eq!(lines[0], vec!["", "grp_a"]);
    assert_eq!(lines[1][0], "X");
    let value: f64 = lines[1][1].parse().unwrap();
    assert_relative_eq!(value, 3.0f64.log10(), epsilon = 1e-10);
}

#[test]
fn test_binarized_annotations() {
    let dir = TempDir::new().unwrap();
    let (values, annotations) = load_inputs(dir.path());

    let binarized = annotations.binarize().unwrap();
    assert_eq!(
        binarized.column_names(),
        &["arm", "site_A", "site_B", "site_C"]
    );
    let path = dir.path().join("binarized.tsv");
    binarized.to_tsv(&path).unwrap();
    let reloaded = AnnotationTable::from_path(&path).unwrap();
    assert_eq!(reloaded.column_names(), binarized.column_names());

    let output = Pipeline::new()
        .no_aggregate()
        .frac_filter(None)
        .run(&values, &reloaded)
        .unwrap();
    assert!(output.qvalues.skipped().iter().all(|s| s.comparison != "site"));
    assert!(output.qvalues.comparisons().contains(&"site_A".to_string()));
}

#[test]
fn test_config_file_drives_run() {
    let dir = TempDir::new().unwrap();
    let (values, annotations) = load_inputs(dir.path());

    let yaml = format!(
        "name: from-file\niqrs: 1.5\naggregate: false\nfrac_filter: 0.3\n\
         output:\n  prefix: {}\n  save_parameters: false\n",
        prefix_in(dir.path(), "cfg")
    );
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, yaml).unwrap();

    let config = PipelineConfig::from_file(&config_path).unwrap();
    let output = Pipeline::from_config(&config).run(&values, &annotations).unwrap();
    assert_eq!(output.summary.name, "from-file");
    assert_eq!(output.outliers.counts().n_rows(), 5);
    assert_eq!(output.written.len(), 2);
}

#[test]
fn test_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("bad.yaml");
    fs::write(&config_path, "frac_filter: 1.5\n").unwrap();

    match PipelineConfig::from_file(&config_path) {
        Err(DevaError::Configuration { parameter, .. }) => assert_eq!(parameter, "frac_filter"),
        other => panic!("expected configuration error, got {:?}", other),
    }
}
