//! Basic example demonstrating outlier enrichment analysis.
//!
//! This example shows how to:
//! 1. Create synthetic site-level data
//! 2. Call and count outliers per gene
//! 3. Compare subtypes for outlier enrichment
//! 4. Examine results

use deva::prelude::*;

fn main() -> Result<()> {
    println!("=== DEVA Example ===\n");

    let (values, annotations) = create_example_data()?;

    println!("Data dimensions:");
    println!("  Sites:   {}", values.n_features());
    println!("  Samples: {}", values.n_samples());
    println!("  Missing: {}", values.n_missing());
    println!();

    println!("=== Running Pipeline ===\n");

    let pipeline = Pipeline::new()
        .name("subtype-example")
        .iqrs(1.5)
        .direction(Direction::Up)
        .aggregate("-")
        .frac_filter(Some(0.3))
        .correction(CorrectionMethod::BenjaminiHochberg)
        .fdr(0.05);
    let output = pipeline.run(&values, &annotations)?;

    println!("{}", output.summary);

    println!("=== Tested Rows (by p-value) ===\n");
    println!(
        "{:<12} {:<10} {:>6} {:>6} {:>6} {:>6} {:>12} {:>12}",
        "Gene", "Group", "Out0", "Out1", "Not0", "Not1", "p-value", "q-value"
    );
    println!("{}", "-".repeat(78));

    for summary in &output.summaries {
        for (label, rows) in [(&summary.label0, &summary.rows0), (&summary.label1, &summary.rows1)] {
            let key = ComparisonKey::fdr(&summary.comparison, label);
            let mut rows: Vec<&FisherRow> = rows.iter().collect();
            rows.sort_by(|a, b| a.p_value.total_cmp(&b.p_value));
            for row in rows.iter().take(10) {
                let q = output.qvalues.get(&row.row_id, &key).unwrap_or(f64::NAN);
                println!(
                    "{:<12} {:<10} {:>6} {:>6} {:>6} {:>6} {:>12.2e} {:>12.2e}",
                    row.row_id,
                    label,
                    row.outliers_0,
                    row.outliers_1,
                    row.not_outliers_0,
                    row.not_outliers_1,
                    row.p_value,
                    q
                );
            }
        }
    }

    println!("\n=== Significant Genes (q < 0.05) ===\n");
    for key in output.qvalues.columns() {
        let genes = output.qvalues.significant(key, 0.05);
        println!("  {}: {}", key, if genes.is_empty() { "-".to_string() } else { genes.join(", ") });
    }

    println!("\n=== Pipeline Configuration (YAML) ===\n");
    println!("{}", pipeline.to_config().to_yaml()?);

    Ok(())
}

/// Create example data with known outlier enrichment.
///
/// 30 samples: 10 basal, 20 luminal. Each gene has three sites.
/// - KIT, EGFR: sites spike in a few basal samples each
/// - ESR1: sites spike in a few luminal samples each
/// - the rest: background noise only
fn create_example_data() -> Result<(ValuesMatrix, AnnotationTable)> {
    let n_samples = 30;
    let n_basal = 10;
    let genes = ["KIT", "EGFR", "ESR1", "ACTB", "GAPDH", "TP53", "MYC", "PTEN"];

    let mut seed = 12345u64;
    let mut rand_uniform = move || -> f64 {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        ((seed >> 16) & 0x7FFF) as f64 / 32768.0
    };

    let mut rows = Vec::new();
    let mut site_ids = Vec::new();
    for gene in genes {
        for site in 0..3 {
            // Samples spiking at this site
            let spiked: Vec<usize> = match gene {
                "KIT" | "EGFR" => (0..3).map(|k| (site * 3 + k) % n_basal).collect(),
                "ESR1" => (0..3).map(|k| n_basal + site * 3 + k).collect(),
                _ => Vec::new(),
            };
            let row = (0..n_samples)
                .map(|s| {
                    // Roughly 5% missing
                    if rand_uniform() < 0.05 {
                        return None;
                    }
                    let noise = rand_uniform() - 0.5;
                    let spike = if spiked.contains(&s) { 8.0 } else { 0.0 };
                    Some(noise + spike)
                })
                .collect();
            rows.push(row);
            site_ids.push(format!("{}-S{}", gene, 100 + site * 17));
        }
    }

    let sample_ids: Vec<String> = (0..n_samples).map(|i| format!("TUMOR{:02}", i)).collect();
    let values = ValuesMatrix::from_rows(rows, site_ids, sample_ids.clone())?;

    let annotation_rows = (0..n_samples)
        .map(|i| {
            let subtype = if i < n_basal { "basal" } else { "luminal" };
            vec![Some(subtype.to_string())]
        })
        .collect();
    let annotations = AnnotationTable::new(sample_ids, vec!["subtype".to_string()], annotation_rows)?;

    Ok((values, annotations))
}
