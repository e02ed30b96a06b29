//! DEVA - Differential Outlier Enrichment Analysis CLI
//!
//! Command-line interface for outlier calling and group enrichment testing.

use clap::{Parser, Subcommand, ValueEnum};
use deva::aggregate::OutlierTable;
use deva::call::Direction;
use deva::correct::CorrectionMethod;
use deva::data::{AnnotationTable, ColumnNaming, ValuesMatrix};
use deva::error::Result;
use deva::pipeline::{
    write_outlier_table, OutputOptions, Pipeline, PipelineConfig, RunSummary,
};
use log::LevelFilter;
use std::path::PathBuf;

/// CLI-friendly outlier direction
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliDirection {
    /// Values above the median
    Up,
    /// Values below the median
    Down,
}

impl From<CliDirection> for Direction {
    fn from(direction: CliDirection) -> Self {
        match direction {
            CliDirection::Up => Direction::Up,
            CliDirection::Down => Direction::Down,
        }
    }
}

/// CLI-friendly correction method
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCorrection {
    /// Benjamini-Hochberg FDR
    Bh,
    /// Bonferroni
    Bonferroni,
}

impl From<CliCorrection> for CorrectionMethod {
    fn from(method: CliCorrection) -> Self {
        match method {
            CliCorrection::Bh => CorrectionMethod::BenjaminiHochberg,
            CliCorrection::Bonferroni => CorrectionMethod::Bonferroni,
        }
    }
}

/// Differential Outlier Enrichment Analysis
#[derive(Parser)]
#[command(name = "deva")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Outlier calling parameters shared by subcommands.
#[derive(clap::Args, Debug)]
struct CallArgs {
    /// Number of IQRs beyond the median to call an outlier
    #[arg(long, default_value = "1.5")]
    iqrs: f64,

    /// Outlier direction
    #[arg(short, long, value_enum, default_value = "up")]
    direction: CliDirection,

    /// Count each row on its own instead of summing by identifier prefix
    #[arg(long)]
    no_aggregate: bool,

    /// Separator between the group key and the rest of a row identifier
    #[arg(long, default_value = "-")]
    id_separator: String,
}

/// Comparison parameters shared by subcommands.
#[derive(clap::Args, Debug)]
struct CompareArgs {
    /// Minimum fraction of the group of interest with an outlier
    #[arg(long, default_value = "0.3")]
    frac_filter: f64,

    /// Disable the fraction filter
    #[arg(long)]
    no_frac_filter: bool,

    /// Multiple testing correction
    #[arg(long, value_enum, default_value = "bh")]
    correction: CliCorrection,

    /// Q-value cutoff for gene lists and the summary
    #[arg(long, default_value = "0.05")]
    fdr: f64,

    /// Write a table per comparison with Fisher counts, p-values and q-values
    #[arg(long)]
    write_comparison_summaries: bool,

    /// Write one significant-row list per q-value column
    #[arg(long)]
    write_gene_lists: bool,

    /// Write signed log10 q-values
    #[arg(long)]
    write_signed_log_qvalues: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Call outliers and write the outlier count table
    OutliersTable {
        /// Path to values table (.tsv, .txt or .csv)
        #[arg(long)]
        values: PathBuf,

        /// Prefix for output files
        #[arg(short, long, default_value = "outliers")]
        output_prefix: String,

        #[command(flatten)]
        call: CallArgs,

        /// Also write the outlier fraction table
        #[arg(long)]
        write_frac_table: bool,
    },

    /// Expand multi-valued annotation columns into two-valued columns
    Binarize {
        /// Path to annotation table
        #[arg(short, long)]
        annotations: PathBuf,

        /// Output path for the binarized table
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Compare groups using an existing outlier count table
    CompareGroups {
        /// Path to outlier count table
        #[arg(long)]
        count_table: PathBuf,

        /// Path to annotation table
        #[arg(short, long)]
        annotations: PathBuf,

        /// Direction the count table was called with
        #[arg(short, long, value_enum, default_value = "up")]
        direction: CliDirection,

        /// IQR multiplier the count table was called with, for the record
        #[arg(long)]
        iqrs: Option<f64>,

        /// Prefix for output files
        #[arg(short, long, default_value = "outliers")]
        output_prefix: String,

        #[command(flatten)]
        compare: CompareArgs,

        /// Summary format: text, json, or yaml
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run the whole analysis from values and annotations
    Run {
        /// Path to values table
        #[arg(long)]
        values: PathBuf,

        /// Path to annotation table
        #[arg(short, long)]
        annotations: PathBuf,

        /// Pipeline configuration YAML; replaces the parameter flags
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Prefix for output files
        #[arg(short, long, default_value = "outliers")]
        output_prefix: String,

        #[command(flatten)]
        call: CallArgs,

        #[command(flatten)]
        compare: CompareArgs,

        /// Also write the outlier fraction table
        #[arg(long)]
        write_frac_table: bool,

        /// Summary format: text, json, or yaml
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Generate an example pipeline configuration
    Example {
        /// Output path for example YAML
        #[arg(short, long, default_value = "deva_pipeline.yaml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::OutliersTable {
            values,
            output_prefix,
            call,
            write_frac_table,
        } => cmd_outliers_table(&values, &output_prefix, &call, write_frac_table),

        Commands::Binarize {
            annotations,
            output,
        } => cmd_binarize(&annotations, &output),

        Commands::CompareGroups {
            count_table,
            annotations,
            direction,
            iqrs,
            output_prefix,
            compare,
            format,
        } => cmd_compare_groups(
            &count_table,
            &annotations,
            direction.into(),
            iqrs,
            &output_prefix,
            &compare,
            &format,
        ),

        Commands::Run {
            values,
            annotations,
            config,
            output_prefix,
            call,
            compare,
            write_frac_table,
            format,
        } => {
            let config = match config {
                Some(path) => PipelineConfig::from_file(&path),
                None => Ok(build_config(
                    &output_prefix,
                    &call,
                    &compare,
                    write_frac_table,
                )),
            };
            config.and_then(|config| cmd_run(&values, &annotations, &config, &format))
        }

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn build_config(
    output_prefix: &str,
    call: &CallArgs,
    compare: &CompareArgs,
    write_frac_table: bool,
) -> PipelineConfig {
    PipelineConfig {
        iqrs: call.iqrs,
        direction: call.direction.into(),
        aggregate: !call.no_aggregate,
        id_separator: call.id_separator.clone(),
        frac_filter: (!compare.no_frac_filter).then_some(compare.frac_filter),
        correction: compare.correction.into(),
        fdr: compare.fdr,
        output: output_options(output_prefix, compare, write_frac_table),
        ..Default::default()
    }
}

fn output_options(prefix: &str, compare: &CompareArgs, write_frac_table: bool) -> OutputOptions {
    OutputOptions {
        prefix: prefix.to_string(),
        save_frac_table: write_frac_table,
        save_comparison_summaries: compare.write_comparison_summaries,
        save_gene_lists: compare.write_gene_lists,
        save_signed_log_qvalues: compare.write_signed_log_qvalues,
        ..Default::default()
    }
}

fn print_summary(summary: &RunSummary, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", summary.to_json()?),
        "yaml" => println!("{}", summary.to_yaml()?),
        _ => println!("{}", summary),
    }
    Ok(())
}

fn cmd_outliers_table(
    values_path: &PathBuf,
    output_prefix: &str,
    call: &CallArgs,
    write_frac_table: bool,
) -> Result<()> {
    let config = PipelineConfig {
        iqrs: call.iqrs,
        direction: call.direction.into(),
        aggregate: !call.no_aggregate,
        id_separator: call.id_separator.clone(),
        ..Default::default()
    };
    config.validate()?;

    eprintln!("Loading values...");
    let values = ValuesMatrix::from_path(values_path)?;
    eprintln!(
        "Loaded {} rows x {} samples ({} missing values)",
        values.n_features(),
        values.n_samples(),
        values.n_missing()
    );

    let outliers = Pipeline::from_config(&config).make_outlier_table(&values)?;
    let options = OutputOptions {
        prefix: output_prefix.to_string(),
        save_frac_table: write_frac_table,
        ..Default::default()
    };
    let written = write_outlier_table(&outliers, &options, &ColumnNaming::default())?;

    eprintln!("Done! {} rows counted", outliers.counts().n_rows());
    for path in written {
        eprintln!("  wrote {}", path.display());
    }
    Ok(())
}

fn cmd_binarize(annotations_path: &PathBuf, output_path: &PathBuf) -> Result<()> {
    eprintln!("Loading annotations...");
    let annotations = AnnotationTable::from_path(annotations_path)?;
    let binarized = annotations.binarize()?;

    eprintln!(
        "Binarized {} columns into {} comparisons",
        annotations.n_columns(),
        binarized.n_columns()
    );
    binarized.to_tsv(output_path)?;
    eprintln!("Wrote {:?}", output_path);
    Ok(())
}

fn cmd_compare_groups(
    count_path: &PathBuf,
    annotations_path: &PathBuf,
    direction: Direction,
    iqrs: Option<f64>,
    output_prefix: &str,
    compare: &CompareArgs,
    format: &str,
) -> Result<()> {
    let defaults = PipelineConfig::default();
    let config = PipelineConfig {
        iqrs: iqrs.unwrap_or(defaults.iqrs),
        direction,
        frac_filter: (!compare.no_frac_filter).then_some(compare.frac_filter),
        correction: compare.correction.into(),
        fdr: compare.fdr,
        output: OutputOptions {
            save_outlier_table: false,
            ..output_options(output_prefix, compare, false)
        },
        ..defaults
    };
    config.validate()?;

    eprintln!("Loading data...");
    let naming = ColumnNaming::default();
    let mut outliers = OutlierTable::from_count_path(count_path, direction, &naming)?;
    if let Some(iqrs) = iqrs {
        outliers = outliers.with_iqrs(iqrs);
    }
    let annotations = AnnotationTable::from_path(annotations_path)?;
    eprintln!(
        "Loaded {} rows x {} samples, {} annotation columns",
        outliers.counts().n_rows(),
        outliers.counts().n_samples(),
        annotations.n_columns()
    );

    let output = Pipeline::from_config(&config).run_comparisons(outliers, &annotations)?;
    print_summary(&output.summary, format)
}

fn cmd_run(
    values_path: &PathBuf,
    annotations_path: &PathBuf,
    config: &PipelineConfig,
    format: &str,
) -> Result<()> {
    config.validate()?;

    eprintln!("Loading data...");
    let values = ValuesMatrix::from_path(values_path)?;
    let annotations = AnnotationTable::from_path(annotations_path)?;
    eprintln!(
        "Loaded {} rows x {} samples, {} annotation columns",
        values.n_features(),
        values.n_samples(),
        annotations.n_columns()
    );

    eprintln!("Running pipeline '{}'...", config.name);
    let output = Pipeline::from_config(config).run(&values, &annotations)?;
    eprintln!("Done! {} files written", output.written.len());
    print_summary(&output.summary, format)
}

fn cmd_example(output_path: &PathBuf) -> Result<()> {
    let config = PipelineConfig {
        name: "example-deva".to_string(),
        description: Some(
            "Up outliers at 1.5 IQRs, aggregated to genes, tested in both directions".to_string(),
        ),
        output: OutputOptions {
            save_frac_table: true,
            save_gene_lists: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let yaml = config.to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example pipeline to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}
