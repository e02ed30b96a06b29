//! Pipeline runner: outlier calling, counting, comparisons and outputs.

use crate::aggregate::{OutlierTable, RowGrouping, SeparatorPrefix};
use crate::call::Direction;
use crate::correct::CorrectionMethod;
use crate::data::{AnnotationTable, ColumnNaming, ComparisonSummary, QValueTable, ValuesMatrix};
use crate::error::{DevaError, Result};
use crate::pipeline::compare::compare_groups;
use crate::pipeline::config::{OutputOptions, PipelineConfig};
use crate::pipeline::output::{write_comparison_outputs, write_outlier_table, write_parameters};
use crate::pipeline::summary::RunSummary;
use std::fmt;
use std::path::PathBuf;

/// Stages a run moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Initialized,
    OutliersCalled,
    CountsAggregated,
    Compared,
    Finalized,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Initialized => "initialize",
            PipelineStage::OutliersCalled => "call outliers",
            PipelineStage::CountsAggregated => "count outliers",
            PipelineStage::Compared => "compare groups",
            PipelineStage::Finalized => "write outputs",
        };
        f.write_str(name)
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub outliers: OutlierTable,
    pub qvalues: QValueTable,
    pub summaries: Vec<ComparisonSummary>,
    pub summary: RunSummary,
    /// Files written, in order.
    pub written: Vec<PathBuf>,
}

/// Builder for configuring and running an outlier enrichment analysis.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
    naming: ColumnNaming,
    write_outputs: bool,
}

impl Pipeline {
    /// Create a pipeline with default parameters that writes no files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a config; outputs selected in the config are written.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            config: config.clone(),
            naming: ColumnNaming::default(),
            write_outputs: true,
        }
    }

    /// Set the run name.
    pub fn name(mut self, name: &str) -> Self {
        self.config.name = name.to_string();
        self
    }

    /// Set the IQR multiplier.
    pub fn iqrs(mut self, iqrs: f64) -> Self {
        self.config.iqrs = iqrs;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.config.direction = direction;
        self
    }

    /// Aggregate rows by identifier prefix before `separator`.
    pub fn aggregate(mut self, separator: &str) -> Self {
        self.config.aggregate = true;
        self.config.id_separator = separator.to_string();
        self
    }

    /// Count each row on its own.
    pub fn no_aggregate(mut self) -> Self {
        self.config.aggregate = false;
        self
    }

    pub fn frac_filter(mut self, frac_filter: Option<f64>) -> Self {
        self.config.frac_filter = frac_filter;
        self
    }

    pub fn correction(mut self, method: CorrectionMethod) -> Self {
        self.config.correction = method;
        self
    }

    /// Q-value cutoff used for gene lists and summaries.
    pub fn fdr(mut self, fdr: f64) -> Self {
        self.config.fdr = fdr;
        self
    }

    /// Write outputs as selected in `options`.
    pub fn write_outputs(mut self, options: OutputOptions) -> Self {
        self.config.output = options;
        self.write_outputs = true;
        self
    }

    /// Use custom column naming for serialized tables.
    pub fn column_naming(mut self, naming: ColumnNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Export as config.
    pub fn to_config(&self) -> PipelineConfig {
        self.config.clone()
    }

    /// Call outliers and count them.
    pub fn make_outlier_table(&self, values: &ValuesMatrix) -> Result<OutlierTable> {
        self.config.validate()?;
        let separator;
        let grouping: Option<&dyn RowGrouping> = if self.config.aggregate {
            separator = SeparatorPrefix::new(&self.config.id_separator)?;
            Some(&separator)
        } else {
            None
        };

        let outliers = OutlierTable::from_values(
            values,
            values.sample_ids(),
            self.config.iqrs,
            self.config.direction,
            grouping,
        )
        .map_err(|e| stage_error(PipelineStage::OutliersCalled, e))?;
        Ok(outliers)
    }

    /// Run the whole analysis on a values matrix.
    pub fn run(&self, values: &ValuesMatrix, annotations: &AnnotationTable) -> Result<PipelineOutput> {
        log::info!("Making outliers table");
        let outliers = self.make_outlier_table(values)?;
        self.finish(outliers, Some(values.n_features()), annotations)
    }

    /// Run the comparisons on an existing outlier table.
    pub fn run_comparisons(
        &self,
        outliers: OutlierTable,
        annotations: &AnnotationTable,
    ) -> Result<PipelineOutput> {
        self.config.validate()?;
        self.finish(outliers, None, annotations)
    }

    fn finish(
        &self,
        outliers: OutlierTable,
        n_input_rows: Option<usize>,
        annotations: &AnnotationTable,
    ) -> Result<PipelineOutput> {
        for column in annotations.column_names() {
            for (label, _) in annotations.value_counts(column)? {
                if !self.naming.is_lossless_label(&label) {
                    log::warn!(
                        "Label {} of {} contains '{}'; its q-value column will not parse back",
                        label,
                        column,
                        self.naming.separator
                    );
                }
            }
        }

        log::info!("Performing group comparisons");
        let comparisons = compare_groups(
            &outliers,
            annotations,
            self.config.frac_filter,
            self.config.correction,
        )
        .map_err(|e| stage_error(PipelineStage::Compared, e))?;

        let summary = RunSummary::new(
            &self.config.name,
            n_input_rows,
            &outliers,
            &comparisons.qvalues,
            self.config.fdr,
            &self.naming,
        );

        let mut output = PipelineOutput {
            outliers,
            qvalues: comparisons.qvalues,
            summaries: comparisons.summaries,
            summary,
            written: Vec::new(),
        };
        if self.write_outputs {
            output.written = self
                .write(&output)
                .map_err(|e| stage_error(PipelineStage::Finalized, e))?;
        }
        Ok(output)
    }

    fn write(&self, output: &PipelineOutput) -> Result<Vec<PathBuf>> {
        let options = &self.config.output;
        let mut written = write_outlier_table(&output.outliers, options, &self.naming)?;
        written.extend(write_comparison_outputs(
            &output.qvalues,
            &output.summaries,
            output.outliers.direction(),
            self.config.fdr,
            options,
            &self.naming,
        )?);
        if options.save_parameters {
            written.push(write_parameters(&self.config)?);
        }
        Ok(written)
    }
}

fn stage_error(stage: PipelineStage, error: DevaError) -> DevaError {
    match error {
        // Configuration errors already name their parameter
        DevaError::Configuration { .. } => error,
        other => DevaError::Pipeline(format!("Stage '{}' failed: {}", stage, other)),
    }
}

/// Run the full analysis with the given parameters, writing no files.
///
/// Returns the outlier table and the q-value table.
pub fn deva(
    values: &ValuesMatrix,
    annotations: &AnnotationTable,
    config: &PipelineConfig,
) -> Result<(OutlierTable, QValueTable)> {
    let pipeline = Pipeline {
        config: config.clone(),
        naming: ColumnNaming::default(),
        write_outputs: false,
    };
    let output = pipeline.run(values, annotations)?;
    Ok((output.outliers, output.qvalues))
}
