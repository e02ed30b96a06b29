//! Differential Outlier Enrichment Analysis (DEVA) Library
//!
//! This library finds features whose extreme values are enriched in one
//! group of samples relative to another, for quantitative profiling data
//! such as phosphoproteomics or RNA abundance.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (ValuesMatrix, AnnotationTable, CountTable, QValueTable)
//! - **call**: Per-row outlier calling against median ± k·IQR
//! - **aggregate**: Outlier counting, optionally summed over row groups
//! - **filter**: Fraction-of-samples and directional enrichment filters
//! - **test**: Fisher exact enrichment test
//! - **correct**: Multiple testing correction (Benjamini-Hochberg, Bonferroni)
//! - **pipeline**: Pipeline composition, configuration and outputs
//!
//! # Example
//!
//! ```no_run
//! use deva::prelude::*;
//!
//! // Load data
//! let values = ValuesMatrix::from_path("phospho.tsv").unwrap();
//! let annotations = AnnotationTable::from_path("annotations.tsv").unwrap();
//!
//! // Run analysis pipeline
//! let output = Pipeline::new()
//!     .iqrs(1.5)
//!     .direction(Direction::Up)
//!     .aggregate("-")
//!     .frac_filter(Some(0.3))
//!     .run(&values, &annotations.binarize().unwrap())
//!     .unwrap();
//!
//! println!("{}", output.summary);
//! ```

pub mod aggregate;
pub mod call;
pub mod correct;
pub mod data;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::aggregate::{count_outliers, OutlierTable, RowGrouping, SeparatorPrefix};
    pub use crate::call::{call_outliers, Direction, OutlierMatrix, RowThreshold};
    pub use crate::correct::{adjust_bh, adjust_bonferroni, correct, CorrectionMethod};
    pub use crate::data::{
        resolve_groups, Annotation, AnnotationTable, ColumnNaming, ComparisonKey,
        ComparisonSummary, CountTable, FisherRow, FractionTable, QValueTable, SampleGroups,
        SkipReason, SkippedComparison, StatKind, ValuesMatrix,
    };
    pub use crate::error::{DevaError, Result};
    pub use crate::filter::{
        filter_enriched, filter_for_enrichment, filter_outlier_fraction, FilterResult,
    };
    pub use crate::pipeline::{
        compare_groups, deva, GroupComparisons, OutputNaming, OutputOptions, Pipeline,
        PipelineConfig, PipelineOutput, PipelineStage, RunSummary,
    };
    pub use crate::test::{fisher_exact, test_enrichment, EnrichmentResult};
}
