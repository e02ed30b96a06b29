//! Pipeline composition and execution for outlier enrichment analysis.

pub mod compare;
pub mod config;
pub mod output;
mod runner;
pub mod summary;

pub use compare::{compare_groups, GroupComparisons};
pub use config::{OutputOptions, PipelineConfig};
pub use output::{write_comparison_outputs, write_outlier_table, write_parameters, OutputNaming};
pub use runner::{deva, Pipeline, PipelineOutput, PipelineStage};
pub use summary::{RunSummary, SignificantCount};
