//! Row filters for enrichment testing.

pub mod outliers;

pub use outliers::{
    filter_enriched, filter_for_enrichment, filter_outlier_fraction, outlier_rate, FilterResult,
};
