//! Per-value outlier calling.

pub mod iqr;

pub use iqr::{call_outliers, quantile_sorted, Direction, OutlierMatrix, RowThreshold};
