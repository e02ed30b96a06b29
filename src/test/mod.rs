//! Statistical testing of outlier enrichment between sample groups.


pub use enrichment::{test_enrichment, EnrichmentResult};
pub use fisher::fisher_exact;
