//! Data structures for outlier enrichment analysis.

mod annotations;
mod count_table;
mod naming;
mod result;
pub(crate) mod table;
mod values;

pub use annotations::{resolve_groups, Annotation, AnnotationTable, SampleGroups};
pub use count_table::{CountTable, FractionTable};
pub use naming::{ColumnNaming, ComparisonKey, StatKind};
pub use result::{
    write_list, ComparisonSummary, FisherRow, QValueTable, SkipReason, SkippedComparison,
};
pub use values::ValuesMatrix;
