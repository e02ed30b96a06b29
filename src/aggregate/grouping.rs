//! Row grouping keys for aggregation.

use crate::error::{DevaError, Result};

/// Maps a row identifier to the key of the group it is aggregated into.
pub trait RowGrouping: Sync {
    fn group_key(&self, row_id: &str) -> String;
}

impl<F> RowGrouping for F
where
    F: Fn(&str) -> String + Sync,
{
    fn group_key(&self, row_id: &str) -> String {
        self(row_id)
    }
}

/// Groups rows by the identifier prefix before the first separator.
///
/// `RAG2-S365` and `RAG2-T12` both map to `RAG2` with separator `-`; an
/// identifier without the separator is its own key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatorPrefix {
    separator: String,
}

impl SeparatorPrefix {
    pub fn new(separator: &str) -> Result<Self> {
        if separator.is_empty() {
            return Err(DevaError::config(
                "id_separator",
                "must be a non-empty string when aggregating",
            ));
        }
        Ok(Self {
            separator: separator.to_string(),
        })
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }
}

impl RowGrouping for SeparatorPrefix {
    fn group_key(&self, row_id: &str) -> String {
        match row_id.split_once(self.separator.as_str()) {
            Some((prefix, _)) => prefix.to_string(),
            None => row_id.to_string(),
        }
    }
}
