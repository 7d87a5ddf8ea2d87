//! Per-field vocabulary and per-segment field capabilities

use std::sync::Arc;

use super::types::DocId;
use crate::error::Result;

/// Term dictionary and postings for one field
pub trait Terms: Send + Sync {
    /// Number of distinct terms
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of documents with at least one term in this field
    fn doc_count(&self) -> u32;

    /// All distinct terms in lexicographic order
    fn vocabulary(&self) -> Vec<String>;

    /// Number of documents containing `term`, 0 when unknown
    fn doc_freq(&self, term: &str) -> u32;

    /// Ascending document ids containing `term`, `None` when unknown
    fn postings(&self, term: &str) -> Result<Option<Vec<DocId>>>;
}

/// Field name to term dictionary lookup
pub trait Fields: Send + Sync {
    /// Terms of `field`, or `None` when no document defines it
    fn terms(&self, field: &str) -> Option<Arc<dyn Terms>>;

    /// Names of all fields with terms, sorted
    fn field_names(&self) -> Vec<String>;

    fn len(&self) -> usize {
        self.field_names().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
