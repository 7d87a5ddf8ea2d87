//! Core types shared by per-segment and composite views

use serde::{Deserialize, Serialize};
use std::fmt;

/// Document number, local to a segment or global to a composite view
pub type DocId = u32;

/// Placement of one segment inside the global document id space
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReaderSlice {
    /// First global document id contributed by the segment
    pub doc_base: DocId,
    /// Number of documents covered by the slice
    pub doc_count: DocId,
    /// Position of the segment among the composed segments
    pub ordinal: usize,
}

impl ReaderSlice {
    pub fn new(doc_base: DocId, doc_count: DocId, ordinal: usize) -> Self {
        Self {
            doc_base,
            doc_count,
            ordinal,
        }
    }

    /// Translate a segment-local document id into the global space
    pub fn to_global(&self, local: DocId) -> DocId {
        self.doc_base + local
    }

    /// Whether `global` falls in `[doc_base, doc_base + doc_count)`
    pub fn contains(&self, global: DocId) -> bool {
        let end = u64::from(self.doc_base) + u64::from(self.doc_count);
        global >= self.doc_base && u64::from(global) < end
    }
}

impl fmt::Display for ReaderSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slice_{}[base={}, count={}]",
            self.ordinal, self.doc_base, self.doc_count
        )
    }
}

/// Location of one term's postings inside a field's postings block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingListMeta {
    /// Offset in the uncompressed postings block
    pub offset: u32,
    /// Length in bytes
    pub length: u32,
    /// Number of documents containing the term
    pub doc_frequency: u32,
}
