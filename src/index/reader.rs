//! Composite readers and the helpers that flatten them into one [`Fields`]

use std::sync::Arc;

use tracing::debug;

use super::multi_fields::MultiFields;
use super::terms::{Fields, Terms};
use super::types::{DocId, ReaderSlice};

/// One segment as seen from a composite reader
#[derive(Clone)]
pub struct LeafReaderContext {
    /// Fields of the segment, `None` when it has no indexed fields
    pub fields: Option<Arc<dyn Fields>>,
    /// First global document id of the segment
    pub doc_base: DocId,
    /// Number of documents in the segment
    pub max_doc: DocId,
}

impl LeafReaderContext {
    pub fn new(fields: Option<Arc<dyn Fields>>, doc_base: DocId, max_doc: DocId) -> Self {
        Self {
            fields,
            doc_base,
            max_doc,
        }
    }
}

/// Reader exposing an ordered list of segment leaves
pub trait IndexReader {
    fn leaves(&self) -> &[LeafReaderContext];

    /// Global document count across all leaves
    fn max_doc(&self) -> DocId;
}

/// Composite reader over segments laid out back to back
#[derive(Clone, Default)]
pub struct MultiReader {
    leaves: Vec<LeafReaderContext>,
    max_doc: DocId,
}

impl MultiReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment; its doc base is the current global document count
    pub fn add_segment(&mut self, fields: Option<Arc<dyn Fields>>, max_doc: DocId) -> &mut Self {
        self.leaves
            .push(LeafReaderContext::new(fields, self.max_doc, max_doc));
        self.max_doc += max_doc;
        self
    }

    pub fn with_segment(mut self, fields: Option<Arc<dyn Fields>>, max_doc: DocId) -> Self {
        self.add_segment(fields, max_doc);
        self
    }
}

impl IndexReader for MultiReader {
    fn leaves(&self) -> &[LeafReaderContext] {
        &self.leaves
    }

    fn max_doc(&self) -> DocId {
        self.max_doc
    }
}

/// Single [`Fields`] view over every leaf of `reader`.
///
/// No leaves yields `None`; a single leaf (or a single leaf with fields)
/// is returned unwrapped; otherwise a [`MultiFields`] is built.
pub fn get_multi_fields(reader: &dyn IndexReader) -> Option<Arc<dyn Fields>> {
    let leaves = reader.leaves();
    match leaves.len() {
        0 => None,
        1 => leaves[0].fields.clone(),
        _ => {
            let (mut fields, slices) = kept_leaves(reader);
            match fields.len() {
                0 => None,
                1 => fields.pop(),
                n => {
                    debug!(leaves = leaves.len(), with_fields = n, "composing multi fields");
                    Some(Arc::new(MultiFields::new(fields, slices)))
                }
            }
        }
    }
}

/// Leaves that have fields, each paired with its slice of the global id space.
///
/// Ordinals count kept leaves only; every slice spans the reader's `max_doc`.
pub fn kept_leaves(reader: &dyn IndexReader) -> (Vec<Arc<dyn Fields>>, Vec<ReaderSlice>) {
    let mut fields = Vec::new();
    let mut slices = Vec::new();
    for leaf in reader.leaves() {
        if let Some(f) = &leaf.fields {
            slices.push(ReaderSlice::new(leaf.doc_base, reader.max_doc(), fields.len()));
            fields.push(Arc::clone(f));
        }
    }
    (fields, slices)
}

/// Merged terms of `field` across every leaf of `reader`
pub fn get_multi_terms(reader: &dyn IndexReader, field: &str) -> Option<Arc<dyn Terms>> {
    get_multi_fields(reader)?.terms(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::segment::SegmentFields;

    fn segment(name: &str, max_doc: DocId, field: &str, docs: &[DocId]) -> Arc<dyn Fields> {
        let mut builder = SegmentFields::builder(name, max_doc);
        for &doc in docs {
            builder.add(field, "term", doc).unwrap();
        }
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn test_multi_reader_doc_bases() {
        let reader = MultiReader::new()
            .with_segment(None, 10)
            .with_segment(None, 5)
            .with_segment(None, 7);
        let bases: Vec<_> = reader.leaves().iter().map(|l| l.doc_base).collect();
        assert_eq!(bases, vec![0, 10, 15]);
        assert_eq!(reader.max_doc(), 22);
    }

    #[test]
    fn test_no_leaves() {
        let reader = MultiReader::new();
        assert!(get_multi_fields(&reader).is_none());
        assert!(get_multi_terms(&reader, "f").is_none());
    }

    #[test]
    fn test_single_leaf_without_fields() {
        let reader = MultiReader::new().with_segment(None, 3);
        assert!(get_multi_fields(&reader).is_none());
    }

    #[test]
    fn test_single_surviving_leaf_is_unwrapped() {
        let only = segment("b", 4, "f", &[1]);
        let reader = MultiReader::new()
            .with_segment(None, 3)
            .with_segment(Some(Arc::clone(&only)), 4)
            .with_segment(None, 2);

        let fields = get_multi_fields(&reader).unwrap();
        assert!(Arc::ptr_eq(&fields, &only));
        // unwrapped, so ids stay local to the segment
        let terms = fields.terms("f").unwrap();
        assert_eq!(terms.postings("term").unwrap(), Some(vec![1]));
    }

    #[test]
    fn test_kept_leaf_slices() {
        let reader = MultiReader::new()
            .with_segment(None, 3)
            .with_segment(Some(segment("b", 4, "f", &[0])), 4)
            .with_segment(None, 2)
            .with_segment(Some(segment("d", 5, "f", &[4])), 5);

        let (fields, slices) = kept_leaves(&reader);
        assert_eq!(fields.len(), 2);
        assert_eq!(
            slices,
            vec![ReaderSlice::new(3, 14, 0), ReaderSlice::new(9, 14, 1)]
        );
    }

    #[test]
    fn test_leaves_without_fields_are_skipped() {
        let reader = MultiReader::new()
            .with_segment(Some(segment("a", 4, "f", &[0])), 4)
            .with_segment(None, 3)
            .with_segment(Some(segment("c", 4, "f", &[2])), 4);

        let terms = get_multi_terms(&reader, "f").unwrap();
        assert_eq!(terms.postings("term").unwrap(), Some(vec![0, 9]));
        assert!(get_multi_terms(&reader, "g").is_none());
    }
}
