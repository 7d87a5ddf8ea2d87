//! Merged view of one field's terms across segments

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use super::terms::Terms;
use super::types::{DocId, ReaderSlice};
use crate::error::Result;

/// Union of several segments' terms for one field, with document ids
/// translated into the global space by each segment's [`ReaderSlice`].
pub struct MultiTerms {
    subs: Vec<Arc<dyn Terms>>,
    slices: Vec<ReaderSlice>,
    /// Sorted union vocabulary, each term with the indexes of the subs holding it
    vocabulary: Vec<(String, Vec<usize>)>,
}

impl MultiTerms {
    /// # Panics
    ///
    /// Panics if `subs` and `slices` differ in length.
    pub fn new(subs: Vec<Arc<dyn Terms>>, slices: Vec<ReaderSlice>) -> Self {
        assert_eq!(
            subs.len(),
            slices.len(),
            "every sub terms needs exactly one reader slice"
        );
        let vocabulary = merge_vocabularies(&subs);
        Self {
            subs,
            slices,
            vocabulary,
        }
    }

    pub fn subs(&self) -> &[Arc<dyn Terms>] {
        &self.subs
    }

    pub fn slices(&self) -> &[ReaderSlice] {
        &self.slices
    }

    fn holders(&self, term: &str) -> Option<&[usize]> {
        self.vocabulary
            .binary_search_by(|(t, _)| t.as_str().cmp(term))
            .ok()
            .map(|i| self.vocabulary[i].1.as_slice())
    }
}

/// K-way merge of sorted vocabularies; equal terms collapse into one entry
fn merge_vocabularies(subs: &[Arc<dyn Terms>]) -> Vec<(String, Vec<usize>)> {
    let mut iters: Vec<_> = subs.iter().map(|s| s.vocabulary().into_iter()).collect();
    let mut heap = BinaryHeap::new();
    for (i, it) in iters.iter_mut().enumerate() {
        if let Some(term) = it.next() {
            heap.push(Reverse((term, i)));
        }
    }

    let mut merged: Vec<(String, Vec<usize>)> = Vec::new();
    while let Some(Reverse((term, i))) = heap.pop() {
        if let Some(next) = iters[i].next() {
            heap.push(Reverse((next, i)));
        }
        if let Some((last, holders)) = merged.last_mut() {
            if *last == term {
                holders.push(i);
                continue;
            }
        }
        merged.push((term, vec![i]));
    }
    merged
}

impl Terms for MultiTerms {
    fn len(&self) -> usize {
        self.vocabulary.len()
    }

    fn doc_count(&self) -> u32 {
        self.subs.iter().map(|s| s.doc_count()).sum()
    }

    fn vocabulary(&self) -> Vec<String> {
        self.vocabulary.iter().map(|(t, _)| t.clone()).collect()
    }

    fn doc_freq(&self, term: &str) -> u32 {
        self.holders(term)
            .map(|holders| holders.iter().map(|&i| self.subs[i].doc_freq(term)).sum())
            .unwrap_or(0)
    }

    fn postings(&self, term: &str) -> Result<Option<Vec<DocId>>> {
        let holders = match self.holders(term) {
            Some(holders) => holders,
            None => return Ok(None),
        };

        let mut docs = Vec::new();
        for &i in holders {
            if let Some(local) = self.subs[i].postings(term)? {
                let slice = self.slices[i];
                docs.extend(local.into_iter().map(|d| slice.to_global(d)));
            }
        }
        Ok(Some(docs))
    }
}
