//! Composite fields over several segments
//!
//! Merged terms are built lazily, once per field name, and kept for the
//! lifetime of the composite. Fields missing from every segment are not
//! cached: the space of absent names is unbounded.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use super::multi_terms::MultiTerms;
use super::terms::{Fields, Terms};
use super::types::ReaderSlice;

pub struct MultiFields {
    subs: Vec<Arc<dyn Fields>>,
    slices: Vec<ReaderSlice>,
    terms_cache: RwLock<HashMap<String, Arc<dyn Terms>>>,
}

impl MultiFields {
    /// # Panics
    ///
    /// Panics if `subs` and `slices` differ in length.
    pub fn new(subs: Vec<Arc<dyn Fields>>, slices: Vec<ReaderSlice>) -> Self {
        assert_eq!(
            subs.len(),
            slices.len(),
            "every sub fields needs exactly one reader slice"
        );
        Self {
            subs,
            slices,
            terms_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn subs(&self) -> &[Arc<dyn Fields>] {
        &self.subs
    }

    pub fn slices(&self) -> &[ReaderSlice] {
        &self.slices
    }

    /// Number of fields with merged terms built so far
    pub fn cached_field_count(&self) -> usize {
        self.terms_cache.read().len()
    }
}

impl Fields for MultiFields {
    fn terms(&self, field: &str) -> Option<Arc<dyn Terms>> {
        if let Some(terms) = self.terms_cache.read().get(field) {
            return Some(Arc::clone(terms));
        }

        // Held across the build so concurrent misses build only once.
        let mut cache = self.terms_cache.write();
        if let Some(terms) = cache.get(field) {
            return Some(Arc::clone(terms));
        }

        let mut subs = Vec::new();
        let mut slices = Vec::new();
        for (sub, slice) in self.subs.iter().zip(&self.slices) {
            if let Some(terms) = sub.terms(field) {
                subs.push(terms);
                slices.push(*slice);
            }
        }

        if subs.is_empty() {
            trace!(field, "field absent from every segment");
            return None;
        }

        debug!(field, segments = subs.len(), "building merged terms");
        let merged: Arc<dyn Terms> = Arc::new(MultiTerms::new(subs, slices));
        cache.insert(field.to_string(), Arc::clone(&merged));
        Some(merged)
    }

    fn field_names(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .subs
            .iter()
            .flat_map(|sub| sub.field_names())
            .collect();
        names.into_iter().collect()
    }
}
