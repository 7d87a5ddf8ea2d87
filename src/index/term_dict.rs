//! Term dictionary using FST (Finite State Transducer)
//!
//! Maps each term to an ordinal into a parallel array of postings metadata.

use std::io;

use fst::{Map, MapBuilder, Streamer};

use super::types::PostingListMeta;

/// Term dictionary backed by FST
pub struct TermDictionary {
    /// FST mapping term -> index in metadata array
    fst: Map<Vec<u8>>,
    /// Metadata for each term (parallel to FST output values)
    metadata: Vec<PostingListMeta>,
}

impl TermDictionary {
    pub fn new(fst_data: Vec<u8>, metadata: Vec<PostingListMeta>) -> io::Result<Self> {
        let fst = Map::new(fst_data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if fst.len() != metadata.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "term dictionary has {} terms but {} metadata entries",
                    fst.len(),
                    metadata.len()
                ),
            ));
        }
        Ok(Self { fst, metadata })
    }

    /// Look up a term and return its postings metadata
    pub fn get(&self, term: &str) -> Option<&PostingListMeta> {
        self.fst
            .get(term.as_bytes())
            .and_then(|idx| self.metadata.get(idx as usize))
    }

    pub fn contains(&self, term: &str) -> bool {
        self.fst.contains_key(term.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// All terms in lexicographic order
    pub fn terms(&self) -> Vec<String> {
        let mut results = Vec::with_capacity(self.metadata.len());
        let mut stream = self.fst.stream();
        while let Some((key, _)) = stream.next() {
            if let Ok(term) = std::str::from_utf8(key) {
                results.push(term.to_string());
            }
        }
        results
    }

    /// Raw FST bytes
    pub fn fst_bytes(&self) -> &[u8] {
        self.fst.as_fst().as_bytes()
    }

    pub fn metadata(&self) -> &[PostingListMeta] {
        &self.metadata
    }
}

/// Builder for term dictionaries
#[derive(Default)]
pub struct TermDictionaryBuilder {
    terms: Vec<(String, PostingListMeta)>,
}

impl TermDictionaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            terms: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, term: String, meta: PostingListMeta) {
        self.terms.push((term, meta));
    }

    pub fn build(mut self) -> io::Result<TermDictionary> {
        // FST requires sorted, unique input
        self.terms.sort_by(|a, b| a.0.cmp(&b.0));
        self.terms.dedup_by(|a, b| a.0 == b.0);

        let mut fst_builder = MapBuilder::memory();
        let mut metadata = Vec::with_capacity(self.terms.len());

        for (idx, (term, meta)) in self.terms.into_iter().enumerate() {
            fst_builder
                .insert(term.as_bytes(), idx as u64)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            metadata.push(meta);
        }

        let fst_data = fst_builder
            .into_inner()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        TermDictionary::new(fst_data, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(offset: u32, doc_frequency: u32) -> PostingListMeta {
        PostingListMeta {
            offset,
            length: 4,
            doc_frequency,
        }
    }

    #[test]
    fn test_term_dictionary_builder() {
        let mut builder = TermDictionaryBuilder::new();
        builder.add("cherry".to_string(), meta(8, 15));
        builder.add("apple".to_string(), meta(0, 10));
        builder.add("banana".to_string(), meta(4, 20));

        let dict = builder.build().unwrap();

        assert_eq!(dict.len(), 3);
        assert!(dict.contains("apple"));
        assert!(!dict.contains("date"));
        assert_eq!(dict.get("banana").unwrap().doc_frequency, 20);
        assert_eq!(dict.get("cherry").unwrap().offset, 8);
        assert_eq!(dict.terms(), vec!["apple", "banana", "cherry"]);
    }

    #[test]
    fn test_mismatched_metadata() {
        let dict = TermDictionaryBuilder::new().build().unwrap();
        assert!(dict.is_empty());

        let err = TermDictionary::new(dict.fst_bytes().to_vec(), vec![meta(0, 1)])
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
