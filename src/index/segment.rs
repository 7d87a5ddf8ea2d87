//! Per-segment fields over compressed postings
//!
//! Each field keeps an FST term dictionary and one compressed postings
//! block. A term's postings are delta + vint encoded at a known offset of
//! the uncompressed block, so a lookup decodes just that window.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use roaring::RoaringBitmap;
use tracing::debug;

use super::term_dict::{TermDictionary, TermDictionaryBuilder};
use super::terms::{Fields, Terms};
use super::types::{DocId, PostingListMeta};
use crate::codec::{decode_vint, encode_vint, ByteArrayDataInput, Decompressor};
use crate::config::IndexSettings;
use crate::error::{LeafdexError, Result};

/// Terms of one field within one segment
pub struct SegmentTerms {
    resource: String,
    dict: TermDictionary,
    block: Bytes,
    original_length: usize,
    doc_count: u32,
    decompressor: Mutex<Box<dyn Decompressor>>,
}

impl SegmentTerms {
    /// Size of the compressed postings block
    pub fn compressed_len(&self) -> usize {
        self.block.len()
    }

    fn decode_postings(&self, meta: &PostingListMeta) -> Result<Vec<DocId>> {
        // Each call decodes with its own instance.
        let mut decompressor = self.decompressor.lock().clone_box();
        let mut input = ByteArrayDataInput::new(self.resource.clone(), self.block.clone());
        let mut buf = Vec::new();
        let window = decompressor.decompress(
            &mut input,
            self.original_length,
            meta.offset as usize,
            meta.length as usize,
            &mut buf,
        )?;

        let mut docs = Vec::with_capacity(meta.doc_frequency as usize);
        let mut pos = 0;
        let mut last: DocId = 0;
        for i in 0..meta.doc_frequency {
            let delta = decode_vint(window, &mut pos).map_err(|e| {
                LeafdexError::corruption(format!("postings: {}", e), self.resource.as_str())
            })?;
            let doc = if i == 0 {
                delta
            } else {
                last.checked_add(delta).ok_or_else(|| {
                    LeafdexError::corruption("postings doc id overflow", self.resource.as_str())
                })?
            };
            docs.push(doc);
            last = doc;
        }
        if pos != window.len() {
            return Err(LeafdexError::corruption(
                format!(
                    "postings window has {} trailing bytes",
                    window.len() - pos
                ),
                self.resource.as_str(),
            ));
        }
        Ok(docs)
    }
}

impl Terms for SegmentTerms {
    fn len(&self) -> usize {
        self.dict.len()
    }

    fn doc_count(&self) -> u32 {
        self.doc_count
    }

    fn vocabulary(&self) -> Vec<String> {
        self.dict.terms()
    }

    fn doc_freq(&self, term: &str) -> u32 {
        self.dict.get(term).map(|m| m.doc_frequency).unwrap_or(0)
    }

    fn postings(&self, term: &str) -> Result<Option<Vec<DocId>>> {
        match self.dict.get(term) {
            Some(meta) => Ok(Some(self.decode_postings(meta)?)),
            None => Ok(None),
        }
    }
}

/// All fields of one segment
pub struct SegmentFields {
    name: String,
    max_doc: DocId,
    fields: BTreeMap<String, Arc<SegmentTerms>>,
}

impl SegmentFields {
    pub fn builder(name: impl Into<String>, max_doc: DocId) -> SegmentFieldsBuilder {
        SegmentFieldsBuilder::new(name, max_doc)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of documents in the segment
    pub fn max_doc(&self) -> DocId {
        self.max_doc
    }
}

impl Fields for SegmentFields {
    fn terms(&self, field: &str) -> Option<Arc<dyn Terms>> {
        self.fields
            .get(field)
            .map(|t| Arc::clone(t) as Arc<dyn Terms>)
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Accumulates postings for a segment and freezes them into [`SegmentFields`]
pub struct SegmentFieldsBuilder {
    name: String,
    max_doc: DocId,
    settings: IndexSettings,
    fields: BTreeMap<String, BTreeMap<String, BTreeSet<DocId>>>,
}

impl SegmentFieldsBuilder {
    pub fn new(name: impl Into<String>, max_doc: DocId) -> Self {
        Self {
            name: name.into(),
            max_doc,
            settings: IndexSettings::default(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_settings(mut self, settings: IndexSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Record that `doc` contains `term` in `field`
    pub fn add(&mut self, field: &str, term: &str, doc: DocId) -> Result<()> {
        if doc >= self.max_doc {
            return Err(LeafdexError::InvalidRequest(format!(
                "doc {} out of range for segment {} with {} docs",
                doc, self.name, self.max_doc
            )));
        }
        self.fields
            .entry(field.to_string())
            .or_default()
            .entry(term.to_string())
            .or_default()
            .insert(doc);
        Ok(())
    }

    /// Add every whitespace-separated token of `text` to `field`
    pub fn add_text(&mut self, field: &str, text: &str, doc: DocId) -> Result<()> {
        for token in text.split_whitespace() {
            self.add(field, token, doc)?;
        }
        Ok(())
    }

    pub fn build(self) -> Result<SegmentFields> {
        let mut fields = BTreeMap::new();
        for (field, terms) in self.fields {
            let resource = format!("{}/{}", self.name, field);
            let built = build_field_terms(resource, terms, &self.settings)?;
            fields.insert(field, Arc::new(built));
        }
        debug!(segment = %self.name, fields = fields.len(), "built segment fields");

        Ok(SegmentFields {
            name: self.name,
            max_doc: self.max_doc,
            fields,
        })
    }
}

fn build_field_terms(
    resource: String,
    terms: BTreeMap<String, BTreeSet<DocId>>,
    settings: &IndexSettings,
) -> Result<SegmentTerms> {
    let mut postings = Vec::new();
    let mut docs = RoaringBitmap::new();
    let mut dict = TermDictionaryBuilder::with_capacity(terms.len());

    for (term, doc_ids) in terms {
        let offset = postings.len();
        let mut last = 0;
        for (i, &doc) in doc_ids.iter().enumerate() {
            encode_vint(if i == 0 { doc } else { doc - last }, &mut postings);
            docs.insert(doc);
            last = doc;
        }
        let length = postings.len() - offset;
        if postings.len() > u32::MAX as usize {
            return Err(LeafdexError::IndexError(format!(
                "postings block for {} exceeds 4GB",
                resource
            )));
        }
        dict.add(
            term,
            PostingListMeta {
                offset: offset as u32,
                length: length as u32,
                doc_frequency: doc_ids.len() as u32,
            },
        );
    }

    let mut compressed = Vec::new();
    settings
        .compression
        .new_compressor()
        .compress(&postings, &mut compressed)?;

    Ok(SegmentTerms {
        dict: dict
            .build()
            .map_err(|e| LeafdexError::IndexError(format!("{}: {}", resource, e)))?,
        resource,
        block: Bytes::from(compressed),
        original_length: postings.len(),
        doc_count: docs.len() as u32,
        decompressor: Mutex::new(settings.compression.new_decompressor()),
    })
}
