//! Per-segment and composite term views
//!
//! # Architecture
//!
//! - `SegmentFields`: one segment's fields, FST term dictionaries over
//!   compressed postings blocks
//! - `MultiFields`: lazily merged, memoized view over many segments
//! - `MultiTerms`: one field's terms across segments, ids remapped by `ReaderSlice`
//! - `get_multi_fields` / `get_multi_terms`: flatten a composite reader

mod multi_fields;
mod multi_terms;
mod reader;
mod segment;
mod term_dict;
mod terms;
mod types;

pub use multi_fields::*;
pub use multi_terms::*;
pub use reader::*;
pub use segment::*;
pub use term_dict::*;
pub use terms::*;
pub use types::*;
