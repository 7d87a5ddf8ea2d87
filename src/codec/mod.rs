//! Block compression codecs
//!
//! - `DataInput`: positionable byte source with a resource name for errors
//! - `CompressionMode` / `CompressionRegistry`: scheme selection by id
//! - `FastCompressor` / `FastDecompressor`: LZ4 block scheme
//! - `RecordStoreWriter` / `RecordStoreReader`: chunked compressed records

mod compression;
mod data_io;
mod lz4;
mod record_store;

pub use compression::*;
pub use data_io::*;
pub use lz4::*;
pub use record_store::*;
