pub mod codec;
pub mod config;
pub mod error;
pub mod index;

pub use codec::{CompressionMode, CompressionRegistry, Compressor, DataInput, Decompressor};
pub use config::IndexSettings;
pub use error::{LeafdexError, Result};
pub use index::{get_multi_fields, get_multi_terms, Fields, MultiFields, ReaderSlice, Terms};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
