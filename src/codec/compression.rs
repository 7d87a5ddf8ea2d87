//! Compression scheme contract and registry
//!
//! A scheme pairs a [`Compressor`] with a [`Decompressor`]. Compressed
//! streams are self-delimiting: a decompressor needs nothing beyond the
//! declared original length to know how many compressed bytes to consume.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::data_io::DataInput;
use super::lz4::{FastCompressor, FastDecompressor};
use crate::error::{LeafdexError, Result};

/// Encodes byte ranges into self-delimiting compressed streams.
///
/// Instances may keep scratch state between calls and are not meant to
/// be shared; create one per concurrent writer.
pub trait Compressor: Send {
    /// Write a compressed representation of `bytes` to `out`
    fn compress(&mut self, bytes: &[u8], out: &mut dyn Write) -> Result<()>;
}

/// Decodes windows of a compressed block.
pub trait Decompressor: Send {
    /// Decode bytes `[offset, offset + length)` of a block whose
    /// uncompressed size is `original_length`.
    ///
    /// `buf` is reused when large enough and grown otherwise; the returned
    /// slice is exactly `length` bytes long.
    ///
    /// # Panics
    ///
    /// Panics if `offset + length > original_length`.
    fn decompress<'a>(
        &mut self,
        input: &mut dyn DataInput,
        original_length: usize,
        offset: usize,
        length: usize,
        buf: &'a mut Vec<u8>,
    ) -> Result<&'a [u8]>;

    /// Independent decompressor with the same behavior and no shared state
    fn clone_box(&self) -> Box<dyn Decompressor>;
}

impl Clone for Box<dyn Decompressor> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Compression schemes selectable by configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMode {
    /// LZ4 block compression, favors decode speed over ratio
    Fast,
}

impl CompressionMode {
    /// Small integer id persisted alongside compressed data
    pub fn id(self) -> u8 {
        match self {
            CompressionMode::Fast => 1,
        }
    }

    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            1 => Ok(CompressionMode::Fast),
            other => Err(LeafdexError::Unsupported(format!(
                "compression scheme id {}",
                other
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionMode::Fast => "fast",
        }
    }

    /// Constructor pair for this mode
    pub fn scheme(self) -> CompressionScheme {
        match self {
            CompressionMode::Fast => CompressionScheme {
                id: self.id(),
                name: self.name(),
                compressor: new_fast_compressor,
                decompressor: new_fast_decompressor,
            },
        }
    }

    pub fn new_compressor(self) -> Box<dyn Compressor> {
        self.scheme().new_compressor()
    }

    pub fn new_decompressor(self) -> Box<dyn Decompressor> {
        self.scheme().new_decompressor()
    }
}

fn new_fast_compressor() -> Box<dyn Compressor> {
    Box::new(FastCompressor::new())
}

fn new_fast_decompressor() -> Box<dyn Decompressor> {
    Box::new(FastDecompressor::new())
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable pairing of compressor and decompressor constructors
#[derive(Clone, Copy)]
pub struct CompressionScheme {
    pub id: u8,
    pub name: &'static str,
    compressor: fn() -> Box<dyn Compressor>,
    decompressor: fn() -> Box<dyn Decompressor>,
}

impl CompressionScheme {
    pub fn new(
        id: u8,
        name: &'static str,
        compressor: fn() -> Box<dyn Compressor>,
        decompressor: fn() -> Box<dyn Decompressor>,
    ) -> Self {
        Self {
            id,
            name,
            compressor,
            decompressor,
        }
    }

    pub fn new_compressor(&self) -> Box<dyn Compressor> {
        (self.compressor)()
    }

    pub fn new_decompressor(&self) -> Box<dyn Decompressor> {
        (self.decompressor)()
    }
}

impl fmt::Debug for CompressionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionScheme")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Lookup of compression schemes by persisted id
#[derive(Clone, Debug)]
pub struct CompressionRegistry {
    schemes: BTreeMap<u8, CompressionScheme>,
}

impl CompressionRegistry {
    /// Registry without any schemes
    pub fn empty() -> Self {
        Self {
            schemes: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in scheme
    pub fn with_defaults() -> Self {
        Self::empty().register(CompressionMode::Fast.scheme())
    }

    /// Add a scheme, replacing any previous entry with the same id
    pub fn register(mut self, scheme: CompressionScheme) -> Self {
        self.schemes.insert(scheme.id, scheme);
        self
    }

    pub fn lookup(&self, id: u8) -> Result<&CompressionScheme> {
        match self.schemes.get(&id) {
            Some(scheme) => {
                debug!(id, name = scheme.name, "resolved compression scheme");
                Ok(scheme)
            }
            None => Err(LeafdexError::Unsupported(format!(
                "no compression scheme registered for id {}",
                id
            ))),
        }
    }

    pub fn new_compressor(&self, id: u8) -> Result<Box<dyn Compressor>> {
        Ok(self.lookup(id)?.new_compressor())
    }

    pub fn new_decompressor(&self, id: u8) -> Result<Box<dyn Decompressor>> {
        Ok(self.lookup(id)?.new_decompressor())
    }

    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.schemes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}

impl Default for CompressionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
