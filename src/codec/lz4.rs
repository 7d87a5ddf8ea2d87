//! Fast compression scheme backed by LZ4 block compression
//!
//! Stream layout: `vint(compressed_len)` followed by `compressed_len` bytes
//! of an LZ4 block. The length prefix makes the stream self-delimiting.

use std::io::Write;

use lz4_flex::block::{compress_into, decompress_into, get_maximum_output_size};
use tracing::warn;

use super::compression::{Compressor, Decompressor};
use super::data_io::{write_vint, DataInput};
use crate::error::{LeafdexError, Result};

/// Spare bytes past the original length so the block decoder never has
/// to bounds-check its last sequence against the exact end
pub const DECODE_PADDING: usize = 7;

/// LZ4 block compressor with a reusable output buffer
#[derive(Debug, Default)]
pub struct FastCompressor {
    scratch: Vec<u8>,
}

impl FastCompressor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Compressor for FastCompressor {
    fn compress(&mut self, bytes: &[u8], out: &mut dyn Write) -> Result<()> {
        if bytes.is_empty() {
            write_vint(out, 0)?;
            return Ok(());
        }

        let bound = get_maximum_output_size(bytes.len());
        if self.scratch.len() < bound {
            self.scratch.resize(bound, 0);
        }
        let compressed_len = compress_into(bytes, &mut self.scratch[..bound])
            .map_err(|e| LeafdexError::IndexError(format!("lz4 compression failed: {}", e)))?;

        write_vint(out, compressed_len as u32)?;
        out.write_all(&self.scratch[..compressed_len])?;
        Ok(())
    }
}

/// LZ4 block decompressor
///
/// Holds a scratch buffer for the compressed bytes, so a single instance
/// must not serve two decodes at once; clone it instead.
#[derive(Debug, Default)]
pub struct FastDecompressor {
    scratch: Vec<u8>,
}

impl FastDecompressor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decompressor for FastDecompressor {
    fn decompress<'a>(
        &mut self,
        input: &mut dyn DataInput,
        original_length: usize,
        offset: usize,
        length: usize,
        buf: &'a mut Vec<u8>,
    ) -> Result<&'a [u8]> {
        assert!(
            offset + length <= original_length,
            "window [{}, {}) exceeds original length {}",
            offset,
            offset + length,
            original_length
        );

        let compressed_len = input.read_vint()? as usize;
        let bound = get_maximum_output_size(original_length);
        if compressed_len > bound {
            return Err(LeafdexError::corruption(
                format!(
                    "compressed length {} exceeds bound {} for {} original bytes",
                    compressed_len, bound, original_length
                ),
                input.name(),
            ));
        }

        self.scratch.resize(compressed_len, 0);
        input.read_bytes(&mut self.scratch)?;

        let capacity = original_length + DECODE_PADDING;
        if buf.len() < capacity {
            buf.resize(capacity, 0);
        }

        let decoded = if compressed_len == 0 {
            0
        } else {
            decompress_into(&self.scratch, &mut buf[..capacity]).map_err(|e| {
                warn!(resource = input.name(), error = %e, "lz4 block failed to decode");
                LeafdexError::corruption(format!("lz4 decode failed: {}", e), input.name())
            })?
        };

        if decoded > original_length {
            warn!(
                resource = input.name(),
                decoded, original_length, "decoded block is longer than declared"
            );
            return Err(LeafdexError::LengthMismatch {
                decoded,
                expected: original_length,
                resource: input.name().to_string(),
            });
        }
        if decoded < original_length {
            return Err(LeafdexError::corruption(
                format!(
                    "block ended after {} of {} original bytes",
                    decoded, original_length
                ),
                input.name(),
            ));
        }

        Ok(&buf[offset..offset + length])
    }

    fn clone_box(&self) -> Box<dyn Decompressor> {
        Box::new(FastDecompressor::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::data_io::ByteArrayDataInput;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        FastCompressor::new().compress(data, &mut out).unwrap();
        out
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| ((i * 31) % 251) as u8 ^ (i / 64) as u8).collect()
    }

    #[test]
    fn test_empty_block() {
        let compressed = compress(&[]);
        assert_eq!(compressed, vec![0x80]);

        let mut input = ByteArrayDataInput::new("empty", compressed);
        let mut buf = Vec::new();
        let out = FastDecompressor::new()
            .decompress(&mut input, 0, 0, 0, &mut buf)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_stream_is_self_delimiting() {
        let first = sample(1000);
        let second = vec![b'z'; 300];
        let mut stream = compress(&first);
        let boundary = stream.len();
        stream.extend(compress(&second));

        let mut input = ByteArrayDataInput::new("two-blocks", stream);
        let mut decompressor = FastDecompressor::new();
        let mut buf = Vec::new();

        let out = decompressor
            .decompress(&mut input, first.len(), 0, first.len(), &mut buf)
            .unwrap();
        assert_eq!(out, &first[..]);
        assert_eq!(input.position(), boundary as u64);

        let out = decompressor
            .decompress(&mut input, second.len(), 10, 20, &mut buf)
            .unwrap();
        assert_eq!(out, &second[10..30]);
    }

    #[test]
    fn test_buffer_reuse() {
        let data = sample(64);
        let compressed = compress(&data);
        let mut buf = vec![0u8; 4096];
        let ptr = buf.as_ptr();

        let mut input = ByteArrayDataInput::new("mem", compressed);
        let out = FastDecompressor::new()
            .decompress(&mut input, data.len(), 8, 16, &mut buf)
            .unwrap()
            .to_vec();
        assert_eq!(out, &data[8..24]);
        assert_eq!(buf.len(), 4096);
        assert_eq!(buf.as_ptr(), ptr);
    }

    #[test]
    fn test_truncated_stream() {
        let data = sample(500);
        let mut compressed = compress(&data);
        compressed.truncate(compressed.len() - 5);

        let mut input = ByteArrayDataInput::new("truncated", compressed);
        let mut buf = Vec::new();
        let err = FastDecompressor::new()
            .decompress(&mut input, data.len(), 0, data.len(), &mut buf)
            .unwrap_err();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_declared_length_too_large() {
        let data = sample(200);
        let compressed = compress(&data);

        let mut input = ByteArrayDataInput::new("short", compressed);
        let mut buf = Vec::new();
        let err = FastDecompressor::new()
            .decompress(&mut input, 400, 0, 10, &mut buf)
            .unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    #[should_panic(expected = "exceeds original length")]
    fn test_window_precondition() {
        let compressed = compress(b"hello");
        let mut input = ByteArrayDataInput::new("mem", compressed);
        let mut buf = Vec::new();
        let _ = FastDecompressor::new().decompress(&mut input, 5, 3, 3, &mut buf);
    }
}
