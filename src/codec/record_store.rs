//! Chunked compressed record store
//!
//! Records are buffered into chunks of roughly `chunk_size` uncompressed
//! bytes and each chunk is compressed as one block. Reading a record
//! decodes only the part of its chunk that covers it.
//!
//! File layout:
//! - compressed chunks, back to back
//! - bincode-encoded [`StoreIndex`]
//! - footer: u64 index offset, u32 index length, u32 crc32 of index, u32 magic

use std::io::{self, Write};
use std::sync::Arc;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::compression::{CompressionMode, CompressionRegistry, Compressor, Decompressor};
use super::data_io::DataInput;
use crate::config::IndexSettings;
use crate::error::{LeafdexError, Result};

const STORE_MAGIC: u32 = 0x4C46_5853;
const FOOTER_LEN: u64 = 8 + 4 + 4 + 4;

/// Location of one compressed chunk
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Start of the compressed stream in the file
    pub file_offset: u64,
    /// Id of the first record in the chunk
    pub first_record: u32,
    /// Cumulative record boundaries inside the uncompressed chunk;
    /// one more entry than records, the last being the chunk length
    pub record_offsets: Vec<u32>,
}

impl ChunkMeta {
    pub fn record_count(&self) -> u32 {
        self.record_offsets.len().saturating_sub(1) as u32
    }

    pub fn original_length(&self) -> usize {
        self.record_offsets.last().copied().unwrap_or(0) as usize
    }
}

/// Chunk directory written at the end of a store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreIndex {
    pub compression: u8,
    pub record_count: u32,
    pub chunks: Vec<ChunkMeta>,
}

struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Appends records and writes them as compressed chunks
pub struct RecordStoreWriter<W: Write> {
    out: CountingWriter<W>,
    mode: CompressionMode,
    compressor: Box<dyn Compressor>,
    chunk_size: usize,
    buffer: Vec<u8>,
    pending_offsets: Vec<u32>,
    chunks: Vec<ChunkMeta>,
    record_count: u32,
}

impl<W: Write> RecordStoreWriter<W> {
    pub fn new(out: W, settings: &IndexSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            out: CountingWriter {
                inner: out,
                written: 0,
            },
            mode: settings.compression,
            compressor: settings.compression.new_compressor(),
            chunk_size: settings.chunk_size,
            buffer: Vec::with_capacity(settings.chunk_size),
            pending_offsets: Vec::new(),
            chunks: Vec::new(),
            record_count: 0,
        })
    }

    /// Append a record and return its id
    pub fn add_record(&mut self, record: &[u8]) -> Result<u32> {
        if self.buffer.len() + record.len() > u32::MAX as usize {
            return Err(LeafdexError::InvalidRequest(format!(
                "record of {} bytes does not fit in a chunk",
                record.len()
            )));
        }

        let id = self.record_count;
        self.pending_offsets.push(self.buffer.len() as u32);
        self.buffer.extend_from_slice(record);
        self.record_count += 1;

        if self.buffer.len() >= self.chunk_size {
            self.flush_chunk()?;
        }
        Ok(id)
    }

    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    fn flush_chunk(&mut self) -> Result<()> {
        if self.pending_offsets.is_empty() {
            return Ok(());
        }

        let file_offset = self.out.written;
        let first_record = self.record_count - self.pending_offsets.len() as u32;
        let mut record_offsets = std::mem::take(&mut self.pending_offsets);
        record_offsets.push(self.buffer.len() as u32);

        self.compressor.compress(&self.buffer, &mut self.out)?;
        debug!(
            first_record,
            records = record_offsets.len() - 1,
            original = self.buffer.len(),
            compressed = self.out.written - file_offset,
            "flushed record chunk"
        );

        self.chunks.push(ChunkMeta {
            file_offset,
            first_record,
            record_offsets,
        });
        self.buffer.clear();
        Ok(())
    }

    /// Flush the last chunk, write the chunk index and footer, and return the sink
    pub fn finish(mut self) -> Result<W> {
        self.flush_chunk()?;

        let index = StoreIndex {
            compression: self.mode.id(),
            record_count: self.record_count,
            chunks: std::mem::take(&mut self.chunks),
        };
        let index_bytes = bincode::serialize(&index)?;
        let index_offset = self.out.written;

        let mut hasher = Hasher::new();
        hasher.update(&index_bytes);
        let crc32 = hasher.finalize();

        self.out.write_all(&index_bytes)?;
        self.out.write_all(&index_offset.to_le_bytes())?;
        self.out.write_all(&(index_bytes.len() as u32).to_le_bytes())?;
        self.out.write_all(&crc32.to_le_bytes())?;
        self.out.write_all(&STORE_MAGIC.to_le_bytes())?;
        self.out.flush()?;

        Ok(self.out.inner)
    }
}

/// Random access to records of a finished store
pub struct RecordStoreReader {
    input: Box<dyn DataInput>,
    decompressor: Box<dyn Decompressor>,
    index: Arc<StoreIndex>,
    buffer: Vec<u8>,
}

impl RecordStoreReader {
    pub fn open(mut input: Box<dyn DataInput>, registry: &CompressionRegistry) -> Result<Self> {
        let len = input.len();
        if len < FOOTER_LEN {
            return Err(LeafdexError::corruption(
                format!("file of {} bytes is too short for a footer", len),
                input.name(),
            ));
        }

        input.seek(len - FOOTER_LEN)?;
        let index_offset = input.read_u64_le()?;
        let index_len = input.read_u32_le()? as u64;
        let stored_crc = input.read_u32_le()?;
        let magic = input.read_u32_le()?;

        if magic != STORE_MAGIC {
            return Err(LeafdexError::corruption(
                format!("bad magic {:#x}", magic),
                input.name(),
            ));
        }
        if index_offset.checked_add(index_len) != Some(len - FOOTER_LEN) {
            return Err(LeafdexError::corruption(
                format!(
                    "index at {} with length {} does not end at footer {}",
                    index_offset,
                    index_len,
                    len - FOOTER_LEN
                ),
                input.name(),
            ));
        }

        input.seek(index_offset)?;
        let mut index_bytes = vec![0u8; index_len as usize];
        input.read_bytes(&mut index_bytes)?;

        let mut hasher = Hasher::new();
        hasher.update(&index_bytes);
        if hasher.finalize() != stored_crc {
            warn!(resource = input.name(), "record store index checksum mismatch");
            return Err(LeafdexError::corruption(
                "index checksum mismatch",
                input.name(),
            ));
        }

        let index: StoreIndex = bincode::deserialize(&index_bytes)?;
        let decompressor = registry.new_decompressor(index.compression)?;

        Ok(Self {
            input,
            decompressor,
            index: Arc::new(index),
            buffer: Vec::new(),
        })
    }

    pub fn record_count(&self) -> u32 {
        self.index.record_count
    }

    pub fn chunk_count(&self) -> usize {
        self.index.chunks.len()
    }

    pub fn index(&self) -> &StoreIndex {
        &self.index
    }

    /// Read one record
    pub fn get(&mut self, record_id: u32) -> Result<Vec<u8>> {
        if record_id >= self.index.record_count {
            return Err(LeafdexError::InvalidRequest(format!(
                "record {} out of range (count {})",
                record_id, self.index.record_count
            )));
        }

        let pos = self
            .index
            .chunks
            .partition_point(|c| c.first_record <= record_id);
        let chunk = pos
            .checked_sub(1)
            .and_then(|i| self.index.chunks.get(i))
            .filter(|c| record_id - c.first_record < c.record_count())
            .ok_or_else(|| {
                LeafdexError::corruption(
                    format!("no chunk holds record {}", record_id),
                    self.input.name(),
                )
            })?;

        let local = (record_id - chunk.first_record) as usize;
        let start = chunk.record_offsets[local] as usize;
        let end = chunk.record_offsets[local + 1] as usize;
        if start > end || end > chunk.original_length() {
            return Err(LeafdexError::corruption(
                format!("record {} spans invalid range {}..{}", record_id, start, end),
                self.input.name(),
            ));
        }

        self.input.seek(chunk.file_offset)?;
        let record = self.decompressor.decompress(
            self.input.as_mut(),
            chunk.original_length(),
            start,
            end - start,
            &mut self.buffer,
        )?;
        Ok(record.to_vec())
    }

    /// Reader with its own cursor and decompressor, sharing the chunk index
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            input: self.input.try_clone()?,
            decompressor: self.decompressor.clone(),
            index: Arc::clone(&self.index),
            buffer: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::data_io::{ByteArrayDataInput, FileDataInput};

    fn records(n: usize) -> Vec<Vec<u8>> {
        (0..n)
            .map(|i| format!("record-{}-{}", i, "x".repeat(i % 13)).into_bytes())
            .collect()
    }

    fn write_store(records: &[Vec<u8>], chunk_size: usize) -> Vec<u8> {
        let settings = IndexSettings::default().with_chunk_size(chunk_size);
        let mut writer = RecordStoreWriter::new(Vec::new(), &settings).unwrap();
        for (i, r) in records.iter().enumerate() {
            assert_eq!(writer.add_record(r).unwrap(), i as u32);
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_store_reads_every_record() {
        let records = records(200);
        let bytes = write_store(&records, 256);

        let input = Box::new(ByteArrayDataInput::new("store", bytes));
        let mut reader = RecordStoreReader::open(input, &CompressionRegistry::default()).unwrap();
        assert_eq!(reader.record_count(), 200);
        assert!(reader.chunk_count() > 1);

        for i in (0..200).rev() {
            assert_eq!(reader.get(i as u32).unwrap(), records[i]);
        }
        assert!(matches!(
            reader.get(200),
            Err(LeafdexError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_empty_store_and_empty_records() {
        let bytes = write_store(&[], 64);
        let input = Box::new(ByteArrayDataInput::new("empty", bytes));
        let reader = RecordStoreReader::open(input, &CompressionRegistry::default()).unwrap();
        assert_eq!(reader.record_count(), 0);
        assert_eq!(reader.chunk_count(), 0);

        let records = vec![Vec::new(), b"a".to_vec(), Vec::new()];
        let bytes = write_store(&records, 64);
        let input = Box::new(ByteArrayDataInput::new("sparse", bytes));
        let mut reader = RecordStoreReader::open(input, &CompressionRegistry::default()).unwrap();
        assert_eq!(reader.get(0).unwrap(), Vec::<u8>::new());
        assert_eq!(reader.get(1).unwrap(), b"a".to_vec());
        assert_eq!(reader.get(2).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_corrupt_footer_and_index() {
        let records = records(20);
        let mut bytes = write_store(&records, 64);
        let registry = CompressionRegistry::default();

        let mut bad_magic = bytes.clone();
        let n = bad_magic.len();
        bad_magic[n - 1] ^= 0xFF;
        let err = RecordStoreReader::open(Box::new(ByteArrayDataInput::new("m", bad_magic)), &registry)
            .err()
            .unwrap();
        assert!(err.is_corruption());

        let index_offset = u64::from_le_bytes(bytes[n - 20..n - 12].try_into().unwrap()) as usize;
        bytes[index_offset] ^= 0xFF;
        let err = RecordStoreReader::open(Box::new(ByteArrayDataInput::new("idx", bytes)), &registry)
            .err()
            .unwrap();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("checksum"));

        let err = RecordStoreReader::open(Box::new(ByteArrayDataInput::new("tiny", vec![1, 2])), &registry)
            .err()
            .unwrap();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_unknown_scheme_is_unsupported() {
        let bytes = write_store(&records(5), 64);
        let input = Box::new(ByteArrayDataInput::new("store", bytes));
        let err = RecordStoreReader::open(input, &CompressionRegistry::empty())
            .err()
            .unwrap();
        assert!(matches!(err, LeafdexError::Unsupported(_)));
    }

    #[test]
    fn test_file_backed_clones_read_in_parallel() {
        let records = records(500);
        let bytes = write_store(&records, 512);
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("records.lfx");
        std::fs::write(&path, bytes).unwrap();

        let input = Box::new(FileDataInput::open(&path).unwrap());
        let reader = RecordStoreReader::open(input, &CompressionRegistry::default()).unwrap();

        std::thread::scope(|s| {
            for t in 0..4 {
                let mut local = reader.try_clone().unwrap();
                let records = &records;
                s.spawn(move || {
                    for i in (t..records.len()).step_by(4) {
                        assert_eq!(local.get(i as u32).unwrap(), records[i]);
                    }
                });
            }
        });
    }
}
