//! Byte sinks and sources used by the codecs
//!
//! Sinks are plain `std::io::Write` implementations. Sources implement
//! [`DataInput`], a positionable read cursor that also carries a stable
//! resource name so corruption errors can say which file was damaged.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{LeafdexError, Result};

/// Variable-byte encoding: low 7 bits first, high bit set on the final byte
pub fn encode_vint(value: u32, output: &mut Vec<u8>) {
    let mut v = value;
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            output.push(byte | 0x80);
            break;
        } else {
            output.push(byte);
        }
    }
}

/// Write a variable-byte integer to any sink
pub fn write_vint<W: Write + ?Sized>(out: &mut W, value: u32) -> io::Result<()> {
    let mut buf = Vec::with_capacity(5);
    encode_vint(value, &mut buf);
    out.write_all(&buf)
}

/// Decode a variable-byte integer from an in-memory buffer
pub fn decode_vint(input: &[u8], pos: &mut usize) -> io::Result<u32> {
    let mut result: u32 = 0;
    let mut shift = 0;

    loop {
        if *pos >= input.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Unexpected end of vint",
            ));
        }

        let byte = input[*pos];
        *pos += 1;

        result |= ((byte & 0x7F) as u32) << shift;

        if byte & 0x80 != 0 {
            return Ok(result);
        }

        shift += 7;
        if shift > 28 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "VInt value too large",
            ));
        }
    }
}

/// Sequential, positionable source of compressed bytes
pub trait DataInput: Send {
    /// Stable description of the underlying resource, used in error messages
    fn name(&self) -> &str;

    /// Total length of the resource in bytes
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current read position
    fn position(&self) -> u64;

    fn seek(&mut self, pos: u64) -> Result<()>;

    /// Fill `buf` completely or fail
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Independent cursor over the same resource, starting at position 0
    fn try_clone(&self) -> Result<Box<dyn DataInput>>;

    fn read_byte(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_bytes(&mut b)?;
        Ok(b[0])
    }

    fn read_vint(&mut self) -> Result<u32> {
        let mut result: u32 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_byte()?;
            result |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 != 0 {
                return Ok(result);
            }
            shift += 7;
            if shift > 28 {
                return Err(LeafdexError::corruption("vint value too large", self.name()));
            }
        }
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.read_bytes(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    fn read_u64_le(&mut self) -> Result<u64> {
        let mut b = [0u8; 8];
        self.read_bytes(&mut b)?;
        Ok(u64::from_le_bytes(b))
    }
}

/// In-memory source over shared bytes
#[derive(Clone, Debug)]
pub struct ByteArrayDataInput {
    name: String,
    data: Bytes,
    pos: usize,
}

impl ByteArrayDataInput {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            pos: 0,
        }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl DataInput for ByteArrayDataInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn position(&self) -> u64 {
        self.pos as u64
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.data.len() as u64 {
            return Err(LeafdexError::corruption(
                format!("seek past EOF: {} > {}", pos, self.data.len()),
                self.name.as_str(),
            ));
        }
        self.pos = pos as usize;
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.len() > self.remaining() {
            return Err(LeafdexError::corruption(
                format!(
                    "read past EOF: wanted {} bytes at {}, {} available",
                    buf.len(),
                    self.pos,
                    self.remaining()
                ),
                self.name.as_str(),
            ));
        }
        buf.copy_from_slice(&self.data[self.pos..self.pos + buf.len()]);
        self.pos += buf.len();
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn DataInput>> {
        Ok(Box::new(Self::new(self.name.clone(), self.data.clone())))
    }
}

/// Buffered file-backed source
pub struct FileDataInput {
    path: PathBuf,
    name: String,
    reader: BufReader<File>,
    len: u64,
    pos: u64,
}

impl FileDataInput {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            name: path.display().to_string(),
            path,
            reader: BufReader::new(file),
            len,
            pos: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataInput for FileDataInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.len {
            return Err(LeafdexError::corruption(
                format!("seek past EOF: {} > {}", pos, self.len),
                self.name.as_str(),
            ));
        }
        self.reader.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.reader.read_exact(buf) {
            Ok(()) => {
                self.pos += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(LeafdexError::corruption(
                format!("read past EOF: wanted {} bytes at {}", buf.len(), self.pos),
                self.name.as_str(),
            )),
            Err(e) => Err(LeafdexError::Io(e)),
        }
    }

    fn try_clone(&self) -> Result<Box<dyn DataInput>> {
        // A fresh handle, so the clone never shares this cursor's file offset.
        Ok(Box::new(Self::open(&self.path)?))
    }
}
