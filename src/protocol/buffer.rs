//! Buffer utilities for reading and writing Firebird protocol data.
//!
//! Firebird uses two byte orders: parameter buffers, info responses and blob
//! segment framing are little-endian ("VAX" order), while row data travels
//! big-endian (XDR order). Both are available here.

use crate::error::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::panic::Location;

/// A buffer for reading Firebird protocol data.
#[derive(Debug, Clone)]
pub struct ReadBuffer {
    data: Bytes,
    pos: usize,
}

impl ReadBuffer {
    /// Create a new read buffer from bytes.
    pub fn new(data: Bytes) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a read buffer over a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Get the current position in the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get the remaining bytes in the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if the buffer has at least `n` bytes remaining.
    pub fn has_remaining(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    #[track_caller]
    fn ensure(&self, n: usize) -> Result<()> {
        if !self.has_remaining(n) {
            return Err(Error::BufferTooSmall {
                needed: n,
                available: self.remaining(),
                location: Location::caller(),
            });
        }
        Ok(())
    }

    /// Skip `n` bytes.
    #[track_caller]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Read a single byte.
    #[track_caller]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let val = self.data[self.pos];
        self.pos += 1;
        Ok(val)
    }

    /// Read a little-endian u16.
    #[track_caller]
    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.ensure(2)?;
        let val = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(val)
    }

    /// Read a big-endian u16.
    #[track_caller]
    pub fn read_u16_be(&mut self) -> Result<u16> {
        self.ensure(2)?;
        let val = u16::from_be_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(val)
    }

    /// Read a big-endian u64.
    #[track_caller]
    pub fn read_u64_be(&mut self) -> Result<u64> {
        self.ensure(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(u64::from_be_bytes(bytes))
    }

    /// Read raw bytes.
    #[track_caller]
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        self.ensure(n)?;
        let bytes = self.data.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(bytes)
    }

    /// Read a little-endian integer of `len` bytes (at most 8).
    ///
    /// This is the "VAX integer" encoding used for info responses and
    /// parameter buffer values. The value is sign-extended.
    #[track_caller]
    pub fn read_vax_integer(&mut self, len: usize) -> Result<i64> {
        if len > 8 {
            return Err(Error::protocol(format!(
                "Invalid VAX integer length: {}",
                len
            )));
        }
        let bytes = self.read_bytes(len)?;
        Ok(vax_integer(&bytes))
    }

    /// Read a blob segment framed as `[u16 LE length][data]`.
    #[track_caller]
    pub fn read_segment(&mut self) -> Result<Bytes> {
        let len = self.read_u16_le()? as usize;
        self.read_bytes(len)
    }
}

/// Decode a little-endian, sign-extended integer of up to 8 bytes.
pub fn vax_integer(bytes: &[u8]) -> i64 {
    if bytes.is_empty() {
        return 0;
    }
    let mut val: u64 = 0;
    for (shift, b) in bytes.iter().take(8).enumerate() {
        val |= (*b as u64) << (shift * 8);
    }
    let bits = bytes.len().min(8) * 8;
    if bits < 64 {
        // Sign extend from the top bit of the last byte
        let sign = 1u64 << (bits - 1);
        ((val ^ sign).wrapping_sub(sign)) as i64
    } else {
        val as i64
    }
}

/// A buffer for writing Firebird protocol data.
#[derive(Debug)]
pub struct WriteBuffer {
    data: BytesMut,
}

impl WriteBuffer {
    /// Create a new write buffer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new write buffer with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
        }
    }

    /// Get the current length of the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the buffer contents as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Freeze the buffer into immutable bytes.
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, val: u8) {
        self.data.put_u8(val);
    }

    /// Write a little-endian u16.
    pub fn write_u16_le(&mut self, val: u16) {
        self.data.put_u16_le(val);
    }

    /// Write a big-endian u16.
    pub fn write_u16_be(&mut self, val: u16) {
        self.data.put_u16(val);
    }

    /// Write a little-endian i32.
    pub fn write_i32_le(&mut self, val: i32) {
        self.data.put_i32_le(val);
    }

    /// Write a big-endian u64.
    pub fn write_u64_be(&mut self, val: u64) {
        self.data.put_u64(val);
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write a blob segment framed as `[u16 LE length][data]`.
    ///
    /// Callers keep `data` at or below the maximum segment size.
    pub fn write_segment(&mut self, data: &[u8]) {
        self.write_u16_le(data.len() as u16);
        self.write_bytes(data);
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}
