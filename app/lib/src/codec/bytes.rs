//! Little-endian primitive reader and writer used by the binary codec.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, TileError};

/// Append-only byte buffer.
#[derive(Debug, Default)]
pub(crate) struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        let mut tmp = [0u8; 2];
        LittleEndian::write_u16(&mut tmp, value);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn write_u64(&mut self, value: u64) {
        let mut tmp = [0u8; 8];
        LittleEndian::write_u64(&mut tmp, value);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn write_f64(&mut self, value: f64) {
        let mut tmp = [0u8; 8];
        LittleEndian::write_f64(&mut tmp, value);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn write_varint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buf.push(((value as u8) & 0x7F) | 0x80);
            value >>= 7;
        }
        self.buf.push(value as u8);
    }

    /// Zig-zag encoded signed varint.
    pub fn write_svarint(&mut self, value: i64) {
        self.write_varint(((value << 1) ^ (value >> 63)) as u64);
    }

    /// Varint length prefix followed by the UTF-8 bytes.
    pub fn write_string(&mut self, text: &str) {
        self.write_varint(text.len() as u64);
        self.buf.extend_from_slice(text.as_bytes());
    }

    pub fn write_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bit-packed booleans, least significant bit first.
    pub fn write_bitmap<I: IntoIterator<Item = bool>>(&mut self, bits: I, count: usize) {
        let start = self.buf.len();
        self.buf.resize(start + bitmap_len(count), 0);
        for (i, bit) in bits.into_iter().enumerate().take(count) {
            if bit {
                self.buf[start + i / 8] |= 1 << (i % 8);
            }
        }
    }
}

/// Number of bytes needed for `count` bits.
pub(crate) fn bitmap_len(count: usize) -> usize {
    count.div_ceil(8)
}

/// Test bit `index` of a bitmap produced by [`ByteWriter::write_bitmap`].
pub(crate) fn bit(bitmap: &[u8], index: usize) -> bool {
    bitmap[index / 8] & (1 << (index % 8)) != 0
}

/// Bounds-checked cursor over a byte slice.
///
/// Running past the end of the slice is reported as [`TileError::Corrupt`]:
/// the slice is always a region whose length was already validated against
/// the input, so a short read means the region's content disagrees with its
/// declared length.
#[derive(Debug)]
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    base: usize,
    region: String,
}

impl<'a> ByteReader<'a> {
    /// `base` is the absolute offset of `bytes` within the input, used in
    /// error positions; `region` names the region in error messages.
    pub fn new(bytes: &'a [u8], base: usize, region: impl Into<String>) -> Self {
        Self {
            bytes,
            pos: 0,
            base,
            region: region.into(),
        }
    }

    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(TileError::corrupt(
                self.position(),
                format!(
                    "{} needs {} more bytes, only {} left",
                    self.region,
                    len,
                    self.remaining()
                ),
            ));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.take(8)?))
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let start = self.position();
        let mut value = 0u64;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            if shift == 63 && byte > 1 {
                return Err(TileError::corrupt(start, "varint overflows 64 bits"));
            }
            value |= ((byte as u64) & 0x7F) << shift;
            if byte & 0x80 == 0 {
                // The writer never emits a zero continuation byte.
                if byte == 0 && shift > 0 {
                    return Err(TileError::corrupt(start, "overlong varint encoding"));
                }
                return Ok(value);
            }
            shift += 7;
        }
    }

    pub fn read_svarint(&mut self) -> Result<i64> {
        let raw = self.read_varint()?;
        Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
    }

    /// Varint that must fit in `usize`.
    pub fn read_len(&mut self) -> Result<usize> {
        let start = self.position();
        let value = self.read_varint()?;
        usize::try_from(value)
            .map_err(|_| TileError::corrupt(start, format!("length {} does not fit in memory", value)))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let start = self.position();
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| TileError::corrupt(start, format!("invalid UTF-8 in {}: {}", self.region, e)))
    }

    pub fn read_bitmap(&mut self, count: usize) -> Result<&'a [u8]> {
        self.take(bitmap_len(count))
    }

    /// Fail unless the whole region was consumed.
    pub fn finish(&self) -> Result<()> {
        if !self.is_empty() {
            return Err(TileError::corrupt(
                self.position(),
                format!("{} has {} unexpected trailing bytes", self.region, self.remaining()),
            ));
        }
        Ok(())
    }
}
