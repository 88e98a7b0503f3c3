//! Binary tile format, version 1.
//!
//! ```text
//! fixed header (24 bytes)
//!   magic        4 bytes   "VTIL"
//!   version      u8        1
//!   flags        u8        0
//!   reserved     u16 LE    0
//!   header_len   u64 LE    length of the header block
//!   data_len     u64 LE    length of the data block
//! header block
//!   meta         varint length + compact JSON object
//!   extra        varint length + compact JSON object (extra top-level fields)
//!   point_count  varint
//!   column_count varint
//!   per column (declared order): type tag u8, name (varint length + UTF-8),
//!                                section length varint
//! data block
//!   column sections, grouped by type (int, float, bool, string) and in
//!   declared order within a group. Each section holds a presence bitmap,
//!   a null bitmap, then the values of present non-null points:
//!   int as zig-zag varint, float as f64 LE, bool bit-packed,
//!   string as varint length + UTF-8.
//! ```
//!
//! All bitmaps are least-significant-bit first with zero padding. Varints
//! are minimal and the JSON objects are in compact sorted-key form, so every
//! tile has exactly one encoding and anything else is rejected. The header
//! block is small and fully validated before the data block is touched, and
//! the section table lets a reader decode one column without the others.

use std::io::Read;

use log::debug;

use super::bytes::{bit, bitmap_len, ByteReader, ByteWriter};
use crate::config::CodecConfig;
use crate::error::{Result, TileError};
use crate::tile::{
    check_unique, ColumnDescriptor, ColumnType, DataPoint, Meta, Tile, Value, RESERVED_KEYS,
};

/// Magic marker at the start of every binary tile.
pub const MAGIC: [u8; 4] = *b"VTIL";

/// Binary format version written by this encoder.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the fixed header in bytes.
pub const FIXED_HEADER_LEN: usize = 24;

/// Location of one column section, relative to the start of the data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionInfo {
    /// Offset from the start of the data block.
    pub offset: usize,
    /// Section length in bytes.
    pub len: usize,
}

/// Everything in a binary tile except its data block.
#[derive(Debug, Clone, PartialEq)]
pub struct TileHeader {
    /// Format version.
    pub version: u8,
    /// Tile metadata.
    pub meta: Meta,
    /// Extra top-level fields.
    pub extra: Meta,
    /// Column descriptors, in declared order.
    pub cols: Vec<ColumnDescriptor>,
    /// Number of data points.
    pub point_count: usize,
    /// Section table, indexed like `cols`.
    pub sections: Vec<SectionInfo>,
    /// Absolute offset of the data block.
    pub data_offset: usize,
    /// Length of the data block.
    pub data_len: usize,
}

impl TileHeader {
    /// Total length of the encoded tile in bytes.
    pub fn total_len(&self) -> usize {
        self.data_offset + self.data_len
    }

    /// Look up a column and its section by name.
    pub fn section(&self, name: &str) -> Option<(&ColumnDescriptor, SectionInfo)> {
        self.cols
            .iter()
            .zip(&self.sections)
            .find(|(col, _)| col.name == name)
            .map(|(col, section)| (col, *section))
    }
}

struct FixedHeader {
    header_len: usize,
    data_len: usize,
}

/// Encode a tile. Output is a pure function of the tile's content.
pub(crate) fn encode(tile: &Tile) -> Vec<u8> {
    let cols = tile.cols();
    let sections: Vec<Vec<u8>> = cols.iter().map(|col| encode_section(tile, col)).collect();

    let mut header = ByteWriter::new();
    write_json_object(&mut header, tile.meta());
    write_json_object(&mut header, tile.extra());
    header.write_varint(tile.point_count() as u64);
    header.write_varint(cols.len() as u64);
    for (col, section) in cols.iter().zip(&sections) {
        header.write_u8(col.column_type.tag());
        header.write_string(&col.name);
        header.write_varint(section.len() as u64);
    }

    let data_len: usize = sections.iter().map(Vec::len).sum();
    let mut out = ByteWriter::with_capacity(FIXED_HEADER_LEN + header.len() + data_len);
    out.write_slice(&MAGIC);
    out.write_u8(FORMAT_VERSION);
    out.write_u8(0);
    out.write_u16(0);
    out.write_u64(header.len() as u64);
    out.write_u64(data_len as u64);
    out.write_slice(&header.into_inner());
    for index in grouped_order(cols) {
        out.write_slice(&sections[index]);
    }

    let out = out.into_inner();
    debug!(
        "Encoded tile: {} columns, {} points, {} bytes",
        cols.len(),
        tile.point_count(),
        out.len()
    );
    out
}

fn encode_section(tile: &Tile, col: &ColumnDescriptor) -> Vec<u8> {
    let n = tile.point_count();
    let slots: Vec<Option<&Value>> = tile.column_values(&col.name).collect();

    let mut writer = ByteWriter::new();
    writer.write_bitmap(slots.iter().map(Option::is_some), n);
    writer.write_bitmap(slots.iter().map(|slot| matches!(slot, Some(Value::Null))), n);

    let values = slots.iter().filter_map(|slot| *slot).filter(|value| !value.is_null());
    if col.column_type == ColumnType::Bool {
        let bits: Vec<bool> = values.filter_map(Value::as_boolean).collect();
        writer.write_bitmap(bits.iter().copied(), bits.len());
    } else {
        for value in values {
            match value {
                Value::Integer(i) => writer.write_svarint(*i),
                Value::Float(f) => writer.write_f64(*f),
                Value::String(s) => writer.write_string(s),
                Value::Boolean(_) | Value::Null => {}
            }
        }
    }
    writer.into_inner()
}

fn write_json_object(writer: &mut ByteWriter, map: &Meta) {
    writer.write_string(&serde_json::Value::Object(map.clone()).to_string());
}

/// Read a JSON object block, accepting only the form the encoder writes.
fn read_json_object(reader: &mut ByteReader<'_>, what: &str) -> Result<Meta> {
    let len = reader.read_len()?;
    let position = reader.position();
    let raw = reader.take(len)?;
    let map: Meta = serde_json::from_slice(raw)
        .map_err(|e| TileError::corrupt(position, format!("{} is not a JSON object: {}", what, e)))?;
    if serde_json::to_vec(&map)? != raw {
        return Err(TileError::corrupt(
            position,
            format!("{} is not compact sorted-key JSON", what),
        ));
    }
    Ok(map)
}

/// Declared column indexes, stably sorted by type group.
fn grouped_order(cols: &[ColumnDescriptor]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..cols.len()).collect();
    order.sort_by_key(|&index| cols[index].column_type);
    order
}

fn read_fixed_header(bytes: &[u8], config: &CodecConfig) -> Result<FixedHeader> {
    if bytes.len() < MAGIC.len() {
        return Err(TileError::Truncated {
            needed: FIXED_HEADER_LEN,
            available: bytes.len(),
        });
    }
    let mut found = [0u8; 4];
    found.copy_from_slice(&bytes[..MAGIC.len()]);
    if found != MAGIC {
        return Err(TileError::InvalidMagic {
            expected: MAGIC,
            found,
        });
    }
    if bytes.len() < FIXED_HEADER_LEN {
        return Err(TileError::Truncated {
            needed: FIXED_HEADER_LEN,
            available: bytes.len(),
        });
    }

    let mut reader = ByteReader::new(&bytes[MAGIC.len()..FIXED_HEADER_LEN], MAGIC.len(), "fixed header");
    let version = reader.read_u8()?;
    if version != FORMAT_VERSION {
        return Err(TileError::VersionMismatch {
            expected: FORMAT_VERSION,
            found: version,
        });
    }
    let flags_position = reader.position();
    let flags = reader.read_u8()?;
    let reserved = reader.read_u16()?;
    if flags != 0 || reserved != 0 {
        return Err(TileError::corrupt(
            flags_position,
            format!("unsupported flags {:#04x}/{:#06x}", flags, reserved),
        ));
    }

    let header_len = read_block_len(&mut reader)?;
    let data_len = read_block_len(&mut reader)?;
    let total = FIXED_HEADER_LEN
        .checked_add(header_len)
        .and_then(|len| len.checked_add(data_len))
        .ok_or_else(|| TileError::corrupt(FIXED_HEADER_LEN - 16, "declared block lengths overflow"))?;
    config.check_input_size(total)?;

    Ok(FixedHeader {
        header_len,
        data_len,
    })
}

fn read_block_len(reader: &mut ByteReader<'_>) -> Result<usize> {
    let position = reader.position();
    let len = reader.read_u64()?;
    usize::try_from(len)
        .map_err(|_| TileError::corrupt(position, format!("block length {} does not fit in memory", len)))
}

/// Read the fixed header and the header block.
///
/// Only the first `24 + header_len` bytes have to be present; the data block
/// is neither required nor inspected.
pub(crate) fn decode_header(bytes: &[u8], config: &CodecConfig) -> Result<TileHeader> {
    let fixed = read_fixed_header(bytes, config)?;
    let header_end = FIXED_HEADER_LEN + fixed.header_len;
    if bytes.len() < header_end {
        return Err(TileError::Truncated {
            needed: header_end,
            available: bytes.len(),
        });
    }

    let mut reader = ByteReader::new(&bytes[FIXED_HEADER_LEN..header_end], FIXED_HEADER_LEN, "header block");
    let meta = read_json_object(&mut reader, "metadata")?;
    let extra_position = reader.position();
    let extra = read_json_object(&mut reader, "extra fields")?;
    if let Some(key) = extra.keys().find(|key| RESERVED_KEYS.contains(&key.as_str())) {
        return Err(TileError::corrupt(
            extra_position,
            format!("extra field '{}' shadows a reserved key", key),
        ));
    }

    let point_count = reader.read_len()?;
    config.check_points(point_count)?;
    let column_count = reader.read_len()?;
    config.check_columns(column_count)?;

    let table_position = reader.position();
    // A column entry takes at least three bytes.
    let mut cols = Vec::with_capacity(column_count.min(reader.remaining() / 3));
    let mut lens = Vec::with_capacity(cols.capacity());
    for _ in 0..column_count {
        let tag_position = reader.position();
        let tag = reader.read_u8()?;
        let column_type = ColumnType::from_tag(tag).ok_or_else(|| {
            TileError::corrupt(tag_position, format!("unknown column type tag {}", tag))
        })?;
        let name = reader.read_string()?;
        lens.push(reader.read_len()?);
        cols.push(ColumnDescriptor::new(name, column_type));
    }
    reader.finish()?;
    check_unique(&cols).map_err(|e| TileError::corrupt(table_position, e.to_string()))?;

    let mut sections = vec![SectionInfo::default(); cols.len()];
    let mut offset = 0usize;
    for index in grouped_order(&cols) {
        sections[index] = SectionInfo {
            offset,
            len: lens[index],
        };
        offset = offset
            .checked_add(lens[index])
            .ok_or_else(|| TileError::corrupt(header_end, "section lengths overflow"))?;
    }
    if offset != fixed.data_len {
        return Err(TileError::corrupt(
            header_end,
            format!(
                "column sections total {} bytes, data block declares {}",
                offset, fixed.data_len
            ),
        ));
    }

    Ok(TileHeader {
        version: FORMAT_VERSION,
        meta,
        extra,
        cols,
        point_count,
        sections,
        data_offset: header_end,
        data_len: fixed.data_len,
    })
}

/// Decode a complete binary tile.
pub(crate) fn decode(bytes: &[u8], config: &CodecConfig) -> Result<Tile> {
    config.check_input_size(bytes.len())?;
    let header = decode_header(bytes, config)?;

    let total = header.total_len();
    if bytes.len() < total {
        return Err(TileError::Truncated {
            needed: total,
            available: bytes.len(),
        });
    }
    if bytes.len() > total {
        return Err(TileError::corrupt(
            total,
            format!("{} unexpected bytes after the data block", bytes.len() - total),
        ));
    }

    let mut points = vec![DataPoint::new(); header.point_count];
    for (col, section) in header.cols.iter().zip(&header.sections) {
        let slots = decode_section(bytes, &header, col, *section)?;
        for (point, slot) in points.iter_mut().zip(slots) {
            if let Some(value) = slot {
                point.insert(col.name.clone(), value);
            }
        }
    }

    debug!(
        "Decoded tile: {} columns, {} points from {} bytes",
        header.cols.len(),
        header.point_count,
        bytes.len()
    );

    let TileHeader { meta, extra, cols, .. } = header;
    Tile::new(meta, cols, points)?.with_extra(extra)
}

/// Read a binary tile from a stream.
///
/// The fixed header is checked first, so foreign input and declared sizes
/// above the configured limit fail before the body is read.
pub(crate) fn read<R: Read>(mut reader: R, config: &CodecConfig) -> Result<Tile> {
    let mut bytes = Vec::with_capacity(FIXED_HEADER_LEN);
    (&mut reader).take(FIXED_HEADER_LEN as u64).read_to_end(&mut bytes)?;
    let fixed = read_fixed_header(&bytes, config)?;

    let total = FIXED_HEADER_LEN + fixed.header_len + fixed.data_len;
    (&mut reader)
        .take((total - FIXED_HEADER_LEN) as u64)
        .read_to_end(&mut bytes)?;
    if bytes.len() < total {
        return Err(TileError::Truncated {
            needed: total,
            available: bytes.len(),
        });
    }

    let mut extra = Vec::new();
    reader.take(1).read_to_end(&mut extra)?;
    if !extra.is_empty() {
        return Err(TileError::corrupt(total, "unexpected bytes after the data block"));
    }

    decode(&bytes, config)
}

/// Decode a single column, touching only its own section.
///
/// Returns one slot per data point: `None` where the point lacks the column.
pub(crate) fn decode_column(
    bytes: &[u8],
    name: &str,
    config: &CodecConfig,
) -> Result<Option<Vec<Option<Value>>>> {
    let header = decode_header(bytes, config)?;
    match header.section(name) {
        Some((col, section)) => decode_section(bytes, &header, col, section).map(Some),
        None => Ok(None),
    }
}

fn decode_section(
    bytes: &[u8],
    header: &TileHeader,
    col: &ColumnDescriptor,
    section: SectionInfo,
) -> Result<Vec<Option<Value>>> {
    let start = header.data_offset + section.offset;
    let end = start + section.len;
    if bytes.len() < end {
        return Err(TileError::Truncated {
            needed: end,
            available: bytes.len(),
        });
    }

    let n = header.point_count;
    let mut reader = ByteReader::new(&bytes[start..end], start, format!("column '{}' section", col.name));

    let presence_position = reader.position();
    let presence = reader.read_bitmap(n)?;
    check_padding(presence, n, presence_position)?;
    let nulls_position = reader.position();
    let nulls = reader.read_bitmap(n)?;
    check_padding(nulls, n, nulls_position)?;

    let mut slots: Vec<Option<Value>> = Vec::with_capacity(n);
    let mut value_rows = Vec::new();
    for row in 0..n {
        match (bit(presence, row), bit(nulls, row)) {
            (true, true) => slots.push(Some(Value::Null)),
            (true, false) => {
                slots.push(None);
                value_rows.push(row);
            }
            (false, false) => slots.push(None),
            (false, true) => {
                return Err(TileError::corrupt(
                    nulls_position,
                    format!("point {} of column '{}' is null but absent", row, col.name),
                ))
            }
        }
    }

    let count = value_rows.len();
    let values: Vec<Value> = match col.column_type {
        ColumnType::Int => (0..count)
            .map(|_| reader.read_svarint().map(Value::Integer))
            .collect::<Result<_>>()?,
        ColumnType::Float => (0..count)
            .map(|_| {
                let position = reader.position();
                let value = reader.read_f64()?;
                if !value.is_finite() {
                    return Err(TileError::corrupt(
                        position,
                        format!("non-finite float {} in column '{}'", value, col.name),
                    ));
                }
                Ok(Value::Float(value))
            })
            .collect::<Result<_>>()?,
        ColumnType::Bool => {
            let bits_position = reader.position();
            let bits = reader.read_bitmap(count)?;
            check_padding(bits, count, bits_position)?;
            (0..count).map(|i| Value::Boolean(bit(bits, i))).collect()
        }
        ColumnType::String => (0..count)
            .map(|_| reader.read_string().map(Value::String))
            .collect::<Result<_>>()?,
    };
    reader.finish()?;

    for (row, value) in value_rows.into_iter().zip(values) {
        slots[row] = Some(value);
    }
    Ok(slots)
}

fn check_padding(bitmap: &[u8], count: usize, position: usize) -> Result<()> {
    if count % 8 != 0 {
        let last = bitmap[bitmap_len(count) - 1];
        if last >> (count % 8) != 0 {
            return Err(TileError::corrupt(
                position + bitmap.len() - 1,
                "non-zero bitmap padding",
            ));
        }
    }
    Ok(())
}
