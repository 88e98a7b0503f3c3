//! Tile codec: binary and JSON encoding plus format detection.
//!
//! [`TileDecoder`] and [`TileEncoder`] carry the configuration; the free
//! functions [`decode_binary`], [`encode_binary`], [`decode_json`] and
//! [`encode_json`] use the defaults.
//!
//! # Examples
//!
//! ```
//! use vtile::{decode_binary, encode_binary, decode_json};
//!
//! let tile = decode_json(r#"{"c1": 1, "c2": 2}"#).unwrap();
//! let bytes = encode_binary(&tile);
//! assert_eq!(decode_binary(&bytes).unwrap(), tile);
//! ```

mod binary;
mod bytes;
mod detect;
mod json;

use std::io::Read;

pub use binary::{SectionInfo, TileHeader, FIXED_HEADER_LEN, FORMAT_VERSION, MAGIC};
pub use detect::{
    detect_format, display_name, resolve_format, Detection, TileFormat, JSON_SUFFIX, STDIN_NAME,
};
pub use json::JsonIndent;
pub(crate) use json::to_json_string;

use crate::config::CodecConfig;
use crate::error::Result;
use crate::tile::{Tile, Value};

/// Decoder for binary and JSON tiles.
#[derive(Debug, Clone, Default)]
pub struct TileDecoder {
    config: CodecConfig,
}

impl TileDecoder {
    /// Create a decoder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with custom configuration.
    pub fn with_config(config: CodecConfig) -> Self {
        Self { config }
    }

    /// The decoder's configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Decode a complete binary tile.
    pub fn decode_binary(&self, bytes: &[u8]) -> Result<Tile> {
        binary::decode(bytes, &self.config)
    }

    /// Read a binary tile from a stream.
    ///
    /// The fixed header is validated before the rest is read, so a foreign
    /// or oversized input is rejected without reading it in full.
    pub fn read_binary<R: Read>(&self, reader: R) -> Result<Tile> {
        binary::read(reader, &self.config)
    }

    /// Decode only the header of a binary tile.
    pub fn decode_header(&self, bytes: &[u8]) -> Result<TileHeader> {
        binary::decode_header(bytes, &self.config)
    }

    /// Decode a single column of a binary tile.
    ///
    /// Returns `None` when the tile declares no such column, otherwise one
    /// slot per data point.
    pub fn decode_column(&self, bytes: &[u8], name: &str) -> Result<Option<Vec<Option<Value>>>> {
        binary::decode_column(bytes, name, &self.config)
    }

    /// Decode JSON text.
    pub fn decode_json(&self, text: &str) -> Result<Tile> {
        json::decode(text.as_bytes(), &self.config)
    }

    /// Decode an already parsed JSON document.
    pub fn decode_json_value(&self, value: serde_json::Value) -> Result<Tile> {
        json::decode_value(value, &self.config)
    }

    /// Read a JSON document from a stream.
    pub fn read_json<R: Read>(&self, reader: R) -> Result<Tile> {
        let limit = (self.config.max_input_size as u64).saturating_add(1);
        let mut bytes = Vec::new();
        reader.take(limit).read_to_end(&mut bytes)?;
        json::decode(&bytes, &self.config)
    }

    /// Read a tile in the given format from a stream.
    pub fn read<R: Read>(&self, reader: R, format: TileFormat) -> Result<Tile> {
        match format {
            TileFormat::Tile => self.read_binary(reader),
            TileFormat::Json => self.read_json(reader),
        }
    }
}

/// Encoder for binary and JSON tiles.
#[derive(Debug, Clone, Default)]
pub struct TileEncoder {
    indent: JsonIndent,
}

impl TileEncoder {
    /// Create an encoder with the default JSON indentation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the JSON indentation.
    pub fn with_indent(mut self, indent: JsonIndent) -> Self {
        self.indent = indent;
        self
    }

    /// The JSON indentation.
    pub fn indent(&self) -> JsonIndent {
        self.indent
    }

    /// Encode a tile in the binary format. Deterministic.
    pub fn encode_binary(&self, tile: &Tile) -> Vec<u8> {
        binary::encode(tile)
    }

    /// Encode a tile as a JSON document with sorted keys.
    pub fn encode_json(&self, tile: &Tile) -> Result<String> {
        json::encode(tile, self.indent)
    }

    /// Encode a tile in the given format, ready to be written to a file.
    ///
    /// JSON output ends with a newline.
    pub fn encode(&self, tile: &Tile, format: TileFormat) -> Result<Vec<u8>> {
        match format {
            TileFormat::Tile => Ok(self.encode_binary(tile)),
            TileFormat::Json => {
                let mut text = self.encode_json(tile)?;
                text.push('\n');
                Ok(text.into_bytes())
            }
        }
    }
}

/// Decode a binary tile with default limits.
pub fn decode_binary(bytes: &[u8]) -> Result<Tile> {
    TileDecoder::new().decode_binary(bytes)
}

/// Encode a tile in the binary format.
pub fn encode_binary(tile: &Tile) -> Vec<u8> {
    TileEncoder::new().encode_binary(tile)
}

/// Decode a JSON tile document with default limits.
pub fn decode_json(text: &str) -> Result<Tile> {
    TileDecoder::new().decode_json(text)
}

/// Encode a tile as a JSON document.
pub fn encode_json(tile: &Tile, indent: JsonIndent) -> Result<String> {
    TileEncoder::new().with_indent(indent).encode_json(tile)
}
