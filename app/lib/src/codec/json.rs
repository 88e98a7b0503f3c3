//! JSON tile documents.
//!
//! Two document shapes are accepted. A top-level object with a `data` key is
//! a tile envelope (`meta`, `cols`, `data`, plus any extra top-level fields,
//! kept verbatim); anything else is bare data, an array of points or a
//! single point object, with columns inferred.

use std::fmt;
use std::io;
use std::str::FromStr;

use log::debug;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::config::CodecConfig;
use crate::error::{Result, TileError};
use crate::tile::{ColumnSpec, ColumnType, DataPoint, Meta, Tile};

/// Indentation of JSON output.
///
/// Object keys are emitted in sorted order either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonIndent {
    /// Single-line output.
    Compact,
    /// One member per line, nested by the given number of spaces.
    Pretty(usize),
}

impl Default for JsonIndent {
    fn default() -> Self {
        JsonIndent::Pretty(4)
    }
}

impl fmt::Display for JsonIndent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonIndent::Compact => f.write_str("none"),
            JsonIndent::Pretty(width) => write!(f, "{}", width),
        }
    }
}

impl FromStr for JsonIndent {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("none") {
            return Ok(JsonIndent::Compact);
        }
        s.parse::<usize>().map(JsonIndent::Pretty).map_err(|_| {
            format!(
                "invalid indent '{}': expected 'none' or a non-negative integer",
                s
            )
        })
    }
}

/// A parsed JSON document, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum JsonDocument {
    Envelope {
        meta: Meta,
        extra: Meta,
        cols: Option<Vec<ColumnSpec>>,
        data: Vec<DataPoint>,
    },
    BareData(Vec<DataPoint>),
}

impl JsonDocument {
    /// Decide the document shape and convert its parts.
    pub fn classify(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(obj) if obj.contains_key("data") => Self::envelope(obj),
            serde_json::Value::Object(obj) => Ok(JsonDocument::BareData(vec![DataPoint::from_json(&obj)?])),
            serde_json::Value::Array(items) => Ok(JsonDocument::BareData(points_from_array(&items)?)),
            other => Err(TileError::invalid_document(format!(
                "expected a JSON object or array, found {}",
                json_kind(&other)
            ))),
        }
    }

    fn envelope(mut obj: serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let meta = match obj.remove("meta") {
            None | Some(serde_json::Value::Null) => Meta::new(),
            Some(serde_json::Value::Object(meta)) => meta,
            Some(other) => {
                return Err(TileError::invalid_document(format!(
                    "'meta' must be an object, found {}",
                    json_kind(&other)
                )))
            }
        };

        let cols = match obj.remove("cols") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Array(items)) => Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| column_spec(index, item))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(other) => {
                return Err(TileError::invalid_document(format!(
                    "'cols' must be an array, found {}",
                    json_kind(&other)
                )))
            }
        };

        let data = match obj.remove("data") {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(serde_json::Value::Array(items)) => points_from_array(&items)?,
            Some(serde_json::Value::Object(point)) => vec![DataPoint::from_json(&point)?],
            Some(other) => {
                return Err(TileError::invalid_document(format!(
                    "'data' must be an array or an object, found {}",
                    json_kind(&other)
                )))
            }
        };

        if !obj.is_empty() {
            debug!("Keeping {} extra top-level fields", obj.len());
        }

        Ok(JsonDocument::Envelope {
            meta,
            extra: obj,
            cols,
            data,
        })
    }

    pub fn is_envelope(&self) -> bool {
        matches!(self, JsonDocument::Envelope { .. })
    }

    pub fn point_count(&self) -> usize {
        match self {
            JsonDocument::Envelope { data, .. } => data.len(),
            JsonDocument::BareData(points) => points.len(),
        }
    }

    /// Build the tile, inferring whatever the document leaves out.
    pub fn into_tile(self) -> Result<Tile> {
        match self {
            JsonDocument::Envelope {
                meta,
                extra,
                cols,
                data,
            } => Tile::from_specs(data, Some(meta), cols)?.with_extra(extra),
            JsonDocument::BareData(points) => Tile::from_specs(points, None, None),
        }
    }
}

fn column_spec(index: usize, item: &serde_json::Value) -> Result<ColumnSpec> {
    let obj = item.as_object().ok_or_else(|| {
        TileError::invalid_document(format!(
            "column {} must be an object, found {}",
            index,
            json_kind(item)
        ))
    })?;
    let name = match obj.get("name") {
        Some(serde_json::Value::String(name)) => name.clone(),
        _ => {
            return Err(TileError::invalid_document(format!(
                "column {} needs a string 'name'",
                index
            )))
        }
    };
    let column_type = match obj.get("type") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(type_name)) => Some(type_name.parse::<ColumnType>()?),
        Some(other) => {
            return Err(TileError::invalid_document(format!(
                "'type' of column '{}' must be a string, found {}",
                name,
                json_kind(other)
            )))
        }
    };
    Ok(ColumnSpec { name, column_type })
}

fn points_from_array(items: &[serde_json::Value]) -> Result<Vec<DataPoint>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            serde_json::Value::Object(obj) => DataPoint::from_json(obj),
            other => Err(TileError::invalid_document(format!(
                "data point {} must be an object, found {}",
                index,
                json_kind(other)
            ))),
        })
        .collect()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Decode an already parsed JSON document.
pub(crate) fn decode_value(value: serde_json::Value, config: &CodecConfig) -> Result<Tile> {
    let document = JsonDocument::classify(value)?;
    debug!(
        "JSON document is {} with {} points",
        if document.is_envelope() { "a tile envelope" } else { "bare data" },
        document.point_count()
    );
    config.check_points(document.point_count())?;

    let tile = document.into_tile()?;
    config.check_columns(tile.column_count())?;
    Ok(tile)
}

/// Parse and decode JSON text.
pub(crate) fn decode(bytes: &[u8], config: &CodecConfig) -> Result<Tile> {
    config.check_input_size(bytes.len())?;
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    decode_value(value, config)
}

/// Encode a tile as a JSON document.
pub(crate) fn encode(tile: &Tile, indent: JsonIndent) -> Result<String> {
    to_json_string(&tile.as_plain_structure(), indent)
}

/// Serialize any JSON value with the requested indentation.
pub(crate) fn to_json_string(value: &serde_json::Value, indent: JsonIndent) -> Result<String> {
    match indent {
        JsonIndent::Compact => Ok(serde_json::to_string(value)?),
        JsonIndent::Pretty(width) => {
            let spaces = vec![b' '; width];
            let mut buf = Vec::new();
            let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(&spaces));
            value.serialize(&mut serializer)?;
            String::from_utf8(buf).map_err(|e| TileError::IoError(io::Error::new(io::ErrorKind::InvalidData, e)))
        }
    }
}
