//! Source format detection from input names.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::error::{Result, TileError};

/// File name suffix (case-insensitive) that selects the JSON decoder.
pub const JSON_SUFFIX: &str = ".json";

/// Input name standing for standard input.
pub const STDIN_NAME: &str = "-";

/// Serialized form of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileFormat {
    /// Binary tile.
    Tile,
    /// JSON document.
    Json,
}

impl TileFormat {
    /// Format identifier used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            TileFormat::Tile => "tile",
            TileFormat::Json => "json",
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TileFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tile" => Ok(TileFormat::Tile),
            "json" => Ok(TileFormat::Json),
            _ => Err(format!("unknown tile format '{}': expected 'tile' or 'json'", s)),
        }
    }
}

/// Outcome of guessing a format from an input name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Detection {
    /// The name carries the JSON suffix.
    Json,
    /// Any other name.
    Binary,
    /// No usable name, e.g. a pipe.
    Undeterminable,
}

impl Detection {
    /// The detected format, if any.
    pub fn format(self) -> Option<TileFormat> {
        match self {
            Detection::Json => Some(TileFormat::Json),
            Detection::Binary => Some(TileFormat::Tile),
            Detection::Undeterminable => None,
        }
    }
}

/// Guess the format of an input from its name.
///
/// `None`, the empty string and `-` are unnamed streams.
pub fn detect_format(name: Option<&str>) -> Detection {
    match name {
        None | Some("") | Some(STDIN_NAME) => Detection::Undeterminable,
        Some(name) if has_json_suffix(name) => Detection::Json,
        Some(_) => Detection::Binary,
    }
}

fn has_json_suffix(name: &str) -> bool {
    let name = name.as_bytes();
    let suffix = JSON_SUFFIX.as_bytes();
    name.len() >= suffix.len() && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Pick the source format: the explicit one if given, otherwise by name.
///
/// Fails with [`TileError::UndeterminableFormat`] for an unnamed input
/// without an explicit format. Nothing is read from the input.
pub fn resolve_format(explicit: Option<TileFormat>, name: Option<&str>) -> Result<TileFormat> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    match detect_format(name).format() {
        Some(format) => {
            debug!("Detected {} input from name {:?}", format, name.unwrap_or_default());
            Ok(format)
        }
        None => Err(TileError::UndeterminableFormat {
            input: display_name(name).to_string(),
        }),
    }
}

/// Human-readable input name, `<stdin>` for unnamed streams.
pub fn display_name(name: Option<&str>) -> &str {
    match name {
        None | Some("") | Some(STDIN_NAME) => "<stdin>",
        Some(name) => name,
    }
}
