//! Error types for the vtile library.
//!
//! This module defines every failure the codec, the tile model and the
//! statistics engine can report. None of them are recovered from locally:
//! a malformed tile is always surfaced to the caller.

use thiserror::Error;

/// Main error type for the vtile library.
///
/// All operations that can fail return `Result<T, TileError>`.
#[derive(Debug, Error)]
pub enum TileError {
    /// The binary input does not start with the tile magic marker.
    #[error("Invalid tile magic: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        /// Magic marker this decoder understands
        expected: [u8; 4],
        /// First four bytes of the input
        found: [u8; 4],
    },

    /// Binary format version not supported by this decoder.
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version written by this encoder
        expected: u8,
        /// Version found in the input
        found: u8,
    },

    /// Binary input is structurally inconsistent.
    ///
    /// Covers unknown type tags, invalid UTF-8, section lengths that disagree
    /// with their content and trailing bytes after the data block.
    #[error("Corrupt tile at byte {position}: {message}")]
    Corrupt {
        /// Byte offset where the problem was detected
        position: usize,
        /// Description of the problem
        message: String,
    },

    /// Binary input is shorter than its header declares.
    #[error("Truncated tile: need {needed} bytes, only {available} available")]
    Truncated {
        /// Number of bytes the header declares
        needed: usize,
        /// Number of bytes actually present
        available: usize,
    },

    /// Two column descriptors share the same name.
    #[error("Schema error: duplicate column '{name}'")]
    DuplicateColumn {
        /// The repeated column name
        name: String,
    },

    /// A data point uses a key that no column descriptor declares.
    #[error("Schema error: data point references undeclared column '{name}'")]
    UndeclaredColumn {
        /// The undeclared key
        name: String,
    },

    /// A value does not fit the declared (or inferred) column type.
    #[error("Schema error: column '{column}' is {expected}, found {found} value")]
    TypeMismatch {
        /// Column name
        column: String,
        /// Declared column type
        expected: String,
        /// Type of the offending value
        found: String,
    },

    /// NaN or infinite float value; the JSON form cannot carry these.
    #[error("Schema error: column '{column}' contains a non-finite float")]
    NonFiniteFloat {
        /// Column name
        column: String,
    },

    /// A column descriptor names a type this library does not know.
    #[error("Schema error: unknown column type '{name}'")]
    UnknownColumnType {
        /// The unrecognized type name
        name: String,
    },

    /// Statistics requested for a column without any observed value.
    #[error("Column '{column}' has no values to compute statistics from")]
    EmptyColumn {
        /// Column name
        column: String,
    },

    /// Error parsing JSON input.
    ///
    /// Wraps errors from the `serde_json` crate.
    #[error("JSON parsing error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    /// JSON input parsed fine but is not shaped like a tile.
    #[error("Invalid tile document: {message}")]
    InvalidDocument {
        /// Description of the shape problem
        message: String,
    },

    /// The source format was not declared and cannot be guessed.
    #[error("Cannot detect the format of {input}; declare the source format explicitly")]
    UndeterminableFormat {
        /// Display name of the input (e.g. `<stdin>`)
        input: String,
    },

    /// A configured safety limit was exceeded.
    #[error("Limit exceeded: {what} is {found}, limit is {limit}")]
    LimitExceeded {
        /// What was being counted
        what: &'static str,
        /// Configured limit
        limit: usize,
        /// Value found in the input
        found: usize,
    },

    /// I/O error.
    ///
    /// Wraps errors from standard I/O operations.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse grouping of [`TileError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Unrecognized or malformed binary input.
    Format,
    /// Binary input shorter than declared.
    Truncation,
    /// Column declarations and data points disagree.
    Schema,
    /// Statistics over a column without values.
    EmptyColumn,
    /// Malformed or mis-shaped JSON.
    Json,
    /// Source format could not be detected.
    Detection,
    /// Safety limit exceeded.
    Limit,
    /// Failure reading or writing a stream.
    Io,
}

impl TileError {
    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            TileError::InvalidMagic { .. }
            | TileError::VersionMismatch { .. }
            | TileError::Corrupt { .. } => ErrorCategory::Format,
            TileError::Truncated { .. } => ErrorCategory::Truncation,
            TileError::DuplicateColumn { .. }
            | TileError::UndeclaredColumn { .. }
            | TileError::TypeMismatch { .. }
            | TileError::NonFiniteFloat { .. }
            | TileError::UnknownColumnType { .. } => ErrorCategory::Schema,
            TileError::EmptyColumn { .. } => ErrorCategory::EmptyColumn,
            TileError::JsonParseError(_) | TileError::InvalidDocument { .. } => {
                ErrorCategory::Json
            }
            TileError::UndeterminableFormat { .. } => ErrorCategory::Detection,
            TileError::LimitExceeded { .. } => ErrorCategory::Limit,
            TileError::IoError(_) => ErrorCategory::Io,
        }
    }

    pub(crate) fn corrupt(position: usize, message: impl Into<String>) -> Self {
        TileError::Corrupt {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_document(message: impl Into<String>) -> Self {
        TileError::InvalidDocument {
            message: message.into(),
        }
    }
}

/// Type alias for Results using `TileError`.
pub type Result<T> = std::result::Result<T, TileError>;
