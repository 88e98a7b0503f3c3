//! # vtile
//!
//! Vector tile codec and statistics library.
//!
//! A tile is opaque metadata, an ordered list of typed columns and an
//! ordered list of data points. This library converts tiles losslessly
//! between a compact columnar binary format, an in-memory model and JSON,
//! and computes per-column min/max reports.
//!
//! ## Features
//!
//! - **Tile model**: validated at construction; column types can be declared
//!   or inferred from the data
//! - **Binary codec**: versioned, length-prefixed, columnar; the header can
//!   be read and single columns decoded without touching the rest
//! - **JSON codec**: accepts a full `{meta, cols, data}` envelope or bare data,
//!   emits sorted keys with configurable indentation
//! - **Statistics**: single-pass min/max per column, folded into a tile-shaped
//!   report
//! - **Thread-safe**: all public types implement `Send + Sync`
//!
//! ## Quick Start
//!
//! ```rust
//! use vtile::{build_report, decode_binary, decode_json, encode_binary, encode_json, JsonIndent};
//!
//! // Bare data: columns and their types are inferred.
//! let tile = decode_json(r#"[{"id": 1, "name": "a"}, {"id": 7}]"#)?;
//!
//! // Binary round trip.
//! let bytes = encode_binary(&tile);
//! assert_eq!(decode_binary(&bytes)?, tile);
//!
//! // JSON round trip.
//! let text = encode_json(&tile, JsonIndent::Pretty(2))?;
//! assert_eq!(decode_json(&text)?, tile);
//!
//! // Statistics.
//! let report = build_report(&tile)?;
//! assert_eq!(report.data["id_max"], vtile::Value::Integer(7));
//! # Ok::<(), vtile::TileError>(())
//! ```
//!
//! ### Configuration
//!
//! ```rust
//! use vtile::{CodecConfig, EmptyColumnPolicy, TileDecoder};
//!
//! let config = CodecConfig::default()
//!     .with_max_points(1_000)
//!     .with_empty_column_policy(EmptyColumnPolicy::Omit);
//!
//! let decoder = TileDecoder::with_config(config);
//! assert!(decoder.decode_json(r#"{"a": 1}"#).is_ok());
//! ```
//!
//! ### Error Handling
//!
//! ```rust
//! use vtile::{decode_binary, ErrorCategory, TileError};
//!
//! match decode_binary(b"VTIL\x01\x00") {
//!     Err(TileError::Truncated { needed, available }) => {
//!         assert_eq!((needed, available), (24, 6));
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//!
//! let err = decode_binary(b"not a tile").unwrap_err();
//! assert_eq!(err.category(), ErrorCategory::Format);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod error;
pub mod stats;
pub mod tile;
pub mod transform;

pub use codec::{
    decode_binary, decode_json, detect_format, encode_binary, encode_json, resolve_format,
    Detection, JsonIndent, SectionInfo, TileDecoder, TileEncoder, TileFormat, TileHeader,
};
pub use config::{CodecConfig, EmptyColumnPolicy};
pub use error::{ErrorCategory, Result, TileError};
pub use stats::{
    build_report, build_report_with, summarize, summarize_with_policy, ColumnRange, Report,
    Summarizer, Summary,
};
pub use tile::{ColumnDescriptor, ColumnType, DataPoint, Meta, Tile, Value};
pub use transform::{compute_info, info, read_tile, render, transform};

/// Compile-time checks that the public types are `Send + Sync`.
#[cfg(test)]
mod thread_safety {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn model_types_are_send_sync() {
        assert_send_sync::<Tile>();
        assert_send_sync::<DataPoint>();
        assert_send_sync::<ColumnDescriptor>();
        assert_send_sync::<Value>();
    }

    #[test]
    fn codec_types_are_send_sync() {
        assert_send_sync::<TileDecoder>();
        assert_send_sync::<TileEncoder>();
        assert_send_sync::<TileHeader>();
        assert_send_sync::<JsonIndent>();
        assert_send_sync::<TileFormat>();
        assert_send_sync::<Detection>();
    }

    #[test]
    fn stats_types_are_send_sync() {
        assert_send_sync::<Summarizer>();
        assert_send_sync::<ColumnRange>();
        assert_send_sync::<Report>();
    }

    #[test]
    fn config_and_error_types_are_send_sync() {
        assert_send_sync::<CodecConfig>();
        assert_send_sync::<TileError>();
    }
}
