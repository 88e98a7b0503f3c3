//! Conversion and info-report entry points.
//!
//! These glue the codec and the statistics engine to byte streams. The
//! source format is resolved before anything is read, and output is fully
//! rendered in memory before the first byte is written, so a failing input
//! never produces partial output.

use std::io::{Read, Write};

use log::debug;

use crate::codec::{display_name, resolve_format, JsonIndent, TileDecoder, TileEncoder, TileFormat};
use crate::config::CodecConfig;
use crate::error::Result;
use crate::stats::build_report_with;
use crate::tile::Tile;

/// Read a tile, detecting the format from `input_name` unless given.
pub fn read_tile<R: Read>(
    reader: R,
    input_name: Option<&str>,
    source_format: Option<TileFormat>,
    config: &CodecConfig,
) -> Result<Tile> {
    let format = resolve_format(source_format, input_name)?;
    debug!("Reading {} as {}", display_name(input_name), format);
    let tile = TileDecoder::with_config(config.clone()).read(reader, format)?;
    debug!(
        "Read tile with {} columns and {} points",
        tile.column_count(),
        tile.point_count()
    );
    Ok(tile)
}

/// Render a tile in the destination format.
pub fn render(tile: &Tile, dest_format: TileFormat, indent: JsonIndent) -> Result<Vec<u8>> {
    TileEncoder::new().with_indent(indent).encode(tile, dest_format)
}

/// Convert a tile from one stream to another.
pub fn transform<R: Read, W: Write>(
    reader: R,
    input_name: Option<&str>,
    source_format: Option<TileFormat>,
    mut writer: W,
    dest_format: TileFormat,
    indent: JsonIndent,
    config: &CodecConfig,
) -> Result<()> {
    let tile = read_tile(reader, input_name, source_format, config)?;
    let output = render(&tile, dest_format, indent)?;
    writer.write_all(&output)?;
    writer.flush()?;
    debug!("Wrote {} bytes of {}", output.len(), dest_format);
    Ok(())
}

/// Statistics report of a decoded tile as a JSON value.
pub fn compute_info(tile: &Tile, config: &CodecConfig) -> Result<serde_json::Value> {
    Ok(build_report_with(tile, config.empty_column_policy)?.to_value())
}

/// Read a tile and render its statistics report, newline-terminated.
pub fn info<R: Read>(
    reader: R,
    input_name: Option<&str>,
    source_format: Option<TileFormat>,
    indent: JsonIndent,
    config: &CodecConfig,
) -> Result<String> {
    let tile = read_tile(reader, input_name, source_format, config)?;
    let report = build_report_with(&tile, config.empty_column_policy)?;
    let mut text = report.to_json(indent)?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_binary;
    use crate::error::TileError;
    use crate::tile::{DataPoint, Tile};
    use std::io::Cursor;

    /// Reader that fails the test if it is ever read.
    struct Untouchable;

    impl Read for Untouchable {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            panic!("input must not be read");
        }
    }

    #[test]
    fn test_transform_json_to_binary() {
        let input = br#"{"meta": {"v": 1}, "data": [{"a": 1}, {"a": 2}]}"#;
        let mut output = Vec::new();
        transform(
            Cursor::new(&input[..]),
            Some("in.json"),
            None,
            &mut output,
            TileFormat::Tile,
            JsonIndent::default(),
            &CodecConfig::default(),
        )
        .unwrap();
        let tile = crate::codec::decode_binary(&output).unwrap();
        assert_eq!(tile.point_count(), 2);
        assert_eq!(tile.meta()["v"], 1);
    }

    #[test]
    fn test_transform_unnamed_input_fails_before_reading() {
        let mut output = Vec::new();
        let err = transform(
            Untouchable,
            None,
            None,
            &mut output,
            TileFormat::Json,
            JsonIndent::Compact,
            &CodecConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TileError::UndeterminableFormat { .. }));
        assert!(output.is_empty());
    }

    #[test]
    fn test_transform_failure_writes_nothing() {
        let mut output = Vec::new();
        let result = transform(
            Cursor::new(b"VTIL\x01".to_vec()),
            Some("broken.tile"),
            None,
            &mut output,
            TileFormat::Json,
            JsonIndent::Compact,
            &CodecConfig::default(),
        );
        assert!(matches!(result, Err(TileError::Truncated { .. })));
        assert!(output.is_empty());
    }

    #[test]
    fn test_compute_info() {
        let points = vec![DataPoint::new().with("x", 4), DataPoint::new().with("x", -1)];
        let tile = Tile::from_flat_points(points, None, None).unwrap();
        let report = compute_info(&tile, &CodecConfig::default()).unwrap();
        assert_eq!(report["data"], serde_json::json!({"x_min": -1, "x_max": 4}));
        assert_eq!(report["meta"], serde_json::json!({}));
    }

    #[test]
    fn test_info_from_binary_stream() {
        let points = vec![DataPoint::new().with("name", "b"), DataPoint::new().with("name", "a")];
        let tile = Tile::from_flat_points(points, None, None).unwrap();
        let bytes = encode_binary(&tile);
        let text = info(
            Cursor::new(bytes),
            Some("-"),
            Some(TileFormat::Tile),
            JsonIndent::Compact,
            &CodecConfig::default(),
        )
        .unwrap();
        assert_eq!(
            text,
            "{\"cols\":[{\"name\":\"name\",\"type\":\"string\"}],\"data\":{\"name_max\":\"b\",\"name_min\":\"a\"},\"meta\":{}}\n"
        );
    }
}
