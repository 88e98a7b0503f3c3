//! Integration tests for the statistics engine and info reports.

use std::io::Cursor;

use vtile::{
    build_report, build_report_with, compute_info, decode_binary, decode_json, encode_binary, info,
    summarize, CodecConfig, ColumnRange, EmptyColumnPolicy, ErrorCategory, JsonIndent,
    Summarizer, TileFormat, Value,
};

#[test]
fn test_summarize_min_max() {
    let tile = decode_json(r#"[{"x": 1}, {"x": 5}, {"x": -2}]"#).unwrap();
    let summary = summarize(tile.cols(), tile.data()).unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(
        summary["x"],
        ColumnRange {
            min: Value::Integer(-2),
            max: Value::Integer(5),
        }
    );
}

#[test]
fn test_report_keeps_other_fields() {
    let tile = decode_json(
        r#"{"meta": {"layer": "roads", "extent": 4096},
            "cols": [{"name": "x", "type": "int"}],
            "data": [{"x": 1}, {"x": 5}, {"x": -2}]}"#,
    )
    .unwrap();
    let report = build_report(&tile).unwrap().to_value();
    assert_eq!(report["data"], serde_json::json!({"x_min": -2, "x_max": 5}));
    assert_eq!(report["meta"], serde_json::json!({"layer": "roads", "extent": 4096}));
    assert_eq!(report["cols"], serde_json::json!([{"name": "x", "type": "int"}]));
}

#[test]
fn test_empty_column_fails_by_default() {
    let tile = decode_json(
        r#"{"cols": [{"name": "x", "type": "int"}, {"name": "y", "type": "float"}],
            "data": [{"x": 1}]}"#,
    )
    .unwrap();
    let err = build_report(&tile).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::EmptyColumn);

    let report = build_report_with(&tile, EmptyColumnPolicy::Omit).unwrap();
    assert_eq!(report.data.len(), 2);
    assert!(!report.data.contains_key("y_min"));
}

#[test]
fn test_all_null_column_is_empty() {
    let tile = decode_json(r#"[{"x": null}, {"x": null}]"#).unwrap();
    assert!(summarize(tile.cols(), tile.data()).is_err());
}

#[test]
fn test_streaming_summarizer_matches_batch() {
    let tile = decode_json(r#"[{"s": "m", "n": 2.5}, {"s": "a"}, {"s": "z", "n": -1.0}]"#).unwrap();
    let mut summarizer = Summarizer::new(tile.cols());
    for point in tile.data() {
        summarizer.observe(point);
    }
    assert_eq!(summarizer.finish().unwrap(), summarize(tile.cols(), tile.data()).unwrap());
}

#[test]
fn test_info_honors_config_policy() {
    let tile = decode_json(
        r#"{"cols": [{"name": "x", "type": "int"}, {"name": "y", "type": "bool"}], "data": [{"x": 7}]}"#,
    )
    .unwrap();
    let config = CodecConfig::new().with_empty_column_policy(EmptyColumnPolicy::Omit);
    let report = compute_info(&tile, &config).unwrap();
    assert_eq!(report["data"], serde_json::json!({"x_min": 7, "x_max": 7}));

    assert!(compute_info(&tile, &CodecConfig::default()).is_err());
}

#[test]
fn test_info_from_binary_input_pretty() {
    let tile = decode_json(r#"[{"b": true}, {"b": false}]"#).unwrap();
    let bytes = encode_binary(&tile);
    let text = info(
        Cursor::new(bytes),
        Some("points.tile"),
        None,
        JsonIndent::Pretty(4),
        &CodecConfig::default(),
    )
    .unwrap();
    let expected = "{\n    \"cols\": [\n        {\n            \"name\": \"b\",\n            \"type\": \"bool\"\n        }\n    ],\n    \"data\": {\n        \"b_max\": true,\n        \"b_min\": false\n    },\n    \"meta\": {}\n}\n";
    assert_eq!(text, expected);
}

#[test]
fn test_info_from_json_with_explicit_format() {
    let input = br#"[{"v": 10}, {"v": 3}]"#;
    let text = info(
        Cursor::new(&input[..]),
        None,
        Some(TileFormat::Json),
        JsonIndent::Compact,
        &CodecConfig::default(),
    )
    .unwrap();
    let report: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(report["data"]["v_min"], 3);
    assert_eq!(report["data"]["v_max"], 10);
}

#[test]
fn test_info_keeps_extra_top_level_fields() {
    let input = br#"{"layer": "roads", "version": 2, "cols": [{"name": "x", "type": "int"}],
                     "data": [{"x": 1}, {"x": 5}, {"x": -2}]}"#;
    let text = info(
        Cursor::new(&input[..]),
        Some("roads.json"),
        None,
        JsonIndent::Compact,
        &CodecConfig::default(),
    )
    .unwrap();
    assert_eq!(
        text,
        "{\"cols\":[{\"name\":\"x\",\"type\":\"int\"}],\"data\":{\"x_max\":5,\"x_min\":-2},\"layer\":\"roads\",\"meta\":{},\"version\":2}\n"
    );

    // The extra fields survive a trip through the binary format too.
    let tile = decode_json(std::str::from_utf8(input).unwrap()).unwrap();
    let report = build_report(&decode_binary(&encode_binary(&tile)).unwrap())
        .unwrap()
        .to_value();
    assert_eq!(report["layer"], "roads");
    assert_eq!(report["version"], 2);
}
