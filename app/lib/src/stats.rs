//! Statistics engine.
//!
//! Computes, for every declared column, the smallest and largest value found
//! across a tile's data points, and folds the result into a tile-shaped
//! report whose `data` holds `<column>_min` / `<column>_max` entries.
//!
//! Numbers compare numerically, strings by byte order and booleans with
//! `false < true`. Nulls are skipped. Accumulation is a single pass that
//! retains nothing but the running bounds.
//!
//! # Examples
//!
//! ```
//! use vtile::{build_report, decode_json, JsonIndent};
//!
//! let tile = decode_json(r#"[{"x": 1}, {"x": 5}, {"x": -2}]"#).unwrap();
//! let report = build_report(&tile).unwrap();
//! assert_eq!(
//!     report.to_json(JsonIndent::Compact).unwrap(),
//!     r#"{"cols":[{"name":"x","type":"int"}],"data":{"x_max":5,"x_min":-2},"meta":{}}"#
//! );
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::codec::{to_json_string, JsonIndent};
use crate::config::EmptyColumnPolicy;
use crate::error::{Result, TileError};
use crate::tile::{ColumnDescriptor, DataPoint, Meta, Tile, Value};

/// Observed bounds of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRange {
    /// Smallest value.
    pub min: Value,
    /// Largest value.
    pub max: Value,
}

impl ColumnRange {
    fn new(value: &Value) -> Self {
        Self {
            min: value.clone(),
            max: value.clone(),
        }
    }

    fn observe(&mut self, value: &Value) {
        if compare(value, &self.min) == Ordering::Less {
            self.min = value.clone();
        }
        if compare(value, &self.max) == Ordering::Greater {
            self.max = value.clone();
        }
    }
}

/// Per-column bounds, keyed by column name.
pub type Summary = BTreeMap<String, ColumnRange>;

/// Running min/max accumulator over a stream of data points.
#[derive(Debug, Clone)]
pub struct Summarizer {
    cols: Vec<ColumnDescriptor>,
    index: HashMap<String, usize>,
    ranges: Vec<Option<ColumnRange>>,
    policy: EmptyColumnPolicy,
}

impl Summarizer {
    /// Create an accumulator for the given columns, failing on empty ones.
    pub fn new(cols: &[ColumnDescriptor]) -> Self {
        Self {
            cols: cols.to_vec(),
            index: cols
                .iter()
                .enumerate()
                .map(|(i, col)| (col.name.clone(), i))
                .collect(),
            ranges: vec![None; cols.len()],
            policy: EmptyColumnPolicy::default(),
        }
    }

    /// Set the policy for columns without any observed value.
    pub fn with_policy(mut self, policy: EmptyColumnPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fold one data point into the running bounds.
    ///
    /// Null values and keys outside the column list are ignored.
    pub fn observe(&mut self, point: &DataPoint) {
        for (name, value) in point.iter() {
            if value.is_null() {
                continue;
            }
            if let Some(&i) = self.index.get(name) {
                match &mut self.ranges[i] {
                    Some(range) => range.observe(value),
                    slot => *slot = Some(ColumnRange::new(value)),
                }
            }
        }
    }

    /// Finish the pass.
    pub fn finish(self) -> Result<Summary> {
        let mut summary = Summary::new();
        for (col, range) in self.cols.into_iter().zip(self.ranges) {
            match range {
                Some(range) => {
                    summary.insert(col.name, range);
                }
                None => match self.policy {
                    EmptyColumnPolicy::Fail => {
                        return Err(TileError::EmptyColumn { column: col.name });
                    }
                    EmptyColumnPolicy::Omit => {
                        debug!("Omitting column '{}' without values from the report", col.name);
                    }
                },
            }
        }
        Ok(summary)
    }
}

/// Total order used for the bounds.
///
/// Values of one column always share a kind; mixed kinds only occur for
/// integers against floats, which compare numerically.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let x = a.as_float().unwrap_or_default();
            let y = b.as_float().unwrap_or_default();
            x.total_cmp(&y)
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Integer(_) | Value::Float(_) => 2,
        Value::String(_) => 3,
    }
}

/// Min/max for every declared column, failing on columns without values.
pub fn summarize(cols: &[ColumnDescriptor], data: &[DataPoint]) -> Result<Summary> {
    summarize_with_policy(cols, data, EmptyColumnPolicy::Fail)
}

/// Min/max for every declared column under the given empty-column policy.
pub fn summarize_with_policy(
    cols: &[ColumnDescriptor],
    data: &[DataPoint],
    policy: EmptyColumnPolicy,
) -> Result<Summary> {
    let mut summarizer = Summarizer::new(cols).with_policy(policy);
    for point in data {
        summarizer.observe(point);
    }
    summarizer.finish()
}

/// Tile-shaped statistics report.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Metadata of the source tile.
    pub meta: Meta,
    /// Extra top-level fields of the source tile.
    pub extra: Meta,
    /// Columns of the source tile.
    pub cols: Vec<ColumnDescriptor>,
    /// `<column>_min` and `<column>_max` entries.
    pub data: BTreeMap<String, Value>,
}

impl Report {
    /// Build a report from a summary.
    pub fn from_summary(meta: Meta, cols: Vec<ColumnDescriptor>, summary: Summary) -> Self {
        let mut data = BTreeMap::new();
        for (name, range) in summary {
            data.insert(format!("{}_min", name), range.min);
            data.insert(format!("{}_max", name), range.max);
        }
        Self {
            meta,
            extra: Meta::new(),
            cols,
            data,
        }
    }

    /// Carry the given extra top-level fields into the report.
    pub fn with_extra(mut self, extra: Meta) -> Self {
        self.extra = extra;
        self
    }

    /// JSON form: the source tile's fields with `data` replaced.
    pub fn to_value(&self) -> serde_json::Value {
        let mut obj = self.extra.clone();
        obj.insert("meta".to_string(), serde_json::Value::Object(self.meta.clone()));
        obj.insert(
            "cols".to_string(),
            serde_json::Value::Array(self.cols.iter().map(ColumnDescriptor::to_json).collect()),
        );
        obj.insert(
            "data".to_string(),
            serde_json::Value::Object(
                self.data
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        );
        serde_json::Value::Object(obj)
    }

    /// Serialize with sorted keys.
    pub fn to_json(&self, indent: JsonIndent) -> Result<String> {
        to_json_string(&self.to_value(), indent)
    }
}

/// Build the statistics report for a tile, failing on empty columns.
pub fn build_report(tile: &Tile) -> Result<Report> {
    build_report_with(tile, EmptyColumnPolicy::Fail)
}

/// Build the statistics report under the given empty-column policy.
pub fn build_report_with(tile: &Tile, policy: EmptyColumnPolicy) -> Result<Report> {
    let summary = summarize_with_policy(tile.cols(), tile.data(), policy)?;
    Ok(Report::from_summary(tile.meta().clone(), tile.cols().to_vec(), summary)
        .with_extra(tile.extra().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::ColumnType;

    fn x_tile() -> Tile {
        let points = vec![
            DataPoint::new().with("x", 1),
            DataPoint::new().with("x", 5),
            DataPoint::new().with("x", -2),
        ];
        Tile::from_flat_points(points, None, None).unwrap()
    }

    #[test]
    fn test_summarize_integers() {
        let tile = x_tile();
        let summary = summarize(tile.cols(), tile.data()).unwrap();
        assert_eq!(
            summary["x"],
            ColumnRange {
                min: Value::Integer(-2),
                max: Value::Integer(5)
            }
        );
    }

    #[test]
    fn test_build_report_replaces_data() {
        let mut meta = Meta::new();
        meta.insert("layer".into(), serde_json::json!("poi"));
        let tile = Tile::new(meta, x_tile().cols().to_vec(), x_tile().data().to_vec()).unwrap();
        let report = build_report(&tile).unwrap();
        assert_eq!(
            report.to_value(),
            serde_json::json!({
                "meta": {"layer": "poi"},
                "cols": [{"name": "x", "type": "int"}],
                "data": {"x_min": -2, "x_max": 5}
            })
        );
    }

    #[test]
    fn test_build_report_keeps_extra_fields() {
        let mut extra = Meta::new();
        extra.insert("version".into(), serde_json::json!(2));
        let tile = x_tile().with_extra(extra).unwrap();
        let report = build_report(&tile).unwrap().to_value();
        assert_eq!(report["version"], serde_json::json!(2));
        assert_eq!(report["data"], serde_json::json!({"x_min": -2, "x_max": 5}));
    }

    #[test]
    fn test_mixed_types() {
        let cols = vec![
            ColumnDescriptor::new("f", ColumnType::Float),
            ColumnDescriptor::new("s", ColumnType::String),
            ColumnDescriptor::new("b", ColumnType::Bool),
        ];
        let data = vec![
            DataPoint::new().with("f", 2.5).with("s", "pear").with("b", true),
            DataPoint::new().with("f", -0.5).with("s", "apple"),
            DataPoint::new().with("f", 10).with("s", "Zebra").with("b", false),
        ];
        let tile = Tile::new(Meta::new(), cols, data).unwrap();
        let summary = summarize(tile.cols(), tile.data()).unwrap();
        assert_eq!(summary["f"].min, Value::Float(-0.5));
        assert_eq!(summary["f"].max, Value::Float(10.0));
        assert_eq!(summary["s"].min, Value::from("Zebra"));
        assert_eq!(summary["s"].max, Value::from("pear"));
        assert_eq!(summary["b"].min, Value::Boolean(false));
        assert_eq!(summary["b"].max, Value::Boolean(true));
    }

    #[test]
    fn test_nulls_are_skipped() {
        let data = vec![
            DataPoint::new().with("x", Value::Null),
            DataPoint::new().with("x", 3),
        ];
        let cols = vec![ColumnDescriptor::new("x", ColumnType::Int)];
        let summary = summarize(&cols, &data).unwrap();
        assert_eq!(summary["x"].min, Value::Integer(3));
    }

    #[test]
    fn test_empty_column_fails() {
        let cols = vec![
            ColumnDescriptor::new("x", ColumnType::Int),
            ColumnDescriptor::new("depth", ColumnType::Float),
        ];
        let data = vec![DataPoint::new().with("x", 1), DataPoint::new().with("depth", Value::Null)];
        let err = summarize(&cols, &data).unwrap_err();
        assert!(matches!(err, TileError::EmptyColumn { column } if column == "depth"));
    }

    #[test]
    fn test_empty_column_omitted() {
        let cols = vec![
            ColumnDescriptor::new("x", ColumnType::Int),
            ColumnDescriptor::new("depth", ColumnType::Float),
        ];
        let data = vec![DataPoint::new().with("x", 1)];
        let summary = summarize_with_policy(&cols, &data, EmptyColumnPolicy::Omit).unwrap();
        assert_eq!(summary.len(), 1);
        assert!(summary.contains_key("x"));
    }

    #[test]
    fn test_report_json_is_sorted() {
        let report = build_report(&x_tile()).unwrap();
        let text = report.to_json(JsonIndent::Pretty(4)).unwrap();
        let cols = text.find("\"cols\"").unwrap();
        let data = text.find("\"data\"").unwrap();
        let meta = text.find("\"meta\"").unwrap();
        assert!(cols < data && data < meta);
        assert!(text.find("\"x_max\"").unwrap() < text.find("\"x_min\"").unwrap());
    }

    #[test]
    fn test_compare_numeric_across_kinds() {
        assert_eq!(compare(&Value::Integer(2), &Value::Float(2.5)), Ordering::Less);
        assert_eq!(compare(&Value::Float(-1.0), &Value::Integer(-3)), Ordering::Greater);
        assert_eq!(
            compare(&Value::Integer(i64::MAX), &Value::Integer(i64::MAX - 1)),
            Ordering::Greater
        );
    }
}
