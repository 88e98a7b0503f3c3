//! In-memory tile model.
//!
//! A [`Tile`] is an immutable value made of opaque metadata (plus any extra
//! top-level fields), an ordered list of [`ColumnDescriptor`]s and an
//! ordered list of [`DataPoint`]s. It is validated once at construction;
//! every accessor afterwards is read-only.
//!
//! # Examples
//!
//! ```
//! use vtile::{ColumnDescriptor, ColumnType, DataPoint, Meta, Tile, Value};
//!
//! let cols = vec![ColumnDescriptor::new("speed", ColumnType::Float)];
//! let data = vec![
//!     DataPoint::new().with("speed", 12),
//!     DataPoint::new().with("speed", 7.5),
//! ];
//! let tile = Tile::new(Meta::new(), cols, data).unwrap();
//!
//! // Integers in a float column are widened at construction.
//! assert_eq!(tile.data()[0].get("speed"), Some(&Value::Float(12.0)));
//! ```

mod column;
mod value;

use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap};

pub use column::ColumnDescriptor;
pub(crate) use column::{check_unique, resolve_columns, ColumnSpec};
pub use value::{ColumnType, Value};

use crate::error::{Result, TileError};

/// Opaque tile metadata, carried through every round trip unchanged.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// Top-level document keys with a fixed meaning; every other top-level key
/// is carried as an extra field.
pub const RESERVED_KEYS: [&str; 3] = ["cols", "data", "meta"];

/// One row of the tile: a mapping from column name to scalar value.
///
/// A point does not have to populate every column; absent columns are simply
/// not keys of the mapping. Keys iterate in sorted order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataPoint {
    values: BTreeMap<String, Value>,
}

impl DataPoint {
    /// Create an empty data point.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the point with `name` set to `value`.
    pub fn with<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Get the value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Check whether the point has a value (possibly null) for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate over `(name, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of populated columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the point populates no column.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// JSON object form of the point.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Build a point from a JSON object.
    pub fn from_json(obj: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut values = BTreeMap::new();
        for (key, json) in obj {
            values.insert(key.clone(), Value::from_json(key, json)?);
        }
        Ok(Self { values })
    }

    pub(crate) fn insert(&mut self, name: String, value: Value) {
        self.values.insert(name, value);
    }

    fn into_values(self) -> btree_map::IntoIter<String, Value> {
        self.values.into_iter()
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for DataPoint {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A validated vector tile.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tile {
    meta: Meta,
    extra: Meta,
    cols: Vec<ColumnDescriptor>,
    data: Vec<DataPoint>,
}

impl Tile {
    /// Construct a tile from explicit metadata, columns and data.
    ///
    /// Fails with a schema error when `cols` repeats a name, when a data
    /// point uses an undeclared key, or when a value does not fit its
    /// column's type. Integers in float columns are widened to floats.
    pub fn new(meta: Meta, cols: Vec<ColumnDescriptor>, data: Vec<DataPoint>) -> Result<Self> {
        check_unique(&cols)?;

        let types: HashMap<&str, ColumnType> = cols
            .iter()
            .map(|col| (col.name.as_str(), col.column_type))
            .collect();

        let mut checked = Vec::with_capacity(data.len());
        for point in data {
            let mut values = BTreeMap::new();
            for (name, value) in point.into_values() {
                let column_type = match types.get(name.as_str()) {
                    Some(column_type) => *column_type,
                    None => return Err(TileError::UndeclaredColumn { name }),
                };
                let value = column_type.normalize(&name, value)?;
                values.insert(name, value);
            }
            checked.push(DataPoint { values });
        }

        Ok(Self {
            meta,
            extra: Meta::new(),
            cols,
            data: checked,
        })
    }

    /// Attach extra top-level fields, replacing any already present.
    ///
    /// Extra fields sit next to `meta`, `cols` and `data` in the document
    /// form and are carried through conversions and reports verbatim. A key
    /// from [`RESERVED_KEYS`] is an invalid document.
    pub fn with_extra(mut self, extra: Meta) -> Result<Self> {
        if let Some(key) = extra.keys().find(|key| RESERVED_KEYS.contains(&key.as_str())) {
            return Err(TileError::invalid_document(format!(
                "extra field '{}' collides with a reserved top-level key",
                key
            )));
        }
        self.extra = extra;
        Ok(self)
    }

    /// Construct a tile from data points, inferring whatever is missing.
    ///
    /// Without `cols`, the columns are the union of the points' keys in
    /// first-seen order, each typed by its first non-null value. A later
    /// value of a different type is a schema error.
    pub fn from_flat_points(
        points: Vec<DataPoint>,
        meta: Option<Meta>,
        cols: Option<Vec<ColumnDescriptor>>,
    ) -> Result<Self> {
        let specs = cols.map(|cols| cols.into_iter().map(ColumnSpec::from).collect());
        Self::from_specs(points, meta, specs)
    }

    pub(crate) fn from_specs(
        points: Vec<DataPoint>,
        meta: Option<Meta>,
        specs: Option<Vec<ColumnSpec>>,
    ) -> Result<Self> {
        let cols = resolve_columns(&points, specs)?;
        Self::new(meta.unwrap_or_default(), cols, points)
    }

    /// Tile metadata.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Extra top-level fields, in key order.
    pub fn extra(&self) -> &Meta {
        &self.extra
    }

    /// Column descriptors, in declaration order.
    pub fn cols(&self) -> &[ColumnDescriptor] {
        &self.cols
    }

    /// Data points, in tile order.
    pub fn data(&self) -> &[DataPoint] {
        &self.data
    }

    /// Look up a column descriptor by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.cols.iter().find(|col| col.name == name)
    }

    /// Number of declared columns.
    pub fn column_count(&self) -> usize {
        self.cols.len()
    }

    /// Number of data points.
    pub fn point_count(&self) -> usize {
        self.data.len()
    }

    /// JSON-compatible structure `{"meta": ..., "cols": [...], "data": [...]}`
    /// plus any extra top-level fields.
    pub fn as_plain_structure(&self) -> serde_json::Value {
        let mut obj = self.extra.clone();
        obj.insert("meta".to_string(), serde_json::Value::Object(self.meta.clone()));
        obj.insert("cols".to_string(), self.cols_json());
        obj.insert(
            "data".to_string(),
            serde_json::Value::Array(self.data.iter().map(DataPoint::to_json).collect()),
        );
        serde_json::Value::Object(obj)
    }

    pub(crate) fn cols_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.cols.iter().map(ColumnDescriptor::to_json).collect())
    }

    /// Values of one column across all points; `None` where a point lacks it.
    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Option<&'a Value>> + 'a {
        self.data.iter().map(move |point| point.get(name))
    }
}
