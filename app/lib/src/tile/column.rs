//! Column descriptors and schema inference.

use std::collections::{HashMap, HashSet};

use super::{ColumnType, DataPoint};
use crate::error::{Result, TileError};

/// Name and value domain of one column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDescriptor {
    /// Column name, unique within a tile.
    pub name: String,
    /// Declared value type.
    pub column_type: ColumnType,
}

impl ColumnDescriptor {
    /// Create a new column descriptor.
    pub fn new<S: Into<String>>(name: S, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    /// JSON form: `{"name": ..., "type": ...}`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("name".to_string(), serde_json::Value::String(self.name.clone()));
        obj.insert(
            "type".to_string(),
            serde_json::Value::String(self.column_type.as_str().to_string()),
        );
        serde_json::Value::Object(obj)
    }
}

/// A column declaration whose type may still have to be inferred from data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnSpec {
    pub name: String,
    pub column_type: Option<ColumnType>,
}

impl From<ColumnDescriptor> for ColumnSpec {
    fn from(col: ColumnDescriptor) -> Self {
        Self {
            name: col.name,
            column_type: Some(col.column_type),
        }
    }
}

/// Resolve the final column list for a set of data points.
///
/// Without declarations, columns are the union of keys in first-seen order.
/// A column without a declared type takes the type of its first non-null
/// value, or `string` when it holds nothing but nulls. Compatibility of the
/// remaining values is checked later, when the tile is constructed.
pub(crate) fn resolve_columns(
    points: &[DataPoint],
    declared: Option<Vec<ColumnSpec>>,
) -> Result<Vec<ColumnDescriptor>> {
    let specs = match declared {
        Some(specs) => specs,
        None => {
            let mut seen = HashSet::new();
            let mut specs = Vec::new();
            for point in points {
                for (key, _) in point.iter() {
                    if seen.insert(key) {
                        specs.push(ColumnSpec {
                            name: key.to_string(),
                            column_type: None,
                        });
                    }
                }
            }
            specs
        }
    };

    let pending: HashSet<&str> = specs
        .iter()
        .filter(|spec| spec.column_type.is_none())
        .map(|spec| spec.name.as_str())
        .collect();
    let mut inferred: HashMap<&str, ColumnType> = HashMap::new();
    if !pending.is_empty() {
        for point in points {
            for (key, value) in point.iter() {
                if !pending.contains(key) || inferred.contains_key(key) {
                    continue;
                }
                if let Some(column_type) = value.natural_type() {
                    inferred.insert(key, column_type);
                }
            }
            if inferred.len() == pending.len() {
                break;
            }
        }
    }

    Ok(specs
        .iter()
        .map(|spec| {
            let column_type = spec
                .column_type
                .or_else(|| inferred.get(spec.name.as_str()).copied())
                .unwrap_or_default();
            ColumnDescriptor::new(spec.name.clone(), column_type)
        })
        .collect())
}

/// Fail on the first column name that appears twice.
pub(crate) fn check_unique(cols: &[ColumnDescriptor]) -> Result<()> {
    let mut seen = HashSet::with_capacity(cols.len());
    for col in cols {
        if !seen.insert(col.name.as_str()) {
            return Err(TileError::DuplicateColumn {
                name: col.name.clone(),
            });
        }
    }
    Ok(())
}
