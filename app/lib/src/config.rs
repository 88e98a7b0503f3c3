//! Configuration types for the vtile library.
//!
//! This module provides the configuration shared by the decoders, the
//! encoders and the statistics engine: safety limits applied to untrusted
//! input and the policy for columns without observed values.

use serde::Deserialize;

/// What the statistics engine does with a declared column that has no
/// observed (non-null) value in any data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyColumnPolicy {
    /// Fail with [`TileError::EmptyColumn`](crate::TileError::EmptyColumn).
    #[default]
    Fail,
    /// Leave the column out of the report.
    Omit,
}

/// Configuration for tile decoding and reporting.
///
/// Every field has a default, so a configuration file only needs to name the
/// settings it changes.
///
/// # Examples
///
/// ```
/// use vtile::CodecConfig;
///
/// let config: CodecConfig = serde_json::from_str(r#"{"max_columns": 16}"#).unwrap();
/// assert_eq!(config.max_columns, 16);
/// assert_eq!(config.max_points, CodecConfig::default().max_points);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Maximum input size accepted by the decoders (in bytes).
    ///
    /// Default: 1,073,741,824 bytes (1 GB)
    pub max_input_size: usize,

    /// Maximum number of column descriptors in one tile.
    ///
    /// Default: 65,536 columns
    pub max_columns: usize,

    /// Maximum number of data points in one tile.
    ///
    /// Default: 100,000,000 points
    pub max_points: usize,

    /// Policy for columns without observed values when building a report.
    ///
    /// Default: [`EmptyColumnPolicy::Fail`]
    pub empty_column_policy: EmptyColumnPolicy,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_input_size: 1_073_741_824, // 1 GB
            max_columns: 65_536,
            max_points: 100_000_000,
            empty_column_policy: EmptyColumnPolicy::Fail,
        }
    }
}

impl CodecConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum input size limit.
    pub fn with_max_input_size(mut self, max: usize) -> Self {
        self.max_input_size = max;
        self
    }

    /// Set the maximum column count limit.
    pub fn with_max_columns(mut self, max: usize) -> Self {
        self.max_columns = max;
        self
    }

    /// Set the maximum data point count limit.
    pub fn with_max_points(mut self, max: usize) -> Self {
        self.max_points = max;
        self
    }

    /// Set the empty column policy.
    pub fn with_empty_column_policy(mut self, policy: EmptyColumnPolicy) -> Self {
        self.empty_column_policy = policy;
        self
    }

    pub(crate) fn check_input_size(&self, size: usize) -> crate::Result<()> {
        check_limit("input size", self.max_input_size, size)
    }

    pub(crate) fn check_columns(&self, count: usize) -> crate::Result<()> {
        check_limit("column count", self.max_columns, count)
    }

    pub(crate) fn check_points(&self, count: usize) -> crate::Result<()> {
        check_limit("point count", self.max_points, count)
    }
}

fn check_limit(what: &'static str, limit: usize, found: usize) -> crate::Result<()> {
    if found > limit {
        return Err(crate::TileError::LimitExceeded { what, limit, found });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TileError;

    #[test]
    fn test_codec_config_default() {
        let config = CodecConfig::default();
        assert_eq!(config.max_input_size, 1_073_741_824);
        assert_eq!(config.max_columns, 65_536);
        assert_eq!(config.max_points, 100_000_000);
        assert_eq!(config.empty_column_policy, EmptyColumnPolicy::Fail);
    }

    #[test]
    fn test_codec_config_builder() {
        let config = CodecConfig::new()
            .with_max_input_size(4096)
            .with_max_columns(8)
            .with_max_points(100)
            .with_empty_column_policy(EmptyColumnPolicy::Omit);

        assert_eq!(config.max_input_size, 4096);
        assert_eq!(config.max_columns, 8);
        assert_eq!(config.max_points, 100);
        assert_eq!(config.empty_column_policy, EmptyColumnPolicy::Omit);
    }

    #[test]
    fn test_codec_config_from_partial_json() {
        let config: CodecConfig =
            serde_json::from_str(r#"{"max_points": 10, "empty_column_policy": "omit"}"#).unwrap();
        assert_eq!(config.max_points, 10);
        assert_eq!(config.empty_column_policy, EmptyColumnPolicy::Omit);
        assert_eq!(config.max_columns, 65_536);
    }

    #[test]
    fn test_codec_config_rejects_unknown_keys() {
        let result = serde_json::from_str::<CodecConfig>(r#"{"max_rows": 10}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_limits() {
        let config = CodecConfig::new().with_max_columns(2);
        assert!(config.check_columns(2).is_ok());
        let err = config.check_columns(3).unwrap_err();
        assert!(matches!(
            err,
            TileError::LimitExceeded {
                what: "column count",
                limit: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn test_config_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CodecConfig>();
        assert_send_sync::<EmptyColumnPolicy>();
    }
}
