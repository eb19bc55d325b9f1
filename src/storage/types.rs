//! Core data types shared with the round-robin store
//!
//! This module defines the contract types of the store layer:
//! - `Consolidation`: Aggregation applied when the store downsamples
//! - `ExportDef`: One raw or derived binding of an export request
//! - `ExportRequest`: Ordered bindings plus the time window
//! - `ExportResult`: Column/row matrix returned by the store

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Consolidation function applied when the store downsamples raw samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Consolidation {
    /// Arithmetic mean of the bucket
    #[default]
    Average,
    /// Smallest sample of the bucket
    Min,
    /// Largest sample of the bucket
    Max,
    /// Most recent sample of the bucket
    Last,
}

impl Consolidation {
    /// Get all consolidation functions for iteration
    pub fn all() -> &'static [Consolidation] {
        &[
            Consolidation::Average,
            Consolidation::Min,
            Consolidation::Max,
            Consolidation::Last,
        ]
    }

    /// Canonical uppercase name, as the store expects it
    pub fn as_str(&self) -> &'static str {
        match self {
            Consolidation::Average => "AVERAGE",
            Consolidation::Min => "MIN",
            Consolidation::Max => "MAX",
            Consolidation::Last => "LAST",
        }
    }
}

impl fmt::Display for Consolidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown consolidation function name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid consolidation '{0}'")]
pub struct InvalidConsolidation(pub String);

impl FromStr for Consolidation {
    type Err = InvalidConsolidation;

    /// Case-insensitive; the empty string selects the default (AVERAGE).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "AVERAGE" => Ok(Consolidation::Average),
            "MIN" => Ok(Consolidation::Min),
            "MAX" => Ok(Consolidation::Max),
            "LAST" => Ok(Consolidation::Last),
            _ => Err(InvalidConsolidation(s.to_string())),
        }
    }
}

impl Serialize for Consolidation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Consolidation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One binding of an export request
#[derive(Debug, Clone, PartialEq)]
pub enum ExportDef {
    /// Raw series read from a store file
    Raw {
        name: String,
        file: PathBuf,
        datasource: String,
        consolidation: Consolidation,
        /// Opaque `key=value` options forwarded verbatim
        options: Vec<String>,
    },
    /// Expression evaluated by the store over earlier bindings
    Derived { name: String, expression: String },
}

impl ExportDef {
    /// Name the binding is declared under
    pub fn name(&self) -> &str {
        match self {
            ExportDef::Raw { name, .. } | ExportDef::Derived { name, .. } => name,
        }
    }

    /// Whether this binding is an expression rather than a raw series
    pub fn is_derived(&self) -> bool {
        matches!(self, ExportDef::Derived { .. })
    }
}

/// Everything the store needs for one export call
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    /// Bindings in declaration order
    pub defs: Vec<ExportDef>,
    /// Names of the bindings to emit as result columns, in order
    pub outputs: Vec<String>,
    /// Window start, unix seconds
    pub start: i64,
    /// Window end, unix seconds
    pub end: i64,
    /// Requested resolution in seconds
    pub step: i64,
}

/// Column/row matrix produced by an export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportResult {
    /// Column names, one per emitted binding
    pub legends: Vec<String>,
    /// Start reported by the store; row `k` closes at `start + (k + 1) * step`
    pub start: i64,
    /// Step the store actually used, in seconds
    pub step: i64,
    /// Number of rows
    pub rows: usize,
    /// Row-major values, `rows * legends.len()` entries
    pub values: Vec<f64>,
}

impl ExportResult {
    /// Create an empty result for the given grid
    pub fn new(legends: Vec<String>, start: i64, step: i64) -> Self {
        Self {
            legends,
            start,
            step,
            rows: 0,
            values: Vec::new(),
        }
    }

    /// Append one row; missing trailing columns are filled with NaN
    pub fn push_row(&mut self, mut row: Vec<f64>) {
        row.resize(self.legends.len(), f64::NAN);
        self.values.extend(row);
        self.rows += 1;
    }

    /// Number of columns
    pub fn columns(&self) -> usize {
        self.legends.len()
    }

    /// Value at a column/row, NaN when out of range
    pub fn value_at(&self, column: usize, row: usize) -> f64 {
        if column >= self.columns() || row >= self.rows {
            return f64::NAN;
        }
        self.values
            .get(row * self.columns() + column)
            .copied()
            .unwrap_or(f64::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consolidation_parse_case_insensitive() {
        assert_eq!("average".parse::<Consolidation>(), Ok(Consolidation::Average));
        assert_eq!("Min".parse::<Consolidation>(), Ok(Consolidation::Min));
        assert_eq!("MAX".parse::<Consolidation>(), Ok(Consolidation::Max));
        assert_eq!("last".parse::<Consolidation>(), Ok(Consolidation::Last));
        assert_eq!("".parse::<Consolidation>(), Ok(Consolidation::Average));
        assert!("median".parse::<Consolidation>().is_err());
    }

    #[test]
    fn test_consolidation_serde_uppercase() {
        let json = serde_json::to_string(&Consolidation::Last).unwrap();
        assert_eq!(json, "\"LAST\"");

        let cf: Consolidation = serde_json::from_str("\"min\"").unwrap();
        assert_eq!(cf, Consolidation::Min);

        assert!(serde_json::from_str::<Consolidation>("\"sum\"").is_err());
    }

    #[test]
    fn test_export_result_value_at() {
        let mut result = ExportResult::new(vec!["a".into(), "b".into()], 0, 60);
        result.push_row(vec![1.0, 2.0]);
        result.push_row(vec![3.0]);

        assert_eq!(result.rows, 2);
        assert_eq!(result.value_at(0, 0), 1.0);
        assert_eq!(result.value_at(1, 0), 2.0);
        assert_eq!(result.value_at(0, 1), 3.0);
        assert!(result.value_at(1, 1).is_nan());
        assert!(result.value_at(2, 0).is_nan());
        assert!(result.value_at(0, 5).is_nan());
    }

    #[test]
    fn test_export_def_accessors() {
        let def = ExportDef::Derived {
            name: "SUM".into(),
            expression: "RX,TX,+".into(),
        };
        assert_eq!(def.name(), "SUM");
        assert!(def.is_derived());
    }
}
