//! Response assembly
//!
//! Converts the store's column/row matrix into named series keyed by unix
//! seconds. Missing samples stay in the series as NaN and travel as JSON
//! `null`:
//!
//! ```json
//! {"name": "RX", "dps": {"946771260": 100.0, "946771320": null}}
//! ```

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::storage::ExportResult;

/// Timestamp → value, ordered by time; NaN marks a missing sample
#[derive(Debug, Clone, Default)]
pub struct SeriesPoints(BTreeMap<i64, f64>);

impl SeriesPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, timestamp: i64, value: f64) {
        self.0.insert(timestamp, value);
    }

    pub fn get(&self, timestamp: i64) -> Option<f64> {
        self.0.get(&timestamp).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.0.iter().map(|(t, v)| (*t, *v))
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.0.keys().copied().collect()
    }
}

/// NaN-aware equality: two missing samples are equal
impl PartialEq for SeriesPoints {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((ta, a), (tb, b))| ta == tb && (a == b || (a.is_nan() && b.is_nan())))
    }
}

impl FromIterator<(i64, f64)> for SeriesPoints {
    fn from_iter<I: IntoIterator<Item = (i64, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for SeriesPoints {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (timestamp, value) in &self.0 {
            // JSON has no NaN or infinity; all three go out as null
            let value = if value.is_finite() { Some(*value) } else { None };
            map.serialize_entry(&timestamp.to_string(), &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SeriesPoints {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SeriesPointsVisitor)
    }
}

struct SeriesPointsVisitor;

impl<'de> Visitor<'de> for SeriesPointsVisitor {
    type Value = SeriesPoints;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of unix-second timestamps to numbers or null")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
        let mut points = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, Option<f64>>()? {
            let timestamp = key.parse::<i64>().map_err(|_| {
                serde::de::Error::custom(format!("invalid timestamp key '{}'", key))
            })?;
            points.insert(timestamp, value.unwrap_or(f64::NAN));
        }
        Ok(SeriesPoints(points))
    }
}

/// One named output series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub dps: SeriesPoints,
}

impl Series {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dps: SeriesPoints::new(),
        }
    }
}

/// Build one series per legend column
///
/// Row `k` is stamped `start + (k + 1) * step`; rows stamped after `end`
/// are dropped.
pub fn assemble(result: &ExportResult, end: i64) -> Vec<Series> {
    let mut series: Vec<Series> = result.legends.iter().map(Series::new).collect();

    for row in 0..result.rows {
        let timestamp = result.start + (row as i64 + 1) * result.step;
        if timestamp > end {
            break;
        }
        for (column, s) in series.iter_mut().enumerate() {
            s.dps.insert(timestamp, result.value_at(column, row));
        }
    }

    series
}
