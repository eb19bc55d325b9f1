//! Query definitions
//!
//! A query is an ordered list of definitions evaluated over one window:
//!
//! ```text
//! DEF:RX=server1.net/interface-eth0/if_octets:rx:AVERAGE     raw series
//! DEF:TX=server1.net/interface-eth0/if_octets/tx::MAX         datasource from the path
//! CDEF:SUM=RX,TX,+                                            derived series
//! ```
//!
//! Definitions marked hidden are computed but left out of the response.

use chrono::Duration;
use std::collections::HashSet;

use crate::query::error::{QueryError, QueryResult};
use crate::query::time::TimePoint;
use crate::storage::Consolidation;

/// Longest accepted definition name
pub const MAX_NAME_LEN: usize = 255;

/// Characters allowed in a definition name
pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Whether `name` is a valid definition name
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_NAME_LEN && name.chars().all(is_name_char)
}

/// What a definition computes
#[derive(Debug, Clone, PartialEq)]
pub enum DefKind {
    /// Raw series read from a store file
    Def {
        /// Metric path, resolved through the catalog
        metric: String,
        /// Explicit datasource, `None` when left empty
        datasource: Option<String>,
        consolidation: Consolidation,
        /// `key=value` options passed to the store untouched
        options: Vec<String>,
    },
    /// Series derived from earlier definitions by a store-side expression
    Cdef { expression: String },
}

/// A named definition
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDef {
    pub name: String,
    pub kind: DefKind,
}

impl QueryDef {
    /// Raw series definition
    pub fn def(
        name: impl Into<String>,
        metric: impl Into<String>,
        datasource: Option<&str>,
        consolidation: Consolidation,
    ) -> Self {
        Self {
            name: name.into(),
            kind: DefKind::Def {
                metric: metric.into(),
                datasource: datasource.map(str::to_string),
                consolidation,
                options: Vec::new(),
            },
        }
    }

    /// Derived series definition
    pub fn cdef(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DefKind::Cdef {
                expression: expression.into(),
            },
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self.kind, DefKind::Cdef { .. })
    }
}

/// A definition and its visibility
#[derive(Debug, Clone, PartialEq)]
pub struct QueryItem {
    pub def: QueryDef,
    pub hidden: bool,
}

/// A complete query ready for validation
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub start: TimePoint,
    pub end: TimePoint,
    pub step: Duration,
    pub items: Vec<QueryItem>,
}

impl QuerySpec {
    /// Query over `[start, end]` at one second resolution, no definitions yet
    pub fn new(start: TimePoint, end: TimePoint) -> Self {
        Self {
            start,
            end,
            step: Duration::seconds(1),
            items: Vec::new(),
        }
    }

    /// Builder method: set the step
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Builder method: add a visible definition
    pub fn with_def(mut self, def: QueryDef) -> Self {
        self.items.push(QueryItem { def, hidden: false });
        self
    }

    /// Builder method: add a hidden definition
    pub fn with_hidden(mut self, def: QueryDef) -> Self {
        self.items.push(QueryItem { def, hidden: true });
        self
    }

    /// Names of the definitions that appear in the response, in order
    pub fn visible_names(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| !item.hidden)
            .map(|item| item.def.name.clone())
            .collect()
    }

    /// Step in whole seconds
    pub fn step_seconds(&self) -> i64 {
        self.step.num_seconds()
    }

    /// Check the query invariants
    pub fn validate(&self) -> QueryResult<()> {
        if self.start > self.end {
            return Err(QueryError::InvalidQuery(format!(
                "start ({}) is after end ({})",
                self.start.timestamp(),
                self.end.timestamp()
            )));
        }

        if self.step < Duration::seconds(1) {
            return Err(QueryError::InvalidQuery(format!(
                "step must be at least one second, got {}ms",
                self.step.num_milliseconds()
            )));
        }

        if self.step != Duration::seconds(self.step.num_seconds()) {
            return Err(QueryError::InvalidQuery(format!(
                "step must be a whole number of seconds, got {}ms",
                self.step.num_milliseconds()
            )));
        }

        if self.items.is_empty() {
            return Err(QueryError::InvalidQuery("no definitions given".to_string()));
        }

        if self.items.iter().all(|item| item.hidden) {
            return Err(QueryError::InvalidQuery(
                "every definition is hidden".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for item in &self.items {
            let name = item.def.name.as_str();
            if !is_valid_name(name) {
                return Err(QueryError::InvalidQuery(format!("invalid name '{}'", name)));
            }
            if !seen.insert(name) {
                return Err(QueryError::InvalidQuery(format!("duplicate name '{}'", name)));
            }
        }

        Ok(())
    }
}
