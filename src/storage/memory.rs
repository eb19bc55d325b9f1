//! In-process store for tests and demos
//!
//! Holds raw samples per file and answers `export` the way a round-robin
//! store does: the window start is aligned down to the step, row `k` closes
//! at `start + (k + 1) * step`, and each row consolidates the samples in
//! `(close - step, close]`. Derived bindings are evaluated with a small RPN
//! interpreter (`+ - * / MIN MAX UN`, numbers, and earlier binding names).
//! Per-binding options are accepted and ignored.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{Consolidation, ExportDef, ExportRequest, ExportResult};
use crate::storage::Store;

/// Largest grid a single export may produce
pub const MAX_ROWS: i64 = 1_000_000;

/// Samples of one store file
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    datasources: Vec<String>,
    /// timestamp → one value per datasource
    samples: BTreeMap<i64, Vec<f64>>,
}

impl MemoryFile {
    /// Create a file with the given datasource names
    pub fn new(datasources: &[&str]) -> Self {
        Self {
            datasources: datasources.iter().map(|s| s.to_string()).collect(),
            samples: BTreeMap::new(),
        }
    }

    /// Builder method: record one sample per datasource at `timestamp`
    pub fn sample(mut self, timestamp: i64, values: &[f64]) -> Self {
        let mut row = values.to_vec();
        row.resize(self.datasources.len(), f64::NAN);
        self.samples.insert(timestamp, row);
        self
    }

    /// Datasource names
    pub fn datasources(&self) -> &[String] {
        &self.datasources
    }

    fn consolidate(&self, column: usize, from: i64, to: i64, cf: Consolidation) -> f64 {
        let values: Vec<f64> = self
            .samples
            .range(from + 1..=to)
            .filter_map(|(_, row)| row.get(column).copied())
            .filter(|v| !v.is_nan())
            .collect();

        if values.is_empty() {
            return f64::NAN;
        }

        match cf {
            Consolidation::Average => values.iter().sum::<f64>() / values.len() as f64,
            Consolidation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Consolidation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Consolidation::Last => values[values.len() - 1],
        }
    }
}

/// Store keeping every file in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: HashMap<PathBuf, MemoryFile>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: register a file
    pub fn with_file(mut self, path: impl Into<PathBuf>, file: MemoryFile) -> Self {
        self.files.insert(path.into(), file);
        self
    }

    /// Register a file
    pub fn insert(&mut self, path: impl Into<PathBuf>, file: MemoryFile) {
        self.files.insert(path.into(), file);
    }

    fn file(&self, path: &Path) -> StorageResult<&MemoryFile> {
        self.files
            .get(path)
            .ok_or_else(|| StorageError::FileNotFound(path.to_path_buf()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn info(&self, file: &Path) -> StorageResult<Vec<String>> {
        Ok(self.file(file)?.datasources.clone())
    }

    async fn export(&self, request: &ExportRequest) -> StorageResult<ExportResult> {
        let step = request.step.max(1);
        let start = request.start - request.start.rem_euclid(step);
        let end = match request.end.rem_euclid(step) {
            0 => request.end,
            r => request.end + (step - r),
        };
        let rows = ((end - start) / step).max(0);
        if rows > MAX_ROWS {
            return Err(StorageError::InvalidExport(format!(
                "{} rows requested, at most {} allowed",
                rows, MAX_ROWS
            )));
        }
        let rows = rows as usize;
        let closes: Vec<i64> = (1..=rows as i64).map(|k| start + k * step).collect();

        let mut columns: HashMap<&str, Vec<f64>> = HashMap::new();

        for def in &request.defs {
            let values: Vec<f64> = match def {
                ExportDef::Raw {
                    file,
                    datasource,
                    consolidation,
                    ..
                } => {
                    let file = self.file(file)?;
                    let column = file
                        .datasources
                        .iter()
                        .position(|d| d == datasource)
                        .ok_or_else(|| {
                            StorageError::InvalidExport(format!(
                                "unknown datasource '{}'",
                                datasource
                            ))
                        })?;
                    closes
                        .iter()
                        .map(|&close| file.consolidate(column, close - step, close, *consolidation))
                        .collect()
                }
                ExportDef::Derived { expression, .. } => (0..rows)
                    .map(|row| eval_rpn(expression, &columns, row))
                    .collect::<StorageResult<Vec<f64>>>()?,
            };
            columns.insert(def.name(), values);
        }

        let mut result = ExportResult::new(request.outputs.clone(), start, step);
        let outputs = request
            .outputs
            .iter()
            .map(|name| {
                columns.get(name.as_str()).ok_or_else(|| {
                    StorageError::InvalidExport(format!("undefined output '{}'", name))
                })
            })
            .collect::<StorageResult<Vec<_>>>()?;

        for row in 0..rows {
            result.push_row(outputs.iter().map(|col| col[row]).collect());
        }

        Ok(result)
    }
}

fn eval_rpn(expression: &str, columns: &HashMap<&str, Vec<f64>>, row: usize) -> StorageResult<f64> {
    let mut stack: Vec<f64> = Vec::new();
    let underflow =
        || StorageError::InvalidExport(format!("stack underflow in '{}'", expression));

    for token in expression.split(',').map(str::trim) {
        match token {
            "+" | "-" | "*" | "/" | "MIN" | "MAX" => {
                let b = stack.pop().ok_or_else(underflow)?;
                let a = stack.pop().ok_or_else(underflow)?;
                stack.push(match token {
                    "+" => a + b,
                    "-" => a - b,
                    "*" => a * b,
                    "/" => a / b,
                    "MIN" => a.min(b),
                    _ => a.max(b),
                });
            }
            "UN" => {
                let a = stack.pop().ok_or_else(underflow)?;
                stack.push(if a.is_nan() { 1.0 } else { 0.0 });
            }
            _ => {
                if let Some(column) = columns.get(token) {
                    stack.push(column.get(row).copied().unwrap_or(f64::NAN));
                } else if let Ok(number) = token.parse::<f64>() {
                    stack.push(number);
                } else {
                    return Err(StorageError::InvalidExport(format!(
                        "unknown token '{}' in '{}'",
                        token, expression
                    )));
                }
            }
        }
    }

    match stack.as_slice() {
        [value] => Ok(*value),
        _ => Err(StorageError::InvalidExport(format!(
            "expression '{}' does not reduce to one value",
            expression
        ))),
    }
}
