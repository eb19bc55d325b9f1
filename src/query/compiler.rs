//! Query compilation
//!
//! Turns a validated [`QuerySpec`] into an [`ExportRequest`]: every DEF is
//! resolved to a store file and a concrete datasource, every CDEF is passed
//! through, and only visible definitions become outputs.

use crate::catalog::MetricCatalog;
use crate::query::ast::{DefKind, QueryDef, QuerySpec};
use crate::query::error::{QueryError, QueryResult};
use crate::storage::{ExportDef, ExportRequest};

/// Shown in place of a datasource name when none was given and the file has several
const UNSPECIFIED_DATASOURCE: &str = "(unspecified)";

/// Build the export request for a query
pub async fn compile(catalog: &MetricCatalog, spec: &QuerySpec) -> QueryResult<ExportRequest> {
    let mut defs = Vec::with_capacity(spec.items.len());

    for item in &spec.items {
        defs.push(compile_def(catalog, &item.def).await?);
    }

    Ok(ExportRequest {
        defs,
        outputs: spec.visible_names(),
        start: spec.start.timestamp(),
        end: spec.end.timestamp(),
        step: spec.step_seconds(),
    })
}

async fn compile_def(catalog: &MetricCatalog, def: &QueryDef) -> QueryResult<ExportDef> {
    match &def.kind {
        DefKind::Def {
            metric,
            datasource,
            consolidation,
            options,
        } => {
            let resolved = catalog.resolve(metric)?;
            let available = catalog.datasources(&resolved.file).await?;

            // Explicit segment, then path, then the file's only datasource
            let datasource = match datasource.as_ref().or(resolved.datasource.as_ref()) {
                Some(name) if available.contains(name) => name.clone(),
                Some(name) => {
                    return Err(QueryError::DatasourceNotFound {
                        datasource: name.clone(),
                        file: resolved.file,
                    })
                }
                None => match available.as_slice() {
                    [only] => only.clone(),
                    _ => {
                        return Err(QueryError::DatasourceNotFound {
                            datasource: UNSPECIFIED_DATASOURCE.to_string(),
                            file: resolved.file,
                        })
                    }
                },
            };

            tracing::debug!(
                name = %def.name,
                file = ?resolved.file,
                datasource = %datasource,
                "Resolved DEF"
            );

            Ok(ExportDef::Raw {
                name: def.name.clone(),
                file: resolved.file,
                datasource,
                consolidation: *consolidation,
                options: options.clone(),
            })
        }
        DefKind::Cdef { expression } => Ok(ExportDef::Derived {
            name: def.name.clone(),
            expression: expression.clone(),
        }),
    }
}
