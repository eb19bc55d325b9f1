//! Data Transfer Objects
//!
//! Request and response types for the API endpoints. POST bodies are JSON;
//! GET requests carry the same fields in the query string, with repeated
//! keys paired by position.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::query::{
    is_name_char, is_valid_name, parse_def, parse_duration, QueryError, QueryItem, QueryOutput,
    QueryResult, QuerySpec, Series, TimeSpecParser,
};

// ============================================
// TIME FIELDS
// ============================================

/// Time field, given as a number or a string
///
/// Both forms go through the same instant parser, so `946771200` and
/// `"946771200"` mean the same thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Number(i64),
    Text(String),
}

impl TimeValue {
    pub fn as_text(&self) -> String {
        match self {
            TimeValue::Number(n) => n.to_string(),
            TimeValue::Text(s) => s.clone(),
        }
    }
}

/// Duration field; numbers count seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Number(i64),
    Text(String),
}

impl DurationValue {
    pub fn as_text(&self) -> String {
        match self {
            DurationValue::Number(n) => n.to_string(),
            DurationValue::Text(s) => s.clone(),
        }
    }
}

// ============================================
// QUERY DTOs
// ============================================

/// One query token and its visibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryItemDto {
    /// `DEF:...` or `CDEF:...`
    pub query: String,
    #[serde(default)]
    pub hidden: bool,
}

/// Query request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub start: Option<TimeValue>,
    /// Defaults to now
    #[serde(default)]
    pub end: Option<TimeValue>,
    /// Defaults to one second
    #[serde(default)]
    pub step: Option<DurationValue>,
    /// Older name for `step`; `step` wins when both are sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<DurationValue>,
    #[serde(default)]
    pub queries: Vec<QueryItemDto>,
}

impl QueryRequest {
    /// Build a request from query string pairs
    ///
    /// `query` and `hidden` are paired by position. The legacy form
    /// `metric=<path>[&consolidation=<cf>]` adds one DEF per metric, named
    /// after the metric path.
    pub fn from_pairs(pairs: &[(String, String)]) -> QueryResult<Self> {
        let first = |key: &str| first_value(pairs, key).map(str::to_string);

        let hidden = all_values(pairs, "hidden")
            .into_iter()
            .map(parse_bool)
            .collect::<QueryResult<Vec<bool>>>()?;

        let mut queries: Vec<QueryItemDto> = all_values(pairs, "query")
            .into_iter()
            .enumerate()
            .map(|(i, query)| QueryItemDto {
                query: query.to_string(),
                hidden: hidden.get(i).copied().unwrap_or(false),
            })
            .collect();

        let consolidations = all_values(pairs, "consolidation");
        for (i, metric) in all_values(pairs, "metric").into_iter().enumerate() {
            let cf = consolidations.get(i).copied().unwrap_or("");
            queries.push(QueryItemDto {
                query: legacy_token(metric, cf)?,
                hidden: false,
            });
        }

        Ok(Self {
            start: first("start").map(TimeValue::Text),
            end: first("end").map(TimeValue::Text),
            step: first("step").map(DurationValue::Text),
            resolution: first("resolution").map(DurationValue::Text),
            queries,
        })
    }

    /// Parse times, step and tokens into a query
    pub fn into_spec(self, times: &TimeSpecParser) -> QueryResult<QuerySpec> {
        let start = self
            .start
            .ok_or_else(|| QueryError::InvalidQuery("missing parameter 'start'".to_string()))?;
        let start = times.parse_instant(&start.as_text())?;

        let end = match &self.end {
            Some(end) => times.parse_instant(&end.as_text())?,
            None => chrono::Local::now(),
        };

        let step = match self.step.as_ref().or(self.resolution.as_ref()) {
            Some(step) => parse_duration(&step.as_text())?,
            None => parse_duration("")?,
        };

        let items = self
            .queries
            .iter()
            .map(|item| {
                Ok(QueryItem {
                    def: parse_def(&item.query)?,
                    hidden: item.hidden,
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(QuerySpec {
            start,
            end,
            step,
            items,
        })
    }
}

/// `DEF` token for a legacy `metric=` parameter
fn legacy_token(metric: &str, consolidation: &str) -> QueryResult<String> {
    if metric.trim().is_empty() {
        return Err(QueryError::InvalidQuery(
            "missing parameter 'metric'".to_string(),
        ));
    }

    let name: String = metric
        .trim_matches('/')
        .chars()
        .map(|c| if is_name_char(c) { c } else { '_' })
        .collect();

    if !is_valid_name(&name) {
        return Err(QueryError::InvalidQuery(format!(
            "metric '{}' cannot be used as a series name",
            metric
        )));
    }

    Ok(format!("DEF:{}={}::{}", name, metric, consolidation))
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn all_values<'a>(pairs: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect()
}

/// Boolean query string value: 1/0, t/f, true/false in any case
pub fn parse_bool(value: &str) -> QueryResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Ok(true),
        "0" | "f" | "false" => Ok(false),
        _ => Err(QueryError::InvalidQuery(format!(
            "invalid boolean '{}'",
            value
        ))),
    }
}

/// Query response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Window start, unix seconds
    pub start: String,
    /// Window end, unix seconds
    pub end: String,
    /// Step in seconds
    pub step: i64,
    pub result: Vec<Series>,
}

impl From<QueryOutput> for QueryResponse {
    fn from(output: QueryOutput) -> Self {
        Self {
            start: output.start.to_string(),
            end: output.end.to_string(),
            step: output.step,
            result: output.series,
        }
    }
}

// ============================================
// SUGGEST DTOs
// ============================================

/// Suggest request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestRequest {
    /// `<path>[:<datasource prefix>]`
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default = "default_withds")]
    pub withds: bool,
}

fn default_withds() -> bool {
    true
}

impl Default for SuggestRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            recursive: false,
            withds: default_withds(),
        }
    }
}

impl SuggestRequest {
    /// Build a request from query string pairs, first value wins
    pub fn from_pairs(pairs: &[(String, String)]) -> QueryResult<Self> {
        let first = |key: &str| first_value(pairs, key);

        let mut request = Self::default();
        if let Some(query) = first("query") {
            request.query = query.to_string();
        }
        if let Some(recursive) = first("recursive") {
            request.recursive = parse_bool(recursive)?;
        }
        if let Some(withds) = first("withds") {
            request.withds = parse_bool(withds)?;
        }
        Ok(request)
    }
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,
    /// Store backend name
    pub store: String,
    /// "ok" or "error"
    pub data_dir: String,
    pub uptime_seconds: u64,
    pub version: String,
}

/// Decode a JSON body; an empty body yields the default request
pub fn from_json_body<T: DeserializeOwned + Default>(body: &[u8]) -> ApiResult<T> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(T::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid JSON body: {}", e)))
}
