//! Metric path normalization

/// Separates a metric path from a datasource name in suggest queries.
/// Never part of a normalized metric path.
pub const DS_SEPARATOR: char = ':';

/// Clean a user supplied metric path
///
/// Strips the datasource separator, drops empty and `.` segments, resolves
/// `..` without climbing above the data directory, and keeps a trailing `/`
/// when anything is left.
///
/// ```text
/// "/a//b/./c"   → "a/b/c"
/// "a/b/../c/"   → "a/c/"
/// "../../etc"   → "etc"
/// "if:octets"   → "ifoctets"
/// ```
pub fn normalize_metric(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| *c != DS_SEPARATOR).collect();

    let mut segments: Vec<&str> = Vec::new();
    for segment in cleaned.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut normalized = segments.join("/");
    if cleaned.ends_with('/') && !normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Split a suggest query into its normalized path and optional datasource prefix
///
/// Only the first separator counts; everything after it is the prefix.
pub fn split_query(query: &str) -> (String, Option<String>) {
    match query.split_once(DS_SEPARATOR) {
        Some((path, ds)) => (normalize_metric(path), Some(ds.to_string())),
        None => (normalize_metric(query), None),
    }
}

/// Directory part of a normalized path, including its trailing `/`
pub(crate) fn dir_part(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    }
}

/// Parent path and last segment, if the path has more than one segment
pub(crate) fn split_last(path: &str) -> Option<(&str, &str)> {
    path.rsplit_once('/')
        .filter(|(parent, last)| !parent.is_empty() && !last.is_empty())
}
