//! Query Token Parser
//!
//! Parses `DEF`/`CDEF` tokens into [`QueryDef`]s.
//!
//! # Supported Syntax
//!
//! ```text
//! DEF:<name>=<metric path>:<datasource>:<consolidation>[:<key>=<value>...]
//! CDEF:<name>=<expression>
//! ```
//!
//! The token type is case-insensitive. The datasource may be empty; the
//! consolidation may be empty (AVERAGE). One pair of wrapping quotes
//! (`"…"`, `` `…` ``, `“…”`, `‘…’`) is removed before parsing.
//!
//! # Examples
//!
//! ```text
//! DEF:RX=server1.net/interface-eth0/if_octets:rx:AVERAGE
//! def:load=server1.net/load/load/shortterm::max:step=300
//! CDEF:BITS=RX,8,*
//! ```

use nom::{
    bytes::complete::{take_while1, take_while_m_n},
    character::complete::char,
    sequence::terminated,
    IResult,
};

use crate::query::ast::{is_name_char, DefKind, QueryDef, MAX_NAME_LEN};
use crate::query::error::{QueryError, QueryResult};
use crate::storage::Consolidation;

/// Wrapping quote pairs, at most one is removed
const QUOTE_PAIRS: [(char, char); 4] = [('"', '"'), ('`', '`'), ('“', '”'), ('‘', '’')];

/// Parse one `DEF`/`CDEF` token
pub fn parse_def(token: &str) -> QueryResult<QueryDef> {
    let text = unquote(token.trim());

    let (rest, kind) = parse_type(text).map_err(|_| {
        QueryError::InvalidQuery(format!("expected TYPE:name=... in '{}'", token))
    })?;

    let is_cdef = if kind.eq_ignore_ascii_case("DEF") {
        false
    } else if kind.eq_ignore_ascii_case("CDEF") {
        true
    } else {
        return Err(QueryError::InvalidQueryType(kind.to_string()));
    };

    let (body, name) = parse_name(rest).map_err(|_| {
        QueryError::InvalidQuery(format!(
            "invalid name in '{}', expected 1-{} of [A-Za-z0-9_-] followed by '='",
            token, MAX_NAME_LEN
        ))
    })?;

    let kind = if is_cdef {
        parse_cdef_body(body, token)?
    } else {
        parse_def_body(body, token)?
    };

    Ok(QueryDef {
        name: name.to_string(),
        kind,
    })
}

/// Remove one matching pair of wrapping quotes
pub fn unquote(text: &str) -> &str {
    for (open, close) in QUOTE_PAIRS {
        if let Some(inner) = text.strip_prefix(open).and_then(|t| t.strip_suffix(close)) {
            return inner;
        }
    }
    text
}

/// `TYPE:`
fn parse_type(input: &str) -> IResult<&str, &str> {
    terminated(take_while1(|c: char| c != ':' && c != '='), char(':'))(input)
}

/// `name=`
fn parse_name(input: &str) -> IResult<&str, &str> {
    terminated(take_while_m_n(1, MAX_NAME_LEN, is_name_char), char('='))(input)
}

fn parse_def_body(body: &str, token: &str) -> QueryResult<DefKind> {
    let parts: Vec<&str> = body.split(':').collect();

    let [metric, datasource, consolidation, options @ ..] = parts.as_slice() else {
        return Err(QueryError::InvalidQuery(format!(
            "DEF needs <metric>:<datasource>:<consolidation> in '{}'",
            token
        )));
    };

    if metric.trim().is_empty() {
        return Err(QueryError::InvalidQuery(format!("empty metric in '{}'", token)));
    }

    let consolidation: Consolidation = consolidation.parse()?;

    for option in options {
        match option.split_once('=') {
            Some((key, _)) if !key.is_empty() => {}
            _ => {
                return Err(QueryError::InvalidQuery(format!(
                    "malformed option '{}' in '{}', expected key=value",
                    option, token
                )))
            }
        }
    }

    Ok(DefKind::Def {
        metric: metric.to_string(),
        datasource: (!datasource.is_empty()).then(|| datasource.to_string()),
        consolidation,
        options: options.iter().map(|o| o.to_string()).collect(),
    })
}

fn parse_cdef_body(body: &str, token: &str) -> QueryResult<DefKind> {
    if body.trim().is_empty() {
        return Err(QueryError::InvalidQuery(format!(
            "empty expression in '{}'",
            token
        )));
    }

    Ok(DefKind::Cdef {
        expression: body.to_string(),
    })
}
