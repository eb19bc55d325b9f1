//! rrdgate Query Pipeline
//!
//! - **time**: Instant and duration parsing
//! - **ast**: Query definitions and validation
//! - **parser**: `DEF`/`CDEF` token parsing
//! - **compiler**: Resolution of definitions to store bindings
//! - **executor**: Execution against the store
//! - **series**: Response assembly with NaN ↔ `null`
//!
//! # Query Language
//!
//! ```text
//! DEF:<name>=<metric path>:<datasource>:<consolidation>[:<key>=<value>...]
//! CDEF:<name>=<expression over earlier names>
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use rrdgate::query::{parse_def, QueryExecutor, QuerySpec, TimeSpecParser};
//!
//! let times = TimeSpecParser::new();
//! let spec = QuerySpec::new(times.parse_instant("-1h")?, times.parse_instant("now")?)
//!     .with_step(parse_duration("1m")?)
//!     .with_hidden(parse_def("DEF:RX=server1.net/interface-eth0/if_octets:rx:AVERAGE")?)
//!     .with_def(parse_def("CDEF:BITS=RX,8,*")?);
//!
//! let output = executor.execute(&spec).await?;
//! ```

mod ast;
mod compiler;
mod error;
mod executor;
mod parser;
mod series;
mod time;

pub use crate::storage::Consolidation;
pub use ast::{is_name_char, is_valid_name, DefKind, QueryDef, QueryItem, QuerySpec, MAX_NAME_LEN};
pub use compiler::compile;
pub use error::{QueryError, QueryResult};
pub use executor::{QueryExecutor, QueryOutput};
pub use parser::{parse_def, unquote};
pub use series::{assemble, Series, SeriesPoints};
pub use time::{parse_duration, TimePoint, TimeSpecParser};
