//! solrdoc: Solr document projection, nested query fragments and index
//! bookkeeping.
//!
//! This crate ties the two library crates together for the CLI and the
//! HTTP surface, and re-exports them so integration tests and embedding
//! applications can import everything from one place.
//!
//! # Architecture
//!
//! ```text
//! schema.toml ──► IndexRegistry ──► SearchQuery ──► SearchBackend
//!                      │                                 │
//!                      ├──► Projector ◄── SearchResultRow ┘
//!                      │
//!                      └──► IndexAdmin / fetch ──► IndexRecordStore
//! ```

pub mod http;

pub use solrdoc_admin as admin;
pub use solrdoc_core as core;

use serde_json::{Map, Value};
use solrdoc_core::{FilterValue, IndexRegistry, ParentFilter, SearchResultRow};

/// Project raw engine hits into API dictionaries. An empty `fields` list
/// means "all fields".
pub fn project_hits(
    registry: &IndexRegistry,
    hits: Vec<Map<String, Value>>,
    fields: &[String],
    fields_inheritance: bool,
) -> solrdoc_core::Result<Vec<Value>> {
    hits.into_iter()
        .map(|hit| {
            let mut row = SearchResultRow::from_hit(hit, registry)?;
            if !fields.is_empty() {
                row = row.with_allowlist(fields.iter().cloned());
            }
            row.to_dict(registry, fields_inheritance)
                .map(|dict| Value::Object(dict.clone()))
        })
        .collect()
}

/// Render the parent/nested filter for `path`. No values gives the
/// existence form; several values match any of them.
pub fn nested_fragment(path: &str, values: Vec<String>) -> solrdoc_core::Result<String> {
    let value = match values.len() {
        0 => FilterValue::Absent,
        1 => FilterValue::Text(values.into_iter().next().unwrap_or_default()),
        _ => FilterValue::List(values),
    };
    Ok(ParentFilter::new(path, value)?.as_query_string())
}
