#![allow(unused)]
//! Test builders: ergonomic constructors for raw engine hits.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use serde_json::{Map, Value};
use solrdoc::core::{IndexRegistry, SearchResultRow};

/// Fluent builder for a raw hit as the engine returns it.
///
/// # Example
///
/// ```rust
/// let hit = HitBuilder::new("blog.post.1")
///     .field("title", "Hello")
///     .field("author", json!({"name": "Ann"}))
///     .build();
/// ```
pub struct HitBuilder {
    fields: Map<String, Value>,
}

impl HitBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::String(id.into()));
        Self { fields }
    }

    pub fn content_type(self, ct: impl Into<String>) -> Self {
        self.field("django_ct", Value::String(ct.into()))
    }

    pub fn score(self, score: f64) -> Self {
        self.field("score", score)
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Map<String, Value> {
        self.fields
    }

    /// Resolve straight into a result row.
    pub fn row(self, registry: &IndexRegistry) -> SearchResultRow {
        SearchResultRow::from_hit(self.build(), registry).expect("hit resolves to a registered model")
    }
}

/// Shorthand for turning a `json!` object into a hit map.
pub fn hit(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("hit() expects a JSON object, got {other}"),
    }
}
