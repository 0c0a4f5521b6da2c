//! Query construction: term filters, the parent/nested-child filter and the
//! request parameters handed to a [`SearchBackend`].
//!
//! # Nested filters
//!
//! A dotted path `a.b.c` addresses field `c` of child documents stored
//! under the nest path `/a/b`. [`ParentFilter`] renders a block-join
//! fragment selecting root documents with at least one such child:
//!
//! ```text
//! {!parent which="*:* -_nest_path_:*"} (+_nest_path_:"/a/b" +c:(x))
//! ```
//!
//! A single-segment path `a` addresses the child collection `a` hanging
//! directly off the root, so its effective nest path is `/a`.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::backend::SearchBackend;
use crate::error::{Error, Result};
use crate::registry::IndexRegistry;
use crate::result::SearchResultRow;
use crate::types::{ModelMeta, CONTENT_TYPE, ID, NATURAL_ID, NEST_PATH, SCORE};

/// Always requested alongside an explicit field list.
pub const INTERNAL_FIELDS: &[&str] = &[ID, CONTENT_TYPE, NATURAL_ID, SCORE];

/// Appended to every field list: all stored fields, the score, and the
/// nested child documents.
pub const EXTRA_FIELDS: &[&str] = &["*", SCORE, "[child]"];

const PARENT_PARSER: &str = r#"{!parent which="*:* -_nest_path_:*"}"#;

const SPECIAL_CHARS: &[char] = &[
    '\\', '+', '-', '!', '(', ')', ':', '^', '[', ']', '"', '{', '}', '~', '*', '?', '|', '&', '/',
];

const OPERATORS: &[&str] = &["AND", "OR", "NOT"];

/// Backslash-escape query syntax characters. Whitespace is kept so that a
/// joined list still analyses into separate terms; a token spelling a
/// boolean operator gets its first letter escaped so it stays a term.
pub fn escape_term(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut token_start = true;
    for (i, c) in value.char_indices() {
        if SPECIAL_CHARS.contains(&c) {
            out.push('\\');
        } else if token_start && starts_operator(&value[i..]) {
            out.push('\\');
        }
        token_start = c.is_whitespace();
        out.push(c);
    }
    out
}

fn starts_operator(rest: &str) -> bool {
    let token = rest.split(char::is_whitespace).next().unwrap_or_default();
    OPERATORS.contains(&token)
}

// ---------------------------------------------------------------------------
// Filter values
// ---------------------------------------------------------------------------

/// Value side of a filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterValue {
    /// Existence only.
    #[default]
    Absent,
    Text(String),
    /// Matches any of the terms.
    List(Vec<String>),
}

impl FilterValue {
    /// Plain-text form: list items joined by a single space, with blank
    /// items dropped. `None` when absent or nothing but whitespace.
    pub fn joined(&self) -> Option<String> {
        let text = match self {
            FilterValue::Absent => return None,
            FilterValue::Text(s) => s.trim().to_string(),
            FilterValue::List(items) => items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        };
        (!text.is_empty()).then_some(text)
    }

    /// Individual terms, split on whitespace.
    pub fn terms(&self) -> Vec<String> {
        self.joined()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(value: Vec<String>) -> Self {
        FilterValue::List(value)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(value: Vec<&str>) -> Self {
        FilterValue::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FilterValue::Absent,
            Value::String(s) => FilterValue::Text(s),
            Value::Array(items) => FilterValue::List(
                items
                    .into_iter()
                    .filter(|v| !v.is_null())
                    .map(|v| match v {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            other => FilterValue::Text(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Nested paths
// ---------------------------------------------------------------------------

/// A parsed dotted path: the leaf `key` and the `nest_path` of its parent
/// documents (`/` for a single-segment path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedPath {
    pub key: String,
    pub nest_path: String,
}

impl NestedPath {
    /// Parse `a.b.c` into key `c` and nest path `/a/b`. Every segment must
    /// be a non-empty identifier (`[A-Za-z0-9_]`).
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidNestedPath {
            path: path.to_string(),
            reason,
        };
        if path.is_empty() {
            return Err(invalid("path is empty"));
        }
        let mut segments: Vec<&str> = path.split('.').collect();
        for segment in &segments {
            if segment.is_empty() {
                return Err(invalid("path has an empty segment"));
            }
            if !segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(invalid("segments may only contain letters, digits and '_'"));
            }
        }
        let key = segments.pop().unwrap_or_default().to_string();
        Ok(Self {
            key,
            nest_path: format!("/{}", segments.join("/")),
        })
    }

    pub fn is_root(&self) -> bool {
        self.nest_path == "/"
    }

    /// Nest path the child documents live under.
    pub fn effective_nest_path(&self) -> String {
        if self.is_root() {
            format!("/{}", self.key)
        } else {
            self.nest_path.clone()
        }
    }

    /// Segments of [`effective_nest_path`](Self::effective_nest_path).
    pub fn nest_segments(&self) -> Vec<String> {
        self.effective_nest_path()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// "Parent document with at least one matching nested child" filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentFilter {
    pub path: NestedPath,
    pub value: FilterValue,
}

impl ParentFilter {
    pub fn new(path: &str, value: impl Into<FilterValue>) -> Result<Self> {
        Ok(Self {
            path: NestedPath::parse(path)?,
            value: value.into(),
        })
    }

    /// Existence form: the parent has at least one child at the path.
    pub fn exists(path: &str) -> Result<Self> {
        Self::new(path, FilterValue::Absent)
    }

    pub fn as_query_string(&self) -> String {
        let mut clauses = vec![format!(
            "+{NEST_PATH}:\"{}\"",
            self.path.effective_nest_path()
        )];
        if let Some(value) = self.value.joined() {
            clauses.push(format!("+{}:({})", self.path.key, escape_term(&value)));
        }
        format!("{PARENT_PARSER} ({})", clauses.join(" "))
    }
}

impl fmt::Display for ParentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_query_string())
    }
}

// ---------------------------------------------------------------------------
// Filters and query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `field:(value)` on the root document.
    Term { field: String, value: FilterValue },
    Parent(ParentFilter),
}

impl Filter {
    pub fn as_query_string(&self) -> String {
        match self {
            Filter::Term { field, value } => match value.joined() {
                Some(v) => format!("{field}:({})", escape_term(&v)),
                None => format!("{field}:[* TO *]"),
            },
            Filter::Parent(parent) => parent.as_query_string(),
        }
    }
}

/// Parameters of one engine request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub q: String,
    /// Rendered filter queries.
    pub fq: Vec<String>,
    /// Field list.
    pub fl: Vec<String>,
    /// Content types the request is scoped to.
    pub models: Vec<String>,
    /// Structured filters behind `fq`, for backends that evaluate them
    /// directly.
    pub filters: Vec<Filter>,
}

/// Builder for a search over one or more models.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    models: Vec<String>,
    filters: Vec<Filter>,
    fields: Vec<String>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// A query scoped to `model`.
    pub fn for_model(model: &ModelMeta) -> Self {
        Self::new().model(model)
    }

    pub fn model(mut self, model: &ModelMeta) -> Self {
        let ct = model.content_type();
        if !self.models.contains(&ct) {
            self.models.push(ct);
        }
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.push(Filter::Term {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Narrow to parents having a child at `path` whose leaf matches `value`.
    pub fn nested(mut self, path: &str, value: impl Into<FilterValue>) -> Result<Self> {
        let parent = ParentFilter::new(path, value)?;
        debug!(fragment = %parent, "nested filter");
        self.filters.push(Filter::Parent(parent));
        Ok(self)
    }

    /// Narrow to parents having any child at `path`.
    pub fn nested_exists(mut self, path: &str) -> Result<Self> {
        self.filters.push(Filter::Parent(ParentFilter::exists(path)?));
        Ok(self)
    }

    /// Restrict the fields returned and projected.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn requested_fields(&self) -> &[String] {
        &self.fields
    }

    /// Explicit field list sent to the engine: the internal fields plus the
    /// requested ones, or nothing when no fields were requested.
    pub fn query_fields(&self) -> Vec<String> {
        if self.fields.is_empty() {
            return Vec::new();
        }
        let mut set: BTreeSet<String> = INTERNAL_FIELDS.iter().map(|s| s.to_string()).collect();
        set.extend(self.fields.iter().cloned());
        set.into_iter().collect()
    }

    pub fn build_params(&self) -> QueryParams {
        let mut fq = Vec::with_capacity(self.filters.len() + 1);
        if !self.models.is_empty() {
            let models: Vec<String> = self.models.iter().map(|m| escape_term(m)).collect();
            fq.push(format!("{CONTENT_TYPE}:({})", models.join(" OR ")));
        }
        fq.extend(self.filters.iter().map(Filter::as_query_string));

        let mut fl = self.query_fields();
        fl.extend(EXTRA_FIELDS.iter().map(|s| s.to_string()));

        QueryParams {
            q: "*:*".to_string(),
            fq,
            fl,
            models: self.models.clone(),
            filters: self.filters.clone(),
        }
    }

    pub fn count(&self, backend: &dyn SearchBackend) -> Result<u64> {
        backend.count(&self.build_params())
    }

    /// Run the query and wrap every hit as a [`SearchResultRow`] carrying
    /// the requested field list.
    pub fn execute(
        &self,
        backend: &dyn SearchBackend,
        registry: &IndexRegistry,
    ) -> Result<Vec<SearchResultRow>> {
        let response = backend.search(&self.build_params())?;
        response
            .docs
            .into_iter()
            .map(|hit| {
                let row = SearchResultRow::from_hit(hit, registry)?;
                Ok(if self.fields.is_empty() {
                    row
                } else {
                    row.with_allowlist(self.fields.iter().cloned())
                })
            })
            .collect()
    }

    pub fn first(
        &self,
        backend: &dyn SearchBackend,
        registry: &IndexRegistry,
    ) -> Result<Option<SearchResultRow>> {
        Ok(self.execute(backend, registry)?.into_iter().next())
    }

    pub fn last(
        &self,
        backend: &dyn SearchBackend,
        registry: &IndexRegistry,
    ) -> Result<Option<SearchResultRow>> {
        Ok(self.execute(backend, registry)?.into_iter().next_back())
    }
}

// ---------------------------------------------------------------------------
// Single-record lookup
// ---------------------------------------------------------------------------

/// Lookup keys accepted by [`get`], in priority order.
pub const LOOKUP_KEYS: &[&str] = &[ID, NATURAL_ID, "guid", "uuid"];

/// How [`get`] identifies the record.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The natural primary key.
    Pk(Value),
    /// Named keys; the first of [`LOOKUP_KEYS`] with a non-empty value wins.
    Named(Vec<(String, Value)>),
}

impl Lookup {
    fn resolve(&self) -> Result<(&str, &Value)> {
        match self {
            Lookup::Pk(value) => Ok((NATURAL_ID, value)),
            Lookup::Named(pairs) => LOOKUP_KEYS
                .iter()
                .find_map(|key| {
                    pairs
                        .iter()
                        .find(|(k, v)| k == key && is_truthy(v))
                        .map(|(_, v)| (*key, v))
                })
                .ok_or_else(|| Error::MissingLookup(LOOKUP_KEYS.join(", "))),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
    }
}

/// Fetch exactly one indexed record of `model_label`.
pub fn get(
    backend: &dyn SearchBackend,
    registry: &IndexRegistry,
    model_label: &str,
    lookup: &Lookup,
    fields: &[&str],
) -> Result<SearchResultRow> {
    registry.get_index(model_label)?;
    let model = registry.model(model_label)?;
    let (key, value) = lookup.resolve()?;
    let mut search = SearchQuery::for_model(model).filter(key, value.clone());
    if !fields.is_empty() {
        search = search.fields(fields.iter().copied());
    }
    match search.count(backend)? {
        0 => Err(Error::NotFound),
        1 => search.first(backend, registry)?.ok_or(Error::NotFound),
        n => Err(Error::MultipleResults(n)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
