//! Search backend seam and an in-process implementation.
//!
//! Transport to a real engine lives outside this crate; anything that can
//! answer [`QueryParams`] and accept [`IndexedDocument`] batches implements
//! [`SearchBackend`]. [`MemoryBackend`] evaluates the structured filters
//! directly and backs the tests, benches and the local sandbox server.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::debug;

use crate::document::{DocumentDecl, IndexedDocument};
use crate::error::{Error, Result};
use crate::query::{Filter, ParentFilter, QueryParams};
use crate::types::{CONTENT_TYPE, SCORE};

/// Hits returned for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub num_found: u64,
    pub docs: Vec<Map<String, Value>>,
}

pub trait SearchBackend: Send + Sync {
    /// Connection alias, for logs and messages.
    fn alias(&self) -> &str;

    /// Documents pushed per [`update`](Self::update) call when rebuilding.
    fn batch_size(&self) -> usize;

    fn search(&self, params: &QueryParams) -> Result<SearchResponse>;

    fn count(&self, params: &QueryParams) -> Result<u64> {
        Ok(self.search(params)?.num_found)
    }

    fn update(&self, document: &DocumentDecl, docs: Vec<IndexedDocument>) -> Result<()>;

    /// Remove every document of the given content types.
    fn clear(&self, content_types: &[String]) -> Result<()>;
}

/// In-process backend keyed by composite id.
#[derive(Debug)]
pub struct MemoryBackend {
    alias: String,
    batch_size: usize,
    docs: Mutex<BTreeMap<String, Map<String, Value>>>,
    failure: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new(alias: impl Into<String>, batch_size: usize) -> Self {
        Self {
            alias: alias.into(),
            batch_size: batch_size.max(1),
            docs: Mutex::new(BTreeMap::new()),
            failure: Mutex::new(None),
        }
    }

    /// Make every following call fail with `message` (until cleared with
    /// `None`).
    pub fn set_failure(&self, message: Option<String>) {
        *lock(&self.failure) = message;
    }

    /// Store already-shaped hits, bypassing [`SearchBackend::update`].
    pub fn insert(&self, doc: IndexedDocument) {
        let map = doc.into_map();
        if let Some(Value::String(id)) = map.get(crate::types::ID).cloned() {
            lock(&self.docs).insert(id, map);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.docs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<()> {
        match lock(&self.failure).as_ref() {
            Some(message) => Err(Error::Backend {
                alias: self.alias.clone(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SearchBackend for MemoryBackend {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn search(&self, params: &QueryParams) -> Result<SearchResponse> {
        self.check()?;
        let docs: Vec<Map<String, Value>> = lock(&self.docs)
            .values()
            .filter(|doc| hit_matches(doc, params))
            .map(|doc| {
                let mut hit = doc.clone();
                hit.insert(SCORE.to_string(), Value::from(1.0));
                hit
            })
            .collect();
        Ok(SearchResponse {
            num_found: docs.len() as u64,
            docs,
        })
    }

    fn update(&self, document: &DocumentDecl, docs: Vec<IndexedDocument>) -> Result<()> {
        self.check()?;
        debug!(alias = %self.alias, document = %document.name, count = docs.len(), "update batch");
        for doc in docs {
            self.insert(doc);
        }
        Ok(())
    }

    fn clear(&self, content_types: &[String]) -> Result<()> {
        self.check()?;
        lock(&self.docs).retain(|_, doc| {
            !matches!(doc.get(CONTENT_TYPE), Some(Value::String(ct)) if content_types.contains(ct))
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Filter evaluation
// ---------------------------------------------------------------------------

fn hit_matches(doc: &Map<String, Value>, params: &QueryParams) -> bool {
    if !params.models.is_empty() {
        let in_scope = matches!(doc.get(CONTENT_TYPE), Some(Value::String(ct)) if params.models.contains(ct));
        if !in_scope {
            return false;
        }
    }
    params.filters.iter().all(|filter| match filter {
        Filter::Term { field, value } => {
            let terms = value.terms();
            match doc.get(field) {
                None | Some(Value::Null) => false,
                Some(v) if terms.is_empty() => !v.is_null(),
                Some(v) => value_matches(v, &terms),
            }
        }
        Filter::Parent(parent) => parent_matches(doc, parent),
    })
}

fn value_matches(value: &Value, terms: &[String]) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|v| value_matches(v, terms)),
        Value::String(s) => terms.iter().any(|t| t == s),
        Value::Number(_) | Value::Bool(_) => {
            let s = value.to_string();
            terms.iter().any(|t| *t == s)
        }
        _ => false,
    }
}

/// Children found by walking the nest path down from the root document.
fn children_at<'a>(doc: &'a Map<String, Value>, segments: &[String]) -> Vec<&'a Map<String, Value>> {
    let mut level = vec![doc];
    for segment in segments {
        let mut next = Vec::new();
        for node in level {
            match node.get(segment) {
                Some(Value::Object(child)) => next.push(child),
                Some(Value::Array(items)) => next.extend(items.iter().filter_map(Value::as_object)),
                _ => {}
            }
        }
        level = next;
    }
    level
}

fn parent_matches(doc: &Map<String, Value>, parent: &ParentFilter) -> bool {
    let children = children_at(doc, &parent.path.nest_segments());
    let terms = parent.value.terms();
    if terms.is_empty() {
        return !children.is_empty();
    }
    children
        .iter()
        .any(|child| child.get(&parent.path.key).is_some_and(|v| value_matches(v, &terms)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SearchQuery;
    use crate::types::ModelMeta;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> IndexedDocument {
        IndexedDocument {
            id: format!("shop.order.{id}"),
            django_ct: "shop.order".into(),
            django_id: id.into(),
            fields: fields.as_object().cloned().unwrap(),
        }
    }

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new("default", 2);
        backend.insert(doc("1", json!({"status": "paid", "lines": [{"sku": "a", "meta": {"tag": "x"}}]})));
        backend.insert(doc("2", json!({"status": "new", "lines": [{"sku": "b"}]})));
        backend.insert(doc("3", json!({"status": "new"})));
        backend
    }

    #[test]
    fn term_and_parent_filters() {
        let backend = backend();
        let model = ModelMeta::new("shop.Order");
        let q = SearchQuery::for_model(&model).filter("status", "new");
        assert_eq!(q.count(&backend).unwrap(), 2);

        let q = SearchQuery::for_model(&model).nested_exists("lines").unwrap();
        assert_eq!(q.count(&backend).unwrap(), 2);

        let q = SearchQuery::for_model(&model).nested("lines.sku", vec!["b", "z"]).unwrap();
        assert_eq!(q.count(&backend).unwrap(), 1);

        let q = SearchQuery::for_model(&model).nested("lines.meta.tag", "x").unwrap();
        assert_eq!(q.count(&backend).unwrap(), 1);
    }

    #[test]
    fn clear_by_content_type_and_failure_injection() {
        let backend = backend();
        backend.clear(&["shop.other".to_string()]).unwrap();
        assert_eq!(backend.len(), 3);
        backend.clear(&["shop.order".to_string()]).unwrap();
        assert!(backend.is_empty());

        backend.set_failure(Some("down".into()));
        let err = backend.clear(&[]).unwrap_err();
        assert_eq!(err.to_string(), "search backend default: down");
    }
}
