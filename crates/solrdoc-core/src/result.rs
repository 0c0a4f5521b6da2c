//! Search result rows: one raw hit plus its memoised API dictionary.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::projector;
use crate::registry::IndexRegistry;
use crate::types::{ModelMeta, CONTENT_TYPE, ID, NATURAL_ID, SCORE};

/// One hit returned by the engine. Read-only once built; the projected
/// dictionary is computed on first access and cached.
#[derive(Debug)]
pub struct SearchResultRow {
    /// Composite identifier (`app.model.pk`).
    pub id: String,
    /// Model label (`app.Model`).
    pub model_label: String,
    pub score: f64,
    /// Remaining stored fields, nested children included.
    pub fields: Map<String, Value>,
    /// Fields requested by the query; `None` means all.
    pub allowlist: Option<BTreeSet<String>>,
    dict: OnceLock<Map<String, Value>>,
}

impl SearchResultRow {
    pub fn new(id: impl Into<String>, model_label: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            model_label: model_label.into(),
            score: 0.0,
            fields,
            allowlist: None,
            dict: OnceLock::new(),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_allowlist<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowlist = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Build a row from a raw engine hit. `id` is mandatory; the model is
    /// resolved through the registry from the hit's content type.
    pub fn from_hit(mut hit: Map<String, Value>, registry: &IndexRegistry) -> Result<Self> {
        let id = match hit.remove(ID) {
            Some(Value::String(id)) => id,
            _ => return Err(Error::MissingHitField(ID)),
        };
        let content_type = match hit.remove(CONTENT_TYPE) {
            Some(Value::String(ct)) => ct,
            _ => id.rsplit_once('.').map(|(ct, _)| ct.to_string()).unwrap_or_default(),
        };
        let model_label = registry
            .model_by_content_type(&content_type)
            .map(|m| m.label.clone())
            .ok_or_else(|| Error::NotHandled(content_type.clone()))?;
        let score = hit.remove(SCORE).and_then(|s| s.as_f64()).unwrap_or(0.0);
        hit.remove(NATURAL_ID);
        Ok(Self::new(id, model_label, hit).with_score(score))
    }

    /// The natural primary key: last `.` segment of the composite id,
    /// coerced by the model's pk kind.
    pub fn natural_pk(&self, model: &ModelMeta) -> Result<Value> {
        let raw = self.id.rsplit('.').next().unwrap_or_default();
        model.pk_kind.coerce(&self.id, raw)
    }

    /// Projected dictionary. Computed once; later calls return the same
    /// instance regardless of `fields_inheritance`. A model with no
    /// registered document projects to an empty mapping.
    pub fn to_dict(&self, registry: &IndexRegistry, fields_inheritance: bool) -> Result<&Map<String, Value>> {
        if let Some(dict) = self.dict.get() {
            return Ok(dict);
        }
        let dict = match registry.get_index(&self.model_label) {
            Ok(document) => {
                let model = registry.model(&self.model_label)?;
                projector::project(self, document, model, fields_inheritance)?
            }
            Err(Error::NotHandled(_)) => Map::new(),
            Err(err) => return Err(err),
        };
        Ok(self.dict.get_or_init(|| dict))
    }

    /// Raw field access.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl Clone for SearchResultRow {
    /// Clones the hit; the memoised dictionary is not carried over.
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            model_label: self.model_label.clone(),
            score: self.score,
            fields: self.fields.clone(),
            allowlist: self.allowlist.clone(),
            dict: OnceLock::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
