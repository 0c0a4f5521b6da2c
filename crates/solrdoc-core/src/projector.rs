//! Document projector: turns a raw engine hit into the API dictionary.
//!
//! The walk is driven by the declared [`FieldDescriptor`] tree, never by the
//! hit: fields the hit carries but the document does not declare are
//! ignored, declared fields the hit lacks come out as their default (or
//! null). Nested values are projected recursively with the child
//! descriptors.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::document::DocumentDecl;
use crate::error::{Error, Result};
use crate::fields::FieldDescriptor;
use crate::result::SearchResultRow;
use crate::types::{ModelMeta, PK};

/// Projection over one declared field list.
#[derive(Debug, Clone, Copy)]
pub struct Projector<'a> {
    allowlist: Option<&'a BTreeSet<String>>,
    fields_inheritance: bool,
}

impl<'a> Projector<'a> {
    /// `allowlist = None` emits every declared field; `Some(∅)` emits none.
    pub fn new(allowlist: Option<&'a BTreeSet<String>>) -> Self {
        Self {
            allowlist,
            fields_inheritance: false,
        }
    }

    /// Apply the allowlist to nested children as well.
    pub fn fields_inheritance(mut self, inherit: bool) -> Self {
        self.fields_inheritance = inherit;
        self
    }

    fn wants(&self, name: &str) -> bool {
        self.allowlist.map_or(true, |allow| allow.contains(name))
    }

    /// Project the top level of a hit. `values` is the hit's field map.
    pub fn project_fields(
        &self,
        fields: &[FieldDescriptor],
        values: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let mut out = Map::new();
        for field in fields {
            if !self.wants(&field.name) {
                continue;
            }
            let value = values.get(&field.name).cloned().unwrap_or(Value::Null);
            if field.document && is_empty(&value) {
                continue;
            }
            let projected = if field.is_nested() {
                self.nested(field, value)?
            } else {
                field.convert(field.or_default(value))
            };
            out.insert(field.name.clone(), projected);
        }
        Ok(out)
    }

    fn nested(&self, field: &FieldDescriptor, value: Value) -> Result<Value> {
        match value {
            Value::Null => Ok(field.default.clone().unwrap_or(Value::Null)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => self.single_nested(field, &map).map(Value::Object),
                    other => Err(invalid_nested(field, &other)),
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let projected = Value::Object(self.single_nested(field, &map)?);
                if field.multivalued {
                    Ok(Value::Array(vec![projected]))
                } else {
                    Ok(projected)
                }
            }
            other => Err(invalid_nested(field, &other)),
        }
    }

    fn single_nested(
        &self,
        field: &FieldDescriptor,
        nested: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let mut out = Map::new();
        if nested.is_empty() {
            return Ok(out);
        }
        for property in &field.properties {
            if self.fields_inheritance && !self.wants(&property.name) {
                continue;
            }
            let value = nested.get(&property.name).cloned().unwrap_or(Value::Null);
            if property.is_nested() {
                out.insert(property.name.clone(), self.nested(property, value)?);
                continue;
            }
            let converted = property.convert(property.or_default(value));
            if let Some(pk_attr) = &property.primary_key_attr {
                out.insert(pk_attr.clone(), converted.clone());
            }
            out.insert(property.name.clone(), converted);
        }
        Ok(out)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn invalid_nested(field: &FieldDescriptor, value: &Value) -> Error {
    let found = match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    };
    Error::InvalidNestedValue {
        field: field.name.clone(),
        found,
    }
}

/// Project `row` with `document`'s fields. The result always carries `pk`
/// (the composite identifier) and the model's natural pk attribute.
pub fn project(
    row: &SearchResultRow,
    document: &DocumentDecl,
    model: &ModelMeta,
    fields_inheritance: bool,
) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    out.insert(PK.to_string(), Value::String(row.id.clone()));
    out.insert(model.pk_attr().to_string(), row.natural_pk(model)?);
    let projected = Projector::new(row.allowlist.as_ref())
        .fields_inheritance(fields_inheritance)
        .project_fields(&document.fields, &row.fields)?;
    out.extend(projected);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
