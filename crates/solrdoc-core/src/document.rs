//! Document declarations (which model a document indexes and which fields
//! it carries) plus the record → indexed document preparation.
//!
//! A declaration is bound against model metadata exactly once, when it is
//! registered (see [`IndexRegistry`](crate::registry::IndexRegistry)).
//! Binding fills in attribute mapping, nullability, defaults, primary-key
//! markers and the [`RelationAccessor`] of every nested field, so nothing is
//! looked up by name at projection or indexing time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::fields::{FieldDescriptor, RelationAccessor};
use crate::types::{ModelMeta, PK};

/// A search document bound to one application model.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentDecl {
    pub name: String,
    /// Model label (`app.Model`).
    pub model: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl DocumentDecl {
    /// A declaration holding only the `text` body field.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            fields: vec![FieldDescriptor::document_body()],
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Insert the `text` body field when the declaration lacks one.
    pub fn ensure_document_field(&mut self) {
        if !self.fields.iter().any(|f| f.document) {
            self.fields.insert(0, FieldDescriptor::document_body());
        }
    }

    /// Resolve attribute mapping against `model`. Related models are looked
    /// up in `models`.
    pub fn bind(&mut self, model: &ModelMeta, models: &BTreeMap<String, ModelMeta>) -> Result<()> {
        self.ensure_document_field();
        bind_fields(model, &mut self.fields, models)
    }

    /// Turn a model record into the document pushed to the engine.
    pub fn prepare(&self, model: &ModelMeta, record: &Record) -> Result<IndexedDocument> {
        let pk = record.pk(model)?;
        let content_type = model.content_type();
        let mut fields = Map::new();
        for field in &self.fields {
            let value = if field.document {
                record
                    .values
                    .get(field.attr())
                    .cloned()
                    .unwrap_or_else(|| Value::String(String::new()))
            } else if field.is_nested() {
                prepare_nested(field, record)?
            } else {
                let raw = record.values.get(field.attr()).cloned().unwrap_or(Value::Null);
                field.prepare_value(field.or_default(raw))
            };
            fields.insert(field.name.clone(), value);
        }
        Ok(IndexedDocument {
            id: format!("{content_type}.{pk}"),
            django_ct: content_type,
            django_id: pk,
            fields,
        })
    }
}

fn bind_fields(
    model: &ModelMeta,
    fields: &mut [FieldDescriptor],
    models: &BTreeMap<String, ModelMeta>,
) -> Result<()> {
    for field in fields.iter_mut() {
        if field.document {
            continue;
        }

        if field.is_nested() {
            let relation_field = model
                .get_field(&field.name)
                .filter(|f| f.relation.is_some())
                .or_else(|| {
                    field
                        .model_attr
                        .as_deref()
                        .and_then(|attr| model.get_field(attr))
                        .filter(|f| f.relation.is_some())
                });
            let Some((attr, relation)) =
                relation_field.and_then(|f| f.relation.as_ref().map(|r| (f.name.clone(), r)))
            else {
                debug!(model = %model.label, field = %field.name, "nested field has no relation, left unbound");
                continue;
            };
            let related = models
                .get(&relation.target)
                .ok_or_else(|| Error::UnknownModel(relation.target.clone()))?;
            bind_fields(related, &mut field.properties, models)?;

            let to_many = relation.kind.is_to_many();
            field.relation = Some(if to_many {
                RelationAccessor::ToMany { attr }
            } else {
                RelationAccessor::ToOne { attr }
            });
            if !field.has_default() {
                if to_many {
                    field.multivalued = true;
                    field.default = Some(Value::Array(Vec::new()));
                } else {
                    field.default = Some(Value::Object(Map::new()));
                }
            }
            continue;
        }

        if field.model_attr.is_none() {
            field.model_attr = Some(field.name.clone());
        }
        let attr = field.attr();
        let model_field = if attr == PK {
            model.pk_field()
        } else {
            model.get_field(attr)
        };
        if let Some(model_field) = model_field {
            field.null = model_field.null;
            if model_field.primary_key {
                field.primary_key_attr = Some(model_field.name.clone());
            }
            if !field.has_default() {
                field.default = model_field.default.clone();
            }
        }
    }
    Ok(())
}

fn prepare_nested(field: &FieldDescriptor, record: &Record) -> Result<Value> {
    let attr = field
        .relation
        .as_ref()
        .map(RelationAccessor::attr)
        .unwrap_or_else(|| field.attr());
    let related = record.relations.get(attr).unwrap_or(&Related::Empty);
    let value = match (&field.relation, related) {
        (_, Related::Empty) => Value::Null,
        (Some(RelationAccessor::ToMany { .. }), Related::One(_)) => {
            return Err(Error::InvalidNestedValue {
                field: field.name.clone(),
                found: "a single related record",
            })
        }
        (Some(RelationAccessor::ToOne { .. }), Related::Many(_)) => {
            return Err(Error::InvalidNestedValue {
                field: field.name.clone(),
                found: "a related collection",
            })
        }
        (_, Related::One(one)) => Value::Object(instance_to_dict(&field.properties, one)?),
        (_, Related::Many(many)) if many.is_empty() => Value::Null,
        (_, Related::Many(many)) => Value::Array(
            many.iter()
                .map(|r| instance_to_dict(&field.properties, r).map(Value::Object))
                .collect::<Result<_>>()?,
        ),
    };
    Ok(value)
}

fn instance_to_dict(properties: &[FieldDescriptor], record: &Record) -> Result<Map<String, Value>> {
    let mut doc = Map::new();
    for property in properties {
        if property.is_nested() {
            let attr = property
                .relation
                .as_ref()
                .map(RelationAccessor::attr)
                .unwrap_or_else(|| property.attr());
            if record.relations.contains_key(attr) {
                doc.insert(property.name.clone(), prepare_nested(property, record)?);
            }
        } else if let Some(raw) = record.values.get(property.attr()) {
            let value = property.prepare_value(property.or_default(raw.clone()));
            doc.insert(property.name.clone(), value);
        }
    }
    Ok(doc)
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// An application record handed to the indexer: its own attribute values
/// and its related records, keyed by relation attribute.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub values: Map<String, Value>,
    #[serde(default)]
    pub relations: BTreeMap<String, Related>,
}

/// Related records reachable through one relation attribute.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Related {
    Empty,
    Many(Vec<Record>),
    One(Box<Record>),
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn one(mut self, attr: impl Into<String>, related: Record) -> Self {
        self.relations.insert(attr.into(), Related::One(Box::new(related)));
        self
    }

    pub fn many(mut self, attr: impl Into<String>, related: Vec<Record>) -> Self {
        self.relations.insert(attr.into(), Related::Many(related));
        self
    }

    /// String form of the record's natural primary key.
    pub fn pk(&self, model: &ModelMeta) -> Result<String> {
        match self.values.get(model.pk_attr()) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            other => Err(Error::InvalidPrimaryKey {
                id: model.label.clone(),
                value: other.map(Value::to_string).unwrap_or_default(),
                reason: format!("record has no usable {:?} value", model.pk_attr()),
            }),
        }
    }
}

/// A document as pushed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedDocument {
    pub id: String,
    pub django_ct: String,
    pub django_id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl IndexedDocument {
    /// Flatten into the mapping shape the engine stores and returns.
    pub fn into_map(self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(crate::types::ID.to_string(), Value::String(self.id));
        map.insert(crate::types::CONTENT_TYPE.to_string(), Value::String(self.django_ct));
        map.insert(crate::types::NATURAL_ID.to_string(), Value::String(self.django_id));
        map.extend(self.fields);
        map
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModelField, RelationKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn models() -> BTreeMap<String, ModelMeta> {
        let order = ModelMeta::new("shop.Order")
            .field(ModelField::new("id").primary_key())
            .field(ModelField::new("status").default_value("new"))
            .field(ModelField::new("note").nullable())
            .field(ModelField::new("customer").relation(RelationKind::ForeignKey, "shop.Customer"))
            .field(ModelField::new("lines").relation(RelationKind::ReverseMany, "shop.Line"));
        let customer = ModelMeta::new("shop.Customer")
            .field(ModelField::new("id").primary_key())
            .field(ModelField::new("name"));
        let line = ModelMeta::new("shop.Line")
            .field(ModelField::new("id").primary_key())
            .field(ModelField::new("qty").default_value(1));
        [order, customer, line]
            .into_iter()
            .map(|m| (m.label.clone(), m))
            .collect()
    }

    fn order_document() -> DocumentDecl {
        DocumentDecl::new("OrderDocument", "shop.Order")
            .field(FieldDescriptor::char("status"))
            .field(FieldDescriptor::char("note"))
            .field(FieldDescriptor::nested(
                "customer",
                vec![FieldDescriptor::integer("id"), FieldDescriptor::char("name")],
            ))
            .field(FieldDescriptor::nested(
                "lines",
                vec![FieldDescriptor::integer("id"), FieldDescriptor::integer("qty")],
            ))
    }

    fn bound() -> (DocumentDecl, BTreeMap<String, ModelMeta>) {
        let models = models();
        let mut doc = order_document();
        doc.bind(&models["shop.Order"], &models).unwrap();
        (doc, models)
    }

    #[test]
    fn binding_resolves_relations_and_defaults() {
        let (doc, _) = bound();
        let status = doc.get_field("status").unwrap();
        assert_eq!(status.default, Some(json!("new")));
        assert!(doc.get_field("note").unwrap().null);

        let customer = doc.get_field("customer").unwrap();
        assert_eq!(customer.relation, Some(RelationAccessor::ToOne { attr: "customer".into() }));
        assert_eq!(customer.default, Some(json!({})));
        assert_eq!(customer.properties[0].primary_key_attr.as_deref(), Some("id"));

        let lines = doc.get_field("lines").unwrap();
        assert!(lines.multivalued);
        assert_eq!(lines.default, Some(json!([])));
        assert_eq!(lines.properties[1].default, Some(json!(1)));
    }

    #[test]
    fn binding_unknown_target_fails() {
        let mut models = models();
        models.remove("shop.Line");
        let mut doc = order_document();
        let err = doc.bind(&models["shop.Order"], &models).unwrap_err();
        assert!(matches!(err, Error::UnknownModel(label) if label == "shop.Line"));
    }

    #[test]
    fn prepare_builds_composite_id_and_nested_values() {
        let (doc, models) = bound();
        let record = Record::new()
            .value("id", 7)
            .value("status", Value::Null)
            .one("customer", Record::new().value("id", 3).value("name", "Ann"))
            .many(
                "lines",
                vec![Record::new().value("id", 1).value("qty", 2), Record::new().value("id", 2)],
            );
        let prepared = doc.prepare(&models["shop.Order"], &record).unwrap();
        assert_eq!(prepared.id, "shop.order.7");
        assert_eq!(prepared.django_ct, "shop.order");
        assert_eq!(prepared.django_id, "7");
        assert_eq!(prepared.fields["text"], json!(""));
        assert_eq!(prepared.fields["status"], json!("new"));
        assert_eq!(prepared.fields["customer"], json!({"id": 3, "name": "Ann"}));
        assert_eq!(prepared.fields["lines"], json!([{"id": 1, "qty": 2}, {"id": 2}]));
    }

    #[test]
    fn prepare_rejects_shape_mismatch() {
        let (doc, models) = bound();
        let record = Record::new().value("id", 1).many("customer", vec![Record::new()]);
        assert!(matches!(
            doc.prepare(&models["shop.Order"], &record),
            Err(Error::InvalidNestedValue { .. })
        ));
    }

    #[test]
    fn empty_collection_prepares_as_null() {
        let (doc, models) = bound();
        let record = Record::new().value("id", 1).many("lines", vec![]);
        let prepared = doc.prepare(&models["shop.Order"], &record).unwrap();
        assert_eq!(prepared.fields["lines"], Value::Null);
        assert_eq!(prepared.fields["customer"], Value::Null);
    }

    #[test]
    fn related_deserializes_by_shape() {
        let record: Record = serde_json::from_value(json!({
            "values": {"id": 1},
            "relations": {"customer": {"values": {"id": 2}}, "lines": [], "owner": null}
        }))
        .unwrap();
        assert!(matches!(record.relations["customer"], Related::One(_)));
        assert!(matches!(record.relations["lines"], Related::Many(_)));
        assert_eq!(record.relations["owner"], Related::Empty);
    }
}
