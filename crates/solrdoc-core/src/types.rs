//! Core types for solrdoc-core.
//!
//! This module defines the metadata shared across the declaration,
//! projection and indexing layers: the engine's reserved field names, the
//! [`FieldType`] of a declared attribute, and the [`ModelMeta`] describing
//! the application model a document is bound to.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Composite identifier field (`app.model.pk`).
pub const ID: &str = "id";
/// Content type field (`app.model`), used to scope queries to one model.
pub const CONTENT_TYPE: &str = "django_ct";
/// Natural primary key of the indexed record, stored as a string.
pub const NATURAL_ID: &str = "django_id";
/// Relevance score returned with every hit.
pub const SCORE: &str = "score";
/// Name of the document body field every declaration carries.
pub const DOCUMENT_FIELD: &str = "text";
/// Engine field holding a child document's nest path.
pub const NEST_PATH: &str = "_nest_path_";
/// Key under which projected dictionaries carry the composite identifier.
pub const PK: &str = "pk";

/// Engine-level type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    TextGeneral,
    Char,
    Integer,
    Float,
    Boolean,
    Date,
    #[serde(rename = "datetime")]
    DateTime,
    Nested,
}

impl FieldType {
    /// Default output format for date-like types.
    pub fn date_format(self) -> Option<&'static str> {
        match self {
            FieldType::Date => Some("%Y-%m-%d"),
            FieldType::DateTime => Some("%Y-%m-%d %H:%M:%S"),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::TextGeneral => write!(f, "text_general"),
            FieldType::Char => write!(f, "char"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Float => write!(f, "float"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Date => write!(f, "date"),
            FieldType::DateTime => write!(f, "datetime"),
            FieldType::Nested => write!(f, "_nest_path_"),
        }
    }
}

/// How the natural primary key of a model is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PkKind {
    #[default]
    Integer,
    Uuid,
    Text,
}

impl PkKind {
    /// Coerce the raw string form of a primary key. `id` is only used for
    /// the error message.
    pub fn coerce(self, id: &str, raw: &str) -> Result<Value> {
        let invalid = |reason: String| Error::InvalidPrimaryKey {
            id: id.to_string(),
            value: raw.to_string(),
            reason,
        };
        match self {
            PkKind::Integer => raw
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| invalid(e.to_string())),
            PkKind::Uuid => uuid::Uuid::parse_str(raw)
                .map(|u| Value::String(u.hyphenated().to_string()))
                .map_err(|e| invalid(e.to_string())),
            PkKind::Text => Ok(Value::String(raw.to_string())),
        }
    }
}

/// Kind of relation a model field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ForeignKey,
    OneToOne,
    ManyToMany,
    /// Reverse side of a foreign key (`<model>_set`).
    ReverseMany,
}

impl RelationKind {
    pub fn is_to_many(self) -> bool {
        matches!(self, RelationKind::ManyToMany | RelationKind::ReverseMany)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelRelation {
    pub kind: RelationKind,
    /// Label of the related model (`app.Model`).
    pub target: String,
}

/// One attribute of an application model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelField {
    pub name: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub null: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub relation: Option<ModelRelation>,
}

impl ModelField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: false,
            null: false,
            default: None,
            relation: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn relation(mut self, kind: RelationKind, target: impl Into<String>) -> Self {
        self.relation = Some(ModelRelation {
            kind,
            target: target.into(),
        });
        self
    }
}

/// Metadata of an application model a document can be bound to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelMeta {
    /// `app_label.ModelName`.
    pub label: String,
    #[serde(default)]
    pub pk_kind: PkKind,
    #[serde(default)]
    pub fields: Vec<ModelField>,
}

impl ModelMeta {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pk_kind: PkKind::default(),
            fields: Vec::new(),
        }
    }

    pub fn pk_kind(mut self, kind: PkKind) -> Self {
        self.pk_kind = kind;
        self
    }

    pub fn field(mut self, field: ModelField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&ModelField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The primary key field, if one is declared.
    pub fn pk_field(&self) -> Option<&ModelField> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Attribute name of the natural primary key; `id` when none is declared.
    pub fn pk_attr(&self) -> &str {
        self.pk_field().map(|f| f.name.as_str()).unwrap_or(ID)
    }

    /// Split `app.Model` into its two halves.
    pub fn split_label(label: &str) -> Option<(&str, &str)> {
        match label.split_once('.') {
            Some((app, model)) if !app.is_empty() && !model.is_empty() && !model.contains('.') => {
                Some((app, model))
            }
            _ => None,
        }
    }

    /// Content type value (`app.model`, lowercase model name).
    pub fn content_type(&self) -> String {
        match Self::split_label(&self.label) {
            Some((app, model)) => format!("{app}.{}", model.to_lowercase()),
            None => self.label.to_lowercase(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
