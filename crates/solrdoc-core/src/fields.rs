//! Field descriptors: how one document attribute is extracted, typed,
//! defaulted and, for nested fields, further decomposed.
//!
//! Descriptors are plain owned trees: a nested descriptor owns its child
//! `properties`, so a descriptor can never contain itself.

use std::sync::{Arc, LazyLock};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::types::{FieldType, DOCUMENT_FIELD};

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})").expect("date regex")
});

static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})(?:T|\s+)(?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2})",
    )
    .expect("datetime regex")
});

/// User supplied conversion applied to raw engine values on projection.
#[derive(Clone)]
pub struct Converter(Arc<dyn Fn(Value) -> Value + Send + Sync>);

impl Converter {
    pub fn new(f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, value: Value) -> Value {
        (self.0)(value)
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Converter(..)")
    }
}

/// How a bound nested field reaches its related records. Resolved once when
/// the document is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationAccessor {
    /// A single related record (foreign key, one-to-one).
    ToOne { attr: String },
    /// An ordered collection of related records.
    ToMany { attr: String },
}

impl RelationAccessor {
    pub fn attr(&self) -> &str {
        match self {
            RelationAccessor::ToOne { attr } | RelationAccessor::ToMany { attr } => attr,
        }
    }
}

/// Describes one projected attribute of a document.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub multivalued: bool,
    /// `None` means "no default declared". `Some(Value::Null)` is a declared
    /// null default.
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub null: bool,
    /// Model attribute the value is read from; the field name when unset.
    #[serde(default)]
    pub model_attr: Option<String>,
    /// Marks the document body field.
    #[serde(default)]
    pub document: bool,
    /// strftime format used when indexing date-like values.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub properties: Vec<FieldDescriptor>,
    #[serde(skip)]
    pub converter: Option<Converter>,
    /// Set during binding when this field maps to the model's primary key:
    /// the model's natural pk attribute name.
    #[serde(skip)]
    pub primary_key_attr: Option<String>,
    #[serde(skip)]
    pub relation: Option<RelationAccessor>,
}

fn default_field_type() -> FieldType {
    FieldType::Char
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            multivalued: false,
            default: None,
            null: false,
            model_attr: None,
            document: false,
            format: None,
            properties: Vec::new(),
            converter: None,
            primary_key_attr: None,
            relation: None,
        }
    }

    pub fn char(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Char)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::DateTime)
    }

    /// A nested field; nested fields are always nullable.
    pub fn nested(name: impl Into<String>, properties: Vec<FieldDescriptor>) -> Self {
        let mut field = Self::new(name, FieldType::Nested);
        field.properties = properties;
        field.null = true;
        field
    }

    /// The `text` body field every document declaration carries.
    pub fn document_body() -> Self {
        let mut field = Self::new(DOCUMENT_FIELD, FieldType::TextGeneral);
        field.document = true;
        field
    }

    pub fn multivalued(mut self) -> Self {
        self.multivalued = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn model_attr(mut self, attr: impl Into<String>) -> Self {
        self.model_attr = Some(attr.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn converter(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.converter = Some(Converter::new(f));
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn is_nested(&self) -> bool {
        self.field_type == FieldType::Nested
    }

    /// Attribute the value is read from when indexing.
    pub fn attr(&self) -> &str {
        self.model_attr.as_deref().unwrap_or(&self.name)
    }

    /// `value`, or the declared default when `value` is null.
    pub fn or_default(&self, value: Value) -> Value {
        match (&value, &self.default) {
            (Value::Null, Some(default)) => default.clone(),
            _ => value,
        }
    }

    /// Coerce a raw engine value for output.
    pub fn convert(&self, value: Value) -> Value {
        if let Some(converter) = &self.converter {
            return converter.apply(value);
        }
        match value {
            Value::Array(items) if self.multivalued => Value::Array(
                items
                    .into_iter()
                    .map(|v| convert_scalar(self.field_type, v))
                    .collect(),
            ),
            other => convert_scalar(self.field_type, other),
        }
    }

    /// Shape a model value for the index. Date-like strings are rendered
    /// with `format`, falling back to the type's default format.
    pub fn prepare_value(&self, value: Value) -> Value {
        let Some(default_format) = self.field_type.date_format() else {
            return value;
        };
        let format = self.format.as_deref().unwrap_or(default_format);
        match value {
            Value::String(s) => match parse_date_like(self.field_type, &s) {
                Some(dt) => Value::String(dt.format(format).to_string()),
                None => Value::String(s),
            },
            other => other,
        }
    }
}

fn convert_scalar(field_type: FieldType, value: Value) -> Value {
    if value.is_null() {
        return value;
    }
    match field_type {
        FieldType::Text | FieldType::TextGeneral | FieldType::Char => match value {
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            other => other,
        },
        FieldType::Integer => match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => value,
            Value::Number(n) => n
                .as_f64()
                .map(|f| Value::from(f.trunc() as i64))
                .unwrap_or(value),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Value::from)
                    .or_else(|_| s.parse::<f64>().map(|f| Value::from(f.trunc() as i64)))
                    .unwrap_or(value)
            }
            _ => value,
        },
        FieldType::Float => match &value {
            Value::Number(n) => n.as_f64().map(Value::from).unwrap_or(value),
            Value::String(s) => s.trim().parse::<f64>().map(Value::from).unwrap_or(value),
            _ => value,
        },
        FieldType::Boolean => match &value {
            Value::String(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
            _ => value,
        },
        FieldType::Date | FieldType::DateTime => match &value {
            Value::String(s) => match (parse_date_like(field_type, s), field_type.date_format()) {
                (Some(dt), Some(format)) => Value::String(dt.format(format).to_string()),
                _ => value,
            },
            _ => value,
        },
        FieldType::Nested => value,
    }
}

fn parse_date_like(field_type: FieldType, s: &str) -> Option<NaiveDateTime> {
    let number = |caps: &regex::Captures<'_>, name: &str| -> Option<u32> {
        caps.name(name)?.as_str().parse().ok()
    };
    match field_type {
        FieldType::Date => {
            let caps = DATE_RE.captures(s)?;
            let date = NaiveDate::from_ymd_opt(
                number(&caps, "year")? as i32,
                number(&caps, "month")?,
                number(&caps, "day")?,
            )?;
            Some(date.and_time(NaiveTime::MIN))
        }
        FieldType::DateTime => {
            let caps = DATETIME_RE.captures(s)?;
            let date = NaiveDate::from_ymd_opt(
                number(&caps, "year")? as i32,
                number(&caps, "month")?,
                number(&caps, "day")?,
            )?;
            let time = NaiveTime::from_hms_opt(
                number(&caps, "hour")?,
                number(&caps, "minute")?,
                number(&caps, "second")?,
            )?;
            Some(date.and_time(time))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
