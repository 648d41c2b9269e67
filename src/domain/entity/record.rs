//! Records: one stored row of an entity plus its hydrated relationships.

use super::{CatalogError, ColumnType, EntityDescriptor, FieldSource, Identity};
use crate::domain::links::Links;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    /// Absolute URL of another API resource or endpoint.
    Link(String),
    /// Ordered key/value map (e.g. `valores`, `uf`).
    Map(Vec<(String, Value)>),
    List(Vec<Value>),
    /// Shallow related entity.
    Entity(Box<Record>),
    Point { lat: f64, lon: f64 },
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the tree-markup renderer leaves this value out.
    ///
    /// Falsy values are omitted unless they are integral: `0` and `false`
    /// are kept, while a zero decimal, empty text and empty collections are not.
    pub fn omitted_in_markup(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(_) | Value::Integer(_) => false,
            Value::Decimal(d) => d.is_zero(),
            Value::Text(s) | Value::Link(s) => s.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Date(_) | Value::Entity(_) | Value::Point { .. } => false,
        }
    }

    /// Plain falsiness: null, `false`, numeric zero and empty text or
    /// collections. Mapped RDF properties skip falsy values.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Integer(i) => *i == 0,
            Value::Decimal(d) => d.is_zero(),
            Value::Text(s) | Value::Link(s) => s.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Date(_) | Value::Entity(_) | Value::Point { .. } => false,
        }
    }

    /// External text form, `None` for null.
    pub fn text_form(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Decimal(d) => Some(format_decimal(d)),
            Value::Text(s) | Value::Link(s) => Some(s.clone()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Value::Map(m) => Some(
                m.iter()
                    .map(|(k, v)| format!("{}: {}", k, v.text_form().unwrap_or_default()))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Value::List(items) => Some(
                items
                    .iter()
                    .filter_map(Value::text_form)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Value::Entity(r) => Some(r.text_form()),
            Value::Point { lat, lon } => Some(format!("{},{}", lat, lon)),
        }
    }
}

/// Fixed two-fraction-digit decimal text.
pub fn format_decimal(d: &Decimal) -> String {
    let mut r = d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    r.rescale(2);
    r.to_string()
}

#[derive(Clone)]
pub struct Record {
    descriptor: Arc<EntityDescriptor>,
    links: Arc<Links>,
    row: Map<String, JsonValue>,
    related: HashMap<String, Value>,
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("entity", &self.descriptor.name())
            .field("row", &self.row)
            .finish()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.name() == other.descriptor.name()
            && self.row == other.row
            && self.related == other.related
    }
}

impl Record {
    pub fn new(descriptor: Arc<EntityDescriptor>, links: Arc<Links>, row: Map<String, JsonValue>) -> Self {
        Self {
            descriptor,
            links,
            row,
            related: HashMap::new(),
        }
    }

    pub fn descriptor(&self) -> &Arc<EntityDescriptor> {
        &self.descriptor
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    pub fn row(&self) -> &Map<String, JsonValue> {
        &self.row
    }

    /// Raw stored value of a column.
    pub fn raw(&self, column: &str) -> Option<&JsonValue> {
        self.row.get(column).filter(|v| !v.is_null())
    }

    /// Typed value of a stored column.
    pub fn column(&self, column: &str) -> Value {
        let Some(raw) = self.raw(column) else {
            return Value::Null;
        };
        let ty = self.descriptor.column(column).unwrap_or(ColumnType::Text);
        json_to_value(ty, raw)
    }

    pub fn column_text(&self, column: &str) -> Option<String> {
        self.column(column).text_form()
    }

    pub fn column_i64(&self, column: &str) -> Option<i64> {
        match self.column(column) {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// Identifier: primary-key values joined with `,`.
    pub fn id(&self) -> String {
        self.descriptor
            .primary_key()
            .iter()
            .map(|pk| self.raw(pk).and_then(json_key_text).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Canonical (non-informational) URI.
    pub fn uri(&self) -> Option<String> {
        match self.descriptor.identity() {
            Identity::Resource { slug } => Some(self.links.resource_uri(slug, &self.id())),
            Identity::Fragment { path } => Some(format!("{}#{}", self.links.absolute(path), self.id())),
            Identity::Anonymous => None,
        }
    }

    /// Document describing the entity.
    pub fn doc_uri(&self) -> Option<String> {
        match self.descriptor.identity() {
            Identity::Resource { slug } => Some(self.links.document_uri(slug, &self.id(), None)),
            Identity::Fragment { path } => Some(self.links.absolute(path)),
            Identity::Anonymous => None,
        }
    }

    /// Value of a declared field; undeclared names read as null.
    pub fn get(&self, field: &str) -> Value {
        self.try_get(field).unwrap_or(Value::Null)
    }

    pub fn try_get(&self, field: &str) -> Result<Value, CatalogError> {
        let def = self
            .descriptor
            .field(field)
            .ok_or_else(|| CatalogError::UndeclaredField {
                entity: self.descriptor.name().to_string(),
                field: field.to_string(),
            })?;
        Ok(match &def.source {
            FieldSource::Column(c) => self.column(c),
            FieldSource::Relationship(r) => self.related.get(r).cloned().unwrap_or(Value::Null),
            FieldSource::Computed(f) => f(self),
        })
    }

    pub fn set_related(&mut self, relationship: &str, value: Value) {
        self.related.insert(relationship.to_string(), value);
    }

    pub fn related(&self, relationship: &str) -> Option<&Value> {
        self.related.get(relationship)
    }

    pub fn related_record(&self, relationship: &str) -> Option<&Record> {
        match self.related.get(relationship) {
            Some(Value::Entity(r)) => Some(r),
            _ => None,
        }
    }

    /// Link value resolved against the public base.
    pub fn link(&self, path: &str) -> Value {
        Value::Link(self.links.absolute(path))
    }

    /// Link to a list endpoint filtered by `param = {column value}`.
    pub fn list_link(&self, slug: &str, param: &str, column: &str) -> Value {
        match self.raw(column).and_then(json_key_text) {
            Some(v) => Value::Link(self.links.filtered_list(slug, param, &v)),
            None => Value::Null,
        }
    }

    /// Human-readable label: the declared label column, else `nome`, else `descricao`.
    pub fn label(&self) -> Option<String> {
        let candidates = self
            .descriptor
            .label_column()
            .into_iter()
            .chain(["nome", "descricao"]);
        for c in candidates {
            if self.descriptor.column(c).is_some() {
                if let Some(t) = self.column_text(c).filter(|t| !t.is_empty()) {
                    return Some(t);
                }
            }
        }
        None
    }

    pub fn text_form(&self) -> String {
        self.label().unwrap_or_else(|| self.id())
    }
}

/// Text of a key column value (string or number).
pub fn json_key_text(v: &JsonValue) -> Option<String> {
    match v {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Converts a stored JSON scalar into a typed value.
pub fn json_to_value(ty: ColumnType, raw: &JsonValue) -> Value {
    match (ty, raw) {
        (_, JsonValue::Null) => Value::Null,
        (ColumnType::Integer, JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Value::Integer)
            .unwrap_or(Value::Null),
        (ColumnType::Integer, JsonValue::String(s)) => {
            s.trim().parse().map(Value::Integer).unwrap_or(Value::Null)
        }
        (ColumnType::Decimal, JsonValue::Number(n)) => parse_decimal(&n.to_string())
            .map(Value::Decimal)
            .unwrap_or(Value::Null),
        (ColumnType::Decimal, JsonValue::String(s)) => parse_decimal(s.trim())
            .map(Value::Decimal)
            .unwrap_or(Value::Null),
        (ColumnType::Date, JsonValue::String(s)) => s
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(Value::Date)
            .unwrap_or(Value::Null),
        (ColumnType::Boolean, JsonValue::Bool(b)) => Value::Bool(*b),
        (ColumnType::Boolean, JsonValue::String(s)) => match s.as_str() {
            "t" | "true" | "1" => Value::Bool(true),
            "f" | "false" | "0" => Value::Bool(false),
            _ => Value::Null,
        },
        (ColumnType::Text, JsonValue::String(s)) => Value::Text(s.clone()),
        (ColumnType::Text, other) => json_key_text(other).map(Value::Text).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
