//! Typed-tree JSON: `{"metadados": {...}, "<list name>": [...]}`.

use super::{Envelope, Format, RenderError, Renderer};
use crate::domain::entity::record::format_decimal;
use crate::domain::entity::{output_name, ColumnType, Record, Value};
use serde_json::{json, Map, Value as JsonValue};

pub struct JsonRenderer;

/// Record id as JSON: a number for single integer keys, text otherwise.
fn id_json(record: &Record) -> JsonValue {
    let d = record.descriptor();
    if let [pk] = d.primary_key() {
        if d.column(pk) == Some(ColumnType::Integer) {
            if let Some(i) = record.column_i64(pk) {
                return json!(i);
            }
        }
    }
    JsonValue::String(record.id())
}

/// `{element: {id, href}}` for a nested entity.
fn reference_json(target: &Record) -> JsonValue {
    let mut inner = Map::new();
    inner.insert("id".to_string(), id_json(target));
    if let Some(uri) = target.uri() {
        inner.insert("href".to_string(), JsonValue::String(uri));
    } else if let Some(label) = target.label() {
        inner.insert("nome".to_string(), JsonValue::String(label));
    }
    let mut outer = Map::new();
    outer.insert(target.descriptor().element_name().to_string(), JsonValue::Object(inner));
    JsonValue::Object(outer)
}

pub fn value_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Integer(i) => json!(i),
        Value::Decimal(d) => JsonValue::String(format_decimal(d)),
        Value::Text(s) => JsonValue::String(s.clone()),
        Value::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
        Value::Link(href) => json!({ "href": href }),
        Value::Map(entries) => JsonValue::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), value_json(v)))
                .collect(),
        ),
        Value::List(items) => JsonValue::Array(items.iter().map(value_json).collect()),
        Value::Entity(target) => reference_json(target),
        Value::Point { lat, lon } => json!({ "lat": lat, "lon": lon }),
    }
}

fn record_json(record: &Record, envelope: &Envelope<'_>) -> JsonValue {
    let mut obj = Map::new();
    for field in record.descriptor().fields(envelope.subset) {
        obj.insert(output_name(field).to_string(), value_json(&record.get(field)));
    }
    obj.insert("id".to_string(), id_json(record));
    if let Some(uri) = record.uri() {
        obj.insert("href".to_string(), JsonValue::String(uri));
    }
    JsonValue::Object(obj)
}

impl Renderer for JsonRenderer {
    fn render(&self, envelope: &Envelope<'_>, _format: Format) -> Result<Vec<u8>, RenderError> {
        let mut meta = Map::new();
        if let Some(total) = envelope.total {
            meta.insert("total_registros".to_string(), json!(total));
        }
        if let Some(next) = &envelope.split.next_url {
            meta.insert("next_page_url".to_string(), JsonValue::String(next.clone()));
        }
        let items: Vec<JsonValue> = envelope
            .records
            .iter()
            .map(|r| record_json(r, envelope))
            .collect();

        let mut doc = Map::new();
        doc.insert("metadados".to_string(), JsonValue::Object(meta));
        doc.insert(envelope.name.to_string(), JsonValue::Array(items));
        Ok(serde_json::to_vec(&JsonValue::Object(doc))?)
    }
}
