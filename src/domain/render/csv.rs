//! Flat table: `id`, `href`, then the sorted union of every field seen.

use super::{Envelope, Format, RenderError, Renderer};
use crate::domain::entity::{FieldKind, Record, Subset, Value};
use std::collections::BTreeSet;

const LEADING: [&str; 2] = ["id", "href"];

pub struct CsvRenderer {
    subset: Subset,
    columns: BTreeSet<String>,
}

impl CsvRenderer {
    pub fn new(subset: Subset) -> Self {
        Self {
            subset,
            columns: BTreeSet::new(),
        }
    }

    pub fn columns(&self) -> Vec<String> {
        LEADING
            .iter()
            .map(|c| c.to_string())
            .chain(self.columns.iter().cloned())
            .collect()
    }
}

/// Cell text: entities by URI, lists comma-joined, nulls empty.
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Entity(target) => target.uri().unwrap_or_else(|| target.text_form()),
        Value::List(items) => items.iter().map(cell).collect::<Vec<_>>().join(","),
        other => other.text_form().unwrap_or_default(),
    }
}

fn is_map_field(record: &Record, field: &str) -> bool {
    matches!(record.descriptor().field(field), Some(f) if f.kind == FieldKind::Map)
}

/// Resolves `field` or `field/subkey` against a record.
fn lookup(record: &Record, column: &str) -> Value {
    match column.split_once('/') {
        Some((field, key)) => match record.get(field) {
            Value::Map(entries) => entries
                .into_iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        },
        None => record.get(column),
    }
}

impl Renderer for CsvRenderer {
    fn on_add(&mut self, record: &Record) -> Result<(), RenderError> {
        for field in record.descriptor().fields(self.subset) {
            if LEADING.contains(&field.as_str()) {
                continue;
            }
            match record.get(field) {
                Value::Map(entries) => {
                    for (key, _) in entries {
                        self.columns.insert(format!("{}/{}", field, key));
                    }
                }
                Value::Null if is_map_field(record, field) => {}
                _ => {
                    self.columns.insert(field.clone());
                }
            }
        }
        Ok(())
    }

    fn render(&self, envelope: &Envelope<'_>, _format: Format) -> Result<Vec<u8>, RenderError> {
        let columns = self.columns();
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(&columns)?;
        for record in envelope.records {
            let row: Vec<String> = columns
                .iter()
                .map(|c| match c.as_str() {
                    "id" => record.id(),
                    "href" => record.uri().unwrap_or_default(),
                    other => cell(&lookup(record, other)),
                })
                .collect();
            wtr.write_record(&row)?;
        }
        wtr.into_inner().map_err(|e| RenderError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{Aggregator, Format};
    use crate::domain::entity::Subset;
    use serde_json::json;

    #[test]
    fn map_fields_expand_into_subkey_columns() {
        let mut ag = Aggregator::new(Format::Csv, "municipios", Subset::Exposed).with_total(2);
        ag.add(record(json!({"id": 1, "nome": "A", "valor_global": "100", "valor_repasse": "80"})))
            .unwrap();
        ag.add(record(json!({"id": 2, "nome": "B"}))).unwrap();
        let out = String::from_utf8(ag.serialize(Format::Csv).unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,href,"));
        assert!(lines[0].contains("valores/global,valores/repasse"));

        let header: Vec<&str> = lines[0].split(',').collect();
        let global = header.iter().position(|c| *c == "valores/global").unwrap();
        let first: Vec<&str> = lines[1].split(',').collect();
        let second: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(first[global], "100.00");
        assert_eq!(second[global], "");
        assert_eq!(second[0], "2");
        assert_eq!(second[1], "http://api.example.org/siconv/id/municipio/2");
    }

    #[test]
    fn empty_table_has_header_only() {
        let mut ag = Aggregator::new(Format::Csv, "municipios", Subset::Summary).with_total(0);
        let out = String::from_utf8(ag.serialize(Format::Csv).unwrap()).unwrap();
        assert_eq!(out, "id,href\n");
    }
}
