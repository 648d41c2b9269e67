//! Documentation projection of the query methods.
//!
//! Methods are projected into plain records of a dedicated descriptor so the
//! listing goes through the same aggregators as any other data.

use super::method::{MethodRegistry, QueryMethod};
use crate::domain::entity::{
    output_name, CatalogError, ColumnType, EntityDescriptor, FieldKind, Identity, Record, Subset, Value,
};
use crate::domain::links::{Links, API_VERSION};
use crate::domain::render::FilterDoc;
use serde_json::{json, Map, Value as JsonValue};
use std::sync::Arc;

pub const LIST_NAME: &str = "metodos";

fn parametros(r: &Record) -> Value {
    let Some(JsonValue::Array(items)) = r.raw("parametros") else {
        return Value::Null;
    };
    let entries = items
        .iter()
        .filter_map(|item| {
            let name = item.get("parametro")?.as_str()?.to_string();
            let text = |key: &str| {
                item.get(key)
                    .and_then(JsonValue::as_str)
                    .map(|s| Value::Text(s.to_string()))
                    .unwrap_or(Value::Null)
            };
            Some((
                name,
                Value::Map(vec![("nome".to_string(), text("nome")), ("tipo".to_string(), text("tipo"))]),
            ))
        })
        .collect();
    Value::Map(entries)
}

fn retorno(r: &Record) -> Value {
    match r.raw("retorno") {
        Some(JsonValue::Array(items)) => Value::List(
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(|s| Value::Text(s.to_string()))
                .collect(),
        ),
        _ => Value::Null,
    }
}

/// Descriptor of a documented method: identified by a fragment of the
/// documentation page.
pub fn descriptor() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("Metodo", "metodo")
        .identity(Identity::Fragment {
            path: format!("v{}/consulta", API_VERSION),
        })
        .list_name(LIST_NAME)
        .primary_key(&["id"])
        .column("id", ColumnType::Text)
        .stored("nome", ColumnType::Text)
        .stored("descricao", ColumnType::Text)
        .computed("parametros", FieldKind::Map, parametros)
        .computed("href_uri", FieldKind::Link, |r| match r.raw("uri").and_then(JsonValue::as_str) {
            Some(uri) => Value::Link(uri.to_string()),
            None => Value::Null,
        })
        .computed("href_doc_uri", FieldKind::Link, |r| {
            Value::Link(r.links().method_doc_uri(&r.id()))
        })
        .computed("retorno", FieldKind::List, retorno)
        .exposed(&["nome", "descricao", "parametros", "href_uri", "href_doc_uri", "retorno"])
        .build()
}

fn method_row(method: &QueryMethod, links: &Links) -> Map<String, JsonValue> {
    let params: Vec<JsonValue> = method
        .params
        .iter()
        .map(|p| {
            json!({
                "parametro": p.name,
                "nome": p.description,
                "tipo": p.value_type.as_str(),
            })
        })
        .collect();
    let retorno: Vec<&str> = method
        .entity
        .fields(Subset::Summary)
        .iter()
        .map(|f| output_name(f))
        .collect();
    let mut row = Map::new();
    row.insert("id".to_string(), json!(method.id));
    row.insert("nome".to_string(), json!(method.name));
    row.insert("descricao".to_string(), json!(method.description.trim()));
    row.insert("parametros".to_string(), JsonValue::Array(params));
    row.insert("uri".to_string(), json!(links.method_url(&method.slug, None, &[])));
    row.insert("retorno".to_string(), json!(retorno));
    row
}

/// One record per registered method, in registration order.
pub fn method_records(methods: &MethodRegistry, descriptor: &Arc<EntityDescriptor>, links: &Arc<Links>) -> Vec<Record> {
    methods
        .iter()
        .map(|m| Record::new(descriptor.clone(), links.clone(), method_row(m, links)))
        .collect()
}

/// Filter listing shown under an HTML result page.
pub fn filter_docs(method: &QueryMethod) -> Vec<FilterDoc> {
    method
        .params
        .iter()
        .map(|p| FilterDoc {
            name: p.name.clone(),
            value_type: p.value_type.as_str().to_string(),
            required: p.required,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::siconv;
    use crate::domain::query::siconv as methods;

    #[test]
    fn projects_every_method_without_touching_templates() {
        let catalog = siconv::catalog().unwrap();
        let registry = methods::registry(&catalog).unwrap();
        let links = Arc::new(Links::new("http://api.example.org/siconv/").unwrap());
        let d = Arc::new(descriptor().unwrap());

        let records = method_records(&registry, &d, &links);
        assert_eq!(records.len(), registry.len());

        let municipios = records
            .iter()
            .find(|r| r.id() == "consulta_municipios")
            .unwrap();
        assert_eq!(
            municipios.uri().as_deref(),
            Some("http://api.example.org/siconv/v1/consulta#consulta_municipios")
        );
        assert_eq!(
            municipios.get("href_uri"),
            Value::Link("http://api.example.org/siconv/v1/consulta/municipios".into())
        );
        assert_eq!(
            municipios.get("href_doc_uri"),
            Value::Link("http://api.example.org/siconv/v1/consulta#consulta_municipios".into())
        );
        let Value::Map(params) = municipios.get("parametros") else {
            panic!("parametros is a map");
        };
        let names: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["uf", "nome"]);
        assert!(matches!(municipios.get("retorno"), Value::List(items) if items.contains(&Value::Text("proponentes".into()))));
    }

    #[test]
    fn filter_docs_follow_declaration_order() {
        let catalog = siconv::catalog().unwrap();
        let registry = methods::registry(&catalog).unwrap();
        let docs = filter_docs(&registry.get("municipios").unwrap());
        assert_eq!(docs[0].name, "uf");
        assert_eq!(docs[0].value_type, "str");
        assert!(!docs[0].required);
    }
}
