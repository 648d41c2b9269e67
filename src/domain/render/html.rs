//! Minimal self-contained HTML page.

use super::{Envelope, Format, RenderError, Renderer};
use crate::domain::entity::{output_name, Record, Value};
use convert_case::{Case, Casing};
use quick_xml::escape::escape;
use std::fmt::Write;

/// One accepted filter, as listed under the results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDoc {
    pub name: String,
    pub value_type: String,
    pub required: bool,
}

pub struct HtmlRenderer;

fn label(field: &str) -> String {
    output_name(field).to_case(Case::Title)
}

fn link(href: &str, text: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape(href), escape(text))
}

fn value_html(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "Verdadeiro".to_string(),
        Value::Bool(false) => "Falso".to_string(),
        Value::Link(href) => link(href, href),
        Value::Entity(target) => entity_link(target),
        Value::Map(entries) => {
            let mut out = String::from("<dl>");
            for (k, v) in entries {
                let _ = write!(out, "<dt>{}</dt><dd>{}</dd>", escape(k.as_str()), value_html(v));
            }
            out.push_str("</dl>");
            out
        }
        Value::List(items) => {
            let mut out = String::from("<ul>");
            for item in items {
                let _ = write!(out, "<li>{}</li>", value_html(item));
            }
            out.push_str("</ul>");
            out
        }
        other => escape(other.text_form().unwrap_or_default().as_str()).into_owned(),
    }
}

fn entity_link(target: &Record) -> String {
    let text = target.text_form();
    match target.doc_uri() {
        Some(doc) => link(&doc, &text),
        None => escape(text.as_str()).into_owned(),
    }
}

/// Same URL with `.html` swapped for another suffix.
fn alternative(current: &str, format: Format) -> Option<String> {
    let pos = current.find(".html")?;
    let rest = &current[pos + ".html".len()..];
    if !(rest.is_empty() || rest.starts_with('?')) {
        return None;
    }
    Some(format!("{}.{}{}", &current[..pos], format.suffix(), rest))
}

impl Renderer for HtmlRenderer {
    fn render(&self, envelope: &Envelope<'_>, _format: Format) -> Result<Vec<u8>, RenderError> {
        let mut page = String::new();
        let title = escape(envelope.name);
        let _ = write!(
            page,
            "<!DOCTYPE html>\n<html lang=\"pt-br\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n"
        );
        if let Some(total) = envelope.total {
            let _ = writeln!(page, "<p class=\"total\">total_registros: {}</p>", total);
        }

        if let Some(current) = envelope.split.current_url.as_deref() {
            let alternatives: Vec<String> = [Format::Xml, Format::Json, Format::Csv]
                .into_iter()
                .filter_map(|f| alternative(current, f).map(|url| format!("<li>{}</li>", link(&url, f.suffix()))))
                .collect();
            if !alternatives.is_empty() {
                let _ = writeln!(page, "<ul class=\"alternativos\">{}</ul>", alternatives.concat());
            }
        }

        if !envelope.filters_used.is_empty() {
            page.push_str("<dl class=\"filtros\">");
            for (k, v) in envelope.filters_used {
                let _ = write!(page, "<dt>{}</dt><dd>{}</dd>", escape(k.as_str()), escape(v.as_str()));
            }
            page.push_str("</dl>\n");
        }

        for record in envelope.records {
            page.push_str("<div class=\"registro\">");
            let heading = match record.uri() {
                Some(uri) => link(&uri, &record.text_form()),
                None => escape(record.text_form().as_str()).into_owned(),
            };
            let _ = write!(page, "<h2>{}</h2><dl>", heading);
            for field in record.descriptor().fields(envelope.subset) {
                let value = record.get(field);
                if value.is_null() {
                    continue;
                }
                let _ = write!(page, "<dt>{}</dt><dd>{}</dd>", escape(label(field).as_str()), value_html(&value));
            }
            page.push_str("</dl></div>\n");
        }

        if let Some(next) = envelope.split.next_url.as_deref() {
            let _ = writeln!(page, "<p><a rel=\"next\" href=\"{}\">próximos</a></p>", escape(next));
        }

        if !envelope.filters.is_empty() {
            page.push_str("<h2>Parâmetros</h2><ul class=\"parametros\">");
            for f in envelope.filters {
                let _ = write!(
                    page,
                    "<li><code>{}</code> ({}){}</li>",
                    escape(f.name.as_str()),
                    escape(f.value_type.as_str()),
                    if f.required { " obrigatório" } else { "" }
                );
            }
            page.push_str("</ul>\n");
        }
        page.push_str("</body>\n</html>\n");
        Ok(page.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{Aggregator, DatasetSplit, Format};
    use super::*;
    use crate::domain::entity::Subset;

    #[test]
    fn alternative_swaps_suffix_before_query() {
        assert_eq!(
            alternative("http://x/v1/consulta/municipios.html?uf=SP", Format::Json).unwrap(),
            "http://x/v1/consulta/municipios.json?uf=SP"
        );
        assert!(alternative("http://x/v1/consulta/municipios", Format::Json).is_none());
    }

    #[test]
    fn page_lists_records_filters_and_next_link() {
        let split = DatasetSplit {
            current_url: Some("http://x/v1/consulta/municipios.html?uf=SP".into()),
            next_url: Some("http://x/v1/consulta/municipios.html?uf=SP&offset=500".into()),
            ..DatasetSplit::default()
        };
        let mut ag = Aggregator::new(Format::Html, "municipios", Subset::Exposed)
            .with_total(1)
            .with_split(split)
            .with_filters(
                vec![("uf".into(), "SP".into()), ("offset".into(), "0".into())],
                vec![FilterDoc {
                    name: "uf".into(),
                    value_type: "text".into(),
                    required: false,
                }],
            );
        ag.add(sao_paulo()).unwrap();
        let page = String::from_utf8(ag.serialize(Format::Html).unwrap()).unwrap();
        assert!(page.contains("<title>municipios</title>"));
        assert!(page.contains("São Paulo"));
        assert!(page.contains("<dt>uf</dt><dd>SP</dd>"));
        assert!(!page.contains("<dt>offset</dt>"));
        assert!(page.contains("rel=\"next\""));
        assert!(page.contains("municipios.csv?uf=SP"));
        assert!(page.contains("<code>uf</code>"));
    }
}
