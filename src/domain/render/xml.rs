//! Tree markup: one element per record, one child element per field.

use super::{Envelope, Format, RenderError, Renderer};
use crate::domain::entity::{output_name, Record, Value};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

type XmlWriter = Writer<Vec<u8>>;

fn xml_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Xml(e.to_string())
}

pub struct XmlRenderer;

fn write_text(w: &mut XmlWriter, tag: &str, text: &str) -> Result<(), RenderError> {
    w.write_event(Event::Start(BytesStart::new(tag))).map_err(xml_err)?;
    w.write_event(Event::Text(BytesText::new(text))).map_err(xml_err)?;
    w.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_err)?;
    Ok(())
}

fn write_href(w: &mut XmlWriter, tag: &str, href: &str) -> Result<(), RenderError> {
    let mut el = BytesStart::new(tag);
    el.push_attribute(("href", href));
    w.write_event(Event::Empty(el)).map_err(xml_err)?;
    Ok(())
}

/// Nested entity: `<tag href="uri"/>`, or its text form when it has no URI.
fn write_reference(w: &mut XmlWriter, tag: &str, target: &Record) -> Result<(), RenderError> {
    match target.uri() {
        Some(uri) => write_href(w, tag, &uri),
        None => write_text(w, tag, &target.text_form()),
    }
}

fn write_value(w: &mut XmlWriter, tag: &str, value: &Value) -> Result<(), RenderError> {
    match value {
        Value::Null => Ok(()),
        Value::Link(href) => write_href(w, tag, href),
        Value::Entity(target) => write_reference(w, tag, target),
        Value::Point { lat, lon } => {
            let mut el = BytesStart::new(tag);
            el.push_attribute(("lat", lat.to_string().as_str()));
            el.push_attribute(("lon", lon.to_string().as_str()));
            w.write_event(Event::Empty(el)).map_err(xml_err)?;
            Ok(())
        }
        Value::Map(entries) => {
            w.write_event(Event::Start(BytesStart::new(tag))).map_err(xml_err)?;
            for (key, v) in entries {
                write_value(w, key, v)?;
            }
            w.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_err)?;
            Ok(())
        }
        Value::List(items) => {
            w.write_event(Event::Start(BytesStart::new(tag))).map_err(xml_err)?;
            for item in items {
                match item {
                    Value::Entity(target) => {
                        let element = target.descriptor().element_name().to_string();
                        write_reference(w, &element, target)?;
                    }
                    other => write_value(w, "item", other)?,
                }
            }
            w.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_err)?;
            Ok(())
        }
        scalar => match scalar.text_form() {
            Some(text) => write_text(w, tag, &text),
            None => Ok(()),
        },
    }
}

fn write_record(w: &mut XmlWriter, record: &Record, envelope: &Envelope<'_>) -> Result<(), RenderError> {
    let d = record.descriptor();
    let mut el = BytesStart::new(d.element_name());
    let id = record.id();
    if !id.is_empty() {
        el.push_attribute(("id", id.as_str()));
    }
    if let Some(uri) = record.uri() {
        el.push_attribute(("href", uri.as_str()));
    }
    w.write_event(Event::Start(el)).map_err(xml_err)?;
    for field in d.fields(envelope.subset) {
        let value = record.get(field);
        if value.omitted_in_markup() {
            continue;
        }
        write_value(w, output_name(field), &value)?;
    }
    w.write_event(Event::End(BytesEnd::new(d.element_name())))
        .map_err(xml_err)?;
    Ok(())
}

impl Renderer for XmlRenderer {
    fn render(&self, envelope: &Envelope<'_>, _format: Format) -> Result<Vec<u8>, RenderError> {
        let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(xml_err)?;

        let mut root = BytesStart::new(envelope.name);
        if let Some(total) = envelope.total {
            root.push_attribute(("total_registros", total.to_string().as_str()));
        }
        w.write_event(Event::Start(root)).map_err(xml_err)?;
        for record in envelope.records {
            write_record(&mut w, record, envelope)?;
        }
        if let Some(next) = envelope.split.next_url.as_deref() {
            write_href(&mut w, "proximos", next)?;
        }
        w.write_event(Event::End(BytesEnd::new(envelope.name)))
            .map_err(xml_err)?;
        Ok(w.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{Aggregator, DatasetSplit, Format};
    use crate::domain::entity::Subset;
    use serde_json::json;

    fn render(records: Vec<crate::domain::entity::Record>, split: DatasetSplit) -> String {
        let total = records.len() as u64;
        let mut ag = Aggregator::new(Format::Xml, "municipios", Subset::Exposed)
            .with_total(total)
            .with_split(split);
        for r in records {
            ag.add(r).unwrap();
        }
        String::from_utf8(ag.serialize(Format::Xml).unwrap()).unwrap()
    }

    #[test]
    fn keeps_integral_zero_and_drops_zero_decimal() {
        let xml = render(vec![sao_paulo()], DatasetSplit::default());
        assert!(xml.contains("<municipios total_registros=\"1\">"));
        assert!(xml.contains(
            "<municipio id=\"3550308\" href=\"http://api.example.org/siconv/id/municipio/3550308\">"
        ));
        assert!(xml.contains("<populacao>0</populacao>"));
        assert!(!xml.contains("<area>"));
        assert!(!xml.contains("<valores>"));
    }

    #[test]
    fn links_render_as_href_attributes_without_prefix() {
        let xml = render(vec![sao_paulo()], DatasetSplit::default());
        assert!(xml.contains(
            "<proponentes href=\"http://api.example.org/siconv/v1/consulta/proponentes?id_municipio=3550308\"/>"
        ));
        assert!(!xml.contains("href_proponentes"));
    }

    #[test]
    fn maps_nest_and_next_page_is_linked() {
        let r = record(json!({"id": 1, "nome": "A", "valor_global": "100", "valor_repasse": "80.5"}));
        let split = DatasetSplit {
            next_url: Some("http://api.example.org/siconv/v1/consulta/municipios?offset=500".into()),
            ..DatasetSplit::default()
        };
        let xml = render(vec![r], split);
        assert!(xml.contains("<global>100.00</global>"));
        assert!(xml.contains("<repasse>80.50</repasse>"));
        assert!(xml.contains("<proximos href=\"http://api.example.org/siconv/v1/consulta/municipios?offset=500\"/>"));
    }

    #[test]
    fn empty_page_still_reports_total() {
        let xml = render(vec![], DatasetSplit::default());
        assert!(xml.contains("total_registros=\"0\""));
    }
}
