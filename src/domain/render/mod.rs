//! Aggregators: accumulate one page of same-typed records and serialize it in
//! one of the supported representation formats.

pub mod csv;
pub mod html;
pub mod json;
pub mod rdf;
pub mod xml;

use crate::domain::entity::{Record, Subset};
use std::fmt;
use thiserror::Error;

pub use html::FilterDoc;

/// Representation formats, in content-negotiation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    Html,
    Xml,
    Csv,
    Json,
    Rdf,
    Ttl,
    N3,
    Nt,
}

impl Format {
    pub const ALL: [Format; 8] = [
        Format::Html,
        Format::Xml,
        Format::Csv,
        Format::Json,
        Format::Rdf,
        Format::Ttl,
        Format::N3,
        Format::Nt,
    ];

    pub fn from_suffix(suffix: &str) -> Option<Format> {
        Format::ALL.into_iter().find(|f| f.suffix() == suffix)
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Xml => "xml",
            Format::Csv => "csv",
            Format::Json => "json",
            Format::Rdf => "rdf",
            Format::Ttl => "ttl",
            Format::N3 => "n3",
            Format::Nt => "nt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Html => "text/html",
            Format::Xml => "application/xml",
            Format::Csv => "text/csv",
            Format::Json => "application/json",
            Format::Rdf => "application/rdf+xml",
            Format::Ttl => "text/turtle",
            Format::N3 => "text/n3",
            Format::Nt => "text/plain",
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Format> {
        Format::ALL
            .into_iter()
            .find(|f| f.content_type().eq_ignore_ascii_case(content_type))
    }

    /// `Content-Type` header value; every payload is UTF-8.
    pub fn header_value(&self) -> String {
        format!("{}; charset=utf-8", self.content_type())
    }

    pub fn is_rdf(&self) -> bool {
        matches!(self, Format::Rdf | Format::Ttl | Format::N3 | Format::Nt)
    }

    fn family(&self) -> Family {
        match self {
            Format::Html => Family::Html,
            Format::Xml => Family::Xml,
            Format::Csv => Family::Csv,
            Format::Json => Family::Json,
            Format::Rdf | Format::Ttl | Format::N3 | Format::Nt => Family::Rdf,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Html,
    Xml,
    Csv,
    Json,
    Rdf,
}

/// Pagination metadata of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSplit {
    /// The endpoint URL with every filter but no offset.
    pub dataset_url: Option<String>,
    pub current_url: Option<String>,
    pub current_offset: u64,
    pub window_size: u64,
    pub next_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("csv writer: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("xml writer: {0}")]
    Xml(String),
    #[error("output buffer: {0}")]
    Io(String),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid utf-8 output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("invalid IRI: {0}")]
    Iri(#[from] oxrdf::IriParseError),
    #[error("unparseable URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("rdf serializer: {0}")]
    Rdf(#[from] std::io::Error),
}

/// Aggregator misuse. Always a wiring defect, never a client error.
#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("cannot add to a closed aggregator")]
    Closed,
    #[error("aggregator holds {expected} records, cannot add {got}")]
    TypeMismatch { expected: String, got: String },
    #[error("aggregator built for {built} cannot serialize {requested}")]
    FormatMismatch { built: Format, requested: Format },
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Everything a renderer sees at serialization time.
pub struct Envelope<'a> {
    pub name: &'a str,
    pub subset: Subset,
    pub records: &'a [Record],
    pub total: Option<u64>,
    pub split: &'a DatasetSplit,
    pub filters_used: &'a [(String, String)],
    pub filters: &'a [FilterDoc],
}

/// One output format. `on_add` sees every record as it arrives; `render`
/// produces the whole payload.
pub trait Renderer: Send {
    fn on_add(&mut self, _record: &Record) -> Result<(), RenderError> {
        Ok(())
    }

    fn render(&self, envelope: &Envelope<'_>, format: Format) -> Result<Vec<u8>, RenderError>;
}

fn renderer_for(format: Format, subset: Subset) -> Box<dyn Renderer> {
    match format.family() {
        Family::Html => Box::new(html::HtmlRenderer),
        Family::Xml => Box::new(xml::XmlRenderer),
        Family::Csv => Box::new(csv::CsvRenderer::new(subset)),
        Family::Json => Box::new(json::JsonRenderer),
        Family::Rdf => Box::new(rdf::RdfRenderer::new()),
    }
}

pub struct Aggregator {
    name: String,
    subset: Subset,
    format: Format,
    renderer: Box<dyn Renderer>,
    records: Vec<Record>,
    entity: Option<String>,
    total: Option<u64>,
    split: DatasetSplit,
    filters_used: Vec<(String, String)>,
    filters: Vec<FilterDoc>,
    open: bool,
    cache: Option<(Format, Vec<u8>)>,
}

impl Aggregator {
    /// `name` is the envelope name (e.g. `municipios`).
    pub fn new(format: Format, name: &str, subset: Subset) -> Self {
        Self {
            name: name.to_string(),
            subset,
            format,
            renderer: renderer_for(format, subset),
            records: Vec::new(),
            entity: None,
            total: None,
            split: DatasetSplit::default(),
            filters_used: Vec::new(),
            filters: Vec::new(),
            open: true,
            cache: None,
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_split(mut self, split: DatasetSplit) -> Self {
        self.split = split;
        self
    }

    /// Filters the client used (offset excluded) and the endpoint's filter docs.
    pub fn with_filters(mut self, used: Vec<(String, String)>, docs: Vec<FilterDoc>) -> Self {
        self.filters_used = used.into_iter().filter(|(k, _)| k != "offset").collect();
        self.filters = docs;
        self
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn subset(&self) -> Subset {
        self.subset
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Type name fixed by the first added record.
    pub fn entity_type(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn add(&mut self, record: Record) -> Result<(), AggregatorError> {
        if !self.open {
            return Err(AggregatorError::Closed);
        }
        let got = record.descriptor().name();
        match &self.entity {
            Some(expected) if expected != got => {
                return Err(AggregatorError::TypeMismatch {
                    expected: expected.clone(),
                    got: got.to_string(),
                });
            }
            Some(_) => {}
            None => self.entity = Some(got.to_string()),
        }
        self.renderer.on_add(&record)?;
        self.records.push(record);
        Ok(())
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Closes the aggregator and returns the payload. Repeated calls return
    /// the same bytes.
    pub fn serialize(&mut self, format: Format) -> Result<Vec<u8>, AggregatorError> {
        if format.family() != self.format.family() {
            return Err(AggregatorError::FormatMismatch {
                built: self.format,
                requested: format,
            });
        }
        self.close();
        if let Some((cached, bytes)) = &self.cache {
            if *cached == format {
                return Ok(bytes.clone());
            }
        }
        let envelope = Envelope {
            name: &self.name,
            subset: self.subset,
            records: &self.records,
            total: self.total,
            split: &self.split,
            filters_used: &self.filters_used,
            filters: &self.filters,
        };
        let bytes = self.renderer.render(&envelope, format)?;
        self.cache = Some((format, bytes.clone()));
        Ok(bytes)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::domain::entity::{ColumnType, EntityDescriptor};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn format_table_round_trips_suffix_and_content_type() {
        for f in Format::ALL {
            assert_eq!(Format::from_suffix(f.suffix()), Some(f));
            assert_eq!(Format::from_content_type(f.content_type()), Some(f));
        }
        assert_eq!(Format::from_suffix("pdf"), None);
    }

    #[test]
    fn heterogeneous_add_is_rejected() {
        let other = Arc::new(
            EntityDescriptor::builder("Orgao", "orgao")
                .resource("orgao", "orgaos")
                .primary_key(&["id"])
                .stored("id", ColumnType::Integer)
                .exposed(&["id"])
                .build()
                .unwrap(),
        );
        let mut ag = Aggregator::new(Format::Json, "municipios", Subset::Summary);
        ag.add(sao_paulo()).unwrap();
        let orgao = crate::domain::entity::Record::new(other, links(), json!({"id": 1}).as_object().cloned().unwrap());
        assert!(matches!(ag.add(orgao), Err(AggregatorError::TypeMismatch { .. })));
    }

    #[test]
    fn closed_aggregator_rejects_add_and_serialize_is_idempotent() {
        for f in Format::ALL {
            let mut ag = Aggregator::new(f, "municipios", Subset::Summary).with_total(1);
            ag.add(sao_paulo()).unwrap();
            let first = ag.serialize(f).unwrap();
            let second = ag.serialize(f).unwrap();
            assert_eq!(first, second, "format {}", f);
            assert!(matches!(ag.add(sao_paulo()), Err(AggregatorError::Closed)));
        }
    }

    #[test]
    fn empty_aggregator_serializes_in_every_format() {
        for f in Format::ALL {
            let mut ag = Aggregator::new(f, "municipios", Subset::Summary).with_total(0);
            let out = ag.serialize(f).unwrap();
            assert!(!out.is_empty() || f.is_rdf(), "format {}", f);
        }
    }

    #[test]
    fn format_family_mismatch() {
        let mut ag = Aggregator::new(Format::Ttl, "municipios", Subset::Summary);
        assert!(ag.serialize(Format::Nt).is_ok());
        assert!(matches!(
            ag.serialize(Format::Json),
            Err(AggregatorError::FormatMismatch { .. })
        ));
    }
}
