//! Triple-store renderer: records become an [`oxrdf::Graph`], serialized by
//! `oxrdfio` as RDF/XML, Turtle (also served as N3) or N-Triples.

use super::{DatasetSplit, Envelope, Format, RenderError, Renderer};
use crate::domain::entity::{RdfProperty, Record, Subset, Value};
use oxrdf::vocab::{rdf, rdfs};
use oxrdf::{BlankNode, Graph, Literal, NamedNode, Subject, Term, Triple};
use oxrdfio::{RdfFormat, RdfSerializer};
use url::Url;

/// Namespace IRIs bound in every graph.
pub mod vocab {
    use oxrdf::NamedNode;

    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const OWL: &str = "http://www.w3.org/2002/07/owl#";
    pub const LIC: &str = "http://vocab.e.gov.br/licitacoes#";
    pub const SIORG: &str = "http://vocab.e.gov.br/siorg#";
    pub const SIAFI: &str = "http://vocab.e.gov.br/siafi#";
    pub const GEO: &str = "http://www.w3.org/2003/01/geo/wgs84_pos#";
    pub const DBPEDIA: &str = "http://dbpedia.org/resource/";
    pub const DBPROP: &str = "http://dbpedia.org/property/";
    pub const DBONT: &str = "http://dbpedia.org/ontology/";
    pub const VOID: &str = "http://rdfs.org/ns/void#";
    pub const FOAF: &str = "http://xmlns.com/foaf/0.1/";
    pub const VCARD: &str = "http://www.w3.org/2006/vcard/ns#";

    // Local names passed here are ASCII constants.
    fn term(namespace: &str, local: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("{}{}", namespace, local))
    }

    pub fn owl(local: &str) -> NamedNode {
        term(OWL, local)
    }

    pub fn dbo(local: &str) -> NamedNode {
        term(DBONT, local)
    }

    pub fn dbprop(local: &str) -> NamedNode {
        term(DBPROP, local)
    }

    pub fn foaf(local: &str) -> NamedNode {
        term(FOAF, local)
    }

    pub fn void(local: &str) -> NamedNode {
        term(VOID, local)
    }

    pub fn geo(local: &str) -> NamedNode {
        term(GEO, local)
    }

    /// Prefix bindings, in serialization order.
    pub const PREFIXES: &[(&str, &str)] = &[
        ("rdf", RDF),
        ("rdfs", RDFS),
        ("owl", OWL),
        ("lic", LIC),
        ("siorg", SIORG),
        ("siafi", SIAFI),
        ("geo", GEO),
        ("dbpedia", DBPEDIA),
        ("dbprop", DBPROP),
        ("dbo", DBONT),
        ("void", VOID),
        ("foaf", FOAF),
        ("vcard", VCARD),
    ];
}

/// Named node for a URI assembled from stored data. Characters an IRI
/// forbids (spaces in text keys) are percent-encoded first.
pub fn iri(value: &str) -> Result<NamedNode, RenderError> {
    match NamedNode::new(value) {
        Ok(node) => Ok(node),
        Err(_) => Ok(NamedNode::new(Url::parse(value)?.as_str())?),
    }
}

/// Syntax written for a triple-store format.
pub fn rdf_format(format: Format) -> RdfFormat {
    match format {
        Format::Rdf => RdfFormat::RdfXml,
        Format::Nt => RdfFormat::NTriples,
        _ => RdfFormat::Turtle,
    }
}

/// Accumulates the triples of every added record.
#[derive(Debug, Default)]
pub struct RdfRenderer {
    graph: Graph,
    next_blank: u128,
}

impl RdfRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Blank node unique within this graph. Sequential ids keep repeated
    /// renders of the same page byte-identical.
    fn mint_blank(&mut self) -> BlankNode {
        let node = BlankNode::new_from_unique_id(self.next_blank);
        self.next_blank += 1;
        node
    }

    fn insert_all(&mut self, triples: Vec<Triple>) {
        for t in &triples {
            self.graph.insert(t);
        }
    }

    fn add_record(&mut self, record: &Record) -> Result<(), RenderError> {
        let d = record.descriptor().clone();
        if let Some(f) = d.rdf_override() {
            self.insert_all(f(record)?);
            return Ok(());
        }

        let subject: Subject = match record.uri() {
            Some(uri) => iri(&uri)?.into(),
            None => self.mint_blank().into(),
        };

        if let Some(class) = d.class_uri() {
            self.graph
                .insert(&Triple::new(subject.clone(), rdf::TYPE, class.clone()));
        }

        if let (Some(doc), Subject::NamedNode(s)) = (record.doc_uri(), &subject) {
            if doc != s.as_str() {
                let doc = iri(&doc)?;
                self.graph
                    .insert(&Triple::new(doc.clone(), rdf::TYPE, vocab::foaf("Document")));
                self.graph.insert(&Triple::new(
                    subject.clone(),
                    vocab::foaf("isPrimaryTopicOf"),
                    doc.clone(),
                ));
                self.graph
                    .insert(&Triple::new(doc, vocab::foaf("primaryTopic"), subject.clone()));
            }
        }

        if d.rdf_property("nome").is_none() {
            let nome = if d.field("nome").is_some() {
                record.get("nome")
            } else if d.column("nome").is_some() {
                record.column("nome")
            } else {
                Value::Null
            };
            if let Some(label) = nome.text_form().filter(|l| !l.is_empty()) {
                self.graph.insert(&Triple::new(
                    subject.clone(),
                    rdfs::LABEL,
                    Literal::new_simple_literal(label),
                ));
            }
        }

        if let Some(point) = d.geo_point() {
            let lat = record.column_text(&point.lat_column);
            let lon = record.column_text(&point.lon_column);
            if let (Some(lat), Some(lon)) = (lat, lon) {
                self.graph.insert(&Triple::new(
                    subject.clone(),
                    vocab::geo("lat"),
                    Literal::new_simple_literal(lat),
                ));
                self.graph.insert(&Triple::new(
                    subject.clone(),
                    vocab::geo("long"),
                    Literal::new_simple_literal(lon),
                ));
            }
        }

        for field in d.fields(Subset::Exposed) {
            let Some(prop) = d.rdf_property(field) else {
                continue;
            };
            match prop {
                RdfProperty::ComputedFunction(f) => self.insert_all(f(record)?),
                RdfProperty::NamedMethod { method, .. } => self.insert_all(method(record, field)?),
                RdfProperty::Direct { predicate } | RdfProperty::RelationshipPredicate { predicate } => {
                    let value = record.get(field);
                    if value.is_falsy() {
                        continue;
                    }
                    let items = match value {
                        Value::List(items) => items,
                        other => vec![other],
                    };
                    for item in items {
                        if let Some(object) = self.object_term(&item)? {
                            self.graph
                                .insert(&Triple::new(subject.clone(), predicate.clone(), object));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Object for a mapped value: URI when the target has one, a typed blank
    /// node when it only declares a class, else a literal of its text form.
    fn object_term(&mut self, value: &Value) -> Result<Option<Term>, RenderError> {
        Ok(match value {
            Value::Null => None,
            Value::Link(uri) => Some(iri(uri)?.into()),
            Value::Entity(target) => {
                if let Some(uri) = target.uri() {
                    return Ok(Some(iri(&uri)?.into()));
                }
                if let Some(class) = target.descriptor().class_uri() {
                    let bn = self.mint_blank();
                    self.graph
                        .insert(&Triple::new(bn.clone(), rdf::TYPE, class.clone()));
                    self.graph.insert(&Triple::new(
                        bn.clone(),
                        rdfs::COMMENT,
                        Literal::new_simple_literal(target.text_form()),
                    ));
                    return Ok(Some(bn.into()));
                }
                Some(Literal::new_simple_literal(target.text_form()).into())
            }
            other => other
                .text_form()
                .map(|t| Literal::new_simple_literal(t).into()),
        })
    }
}

/// Dataset-description triples for the current page, the next page and the
/// whole dataset.
pub fn void_triples(split: &DatasetSplit) -> Result<Vec<Triple>, RenderError> {
    let mut out = Vec::new();
    let dataset = |url: &str| iri(&format!("{}#dataset", url));
    let describe = |out: &mut Vec<Triple>, url: &str| -> Result<(), RenderError> {
        let page = iri(url)?;
        out.push(Triple::new(dataset(url)?, rdf::TYPE, vocab::void("Dataset")));
        out.push(Triple::new(page.clone(), rdf::TYPE, vocab::void("DatasetDescription")));
        out.push(Triple::new(page, vocab::foaf("primaryTopic"), dataset(url)?));
        Ok(())
    };

    let current = split.current_url.as_deref().filter(|u| !u.is_empty());
    let next = split.next_url.as_deref().filter(|u| !u.is_empty());
    let whole = split.dataset_url.as_deref().filter(|u| !u.is_empty());

    if let Some(c) = current {
        describe(&mut out, c)?;
        if let Some(n) = next {
            out.push(Triple::new(dataset(c)?, rdfs::SEE_ALSO, dataset(n)?));
        }
    }
    if let Some(n) = next {
        describe(&mut out, n)?;
    }
    if let Some(w) = whole {
        describe(&mut out, w)?;
        for sub in [current, next].into_iter().flatten() {
            out.push(Triple::new(dataset(w)?, vocab::void("subset"), dataset(sub)?));
        }
    }
    Ok(out)
}

fn serialize(graph: &Graph, format: RdfFormat) -> Result<Vec<u8>, RenderError> {
    let mut serializer = RdfSerializer::from_format(format);
    for (prefix, namespace) in vocab::PREFIXES {
        // RDF/XML declares its own namespace.
        if format == RdfFormat::RdfXml && *prefix == "rdf" {
            continue;
        }
        serializer = serializer.with_prefix(*prefix, *namespace)?;
    }
    let mut writer = serializer.for_writer(Vec::new());
    for triple in graph.iter() {
        writer.serialize_triple(triple)?;
    }
    Ok(writer.finish()?)
}

impl Renderer for RdfRenderer {
    fn on_add(&mut self, record: &Record) -> Result<(), RenderError> {
        self.add_record(record)
    }

    fn render(&self, envelope: &Envelope<'_>, format: Format) -> Result<Vec<u8>, RenderError> {
        // The page may describe itself and the dataset with the same URL.
        let mut graph = self.graph.clone();
        for t in void_triples(envelope.split)? {
            graph.insert(&t);
        }
        serialize(&graph, rdf_format(format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{ColumnType, EntityDescriptor};
    use crate::domain::render::test_support::{links, sao_paulo};
    use crate::domain::render::Aggregator;
    use oxrdf::TermRef;
    use serde_json::json;
    use std::sync::Arc;

    const RESPONSAVEL: &str = "http://vocab.e.gov.br/licitacoes#responsavel";
    const NUMERO: &str = "http://vocab.e.gov.br/licitacoes#numero";

    fn pessoa(class: Option<&str>) -> Arc<EntityDescriptor> {
        let mut b = EntityDescriptor::builder("Pessoa", "pessoa")
            .primary_key(&["id"])
            .stored("id", ColumnType::Integer)
            .stored("nome", ColumnType::Text)
            .exposed(&["nome"]);
        if let Some(class) = class {
            b = b.class_uri(class);
        }
        Arc::new(b.build().unwrap())
    }

    fn proposta() -> Arc<EntityDescriptor> {
        Arc::new(
            EntityDescriptor::builder("Proposta", "proposta")
                .resource("proposta", "propostas")
                .primary_key(&["id"])
                .stored("id", ColumnType::Integer)
                .stored("numero", ColumnType::Integer)
                .column("id_pessoa", ColumnType::Integer)
                .reference("responsavel", "Pessoa", "id_pessoa", "id")
                .exposed(&["numero", "responsavel"])
                .rdf_direct("numero", NUMERO)
                .rdf_relationship("responsavel", RESPONSAVEL)
                .build()
                .unwrap(),
        )
    }

    fn proposta_with(numero: i64, responsavel_class: Option<&str>) -> Record {
        let row = json!({"id": 1, "numero": numero, "id_pessoa": 9});
        let mut r = Record::new(proposta(), links(), row.as_object().cloned().unwrap());
        let target = Record::new(
            pessoa(responsavel_class),
            links(),
            json!({"id": 9, "nome": "Maria"}).as_object().cloned().unwrap(),
        );
        r.set_related("responsavel", Value::Entity(Box::new(target)));
        r
    }

    fn objects<'a>(g: &'a Graph, predicate: &str) -> Vec<TermRef<'a>> {
        g.iter()
            .filter(|t| t.predicate.as_str() == predicate)
            .map(|t| t.object)
            .collect()
    }

    #[test]
    fn graph_deduplicates_triples() {
        let mut r = RdfRenderer::new();
        r.on_add(&sao_paulo()).unwrap();
        let before = r.graph().len();
        r.on_add(&sao_paulo()).unwrap();
        assert_eq!(r.graph().len(), before);
        assert_ne!(r.mint_blank(), r.mint_blank());
    }

    #[test]
    fn related_target_without_uri_or_class_is_a_literal() {
        let mut r = RdfRenderer::new();
        r.on_add(&proposta_with(3, None)).unwrap();
        let objs = objects(r.graph(), RESPONSAVEL);
        assert_eq!(objs.len(), 1);
        assert!(matches!(objs[0], TermRef::Literal(l) if l.value() == "Maria"));
    }

    #[test]
    fn related_target_with_class_only_is_a_typed_blank_node() {
        let class = "http://xmlns.com/foaf/0.1/Person";
        let mut r = RdfRenderer::new();
        r.on_add(&proposta_with(3, Some(class))).unwrap();
        let objs = objects(r.graph(), RESPONSAVEL);
        assert_eq!(objs.len(), 1);
        let TermRef::BlankNode(bn) = objs[0] else {
            panic!("expected a blank node, got {}", objs[0]);
        };
        let typed = r.graph().iter().any(|t| {
            t.subject.to_string() == bn.to_string()
                && t.predicate == rdf::TYPE
                && matches!(t.object, TermRef::NamedNode(n) if n.as_str() == class)
        });
        assert!(typed);
        assert!(matches!(
            objects(r.graph(), rdfs::COMMENT.as_str()).as_slice(),
            [TermRef::Literal(l)] if l.value() == "Maria"
        ));
    }

    #[test]
    fn falsy_mapped_values_emit_no_triple() {
        let mut r = RdfRenderer::new();
        r.on_add(&proposta_with(0, None)).unwrap();
        assert!(objects(r.graph(), NUMERO).is_empty());

        let mut r = RdfRenderer::new();
        r.on_add(&proposta_with(5, None)).unwrap();
        assert!(matches!(
            objects(r.graph(), NUMERO).as_slice(),
            [TermRef::Literal(l)] if l.value() == "5"
        ));
    }

    #[test]
    fn void_chains_pages_under_dataset() {
        let split = DatasetSplit {
            dataset_url: Some("http://x/v1/consulta/municipios.nt".into()),
            current_url: Some("http://x/v1/consulta/municipios.nt?offset=0".into()),
            current_offset: 0,
            window_size: 500,
            next_url: Some("http://x/v1/consulta/municipios.nt?offset=500".into()),
        };
        let triples = void_triples(&split).unwrap();
        let subset = vocab::void("subset");
        assert_eq!(triples.iter().filter(|t| t.predicate == subset).count(), 2);
        let next = Term::from(iri("http://x/v1/consulta/municipios.nt?offset=500#dataset").unwrap());
        assert!(triples
            .iter()
            .any(|t| t.predicate == rdfs::SEE_ALSO.into_owned() && t.object == next));
    }

    #[test]
    fn void_without_next_page() {
        let split = DatasetSplit {
            current_url: Some("http://x/a".into()),
            ..DatasetSplit::default()
        };
        assert_eq!(void_triples(&split).unwrap().len(), 3);
    }

    #[test]
    fn uris_with_spaces_are_encoded() {
        let node = iri("http://x/id/pessoa/JOSE DA SILVA").unwrap();
        assert_eq!(node.as_str(), "http://x/id/pessoa/JOSE%20DA%20SILVA");
    }

    fn serialized(format: Format) -> String {
        let mut ag = Aggregator::new(format, "municipios", Subset::Exposed);
        ag.add(sao_paulo()).unwrap();
        String::from_utf8(ag.serialize(format).unwrap()).unwrap()
    }

    #[test]
    fn ntriples_spell_out_full_iris() {
        let out = serialized(Format::Nt);
        assert!(out.contains(
            "<http://api.example.org/siconv/id/municipio/3550308> \
             <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> \
             <http://dbpedia.org/ontology/Settlement> ."
        ));
        assert!(out.contains("\"S\u{e3}o Paulo\""));
    }

    #[test]
    fn turtle_and_rdfxml_use_bound_prefixes() {
        let ttl = serialized(Format::Ttl);
        assert!(ttl.contains("@prefix dbo: <http://dbpedia.org/ontology/>"));
        assert!(ttl.contains("<http://api.example.org/siconv/id/municipio/3550308>"));
        assert_eq!(serialized(Format::N3), ttl);

        let xml = serialized(Format::Rdf);
        assert!(xml.contains("rdf:RDF"));
        assert!(xml.contains("rdf:about=\"http://api.example.org/siconv/id/municipio/3550308\""));
    }
}
