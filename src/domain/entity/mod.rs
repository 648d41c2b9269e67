//! Entity descriptors: immutable, per-type metadata consumed by the planner,
//! the storage layer and every renderer.
//!
//! A descriptor is assembled once at startup with [`EntityBuilder`]; all
//! cross-references (summary ⊆ exposed, declared columns, named RDF methods)
//! are checked when it is built, and relationship targets are checked when the
//! descriptors are collected into a [`Catalog`].

pub mod catalog;
pub mod record;
pub mod siconv;

pub use catalog::{Catalog, CatalogError};
pub use record::{Record, Value};

use crate::domain::render::RenderError;
use convert_case::{Case, Casing};
use oxrdf::{NamedNode, Triple};
use std::collections::HashMap;
use std::fmt;

/// Stored column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Decimal,
    Text,
    Date,
    Boolean,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Decimal => "decimal",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
        }
    }
}

/// Semantic type of an exposed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(ColumnType),
    /// Many-to-one (or one-to-one) reference to another entity.
    Reference(String),
    /// One-to-many or many-to-many collection of another entity.
    Collection(String),
    /// Absolute URL to another API endpoint (`href_*` fields).
    Link,
    Map,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Association (join) table for many-to-many relationships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub table: String,
    /// Column in the association table pointing at the owning entity.
    pub local_column: String,
    /// Column in the association table pointing at the target entity.
    pub remote_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,
    /// Column of the owning table (or of the association table's owner side).
    pub local_column: String,
    /// Column of the target table.
    pub remote_column: String,
    pub through: Option<Association>,
}

pub type ComputeFn = fn(&Record) -> Value;
pub type TripleFn = fn(&Record) -> Result<Vec<Triple>, RenderError>;
pub type FieldTripleFn = fn(&Record, &str) -> Result<Vec<Triple>, RenderError>;

#[derive(Clone)]
pub enum FieldSource {
    Column(String),
    Relationship(String),
    Computed(ComputeFn),
}

#[derive(Clone)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub source: FieldSource,
}

/// How a field contributes to the RDF graph. Resolved when the descriptor is
/// built, never looked up by name at render time.
#[derive(Clone)]
pub enum RdfProperty {
    /// `subject predicate value`; links become URI objects, scalars literals.
    Direct { predicate: NamedNode },
    /// Arbitrary triples computed from the whole record.
    ComputedFunction(TripleFn),
    /// A named per-entity method, invoked with the field name.
    NamedMethod { name: String, method: FieldTripleFn },
    /// Predicate towards a related entity: its URI when it has one, a typed
    /// blank node when it only declares a class, a literal otherwise.
    RelationshipPredicate { predicate: NamedNode },
}

/// Builder-side RDF mapping; predicates are parsed in [`EntityBuilder::build`].
#[derive(Clone)]
enum PendingRdf {
    Direct(String),
    Function(TripleFn),
    Relationship(String),
}

/// How the canonical URI of an instance is formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// `{base}id/{slug}/{id}`, document `{base}dados/{slug}/{id}`.
    Resource { slug: String },
    /// `{base}{path}#{id}`; the document is the same URI without fragment.
    Fragment { path: String },
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subset {
    Exposed,
    Summary,
}

impl Subset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subset::Exposed => "exposed",
            Subset::Summary => "summary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoPoint {
    pub lat_column: String,
    pub lon_column: String,
}

pub struct EntityDescriptor {
    name: String,
    table: String,
    identity: Identity,
    list_name: String,
    element_name: String,
    primary_key: Vec<String>,
    columns: Vec<(String, ColumnType)>,
    relationships: Vec<Relationship>,
    fields: Vec<FieldDef>,
    exposed: Vec<String>,
    summary: Vec<String>,
    preload: Vec<String>,
    class_uri: Option<NamedNode>,
    rdf_properties: Vec<(String, RdfProperty)>,
    rdf_override: Option<TripleFn>,
    geo_point: Option<GeoPoint>,
    label_column: Option<String>,
}

impl fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("identity", &self.identity)
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

impl EntityDescriptor {
    pub fn builder(name: &str, table: &str) -> EntityBuilder {
        EntityBuilder::new(name, table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Slug used in `/id/{slug}/...` and `/dados/{slug}/...`.
    pub fn slug(&self) -> Option<&str> {
        match &self.identity {
            Identity::Resource { slug } => Some(slug),
            _ => None,
        }
    }

    pub fn list_name(&self) -> &str {
        &self.list_name
    }

    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn columns(&self) -> &[(String, ColumnType)] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(c, _)| c == name)
            .map(|(_, t)| *t)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Ordered field names of a subset.
    pub fn fields(&self, subset: Subset) -> &[String] {
        match subset {
            Subset::Exposed => &self.exposed,
            Subset::Summary => &self.summary,
        }
    }

    /// Relationships hydrated in addition to those named by the subset.
    pub fn preload(&self) -> &[String] {
        &self.preload
    }

    pub fn class_uri(&self) -> Option<&NamedNode> {
        self.class_uri.as_ref()
    }

    pub fn rdf_property(&self, field: &str) -> Option<&RdfProperty> {
        self.rdf_properties
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, p)| p)
    }

    pub fn rdf_override(&self) -> Option<TripleFn> {
        self.rdf_override
    }

    pub fn geo_point(&self) -> Option<&GeoPoint> {
        self.geo_point.as_ref()
    }

    pub fn label_column(&self) -> Option<&str> {
        self.label_column.as_deref()
    }

    /// Relationship names that must be loaded to render `subset`.
    pub fn relationships_for(&self, subset: Subset) -> Vec<&Relationship> {
        let mut names: Vec<&str> = self.preload.iter().map(String::as_str).collect();
        for field in self.fields(subset) {
            if let Some(FieldDef {
                source: FieldSource::Relationship(rel),
                ..
            }) = self.field(field)
            {
                names.push(rel.as_str());
            }
        }
        let mut out: Vec<&Relationship> = Vec::new();
        for name in names {
            if let Some(rel) = self.relationship(name) {
                if !out.iter().any(|r| r.name == rel.name) {
                    out.push(rel);
                }
            }
        }
        out
    }
}

/// Strips the `href_` link prefix used by link fields.
pub fn output_name(field: &str) -> &str {
    field.strip_prefix("href_").unwrap_or(field)
}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`; anything else never reaches SQL.
pub fn validate_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub struct EntityBuilder {
    name: String,
    table: String,
    identity: Identity,
    list_name: Option<String>,
    element_name: Option<String>,
    primary_key: Vec<String>,
    columns: Vec<(String, ColumnType)>,
    relationships: Vec<Relationship>,
    fields: Vec<FieldDef>,
    exposed: Vec<String>,
    summary: Option<Vec<String>>,
    preload: Vec<String>,
    class_uri: Option<String>,
    rdf_properties: Vec<(String, PendingRdf)>,
    rdf_named: Vec<(String, String)>,
    methods: HashMap<String, FieldTripleFn>,
    rdf_override: Option<TripleFn>,
    geo_point: Option<GeoPoint>,
    label_column: Option<String>,
}

impl EntityBuilder {
    fn new(name: &str, table: &str) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            identity: Identity::Anonymous,
            list_name: None,
            element_name: None,
            primary_key: Vec::new(),
            columns: Vec::new(),
            relationships: Vec::new(),
            fields: Vec::new(),
            exposed: Vec::new(),
            summary: None,
            preload: Vec::new(),
            class_uri: None,
            rdf_properties: Vec::new(),
            rdf_named: Vec::new(),
            methods: HashMap::new(),
            rdf_override: None,
            geo_point: None,
            label_column: None,
        }
    }

    /// Addressable as `id/{slug}/{id}`, listed under `list_name`.
    pub fn resource(mut self, slug: &str, list_name: &str) -> Self {
        self.identity = Identity::Resource {
            slug: slug.to_string(),
        };
        self.list_name = Some(list_name.to_string());
        self
    }

    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn list_name(mut self, list_name: &str) -> Self {
        self.list_name = Some(list_name.to_string());
        self
    }

    pub fn element_name(mut self, element_name: &str) -> Self {
        self.element_name = Some(element_name.to_string());
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Declares a stored column without exposing it.
    pub fn column(mut self, name: &str, ty: ColumnType) -> Self {
        self.columns.push((name.to_string(), ty));
        self
    }

    /// Declares a stored column exposed under its own name.
    pub fn stored(mut self, name: &str, ty: ColumnType) -> Self {
        self.columns.push((name.to_string(), ty));
        self.fields.push(FieldDef {
            name: name.to_string(),
            kind: FieldKind::Scalar(ty),
            source: FieldSource::Column(name.to_string()),
        });
        self
    }

    /// Exposes a stored column under another name.
    pub fn alias(mut self, name: &str, column: &str) -> Self {
        let kind = self
            .columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, t)| FieldKind::Scalar(*t))
            .unwrap_or(FieldKind::Scalar(ColumnType::Text));
        self.fields.push(FieldDef {
            name: name.to_string(),
            kind,
            source: FieldSource::Column(column.to_string()),
        });
        self
    }

    pub fn computed(mut self, name: &str, kind: FieldKind, f: ComputeFn) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            kind,
            source: FieldSource::Computed(f),
        });
        self
    }

    /// Many-to-one: `local_column` of this table equals `remote_column` of `target`.
    pub fn reference(mut self, name: &str, target: &str, local_column: &str, remote_column: &str) -> Self {
        self.relationships.push(Relationship {
            name: name.to_string(),
            target: target.to_string(),
            cardinality: Cardinality::One,
            local_column: local_column.to_string(),
            remote_column: remote_column.to_string(),
            through: None,
        });
        self.fields.push(FieldDef {
            name: name.to_string(),
            kind: FieldKind::Reference(target.to_string()),
            source: FieldSource::Relationship(name.to_string()),
        });
        self
    }

    /// One-to-many: `remote_column` of `target` points back at `local_column`.
    pub fn collection(mut self, name: &str, target: &str, local_column: &str, remote_column: &str) -> Self {
        self.relationships.push(Relationship {
            name: name.to_string(),
            target: target.to_string(),
            cardinality: Cardinality::Many,
            local_column: local_column.to_string(),
            remote_column: remote_column.to_string(),
            through: None,
        });
        self.fields.push(FieldDef {
            name: name.to_string(),
            kind: FieldKind::Collection(target.to_string()),
            source: FieldSource::Relationship(name.to_string()),
        });
        self
    }

    /// Many-to-many through an association table.
    pub fn association(
        mut self,
        name: &str,
        target: &str,
        local_column: &str,
        remote_column: &str,
        through: Association,
    ) -> Self {
        self.relationships.push(Relationship {
            name: name.to_string(),
            target: target.to_string(),
            cardinality: Cardinality::Many,
            local_column: local_column.to_string(),
            remote_column: remote_column.to_string(),
            through: Some(through),
        });
        self.fields.push(FieldDef {
            name: name.to_string(),
            kind: FieldKind::Collection(target.to_string()),
            source: FieldSource::Relationship(name.to_string()),
        });
        self
    }

    pub fn exposed(mut self, fields: &[&str]) -> Self {
        self.exposed = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Defaults to the exposed subset when not given.
    pub fn summary(mut self, fields: &[&str]) -> Self {
        self.summary = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn preload(mut self, relationships: &[&str]) -> Self {
        self.preload = relationships.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn class_uri(mut self, uri: &str) -> Self {
        self.class_uri = Some(uri.to_string());
        self
    }

    pub fn rdf_direct(mut self, field: &str, predicate: &str) -> Self {
        self.rdf_properties
            .push((field.to_string(), PendingRdf::Direct(predicate.to_string())));
        self
    }

    pub fn rdf_function(mut self, field: &str, f: TripleFn) -> Self {
        self.rdf_properties
            .push((field.to_string(), PendingRdf::Function(f)));
        self
    }

    pub fn rdf_relationship(mut self, field: &str, predicate: &str) -> Self {
        self.rdf_properties
            .push((field.to_string(), PendingRdf::Relationship(predicate.to_string())));
        self
    }

    /// Registers a named triple method usable by [`EntityBuilder::rdf_named`].
    pub fn method(mut self, name: &str, f: FieldTripleFn) -> Self {
        self.methods.insert(name.to_string(), f);
        self
    }

    pub fn rdf_named(mut self, field: &str, method: &str) -> Self {
        self.rdf_named.push((field.to_string(), method.to_string()));
        self
    }

    /// Replaces the triple heuristics entirely for this entity.
    pub fn rdf_override(mut self, f: TripleFn) -> Self {
        self.rdf_override = Some(f);
        self
    }

    pub fn geo_point(mut self, lat_column: &str, lon_column: &str) -> Self {
        self.geo_point = Some(GeoPoint {
            lat_column: lat_column.to_string(),
            lon_column: lon_column.to_string(),
        });
        self
    }

    pub fn label(mut self, column: &str) -> Self {
        self.label_column = Some(column.to_string());
        self
    }

    pub fn build(self) -> Result<EntityDescriptor, CatalogError> {
        let entity = self.name.clone();
        let has_column = |c: &str| self.columns.iter().any(|(name, _)| name == c);
        let has_field = |f: &str| self.fields.iter().any(|def| def.name == f);

        for ident in std::iter::once(&self.table).chain(self.columns.iter().map(|(c, _)| c)) {
            if !validate_ident(ident) {
                return Err(CatalogError::InvalidIdentifier(ident.clone()));
            }
        }
        if self.primary_key.is_empty() {
            return Err(CatalogError::EmptyPrimaryKey(entity));
        }
        for pk in &self.primary_key {
            if !has_column(pk) {
                return Err(CatalogError::UndeclaredColumn {
                    entity,
                    column: pk.clone(),
                });
            }
        }
        for def in &self.fields {
            if let FieldSource::Column(c) = &def.source {
                if !has_column(c) {
                    return Err(CatalogError::UndeclaredColumn {
                        entity,
                        column: c.clone(),
                    });
                }
            }
        }
        for rel in &self.relationships {
            if !validate_ident(&rel.remote_column) {
                return Err(CatalogError::InvalidIdentifier(rel.remote_column.clone()));
            }
            if !has_column(&rel.local_column) {
                return Err(CatalogError::UndeclaredColumn {
                    entity,
                    column: rel.local_column.clone(),
                });
            }
            if let Some(a) = &rel.through {
                for ident in [&a.table, &a.local_column, &a.remote_column] {
                    if !validate_ident(ident) {
                        return Err(CatalogError::InvalidIdentifier(ident.clone()));
                    }
                }
            }
        }

        let summary = self.summary.clone().unwrap_or_else(|| self.exposed.clone());
        for f in self.exposed.iter().chain(summary.iter()) {
            if !has_field(f) {
                return Err(CatalogError::UndeclaredField {
                    entity,
                    field: f.clone(),
                });
            }
        }
        for f in &summary {
            if !self.exposed.contains(f) {
                return Err(CatalogError::SummaryNotExposed {
                    entity,
                    field: f.clone(),
                });
            }
        }
        for r in &self.preload {
            if !self.relationships.iter().any(|rel| &rel.name == r) {
                return Err(CatalogError::NotARelationship {
                    entity,
                    field: r.clone(),
                });
            }
        }

        let iri = |value: &str| {
            NamedNode::new(value).map_err(|_| CatalogError::InvalidIri {
                entity: entity.clone(),
                iri: value.to_string(),
            })
        };
        let class_uri = self.class_uri.as_deref().map(iri).transpose()?;
        let mut rdf_properties = Vec::with_capacity(self.rdf_properties.len());
        for (field, pending) in &self.rdf_properties {
            let prop = match pending {
                PendingRdf::Direct(p) => RdfProperty::Direct { predicate: iri(p)? },
                PendingRdf::Function(f) => RdfProperty::ComputedFunction(*f),
                PendingRdf::Relationship(p) => RdfProperty::RelationshipPredicate { predicate: iri(p)? },
            };
            rdf_properties.push((field.clone(), prop));
        }
        for (field, method) in &self.rdf_named {
            let f = self
                .methods
                .get(method)
                .copied()
                .ok_or_else(|| CatalogError::UnresolvedMethod {
                    entity: entity.clone(),
                    method: method.clone(),
                })?;
            rdf_properties.push((
                field.clone(),
                RdfProperty::NamedMethod {
                    name: method.clone(),
                    method: f,
                },
            ));
        }
        for (field, prop) in &rdf_properties {
            if !has_field(field) {
                return Err(CatalogError::UndeclaredField {
                    entity,
                    field: field.clone(),
                });
            }
            if let RdfProperty::RelationshipPredicate { .. } = prop {
                if !self.relationships.iter().any(|rel| &rel.name == field) {
                    return Err(CatalogError::NotARelationship {
                        entity,
                        field: field.clone(),
                    });
                }
            }
        }
        if let Some(g) = &self.geo_point {
            for c in [&g.lat_column, &g.lon_column] {
                if !has_column(c) {
                    return Err(CatalogError::UndeclaredColumn {
                        entity,
                        column: c.clone(),
                    });
                }
            }
        }
        if let Some(l) = &self.label_column {
            if !has_column(l) {
                return Err(CatalogError::UndeclaredColumn {
                    entity,
                    column: l.clone(),
                });
            }
        }

        let element_name = self
            .element_name
            .clone()
            .unwrap_or_else(|| self.name.to_case(Case::Snake));
        let list_name = self
            .list_name
            .clone()
            .unwrap_or_else(|| format!("{}s", self.name.to_lowercase()));

        Ok(EntityDescriptor {
            name: self.name,
            table: self.table,
            identity: self.identity,
            list_name,
            element_name,
            primary_key: self.primary_key,
            columns: self.columns,
            relationships: self.relationships,
            fields: self.fields,
            exposed: self.exposed,
            summary,
            preload: self.preload,
            class_uri,
            rdf_properties,
            rdf_override: self.rdf_override,
            geo_point: self.geo_point,
            label_column: self.label_column,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> EntityBuilder {
        EntityDescriptor::builder("SituacaoProposta", "situacao_proposta")
            .resource("situacao_proposta", "situacoes_propostas")
            .primary_key(&["id"])
            .stored("id", ColumnType::Integer)
            .stored("nome", ColumnType::Text)
    }

    #[test]
    fn element_name_defaults_to_snake_case() {
        let d = base().exposed(&["nome"]).build().unwrap();
        assert_eq!(d.element_name(), "situacao_proposta");
        assert_eq!(d.fields(Subset::Summary), &["nome".to_string()]);
        assert_eq!(d.slug(), Some("situacao_proposta"));
    }

    #[test]
    fn summary_must_be_subset_of_exposed() {
        let err = base()
            .exposed(&["nome"])
            .summary(&["nome", "id"])
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::SummaryNotExposed { ref field, .. } if field == "id"));
    }

    #[test]
    fn unknown_named_method_fails_fast() {
        let err = base()
            .exposed(&["nome"])
            .rdf_named("nome", "missing")
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnresolvedMethod { .. }));
    }

    #[test]
    fn invalid_column_identifier_rejected() {
        let err = EntityDescriptor::builder("X", "x")
            .primary_key(&["id"])
            .stored("id", ColumnType::Integer)
            .stored("bad name", ColumnType::Text)
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidIdentifier(_)));
    }

    #[test]
    fn invalid_remote_column_rejected() {
        let err = base()
            .column("id_orgao", ColumnType::Integer)
            .reference("orgao", "Orgao", "id_orgao", "id) OR (1=1")
            .exposed(&["nome", "orgao"])
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidIdentifier(ref ident) if ident == "id) OR (1=1"));
    }

    #[test]
    fn rdf_iris_are_parsed_at_build() {
        let d = base()
            .exposed(&["nome"])
            .class_uri("http://vocab.e.gov.br/licitacoes#Situacao")
            .rdf_direct("nome", "http://xmlns.com/foaf/0.1/name")
            .build()
            .unwrap();
        assert_eq!(d.class_uri().unwrap().as_str(), "http://vocab.e.gov.br/licitacoes#Situacao");
        assert!(matches!(
            d.rdf_property("nome"),
            Some(RdfProperty::Direct { predicate }) if predicate.as_str() == "http://xmlns.com/foaf/0.1/name"
        ));

        let err = base()
            .exposed(&["nome"])
            .rdf_direct("nome", "foaf name")
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidIri { ref iri, .. } if iri == "foaf name"));
    }

    #[test]
    fn output_name_strips_link_prefix() {
        assert_eq!(output_name("href_propostas"), "propostas");
        assert_eq!(output_name("nome"), "nome");
    }
}
