//! Catalog: registry of entity descriptors keyed by type name and slug.

use super::{Cardinality, EntityDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Wiring defects detected at startup. Never produced while serving requests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("invalid SQL identifier: {0}")]
    InvalidIdentifier(String),
    #[error("entity {0} declares no primary key")]
    EmptyPrimaryKey(String),
    #[error("entity {entity}: undeclared column '{column}'")]
    UndeclaredColumn { entity: String, column: String },
    #[error("entity {entity}: undeclared field '{field}'")]
    UndeclaredField { entity: String, field: String },
    #[error("entity {entity}: summary field '{field}' is not exposed")]
    SummaryNotExposed { entity: String, field: String },
    #[error("entity {entity}: '{field}' is not a relationship")]
    NotARelationship { entity: String, field: String },
    #[error("entity {entity}: invalid IRI '{iri}'")]
    InvalidIri { entity: String, iri: String },
    #[error("entity {entity}: named RDF method '{method}' is not registered")]
    UnresolvedMethod { entity: String, method: String },
    #[error("entity {entity}: relationship '{relationship}' targets unknown entity '{target}'")]
    UnknownTarget {
        entity: String,
        relationship: String,
        target: String,
    },
    #[error("duplicate entity or slug: {0}")]
    Duplicate(String),
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("method {method}, parameter {parameter}: invalid query path '{path}': {reason}")]
    InvalidQueryPath {
        method: String,
        parameter: String,
        path: String,
        reason: String,
    },
}

#[derive(Debug, Default)]
pub struct Catalog {
    by_name: HashMap<String, Arc<EntityDescriptor>>,
    by_slug: HashMap<String, Arc<EntityDescriptor>>,
    order: Vec<String>,
}

impl Catalog {
    /// Collects descriptors and checks every relationship against its target.
    pub fn from_descriptors(descriptors: Vec<EntityDescriptor>) -> Result<Self, CatalogError> {
        let mut catalog = Catalog::default();
        for d in descriptors {
            let name = d.name().to_string();
            if catalog.by_name.contains_key(&name) {
                return Err(CatalogError::Duplicate(name));
            }
            let d = Arc::new(d);
            if let Some(slug) = d.slug() {
                if catalog.by_slug.insert(slug.to_string(), d.clone()).is_some() {
                    return Err(CatalogError::Duplicate(slug.to_string()));
                }
            }
            catalog.order.push(name.clone());
            catalog.by_name.insert(name, d);
        }

        for d in catalog.by_name.values() {
            for rel in d.relationships() {
                let target = catalog.by_name.get(&rel.target).ok_or_else(|| {
                    CatalogError::UnknownTarget {
                        entity: d.name().to_string(),
                        relationship: rel.name.clone(),
                        target: rel.target.clone(),
                    }
                })?;
                if target.column(&rel.remote_column).is_none() {
                    return Err(CatalogError::UndeclaredColumn {
                        entity: target.name().to_string(),
                        column: rel.remote_column.clone(),
                    });
                }
                if rel.cardinality == Cardinality::One && rel.through.is_some() {
                    return Err(CatalogError::NotARelationship {
                        entity: d.name().to_string(),
                        field: rel.name.clone(),
                    });
                }
            }
        }
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<Arc<EntityDescriptor>> {
        self.by_name.get(name).cloned()
    }

    /// Looks up an addressable entity by its `id/{slug}` slug.
    pub fn by_slug(&self, slug: &str) -> Option<Arc<EntityDescriptor>> {
        self.by_slug.get(slug).cloned()
    }

    /// Registered type names, in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn descriptors(&self) -> impl Iterator<Item = Arc<EntityDescriptor>> + '_ {
        self.order.iter().filter_map(|n| self.by_name.get(n).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::ColumnType;

    fn municipio() -> EntityDescriptor {
        EntityDescriptor::builder("Municipio", "municipio")
            .resource("municipio", "municipios")
            .primary_key(&["id"])
            .stored("id", ColumnType::Integer)
            .stored("nome", ColumnType::Text)
            .exposed(&["nome"])
            .build()
            .unwrap()
    }

    #[test]
    fn resolves_slug_and_name() {
        let catalog = Catalog::from_descriptors(vec![municipio()]).unwrap();
        assert_eq!(catalog.by_slug("municipio").unwrap().name(), "Municipio");
        assert!(catalog.get("Municipio").is_some());
        assert!(catalog.by_slug("unknownslug").is_none());
    }

    #[test]
    fn relationship_target_must_exist() {
        let proponente = EntityDescriptor::builder("Proponente", "proponente")
            .resource("proponente", "proponentes")
            .primary_key(&["id"])
            .stored("id", ColumnType::Integer)
            .column("id_municipio", ColumnType::Integer)
            .reference("municipio", "Municipio", "id_municipio", "id")
            .exposed(&["municipio"])
            .build()
            .unwrap();
        let err = Catalog::from_descriptors(vec![proponente]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownTarget { ref target, .. } if target == "Municipio"));
    }

    #[test]
    fn duplicate_slug_rejected() {
        let err = Catalog::from_descriptors(vec![municipio(), municipio()]).unwrap_err();
        assert_eq!(err, CatalogError::Duplicate("Municipio".to_string()));
    }
}
