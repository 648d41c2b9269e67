//! Query methods: a list endpoint over one entity plus its parameters, with
//! every parameter path resolved against the catalog at registration time.

use super::params::{Comparison, ParamSpec, ParamType};
use crate::domain::entity::{Catalog, CatalogError, ColumnType, EntityDescriptor, Relationship, Subset};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Default page size of list endpoints.
pub const DEFAULT_WINDOW: u64 = 500;

/// One relationship hop of a parameter path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    pub relationship: Relationship,
    /// Table of the relationship target.
    pub table: String,
    /// Alias of the target table, unique within one parameter's joins.
    pub alias: String,
    /// Alias of the association table, for many-to-many hops.
    pub through_alias: Option<String>,
}

/// A parameter path resolved down to one stored column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub steps: Vec<JoinStep>,
    pub column: String,
    pub column_type: ColumnType,
}

impl ResolvedPath {
    /// Alias holding the leaf column; `base_alias` when there are no joins.
    pub fn leaf_alias<'a>(&'a self, base_alias: &'a str) -> &'a str {
        self.steps.last().map(|s| s.alias.as_str()).unwrap_or(base_alias)
    }
}

#[derive(Debug)]
pub struct QueryMethod {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub entity: Arc<EntityDescriptor>,
    pub params: Vec<ParamSpec>,
    paths: HashMap<String, ResolvedPath>,
    pub window_size: u64,
    pub subset: Subset,
}

impl QueryMethod {
    pub fn builder(slug: &str, entity: &str) -> MethodBuilder {
        MethodBuilder {
            slug: slug.to_string(),
            entity: entity.to_string(),
            id: None,
            name: String::new(),
            description: String::new(),
            params: Vec::new(),
            window_size: DEFAULT_WINDOW,
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn path(&self, param: &str) -> Option<&ResolvedPath> {
        self.paths.get(param)
    }
}

pub struct MethodBuilder {
    slug: String,
    entity: String,
    id: Option<String>,
    name: String,
    description: String,
    params: Vec<ParamSpec>,
    window_size: u64,
}

impl MethodBuilder {
    /// Documentation id; defaults to `consulta_{slug}`.
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn window(mut self, size: u64) -> Self {
        self.window_size = size;
        self
    }

    pub fn build(self, catalog: &Catalog) -> Result<QueryMethod, CatalogError> {
        let entity = catalog
            .get(&self.entity)
            .ok_or_else(|| CatalogError::UnknownEntity(self.entity.clone()))?;
        let id = self.id.unwrap_or_else(|| format!("consulta_{}", self.slug));

        let mut paths = HashMap::new();
        let mut seen = HashSet::new();
        for spec in &self.params {
            if !seen.insert(spec.name.clone()) {
                return Err(CatalogError::Duplicate(format!("{}.{}", self.slug, spec.name)));
            }
            let path = resolve_path(catalog, &entity, spec).map_err(|reason| {
                CatalogError::InvalidQueryPath {
                    method: self.slug.clone(),
                    parameter: spec.name.clone(),
                    path: spec.query_path.clone(),
                    reason,
                }
            })?;
            paths.insert(spec.name.clone(), path);
        }

        Ok(QueryMethod {
            id,
            slug: self.slug,
            name: self.name,
            description: self.description,
            entity,
            params: self.params,
            paths,
            window_size: self.window_size,
            subset: Subset::Summary,
        })
    }
}

fn resolve_path(catalog: &Catalog, entity: &Arc<EntityDescriptor>, spec: &ParamSpec) -> Result<ResolvedPath, String> {
    let segments: Vec<&str> = spec.query_path.split('.').collect();
    let Some((leaf, hops)) = segments.split_last() else {
        return Err("empty path".to_string());
    };

    let mut current = entity.clone();
    let mut steps: Vec<JoinStep> = Vec::new();
    let mut aliases: HashSet<String> = HashSet::new();
    let mut unique_alias = |table: &str| {
        let base = format!("{}__{}", table, spec.name);
        let mut alias = base.clone();
        let mut n = 1;
        while !aliases.insert(alias.clone()) {
            n += 1;
            alias = format!("{}_{}", base, n);
        }
        alias
    };

    for hop in hops {
        let rel = current
            .relationship(hop)
            .ok_or_else(|| format!("'{}' is not a relationship of {}", hop, current.name()))?
            .clone();
        let target = catalog
            .get(&rel.target)
            .ok_or_else(|| format!("unknown entity {}", rel.target))?;
        let through_alias = rel.through.as_ref().map(|a| unique_alias(&a.table));
        let alias = unique_alias(target.table());
        steps.push(JoinStep {
            relationship: rel,
            table: target.table().to_string(),
            alias,
            through_alias,
        });
        current = target;
    }

    let column_type = current
        .column(leaf)
        .ok_or_else(|| format!("'{}' is not a column of {}", leaf, current.name()))?;
    if !spec.value_type.compatible_with(column_type) {
        return Err(format!(
            "parameter type {} cannot be compared with {} column",
            spec.value_type,
            column_type.as_str()
        ));
    }
    if spec.comparison == Comparison::Contains && spec.value_type != ParamType::Text {
        return Err("substring match needs a text parameter".to_string());
    }

    Ok(ResolvedPath {
        steps,
        column: leaf.to_string(),
        column_type,
    })
}

/// Every list endpoint, in registration order.
#[derive(Debug, Default)]
pub struct MethodRegistry {
    methods: Vec<Arc<QueryMethod>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: QueryMethod) -> Result<(), CatalogError> {
        if self.get(&method.slug).is_some() {
            return Err(CatalogError::Duplicate(method.slug));
        }
        self.methods.push(Arc::new(method));
        Ok(())
    }

    pub fn get(&self, slug: &str) -> Option<Arc<QueryMethod>> {
        self.methods.iter().find(|m| m.slug == slug).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<QueryMethod>> {
        self.methods.iter()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::siconv;
    use crate::domain::query::params::ParamType;

    #[test]
    fn nested_path_resolves_to_aliased_joins() {
        let catalog = siconv::catalog().unwrap();
        let method = QueryMethod::builder("propostas", "Proposta")
            .param(ParamSpec::new("uf", ParamType::Text).path("proponente.municipio.uf"))
            .build(&catalog)
            .unwrap();
        let path = method.path("uf").unwrap();
        let aliases: Vec<&str> = path.steps.iter().map(|s| s.alias.as_str()).collect();
        assert_eq!(aliases, ["proponente__uf", "municipio__uf"]);
        assert_eq!(path.column, "uf");
        assert_eq!(path.leaf_alias("base"), "municipio__uf");
        assert_eq!(method.id, "consulta_propostas");
        assert_eq!(method.window_size, DEFAULT_WINDOW);
    }

    #[test]
    fn association_hop_gets_its_own_alias() {
        let catalog = siconv::catalog().unwrap();
        let method = QueryMethod::builder("programas", "Programa")
            .param(ParamSpec::new("estados_habilitados", ParamType::Text).path("estados_habilitados.sigla"))
            .build(&catalog)
            .unwrap();
        let step = &method.path("estados_habilitados").unwrap().steps[0];
        assert_eq!(step.through_alias.as_deref(), Some("uf_programa__estados_habilitados"));
        assert_eq!(step.alias, "uf__estados_habilitados");
    }

    #[test]
    fn invalid_paths_fail_at_registration() {
        let catalog = siconv::catalog().unwrap();
        let err = QueryMethod::builder("municipios", "Municipio")
            .param(ParamSpec::new("x", ParamType::Text).path("estado.sigla"))
            .build(&catalog)
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidQueryPath { ref parameter, .. } if parameter == "x"));

        let err = QueryMethod::builder("municipios", "Municipio")
            .param(ParamSpec::new("nome", ParamType::Integer))
            .build(&catalog)
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidQueryPath { .. }));
    }
}
