//! The Query Service.
//!
//! Request-scoped orchestration between the HTTP layer and the record store:
//! 1.  Binds and validates the query string before any store access.
//! 2.  Opens one store session, counts and fetches the page, hydrates the
//!     relationships the chosen field subset needs.
//! 3.  Feeds the records through an `Aggregator` and closes the session only
//!     after the payload has been composed.

use crate::domain::entity::{Cardinality, Catalog, CatalogError, EntityDescriptor, Record, Subset, Value};
use crate::domain::linked_data::LinkedDataError;
use crate::domain::links::Links;
use crate::domain::query::documentation::{self, filter_docs, method_records, LIST_NAME};
use crate::domain::query::plan::split;
use crate::domain::query::{bind, MethodRegistry, ParamValue, QueryError, QueryMethod, QueryPlan};
use crate::domain::render::{Aggregator, AggregatorError, Format};
use crate::storage::{param_type, same_key, RecordStore, StoreError, StoreSession};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Método não suportado: {0}")]
    UnknownMethod(String),
    #[error(transparent)]
    LinkedData(#[from] LinkedDataError),
    #[error("Recurso não encontrado: {slug}/{id}")]
    NotFound { slug: String, id: String },
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// A serialized response body and its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub format: Format,
    pub body: Vec<u8>,
}

/// One list request: endpoint, format and the raw query pairs in order.
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub slug: String,
    pub format: Format,
    pub query: Vec<(String, String)>,
    /// URL the client requested, echoed in pagination metadata.
    pub current_url: Option<String>,
}

pub struct QueryService {
    catalog: Arc<Catalog>,
    methods: Arc<MethodRegistry>,
    links: Arc<Links>,
    store: Arc<dyn RecordStore>,
    doc_descriptor: Arc<EntityDescriptor>,
}

impl QueryService {
    pub fn new(
        catalog: Arc<Catalog>,
        methods: Arc<MethodRegistry>,
        links: Arc<Links>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            catalog,
            methods,
            links,
            store,
            doc_descriptor: Arc::new(documentation::descriptor()?),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn methods(&self) -> &MethodRegistry {
        &self.methods
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Runs a list endpoint and serializes one page.
    pub async fn list(&self, request: &ListRequest) -> Result<Payload, ServiceError> {
        let method = self
            .methods
            .get(&request.slug)
            .ok_or_else(|| ServiceError::UnknownMethod(request.slug.clone()))?;
        let binding = bind(&method.params, &request.query)?;
        let plan = QueryPlan::for_method(&method, &binding);
        tracing::debug!(
            method = %method.slug,
            filters = plan.filters.len(),
            offset = plan.window.offset,
            limit = plan.window.limit,
            "planned list query"
        );

        let mut session = self.store.session().await?;
        let result = self.run_list(session.as_mut(), &method, &plan, request).await;
        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "failed to close store session");
        }
        result
    }

    async fn run_list(
        &self,
        session: &mut dyn StoreSession,
        method: &QueryMethod,
        plan: &QueryPlan,
        request: &ListRequest,
    ) -> Result<Payload, ServiceError> {
        let total = session.count(plan).await?;
        let rows = session.fetch_window(plan).await?;
        let mut records: Vec<Record> = rows
            .into_iter()
            .map(|row| Record::new(method.entity.clone(), self.links.clone(), row))
            .collect();
        self.hydrate(session, &method.entity, &mut records, method.subset).await?;

        let page = split(
            &self.links,
            &method.slug,
            request.format,
            &request.query,
            request.current_url.clone(),
            plan.window,
            total,
        );
        let mut aggregator = Aggregator::new(request.format, method.entity.list_name(), method.subset)
            .with_total(total)
            .with_split(page)
            .with_filters(request.query.clone(), filter_docs(method));
        for record in records {
            aggregator.add(record)?;
        }
        tracing::info!(method = %method.slug, total, returned = aggregator.len(), "list served");
        Ok(Payload {
            format: request.format,
            body: aggregator.serialize(request.format)?,
        })
    }

    /// Single-resource document with the exposed field subset.
    ///
    /// `id` is the primary-key values joined with `,`; a wrong number of
    /// values, an unparseable value, no match or more than one match all read
    /// as not found.
    pub async fn document(&self, slug: &str, id: &str, format: Format) -> Result<Payload, ServiceError> {
        let entity = self
            .catalog
            .by_slug(slug)
            .ok_or_else(|| LinkedDataError::UnknownSlug(slug.to_string()))?;
        let not_found = || ServiceError::NotFound {
            slug: slug.to_string(),
            id: id.to_string(),
        };

        let parts: Vec<&str> = id.split(',').collect();
        if parts.len() != entity.primary_key().len() {
            return Err(not_found());
        }
        let mut key = Vec::with_capacity(parts.len());
        for (column, part) in entity.primary_key().iter().zip(&parts) {
            let ty = entity.column(column).ok_or_else(|| CatalogError::UndeclaredColumn {
                entity: entity.name().to_string(),
                column: column.clone(),
            })?;
            let value = param_type(ty).parse(part).ok_or_else(not_found)?;
            key.push(value);
        }

        let mut session = self.store.session().await?;
        let result = self.run_document(session.as_mut(), &entity, &key, format).await;
        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "failed to close store session");
        }
        result?.ok_or_else(not_found)
    }

    async fn run_document(
        &self,
        session: &mut dyn StoreSession,
        entity: &Arc<EntityDescriptor>,
        key: &[ParamValue],
        format: Format,
    ) -> Result<Option<Payload>, ServiceError> {
        let mut rows = session.fetch_by_key(entity, key).await?;
        if rows.len() != 1 {
            if rows.len() > 1 {
                tracing::warn!(entity = entity.name(), "ambiguous key lookup");
            }
            return Ok(None);
        }
        let Some(row) = rows.pop() else {
            return Ok(None);
        };
        let mut records = vec![Record::new(entity.clone(), self.links.clone(), row)];
        self.hydrate(session, entity, &mut records, Subset::Exposed).await?;

        let mut aggregator = Aggregator::new(format, entity.list_name(), Subset::Exposed);
        for record in records {
            aggregator.add(record)?;
        }
        Ok(Some(Payload {
            format,
            body: aggregator.serialize(format)?,
        }))
    }

    /// Documentation listing of every query method.
    pub fn documentation(&self, format: Format) -> Result<Payload, ServiceError> {
        let records = method_records(&self.methods, &self.doc_descriptor, &self.links);
        let mut aggregator = Aggregator::new(format, LIST_NAME, Subset::Exposed).with_total(records.len() as u64);
        for record in records {
            aggregator.add(record)?;
        }
        Ok(Payload {
            format,
            body: aggregator.serialize(format)?,
        })
    }

    /// Loads, one level deep, every relationship `subset` renders plus the
    /// descriptor's preload list. One store round trip per relationship.
    async fn hydrate(
        &self,
        session: &mut dyn StoreSession,
        entity: &Arc<EntityDescriptor>,
        records: &mut [Record],
        subset: Subset,
    ) -> Result<(), ServiceError> {
        if records.is_empty() {
            return Ok(());
        }
        for rel in entity.relationships_for(subset) {
            let target = self
                .catalog
                .get(&rel.target)
                .ok_or_else(|| CatalogError::UnknownEntity(rel.target.clone()))?;

            let mut owner_keys: Vec<JsonValue> = Vec::new();
            for record in records.iter() {
                if let Some(k) = record.raw(&rel.local_column) {
                    if !owner_keys.iter().any(|seen| same_key(seen, k)) {
                        owner_keys.push(k.clone());
                    }
                }
            }
            let related = session.fetch_related(rel, &target, &owner_keys).await?;

            for record in records.iter_mut() {
                let Some(local) = record.raw(&rel.local_column).cloned() else {
                    record.set_related(&rel.name, Value::Null);
                    continue;
                };
                let mut matched = related
                    .iter()
                    .filter(|r| same_key(&r.owner_key, &local))
                    .map(|r| Record::new(target.clone(), self.links.clone(), r.row.clone()));
                let value = match rel.cardinality {
                    Cardinality::One => matched
                        .next()
                        .map(|r| Value::Entity(Box::new(r)))
                        .unwrap_or(Value::Null),
                    Cardinality::Many => Value::List(matched.map(|r| Value::Entity(Box::new(r))).collect()),
                };
                record.set_related(&rel.name, value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::siconv;
    use crate::domain::query::siconv as methods;
    use crate::storage::memory::MemoryStore;
    use serde_json::json;

    fn service() -> QueryService {
        let catalog = Arc::new(siconv::catalog().unwrap());
        let registry = Arc::new(methods::registry(&catalog).unwrap());
        let links = Arc::new(Links::new("http://api.example.org/siconv/").unwrap());
        let store = MemoryStore::from_tables(vec![
            (
                "municipio".to_string(),
                vec![
                    json!({"id": 3550308, "nome": "São Paulo", "uf": "SP", "uf_nome": "São Paulo", "regiao": "SE"}),
                    json!({"id": 3304557, "nome": "Rio de Janeiro", "uf": "RJ", "uf_nome": "Rio de Janeiro", "regiao": "SE"}),
                ],
            ),
            (
                "proponente".to_string(),
                vec![json!({"id": 46395000000139i64, "nome": "Prefeitura de São Paulo", "id_municipio": 3550308})],
            ),
            (
                "area_atuacao_proponente".to_string(),
                vec![json!({"id": 7, "descricao": "Saúde"})],
            ),
            (
                "subarea_atuacao_proponente".to_string(),
                vec![
                    json!({"id": 71, "id_area": 7, "descricao": "Atenção básica"}),
                    json!({"id": 72, "id_area": 7, "descricao": "Vigilância sanitária"}),
                ],
            ),
            (
                "pessoa_responsavel".to_string(),
                vec![json!({"id": "r1", "nome": "Maria", "cpf": "***456789**"})],
            ),
            (
                "habilitacao_area_atuacao".to_string(),
                vec![
                    json!({"id": 1, "id_subarea": 71, "id_proponente": 46395000000139i64, "id_orgao": 26000,
                           "id_pessoa_responsavel": "r1", "situacao": "Habilitado", "data_inicio": "2012-01-02"}),
                    json!({"id": 2, "id_subarea": 72, "id_proponente": 46395000000139i64, "id_orgao": 36000,
                           "situacao": "Vencido"}),
                ],
            ),
        ])
        .unwrap();
        QueryService::new(catalog, registry, links, Arc::new(store)).unwrap()
    }

    fn request(slug: &str, format: Format, query: &[(&str, &str)]) -> ListRequest {
        ListRequest {
            slug: slug.to_string(),
            format,
            query: query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            current_url: None,
        }
    }

    #[tokio::test]
    async fn state_filter_is_folded_before_querying() {
        let svc = service();
        let payload = svc.list(&request("municipios", Format::Json, &[("uf", "sp")])).await.unwrap();
        let body: JsonValue = serde_json::from_slice(&payload.body).unwrap();
        assert_eq!(body["metadados"]["total_registros"], json!(1));
        assert_eq!(body["municipios"][0]["nome"], json!("São Paulo"));

        let err = svc.list(&request("municipios", Format::Json, &[("uf", "xx")])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Query(_)));
        assert!(err.to_string().contains("uf"));
    }

    #[tokio::test]
    async fn unknown_method_and_parameter() {
        let svc = service();
        let err = svc.list(&request("nada", Format::Json, &[])).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnknownMethod(ref m) if m == "nada"));
        let err = svc.list(&request("municipios", Format::Json, &[("foo", "1")])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Query(QueryError::UnknownParameter(_))));
    }

    #[tokio::test]
    async fn empty_result_is_a_valid_page() {
        let svc = service();
        let payload = svc.list(&request("orgaos", Format::Xml, &[])).await.unwrap();
        assert!(!payload.body.is_empty());
    }

    #[tokio::test]
    async fn document_lookup_hydrates_references() {
        let svc = service();
        let payload = svc.document("proponente", "46395000000139", Format::Json).await.unwrap();
        let body = String::from_utf8(payload.body).unwrap();
        assert!(body.contains("http://api.example.org/siconv/id/municipio/3550308"));

        for id in ["1", "abc", "3550308,1"] {
            let err = svc.document("municipio", id, Format::Json).await.unwrap_err();
            assert!(matches!(err, ServiceError::NotFound { .. }), "{}", id);
        }
        let err = svc.document("unknownslug", "1", Format::Json).await.unwrap_err();
        assert!(err.to_string().contains("unknownslug"));
    }

    #[tokio::test]
    async fn habilitations_filter_and_hydrate_their_references() {
        let svc = service();
        let payload = svc
            .list(&request("habilitacoes_area_atuacao", Format::Json, &[("id_orgao", "26000")]))
            .await
            .unwrap();
        let body: JsonValue = serde_json::from_slice(&payload.body).unwrap();
        assert_eq!(body["metadados"]["total_registros"], json!(1));
        let item = &body["habilitacoes_area_atuacao"][0];
        assert_eq!(item["cpf_responsavel"], json!("***456789**"));
        assert_eq!(item["data_inicio"], json!("2012-01-02"));
        assert_eq!(
            item["subarea"]["subarea_atuacao_proponente"]["href"],
            json!("http://api.example.org/siconv/id/subarea_atuacao_proponente/71")
        );

        let payload = svc
            .list(&request("subareas_atuacao_proponente", Format::Json, &[("descricao", "SANIT")]))
            .await
            .unwrap();
        let body: JsonValue = serde_json::from_slice(&payload.body).unwrap();
        assert_eq!(body["metadados"]["total_registros"], json!(1));
        assert_eq!(
            body["subareas_atuacao_proponente"][0]["habilitacoes"],
            json!({"href": "http://api.example.org/siconv/v1/consulta/habilitacoes_area_atuacao?id_subarea=72"})
        );

        let payload = svc.document("area_atuacao_proponente", "7", Format::Json).await.unwrap();
        let body: JsonValue = serde_json::from_slice(&payload.body).unwrap();
        assert_eq!(body["areas_atuacao_proponente"][0]["descricao"], json!("Saúde"));
    }

    #[test]
    fn documentation_lists_every_method() {
        let svc = service();
        let payload = svc.documentation(Format::Json).unwrap();
        let body: JsonValue = serde_json::from_slice(&payload.body).unwrap();
        assert_eq!(body["metodos"].as_array().map(Vec::len), Some(svc.methods().len()));
    }
}
