pub mod app;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::query_service::QueryService;
pub use domain::entity::Catalog;
pub use domain::links::Links;
pub use domain::query::MethodRegistry;
pub use infra::config::Settings;
pub use storage::memory::MemoryStore;
pub use storage::postgres::PostgresStore;

use std::sync::Arc;

/// SICONV catalog, endpoint registry and URL builder, checked at startup.
pub fn build_service(
    public_base_url: &str,
    store: Arc<dyn storage::RecordStore>,
) -> anyhow::Result<QueryService> {
    let catalog = Arc::new(domain::entity::siconv::catalog()?);
    let methods = Arc::new(domain::query::siconv::registry(&catalog)?);
    let links = Arc::new(Links::new(public_base_url)?);
    Ok(QueryService::new(catalog, methods, links, store)?)
}
