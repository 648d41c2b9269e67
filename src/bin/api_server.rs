// src/bin/api_server.rs

use convenios_api::storage::postgres::PostgresStore;
use convenios_api::transport;
use convenios_api::Settings;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("convenios_api=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;

    // --- Store Initialization ---
    tracing::info!(max_connections = settings.db_max_connections, "connecting to PostgreSQL");
    let store = PostgresStore::connect(&settings.database_url, settings.db_max_connections).await?;

    // --- Catalog / Endpoint Registry ---
    let service = convenios_api::build_service(&settings.public_base_url, Arc::new(store))?;
    tracing::info!(
        entities = service.catalog().names().len(),
        methods = service.methods().len(),
        base = %service.links().base(),
        "catalog loaded"
    );

    let app_state = transport::http::AppState {
        service: Arc::new(service),
        cache_refresh_hour: settings.cache_refresh_hour,
    };

    // --- API Server Initialization ---
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()));
    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    tracing::info!(addr = %settings.bind_addr, "API server listening (Swagger UI at /swagger-ui)");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
