use crate::transport::http::handlers::{consulta, dados, health, metodos};
use crate::transport::http::types::{AppState, HealthResponse};
use axum::routing::get;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        consulta::consulta_handler,
        dados::dados_handler,
        dados::id_handler,
        metodos::metodos_negotiate_handler,
        metodos::metodos_handler
    ),
    components(schemas(HealthResponse)),
    info(
        title = "API de Dados Abertos de Convênios",
        description = "Read-only linked-data API over SICONV proposals, agreements and related registries."
    )
)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/v1/consulta", get(metodos::metodos_negotiate_handler))
        .route("/v1/consulta/:metodo", get(consulta::consulta_handler))
        .route("/v1/metodos", get(metodos::metodos_negotiate_handler))
        .route("/v1/metodos/:formato", get(metodos::metodos_handler))
        .route("/dados/:classe/:id", get(dados::dados_handler))
        .route("/id/:classe/:id", get(dados::id_handler))
        .with_state(app_state)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
