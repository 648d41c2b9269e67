use crate::domain::linked_data::{LinkedDataError, Resolver};
use crate::domain::render::Format;
use crate::transport::http::handlers::consulta::accept;
use crate::transport::http::policy::{payload_response, redirect_response};
use crate::transport::http::types::{ApiError, AppState};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

#[utoipa::path(
    get,
    path = "/v1/metodos",
    responses(
        (status = 302, description = "Format of the documentation listing negotiated from the Accept header")
    )
)]
pub async fn metodos_negotiate_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let resolver = Resolver::new(state.service.catalog(), state.service.links());
    redirect_response(resolver.documentation(accept(&headers)))
}

#[utoipa::path(
    get,
    path = "/v1/metodos/{formato}",
    params(
        ("formato" = String, Path, description = "html, xml, csv, json, rdf, ttl, n3 or nt")
    ),
    responses(
        (status = 200, description = "Every query method with its parameters and returned fields"),
        (status = 304, description = "Not modified"),
        (status = 404, description = "Unknown format")
    )
)]
pub async fn metodos_handler(
    State(state): State<AppState>,
    Path(formato): Path<String>,
    headers: HeaderMap,
) -> Response {
    let result = Format::from_suffix(&formato)
        .ok_or(LinkedDataError::UnknownFormat(formato))
        .map_err(ApiError::from)
        .and_then(|format| state.service.documentation(format).map_err(ApiError::from));
    match result {
        Ok(payload) => payload_response(&headers, payload, state.cache_refresh_hour),
        Err(e) => e.into_response(),
    }
}
