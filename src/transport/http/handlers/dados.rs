use crate::domain::linked_data::{split_suffix, Resolver};
use crate::transport::http::handlers::consulta::accept;
use crate::transport::http::policy::{payload_response, redirect_response};
use crate::transport::http::types::{ApiError, AppState};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

#[utoipa::path(
    get,
    path = "/dados/{classe}/{id}",
    params(
        ("classe" = String, Path, description = "Resource type (e.g. municipio)"),
        ("id" = String, Path, description = "Identifier, optionally suffixed with a format (e.g. 3550308.rdf); composite keys are comma-separated")
    ),
    responses(
        (status = 200, description = "Resource document in the requested format"),
        (status = 302, description = "Format negotiated from the Accept header"),
        (status = 304, description = "Not modified"),
        (status = 404, description = "Unknown type, format or resource")
    )
)]
pub async fn dados_handler(
    State(state): State<AppState>,
    Path((classe, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    match dados(&state, &classe, &id, &headers).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn dados(state: &AppState, classe: &str, segment: &str, headers: &HeaderMap) -> Result<Response, ApiError> {
    let service = &state.service;
    let (id, format) = split_suffix(segment)?;
    match format {
        Some(format) => {
            let payload = service.document(classe, id, format).await?;
            Ok(payload_response(headers, payload, state.cache_refresh_hour))
        }
        None => {
            let resolver = Resolver::new(service.catalog(), service.links());
            Ok(redirect_response(resolver.document(classe, id, accept(headers))?))
        }
    }
}

#[utoipa::path(
    get,
    path = "/id/{classe}/{id}",
    params(
        ("classe" = String, Path, description = "Resource type (e.g. municipio)"),
        ("id" = String, Path, description = "Identifier")
    ),
    responses(
        (status = 303, description = "See the document describing the resource"),
        (status = 404, description = "Unknown type")
    )
)]
pub async fn id_handler(State(state): State<AppState>, Path((classe, id)): Path<(String, String)>) -> Response {
    let resolver = Resolver::new(state.service.catalog(), state.service.links());
    match resolver.identifier(&classe, &id) {
        Ok(redirect) => redirect_response(redirect),
        Err(e) => ApiError::from(e).into_response(),
    }
}
