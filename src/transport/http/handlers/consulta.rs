use crate::app::query_service::ListRequest;
use crate::domain::linked_data::{split_suffix, Resolver};
use crate::domain::links::API_VERSION;
use crate::transport::http::policy::{payload_response, redirect_response};
use crate::transport::http::types::{ApiError, AppState};
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};

/// Query pairs in request order, percent-decoded.
pub fn query_pairs(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

pub fn accept(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::ACCEPT).and_then(|v| v.to_str().ok())
}

#[utoipa::path(
    get,
    path = "/v1/consulta/{metodo}",
    params(
        ("metodo" = String, Path, description = "Query method, optionally suffixed with a format (e.g. municipios.json)"),
        ("offset" = Option<u64>, Query, description = "Window offset; every method-specific filter is also accepted")
    ),
    responses(
        (status = 200, description = "One page of results in the requested format"),
        (status = 302, description = "Format negotiated from the Accept header"),
        (status = 304, description = "Not modified"),
        (status = 400, description = "Invalid, unknown or missing parameter"),
        (status = 404, description = "Unknown method or format")
    )
)]
pub async fn consulta_handler(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> Response {
    match consulta(&state, &segment, raw_query.as_deref(), &headers).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn consulta(
    state: &AppState,
    segment: &str,
    raw_query: Option<&str>,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let service = &state.service;
    let (slug, format) = split_suffix(segment)?;
    let Some(format) = format else {
        if service.methods().get(slug).is_none() {
            return Err(ApiError::NotFound(format!("Método não suportado: {}", slug)));
        }
        let resolver = Resolver::new(service.catalog(), service.links());
        return Ok(redirect_response(resolver.method(slug, raw_query, accept(headers))));
    };

    let mut current_url = service
        .links()
        .absolute(&format!("v{}/consulta/{}", API_VERSION, segment));
    if let Some(q) = raw_query.filter(|q| !q.is_empty()) {
        current_url.push('?');
        current_url.push_str(q);
    }
    let request = ListRequest {
        slug: slug.to_string(),
        format,
        query: query_pairs(raw_query),
        current_url: Some(current_url),
    };
    let payload = service.list(&request).await?;
    Ok(payload_response(headers, payload, state.cache_refresh_hour))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_pairs_keep_order_and_repeats() {
        let pairs = query_pairs(Some("uf=SP&nome=s%C3%A3o+paulo&uf=RJ"));
        assert_eq!(
            pairs,
            vec![
                ("uf".to_string(), "SP".to_string()),
                ("nome".to_string(), "são paulo".to_string()),
                ("uf".to_string(), "RJ".to_string()),
            ]
        );
        assert!(query_pairs(None).is_empty());
    }
}
