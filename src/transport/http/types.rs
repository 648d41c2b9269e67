use crate::app::query_service::{QueryService, ServiceError};
use crate::domain::linked_data::LinkedDataError;
use crate::domain::query::QueryError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use quick_xml::escape::escape;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QueryService>,
    /// Local hour of the nightly refresh; responses expire then.
    pub cache_refresh_hour: u32,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error responses: small HTML documents with the status and a message.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m) | ApiError::NotFound(m) | ApiError::Internal(m) => m,
        }
    }
}

impl From<LinkedDataError> for ApiError {
    fn from(e: LinkedDataError) -> Self {
        ApiError::NotFound(e.to_string())
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Query(q) => q.into(),
            ServiceError::LinkedData(l) => l.into(),
            ServiceError::UnknownMethod(_) | ServiceError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            ServiceError::Store(_) | ServiceError::Aggregator(_) | ServiceError::Catalog(_) => {
                tracing::error!(error = %e, "request failed");
                ApiError::Internal("Erro interno do servidor.".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            tracing::info!(status = status.as_u16(), message = self.message(), "client error");
        }
        let body = format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{code}</title></head>\
             <body><h1>{code} {reason}</h1><p>{message}</p></body></html>\n",
            code = status.as_u16(),
            reason = status.canonical_reason().unwrap_or(""),
            message = escape(self.message()),
        );
        (status, [(header::CONTENT_TYPE, "text/html; charset=utf-8")], body).into_response()
    }
}
