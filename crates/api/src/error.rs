//! API error types with HTTP response mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, HandlerResponse};

/// API-level error type that maps to HTTP responses.
///
/// Every error renders as a failed [`HandlerResponse`].
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(Vec<String>),
    /// Inventory operation error.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, messages) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, vec![msg]),
            ApiError::BadRequest(reasons) => (StatusCode::BAD_REQUEST, reasons),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        let body: HandlerResponse<()> = HandlerResponse::failure(messages);
        (status, Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, Vec<String>) {
    let status = match &err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) | DomainError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::ConcurrencyExhausted { .. } => StatusCode::CONFLICT,
        DomainError::DataAccess(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::Catalogue(_) => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "inventory operation failed");
    }

    let response: HandlerResponse<()> = Err(err).into();
    (status, response.message)
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::info!(error = %rejection, "rejected request body");
        ApiError::BadRequest(vec![rejection.body_text()])
    }
}
