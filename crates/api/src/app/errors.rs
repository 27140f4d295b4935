use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use stockroom_auth::{PasswordError, TokenError};
use stockroom_core::DomainError;
use stockroom_infra::StoreError;

/// Failure of an application use case.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage failure: {0}")]
    Store(StoreError),

    #[error("internal failure: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => DomainError::not_found("Record not found").into(),
            StoreError::Duplicate => DomainError::conflict("Record already exists").into(),
            StoreError::VersionConflict { .. } => DomainError::conflict(
                "Item was modified by another request; reload and try again",
            )
            .into(),
            StoreError::Backend(_) => ServiceError::Store(err),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Domain(err) => domain_error_to_response(err),
            ServiceError::Store(err) => {
                tracing::error!(error = %err, "store operation failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "Internal server error")
            }
            ServiceError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error")
            }
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    let status = match &err {
        DomainError::Validation(_) | DomainError::InvalidId(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
    };
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": message.into(),
            "code": code,
        })),
    )
        .into_response()
}

/// Malformed or non-JSON request bodies.
pub fn body_rejection(rejection: JsonRejection) -> Response {
    tracing::debug!(error = %rejection, "rejected request body");
    json_error(rejection.status(), "invalid_body", "Invalid request body")
}

/// `{"success": true, "data": ...}` with 200.
pub fn ok<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        axum::Json(json!({
            "success": true,
            "data": data,
        })),
    )
        .into_response()
}

/// Same envelope with 201.
pub fn created<T: Serialize>(data: T) -> Response {
    let mut response = ok(data);
    *response.status_mut() = StatusCode::CREATED;
    response
}
