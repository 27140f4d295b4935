use axum::{Json, http::StatusCode, response::IntoResponse};

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// JSON 404 for unknown paths.
pub async fn not_found() -> axum::response::Response {
    crate::app::errors::json_error(StatusCode::NOT_FOUND, "not_found", "Not found")
}
