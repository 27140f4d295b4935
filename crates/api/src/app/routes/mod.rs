use std::str::FromStr;

use axum::{
    Router,
    response::Response,
    routing::{get, post},
};

use stockroom_core::DomainError;

use crate::app::errors;

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod inventory;
pub mod system;

/// Endpoints reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
}

/// Endpoints that require an authenticated user (owner-scoped).
pub fn protected_router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .merge(inventory::router())
        .merge(catalog::router())
        .nest("/admin", admin::router())
}

/// Parse a path identifier, answering 400 `invalid_id` on failure.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(errors::domain_error_to_response)
}
