//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store wiring and use cases
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON views
//! - `errors.rs`: response envelope and error mapping

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::middleware::{self, AuthState, CookieSettings};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(router(
        services,
        CookieSettings {
            secure: config.cookie_secure,
        },
    ))
}

/// Assemble routes and middleware around already-built services.
pub fn router(services: Arc<AppServices>, cookies: CookieSettings) -> Router {
    let auth_state = AuthState {
        services: Arc::clone(&services),
    };

    // Protected routes: require a valid session for a user that still exists.
    let protected = routes::protected_router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .fallback(routes::system::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::trace_requests))
                .layer(Extension(services))
                .layer(Extension(cookies)),
        )
}
