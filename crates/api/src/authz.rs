//! API-side authorization guards.
//!
//! Route groups that need more than an authenticated user are wrapped here,
//! before any handler runs.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};

use stockroom_core::DomainError;

use crate::app::errors;
use crate::context::PrincipalContext;

/// Admin-only routes. Must run inside the auth middleware.
pub async fn require_admin(
    Extension(principal): Extension<PrincipalContext>,
    req: Request,
    next: Next,
) -> Response {
    if let Err(e) = stockroom_auth::require_admin(principal.principal()) {
        tracing::warn!(username = %principal.principal().username, "admin route denied");
        return errors::domain_error_to_response(DomainError::from(e));
    }
    next.run(req).await
}
