//! User administration. Every route here sits behind `authz::require_admin`.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::json;

use stockroom_core::UserId;

use crate::app::dto::{AdminUserView, UserView};
use crate::app::errors;
use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", delete(delete_user))
        .route("/users/:id/toggle-admin", post(toggle_admin))
        .route_layer(middleware::from_fn(authz::require_admin))
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.list_users_with_item_counts().await {
        Ok(rows) => {
            let users: Vec<AdminUserView> = rows
                .iter()
                .map(|(user, count)| AdminUserView::new(user, *count))
                .collect();
            errors::ok(json!({ "users": users }))
        }
        Err(e) => e.into_response(),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: UserId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_user(principal.principal(), id).await {
        Ok(()) => errors::ok(json!({
            "message": "User and all associated data deleted successfully"
        })),
        Err(e) => e.into_response(),
    }
}

pub async fn toggle_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: UserId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.toggle_admin(principal.principal(), id).await {
        Ok(user) => {
            let verb = if user.is_admin { "promoted to" } else { "demoted from" };
            errors::ok(json!({
                "user": UserView::from(&user),
                "message": format!("User {verb} admin"),
            }))
        }
        Err(e) => e.into_response(),
    }
}
