use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use stockroom_auth::Credentials;

use crate::app::dto::UserView;
use crate::app::errors::{self, ServiceError};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;
use crate::middleware::CookieSettings;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(cookies): Extension<CookieSettings>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Response {
    let Json(credentials) = match body {
        Ok(b) => b,
        Err(rej) => return errors::body_rejection(rej),
    };

    let session = match services.register(&credentials, Utc::now()).await {
        Ok(s) => s,
        Err(e) => return e.into_response(),
    };

    let message = if session.user.is_admin {
        "Account created as admin (first user)"
    } else {
        "Account created successfully"
    };
    let response = errors::ok(json!({
        "user": UserView::from(&session.user),
        "message": message,
    }));
    with_cookie(response, cookies.session(&session.token, services.session_ttl()))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(cookies): Extension<CookieSettings>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Response {
    let Json(credentials) = match body {
        Ok(b) => b,
        Err(rej) => return errors::body_rejection(rej),
    };

    let session = match services.login(&credentials, Utc::now()).await {
        Ok(s) => s,
        Err(e) => return e.into_response(),
    };

    tracing::info!(username = %session.user.username, "login");
    let response = errors::ok(json!({ "user": UserView::from(&session.user) }));
    with_cookie(response, cookies.session(&session.token, services.session_ttl()))
}

pub async fn logout(Extension(cookies): Extension<CookieSettings>) -> Response {
    let response = errors::ok(json!({ "message": "Logged out successfully" }));
    with_cookie(response, cookies.cleared())
}

pub async fn me(Extension(principal): Extension<PrincipalContext>) -> Response {
    let p = principal.principal();
    errors::ok(json!({
        "user": {
            "id": p.user_id,
            "username": p.username,
            "isAdmin": p.is_admin,
        }
    }))
}

fn with_cookie(mut response: Response, cookie: Option<HeaderValue>) -> Response {
    match cookie {
        Some(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
            response
        }
        None => ServiceError::Internal("session cookie is not a valid header value".into())
            .into_response(),
    }
}
