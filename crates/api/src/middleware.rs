use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use stockroom_core::DomainError;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "auth-token";

#[derive(Clone)]
pub struct AuthState {
    pub services: Arc<AppServices>,
}

/// Session cookie attributes shared by login, register and logout.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
}

impl CookieSettings {
    /// `Set-Cookie` value carrying a fresh session token.
    pub fn session(&self, token: &str, max_age: chrono::Duration) -> Option<HeaderValue> {
        self.header(token, max_age.num_seconds().max(0))
    }

    /// `Set-Cookie` value that clears the session.
    pub fn cleared(&self) -> Option<HeaderValue> {
        self.header("", 0)
    }

    fn header(&self, value: &str, max_age_secs: i64) -> Option<HeaderValue> {
        let secure = if self.secure { "; Secure" } else { "" };
        let cookie = format!(
            "{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}{secure}"
        );
        HeaderValue::from_str(&cookie).ok()
    }
}

/// Authenticate from the session cookie (or a Bearer token) and attach the
/// current user as [`PrincipalContext`].
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_token(req.headers()) else {
        return errors::domain_error_to_response(DomainError::unauthorized("Unauthorized"));
    };

    let user = match state.services.authenticate(&token, Utc::now()).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    req.extensions_mut().insert(PrincipalContext::from_user(&user));
    next.run(req).await
}

/// One log line per request.
pub async fn trace_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

/// Session cookie first, then `Authorization: Bearer`.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    cookie_token(headers).or_else(|| bearer_token(headers))
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn reads_the_session_cookie_among_others() {
        let h = headers(&[(header::COOKIE, "theme=dark; auth-token=abc.def.ghi; lang=en")]);
        assert_eq!(extract_token(&h).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn falls_back_to_bearer() {
        let h = headers(&[
            (header::COOKIE, "auth-token="),
            (header::AUTHORIZATION, "Bearer tok"),
        ]);
        assert_eq!(extract_token(&h).as_deref(), Some("tok"));

        let h = headers(&[(header::AUTHORIZATION, "Basic abc")]);
        assert_eq!(extract_token(&h), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn cookie_attributes() {
        let plain = CookieSettings { secure: false }
            .session("tok", chrono::Duration::hours(1))
            .unwrap();
        assert_eq!(
            plain.to_str().unwrap(),
            "auth-token=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=3600"
        );

        let cleared = CookieSettings { secure: true }.cleared().unwrap();
        assert_eq!(
            cleared.to_str().unwrap(),
            "auth-token=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0; Secure"
        );
    }
}
