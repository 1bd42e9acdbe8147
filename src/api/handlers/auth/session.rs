//! Session cookie handling and the logout/session endpoints.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::error;

use super::{
    principal::CurrentAdmin,
    state::{AuthConfig, AuthState},
    types::{AuthAdmin, ErrorResponse, MessageResponse},
};

pub const SESSION_COOKIE_NAME: &str = "admin-session";

#[utoipa::path(
    get,
    path = "/api/auth/admin/session",
    responses(
        (status = 200, description = "Session is active", body = AuthAdmin),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(current: CurrentAdmin) -> impl IntoResponse {
    match current.0 {
        Some(admin) => (StatusCode::OK, Json(admin)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/admin/logout",
    responses(
        (status = 200, description = "Session cleared", body = MessageResponse),
        (status = 500, description = "Session could not be deleted", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        if let Err(err) = auth_state.service().logout(&token).await {
            error!("Admin logout error: {err:#}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Internal server error".to_string(),
                }),
            )
                .into_response();
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (
        StatusCode::OK,
        response_headers,
        Json(MessageResponse {
            message: "Logout successful".to_string(),
        }),
    )
        .into_response()
}

/// Build the `HttpOnly` session cookie, expiring with the session itself.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let expires = expires_at.format("%a, %d %b %Y %H:%M:%S GMT");
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Expires={expires}");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Read the session token from the `Cookie` header(s).
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == SESSION_COOKIE_NAME).then(|| val.trim().to_string())
        })
        .filter(|token| !token.is_empty())
}
