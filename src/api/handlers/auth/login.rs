//! Admin login endpoint.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::error;

use super::service::AuthError;
use super::session::session_cookie;
use super::state::AuthState;
use super::types::{ErrorResponse, LoginRequest, LoginResponse};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[utoipa::path(
    post,
    path = "/api/auth/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created", body = LoginResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid credentials or locked out", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error_response(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let username = request.username.unwrap_or_default();
    let password = SecretString::from(request.password.unwrap_or_default());

    let success = match auth_state.service().login(&username, &password).await {
        Ok(Some(success)) => success,
        Ok(None) => return error_response(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS),
        Err(AuthError::Validation(message)) => {
            return error_response(StatusCode::BAD_REQUEST, message)
        }
        Err(AuthError::Internal(err)) => {
            error!("Admin login error: {err:#}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let cookie = match session_cookie(
        auth_state.config(),
        &success.session.token,
        success.session.expires_at,
    ) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    (
        StatusCode::OK,
        headers,
        Json(LoginResponse {
            admin: success.admin,
            message: "Login successful".to_string(),
        }),
    )
        .into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
