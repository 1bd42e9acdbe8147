//! Access-control gate for the admin area.
//!
//! Runs once per request before routing. It resolves the session cookie into a
//! [`CurrentAdmin`] stored in request extensions, then decides whether the
//! request may reach its handler:
//!
//! | path            | anonymous                         | authenticated        |
//! |-----------------|-----------------------------------|----------------------|
//! | `/admin/login`  | pass                              | `302 /admin/dashboard` |
//! | other `/admin*` | `302 /admin/login?redirectTo=...` | pass                 |
//! | anything else   | pass                              | pass                 |
//!
//! A presented cookie that does not resolve (expired, unknown or a store
//! failure) is cleared on the way out.

use axum::{
    extract::{Extension, Request},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;
use tracing::{debug, warn};

use super::handlers::auth::{
    session::{clear_session_cookie, extract_session_token},
    AuthState, CurrentAdmin,
};

pub const ADMIN_PREFIX: &str = "/admin";
pub const LOGIN_PATH: &str = "/admin/login";
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

/// Characters left as-is by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    RedirectToLogin { redirect_to: String },
    RedirectToDashboard,
}

/// `/admin` itself and everything below it; `/administrator` is not admin.
#[must_use]
pub fn is_admin_path(path: &str) -> bool {
    path.strip_prefix(ADMIN_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[must_use]
pub fn decide(path: &str, authenticated: bool) -> GateDecision {
    if !is_admin_path(path) {
        return GateDecision::Pass;
    }

    if path == LOGIN_PATH {
        return if authenticated {
            GateDecision::RedirectToDashboard
        } else {
            GateDecision::Pass
        };
    }

    if authenticated {
        GateDecision::Pass
    } else {
        GateDecision::RedirectToLogin {
            redirect_to: path.to_string(),
        }
    }
}

/// Login URL carrying the originally requested path.
#[must_use]
pub fn login_location(redirect_to: &str) -> String {
    let encoded = utf8_percent_encode(redirect_to, URI_COMPONENT);
    format!("{LOGIN_PATH}?redirectTo={encoded}")
}

pub async fn gate(
    Extension(auth_state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut clear_cookie = false;
    let current = match extract_session_token(request.headers()) {
        None => CurrentAdmin::default(),
        Some(token) => match auth_state.service().validate_session(&token).await {
            Ok(Some(admin)) => CurrentAdmin(Some(admin)),
            Ok(None) => {
                debug!("presented session did not resolve");
                clear_cookie = true;
                CurrentAdmin::default()
            }
            Err(err) => {
                warn!("Session validation failed: {err:#}");
                clear_cookie = true;
                CurrentAdmin::default()
            }
        },
    };

    let decision = decide(request.uri().path(), current.is_authenticated());
    let mut response = match decision {
        GateDecision::Pass => {
            request.extensions_mut().insert(current);
            next.run(request).await
        }
        GateDecision::RedirectToLogin { redirect_to } => redirect(&login_location(&redirect_to)),
        GateDecision::RedirectToDashboard => redirect(DASHBOARD_PATH),
    };

    // A handler that already set the cookie (login, logout) wins.
    if clear_cookie && !response.headers().contains_key(SET_COOKIE) {
        if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
    }

    response
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(err) => {
            warn!("Invalid redirect location {location:?}: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
