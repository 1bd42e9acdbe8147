//! Admin area pages. Rendering is out of scope; these stand in for the
//! server-rendered views and exist so the gate has something to protect.

use axum::{
    http::{header::LOCATION, StatusCode},
    response::{Html, IntoResponse},
    Json,
};

use super::auth::{AuthAdmin, AuthenticatedAdmin};
use crate::api::gate::DASHBOARD_PATH;

/// `/admin` has no page of its own.
pub async fn index() -> impl IntoResponse {
    (StatusCode::FOUND, [(LOCATION, DASHBOARD_PATH)])
}

pub async fn login_page() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Admin login</title></head>\
         <body><h1>Admin login</h1></body></html>",
    )
}

#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses(
        (status = 200, description = "Administrator behind the current session", body = AuthAdmin),
        (status = 302, description = "No session, redirected to the login page")
    ),
    tag = "admin"
)]
pub async fn dashboard(AuthenticatedAdmin(admin): AuthenticatedAdmin) -> Json<AuthAdmin> {
    Json(admin)
}
