//! HTTP surface: router, middleware stack and server bootstrap.

use crate::api::handlers::{admin, auth, health};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod gate;
pub mod handlers;
mod openapi;
pub mod security;
pub mod sweeper;

pub use openapi::openapi;

/// Application routes with the gate and security headers applied.
///
/// `/health` additionally needs an `Extension<PgPool>`, added by [`new`].
pub fn router(auth_state: Arc<auth::AuthState>) -> Router {
    Router::new()
        .route("/health", get(health::health).head(health::health))
        .route("/api/auth/admin/login", post(auth::login::login))
        .route("/api/auth/admin/logout", post(auth::session::logout))
        .route("/api/auth/admin/session", get(auth::session::session))
        .route("/admin", get(admin::index))
        .route(gate::LOGIN_PATH, get(admin::login_page))
        .route(gate::DASHBOARD_PATH, get(admin::dashboard))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi()))
        .layer(middleware::from_fn(gate::gate))
        .layer(middleware::from_fn(security::security_headers))
        .layer(Extension(auth_state))
}

/// Open the connection pool used by the server and the provisioning command.
///
/// # Errors
/// Returns an error if the database is unreachable.
pub async fn connect(dsn: &SecretString) -> Result<PgPool> {
    PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn.expose_secret())
        .await
        .context("Failed to connect to database")
}

/// Start the server.
///
/// # Errors
/// Returns an error if the database is unreachable or the listener fails.
pub async fn new(port: u16, dsn: &SecretString, auth_config: auth::AuthConfig) -> Result<()> {
    let pool = connect(dsn).await?;

    let store = Arc::new(auth::PgStore::new(pool.clone()));
    let sweep_interval = Duration::from_secs(auth_config.session_sweep_seconds());
    let auth_state = Arc::new(auth::AuthState::from_config(
        auth_config,
        store.clone(),
        store,
        Arc::new(auth::SystemClock),
    ));

    if sweeper::spawn_session_sweeper(auth_state.clone(), sweep_interval).is_some() {
        info!("Session sweep every {}s", sweep_interval.as_secs());
    }

    let app = router(auth_state).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(pool)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
