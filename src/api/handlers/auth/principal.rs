//! Typed view of the session resolved by the access-control gate.
//!
//! The gate stores a [`CurrentAdmin`] in request extensions for every request.
//! Handlers that need a logged-in administrator take [`AuthenticatedAdmin`],
//! which rejects with `401` when the request is anonymous.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use super::types::AuthAdmin;

/// Session owner resolved for this request, if any.
#[derive(Clone, Debug, Default)]
pub struct CurrentAdmin(pub Option<AuthAdmin>);

impl CurrentAdmin {
    #[must_use]
    pub fn admin(&self) -> Option<&AuthAdmin> {
        self.0.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

/// Guard: the request carries a valid admin session.
#[derive(Clone, Debug)]
pub struct AuthenticatedAdmin(pub AuthAdmin);

/// Resolve the current admin or fail with `401`.
///
/// # Errors
/// Returns `StatusCode::UNAUTHORIZED` when no session was resolved.
pub fn require_auth(current: &CurrentAdmin) -> Result<AuthenticatedAdmin, StatusCode> {
    current
        .admin()
        .cloned()
        .map(AuthenticatedAdmin)
        .ok_or(StatusCode::UNAUTHORIZED)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedAdmin
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentAdmin>()
            .map_or(Err(StatusCode::UNAUTHORIZED), require_auth)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentAdmin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentAdmin>()
            .cloned()
            .unwrap_or_default())
    }
}
