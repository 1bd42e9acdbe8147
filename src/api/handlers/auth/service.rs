//! Admin authentication service: credentials, sessions and throttling.
//!
//! Flow Overview:
//! 1) Validate login input locally.
//! 2) Register the attempt with the rate limiter (limited attempts stop here).
//! 3) Look up the administrator and verify the Argon2 hash off the reactor.
//! 4) On success reset the limiter and issue a session whose token is only
//!    stored as a SHA-256 digest.
//!
//! Expired sessions are deleted the next time they are presented.

use anyhow::{anyhow, Context};
use chrono::Duration;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::{future::Future, sync::Arc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::password::{self, PasswordError};
use super::rate_limit::{RateLimitDecision, RateLimiter};
use super::storage::{AdminStore, InsertOutcome, SessionStore};
use super::types::{Admin, AuthAdmin, AuthSession, NewAdmin, SessionRecord};
use super::utils::{generate_session_token, hash_session_token, validate_login_input};

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
/// Ten years; longer lifetimes are refused at configuration time.
pub const MAX_SESSION_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;
pub const DEFAULT_STORE_TIMEOUT_SECONDS: u64 = 5;
const SESSION_INSERT_RETRIES: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Why a login was refused. Only ever logged; clients see one generic answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginFailure {
    RateLimited,
    UnknownAdmin,
    Inactive,
    InvalidPassword,
}

#[derive(Clone, Debug)]
pub struct LoginSuccess {
    pub admin: AuthAdmin,
    pub session: AuthSession,
}

#[derive(Clone, Debug)]
pub enum ProvisionOutcome {
    Created(AuthAdmin),
    Exists,
}

pub struct AuthService {
    admins: Arc<dyn AdminStore>,
    sessions: Arc<dyn SessionStore>,
    rate_limiter: Arc<dyn RateLimiter>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
    store_timeout: std::time::Duration,
}

impl AuthService {
    pub fn new(
        admins: Arc<dyn AdminStore>,
        sessions: Arc<dyn SessionStore>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            admins,
            sessions,
            rate_limiter,
            clock: Arc::new(SystemClock),
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECONDS),
            store_timeout: std::time::Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_store_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Hash a password on the blocking pool.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if hashing fails or the task panics.
    pub async fn hash_password(plaintext: &SecretString) -> Result<String, AuthError> {
        let plaintext = SecretString::from(plaintext.expose_secret().to_string());
        tokio::task::spawn_blocking(move || password::hash_password(plaintext.expose_secret()))
            .await
            .context("password hashing task failed")?
            .map_err(|err| AuthError::Internal(err.into()))
    }

    /// Verify a password against a stored hash on the blocking pool.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the hash is malformed or the task panics.
    pub async fn verify_password(hash: &str, plaintext: &SecretString) -> Result<bool, AuthError> {
        let hash = hash.to_string();
        let plaintext = SecretString::from(plaintext.expose_secret().to_string());
        tokio::task::spawn_blocking(move || {
            password::verify_password(&hash, plaintext.expose_secret())
        })
        .await
        .context("password verification task failed")?
        .map_err(|err: PasswordError| AuthError::Internal(err.into()))
    }

    /// Authenticate an administrator and open a session.
    ///
    /// Returns `Ok(None)` for every authentication failure, including lockout.
    ///
    /// # Errors
    /// `AuthError::Validation` for malformed input, `AuthError::Internal` for
    /// storage or hashing failures.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        identifier: &str,
        password: &SecretString,
    ) -> Result<Option<LoginSuccess>, AuthError> {
        let username = validate_login_input(identifier, password.expose_secret())
            .map_err(AuthError::Validation)?;

        match self.attempt_login(username, password).await? {
            Ok(admin) => {
                self.rate_limiter.reset(username);
                let session = self.create_session(admin.id).await?;
                info!(admin_id = %admin.id, "admin logged in");
                Ok(Some(LoginSuccess {
                    admin: admin.into(),
                    session,
                }))
            }
            Err(reason) => {
                warn!(username, ?reason, "admin login refused");
                Ok(None)
            }
        }
    }

    async fn attempt_login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Result<Admin, LoginFailure>, AuthError> {
        if self.rate_limiter.register_attempt(username) == RateLimitDecision::Limited {
            return Ok(Err(LoginFailure::RateLimited));
        }

        let Some(admin) = self
            .timed(self.admins.find_admin_by_username(username))
            .await?
        else {
            return Ok(Err(LoginFailure::UnknownAdmin));
        };

        if !admin.is_active {
            return Ok(Err(LoginFailure::Inactive));
        }

        if !Self::verify_password(&admin.password_hash, password).await? {
            return Ok(Err(LoginFailure::InvalidPassword));
        }

        Ok(Ok(admin))
    }

    /// Issue a new session for `admin_id`, retrying on token collisions.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the session cannot be stored.
    pub async fn create_session(&self, admin_id: Uuid) -> Result<AuthSession, AuthError> {
        for _ in 0..SESSION_INSERT_RETRIES {
            let token = generate_session_token()?;
            let created_at = self.clock.now();
            let expires_at = created_at
                .checked_add_signed(self.session_ttl)
                .context("session expiry out of range")?;
            let record = SessionRecord {
                token_hash: hash_session_token(&token),
                admin_id,
                expires_at,
                created_at,
            };

            match self.timed(self.sessions.insert_session(&record)).await? {
                InsertOutcome::Created => {
                    return Ok(AuthSession {
                        token,
                        admin_id,
                        expires_at: record.expires_at,
                    });
                }
                InsertOutcome::Conflict => debug!("session token collision, retrying"),
            }
        }

        Err(AuthError::Internal(anyhow!(
            "failed to generate unique session token"
        )))
    }

    /// Resolve a session token into its owner.
    ///
    /// Expired sessions are deleted on sight and resolve to `None`, as do
    /// sessions whose owner has been deactivated.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the session lookup fails.
    #[instrument(skip_all)]
    pub async fn validate_session(&self, token: &str) -> Result<Option<AuthAdmin>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }

        let token_hash = hash_session_token(token);
        let Some((session, admin)) = self.timed(self.sessions.find_session(&token_hash)).await?
        else {
            return Ok(None);
        };

        if session.expires_at < self.clock.now() {
            debug!(admin_id = %session.admin_id, "session expired");
            if let Err(err) = self.timed(self.sessions.delete_session(&token_hash)).await {
                warn!("Failed to delete expired session: {err}");
            }
            return Ok(None);
        }

        if !admin.is_active {
            debug!(admin_id = %admin.id, "session owner is inactive");
            return Ok(None);
        }

        Ok(Some(admin.into()))
    }

    /// Remove a session. Idempotent; reports whether a record existed.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the delete fails.
    #[instrument(skip_all)]
    pub async fn delete_session(&self, token: &str) -> Result<bool, AuthError> {
        let token_hash = hash_session_token(token);
        self.timed(self.sessions.delete_session(&token_hash)).await
    }

    /// Alias of [`Self::delete_session`].
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the delete fails.
    pub async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        self.delete_session(token).await
    }

    /// Revoke every session owned by `admin_id`.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete_all_admin_sessions(&self, admin_id: Uuid) -> Result<u64, AuthError> {
        self.timed(self.sessions.delete_admin_sessions(admin_id)).await
    }

    /// Purge sessions that expired before now.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the delete fails.
    #[instrument(skip(self))]
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, AuthError> {
        let now = self.clock.now();
        self.timed(self.sessions.delete_expired_sessions(now)).await
    }

    /// Provision a new administrator.
    ///
    /// # Errors
    /// `AuthError::Validation` for malformed input, `AuthError::Internal` for
    /// storage or hashing failures.
    #[instrument(skip(self, new_admin), fields(username = %new_admin.username))]
    pub async fn create_admin(&self, new_admin: NewAdmin) -> Result<ProvisionOutcome, AuthError> {
        let username =
            validate_login_input(&new_admin.username, new_admin.password.expose_secret())
                .map_err(AuthError::Validation)?
                .to_string();
        let email = new_admin.email.trim().to_lowercase();
        if !valid_email(&email) {
            return Err(AuthError::Validation("Invalid email address"));
        }

        if self
            .timed(self.admins.find_admin_by_username(&username))
            .await?
            .is_some()
        {
            return Ok(ProvisionOutcome::Exists);
        }

        let password_hash = Self::hash_password(&new_admin.password).await?;
        let now = self.clock.now();
        let admin = Admin {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            first_name: new_admin.first_name,
            last_name: new_admin.last_name,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        match self.timed(self.admins.insert_admin(&admin)).await? {
            InsertOutcome::Created => {
                info!(admin_id = %admin.id, "admin created");
                Ok(ProvisionOutcome::Created(admin.into()))
            }
            InsertOutcome::Conflict => Ok(ProvisionOutcome::Exists),
        }
    }

    async fn timed<T, F>(&self, operation: F) -> Result<T, AuthError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.store_timeout, operation).await {
            Ok(result) => result.map_err(AuthError::Internal),
            Err(_) => Err(AuthError::Internal(anyhow!(
                "store operation timed out after {:?}",
                self.store_timeout
            ))),
        }
    }
}

/// Basic email format check on already-normalized input.
fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}
