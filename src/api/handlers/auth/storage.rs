//! Credential and session persistence.
//!
//! The auth service talks to storage only through [`AdminStore`] and
//! [`SessionStore`]; [`PgStore`] implements both on top of `PostgreSQL`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::{Admin, SessionRecord};
use super::utils::is_unique_violation;

/// Outcome when inserting a row guarded by unique constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    Conflict,
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>>;

    async fn insert_admin(&self, admin: &Admin) -> Result<InsertOutcome>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: &SessionRecord) -> Result<InsertOutcome>;

    /// Return the session and its owner regardless of expiry; callers decide.
    async fn find_session(&self, token_hash: &[u8]) -> Result<Option<(SessionRecord, Admin)>>;

    /// Returns whether a row was removed.
    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool>;

    async fn delete_admin_sessions(&self, admin_id: Uuid) -> Result<u64>;

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn admin_from_row(row: &PgRow) -> Admin {
    Admin {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl AdminStore for PgStore {
    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let query = r"
            SELECT id, username, email, password_hash, first_name, last_name,
                   is_active, created_at, updated_at
            FROM admins
            WHERE username = $1
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup admin by username")?;

        Ok(row.as_ref().map(admin_from_row))
    }

    async fn insert_admin(&self, admin: &Admin) -> Result<InsertOutcome> {
        let query = r"
            INSERT INTO admins
                (id, username, email, password_hash, first_name, last_name,
                 is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(admin.id)
            .bind(&admin.username)
            .bind(&admin.email)
            .bind(&admin.password_hash)
            .bind(&admin.first_name)
            .bind(&admin.last_name)
            .bind(admin.is_active)
            .bind(admin.created_at)
            .bind(admin.updated_at)
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert admin"),
        }
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, session: &SessionRecord) -> Result<InsertOutcome> {
        let query = r"
            INSERT INTO admin_sessions (session_hash, admin_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(&session.token_hash)
            .bind(session.admin_id)
            .bind(session.expires_at)
            .bind(session.created_at)
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert session"),
        }
    }

    async fn find_session(&self, token_hash: &[u8]) -> Result<Option<(SessionRecord, Admin)>> {
        let query = r"
            SELECT admin_sessions.session_hash,
                   admin_sessions.expires_at AS session_expires_at,
                   admin_sessions.created_at AS session_created_at,
                   admins.id, admins.username, admins.email, admins.password_hash,
                   admins.first_name, admins.last_name, admins.is_active,
                   admins.created_at, admins.updated_at
            FROM admin_sessions
            JOIN admins ON admins.id = admin_sessions.admin_id
            WHERE admin_sessions.session_hash = $1
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session")?;

        Ok(row.map(|row| {
            let admin = admin_from_row(&row);
            let session = SessionRecord {
                token_hash: row.get("session_hash"),
                admin_id: admin.id,
                expires_at: row.get("session_expires_at"),
                created_at: row.get("session_created_at"),
            };
            (session, admin)
        }))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool> {
        let query = "DELETE FROM admin_sessions WHERE session_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_admin_sessions(&self, admin_id: Uuid) -> Result<u64> {
        let query = "DELETE FROM admin_sessions WHERE admin_id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(admin_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete admin sessions")?;
        Ok(result.rows_affected())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let query = "DELETE FROM admin_sessions WHERE expires_at < $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(now)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete expired sessions")?;
        Ok(result.rows_affected())
    }
}
