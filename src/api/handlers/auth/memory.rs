//! In-process store used by tests and local experiments.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::storage::{AdminStore, InsertOutcome, SessionStore};
use super::types::{Admin, SessionRecord};

#[derive(Debug, Default)]
struct Tables {
    admins: HashMap<Uuid, Admin>,
    sessions: HashMap<Vec<u8>, SessionRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the active flag of an administrator; returns whether it existed.
    pub async fn set_admin_active(&self, admin_id: Uuid, is_active: bool) -> bool {
        let mut tables = self.tables.lock().await;
        match tables.admins.get_mut(&admin_id) {
            Some(admin) => {
                admin.is_active = is_active;
                true
            }
            None => false,
        }
    }

    /// Raw session row lookup, bypassing expiry checks.
    pub async fn session_row(&self, token_hash: &[u8]) -> Option<SessionRecord> {
        self.tables.lock().await.sessions.get(token_hash).cloned()
    }

    /// Overwrite the expiry of a stored session; returns whether it existed.
    pub async fn set_session_expiry(&self, token_hash: &[u8], expires_at: DateTime<Utc>) -> bool {
        let mut tables = self.tables.lock().await;
        match tables.sessions.get_mut(token_hash) {
            Some(session) => {
                session.expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.tables.lock().await.sessions.len()
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .admins
            .values()
            .find(|admin| admin.username == username)
            .cloned())
    }

    async fn insert_admin(&self, admin: &Admin) -> Result<InsertOutcome> {
        let mut tables = self.tables.lock().await;
        let taken = tables.admins.values().any(|existing| {
            existing.id == admin.id
                || existing.username == admin.username
                || existing.email == admin.email
        });
        if taken {
            return Ok(InsertOutcome::Conflict);
        }
        tables.admins.insert(admin.id, admin.clone());
        Ok(InsertOutcome::Created)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: &SessionRecord) -> Result<InsertOutcome> {
        let mut tables = self.tables.lock().await;
        if tables.sessions.contains_key(&session.token_hash) {
            return Ok(InsertOutcome::Conflict);
        }
        tables
            .sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(InsertOutcome::Created)
    }

    async fn find_session(&self, token_hash: &[u8]) -> Result<Option<(SessionRecord, Admin)>> {
        let tables = self.tables.lock().await;
        Ok(tables.sessions.get(token_hash).and_then(|session| {
            tables
                .admins
                .get(&session.admin_id)
                .map(|admin| (session.clone(), admin.clone()))
        }))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .sessions
            .remove(token_hash)
            .is_some())
    }

    async fn delete_admin_sessions(&self, admin_id: Uuid) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.sessions.len();
        tables
            .sessions
            .retain(|_, session| session.admin_id != admin_id);
        Ok(u64::try_from(before - tables.sessions.len()).unwrap_or(u64::MAX))
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, session| session.expires_at >= now);
        Ok(u64::try_from(before - tables.sessions.len()).unwrap_or(u64::MAX))
    }
}
