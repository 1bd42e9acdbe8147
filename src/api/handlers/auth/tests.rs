//! Auth module tests.

use super::clock::{Clock, ManualClock};
use super::memory::MemoryStore;
use super::rate_limit::NoopRateLimiter;
use super::service::{AuthError, AuthService, ProvisionOutcome};
use super::state::{AuthConfig, AuthState, Environment};
use super::storage::{AdminStore, InsertOutcome, SessionStore};
use super::types::{Admin, NewAdmin, SessionRecord};
use super::utils::hash_session_token;
use anyhow::{Context, Result};
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Algorithm, Argon2, Params, Version,
};
use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::OsRng;
use secrecy::SecretString;
use std::sync::Arc;
use uuid::Uuid;

pub(crate) struct Fixture {
    pub state: Arc<AuthState>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub admin_id: Uuid,
}

/// Argon2id with minimal cost; verification reads parameters from the hash.
pub(crate) fn cheap_hash(password: &str) -> String {
    let params = Params::new(8, 1, 1, None).unwrap();
    let salt = SaltString::generate(&mut OsRng);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

pub(crate) async fn fixture(username: &str, password: &str) -> Fixture {
    fixture_with_config(AuthConfig::new(Environment::Development), username, password).await
}

pub(crate) async fn fixture_with_config(
    config: AuthConfig,
    username: &str,
    password: &str,
) -> Fixture {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
    ));
    let store = Arc::new(MemoryStore::new());
    let now = clock.now();
    let admin = Admin {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: cheap_hash(password),
        first_name: Some("Store".to_string()),
        last_name: Some("Owner".to_string()),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    store.insert_admin(&admin).await.unwrap();

    let state = AuthState::from_config(config, store.clone(), store.clone(), clock.clone());
    Fixture {
        state: Arc::new(state),
        store,
        clock,
        admin_id: admin.id,
    }
}

pub(crate) async fn read_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

#[tokio::test]
async fn login_then_validate_returns_admin() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let service = fx.state.service();

    let success = service
        .login("admin", &secret("secret123"))
        .await?
        .context("expected login success")?;
    assert_eq!(success.admin.id, fx.admin_id);
    assert_eq!(success.session.admin_id, fx.admin_id);
    assert_eq!(
        success.session.expires_at,
        fx.clock.now() + Duration::days(30)
    );

    let resolved = service
        .validate_session(&success.session.token)
        .await?
        .context("expected session to resolve")?;
    assert_eq!(resolved.id, fx.admin_id);
    assert_eq!(resolved.username, "admin");
    Ok(())
}

#[tokio::test]
async fn session_is_stored_as_digest_only() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let success = fx
        .state
        .service()
        .login("admin", &secret("secret123"))
        .await?
        .context("expected login success")?;

    let row = fx
        .store
        .session_row(&hash_session_token(&success.session.token))
        .await
        .context("expected session row")?;
    assert_eq!(row.token_hash.len(), 32);
    assert_ne!(row.token_hash, success.session.token.as_bytes());
    assert!(fx
        .store
        .session_row(success.session.token.as_bytes())
        .await
        .is_none());
    Ok(())
}

#[tokio::test]
async fn expired_session_is_rejected_and_deleted() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let service = fx.state.service();
    let success = service
        .login("admin", &secret("secret123"))
        .await?
        .context("expected login success")?;
    let token_hash = hash_session_token(&success.session.token);

    fx.clock.advance(Duration::days(30));
    assert!(service.validate_session(&success.session.token).await?.is_some());

    fx.clock.advance(Duration::seconds(1));
    assert!(service.validate_session(&success.session.token).await?.is_none());
    assert!(fx.store.session_row(&token_hash).await.is_none());
    Ok(())
}

#[tokio::test]
async fn lockout_after_max_attempts_then_recovers() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let service = fx.state.service();

    for _ in 0..5 {
        assert!(service.login("admin", &secret("wrong-pass")).await?.is_none());
        fx.clock.advance(Duration::seconds(10));
    }

    // Locked out: even the right password is refused.
    assert!(service.login("admin", &secret("secret123")).await?.is_none());

    // Window is measured from the last counted attempt.
    fx.clock.advance(Duration::minutes(15) - Duration::seconds(10));
    assert!(service.login("admin", &secret("secret123")).await?.is_none());

    fx.clock.advance(Duration::seconds(1));
    assert!(service.login("admin", &secret("secret123")).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn successful_login_resets_attempts() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let service = fx.state.service();

    for _ in 0..4 {
        assert!(service.login("admin", &secret("wrong-pass")).await?.is_none());
    }
    assert!(service.login("admin", &secret("secret123")).await?.is_some());

    for _ in 0..4 {
        assert!(service.login("admin", &secret("wrong-pass")).await?.is_none());
    }
    assert!(service.login("admin", &secret("secret123")).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn validation_errors_do_not_count_as_attempts() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let service = fx.state.service();

    for _ in 0..10 {
        let result = service.login("admin", &secret("short")).await;
        assert!(matches!(
            result,
            Err(AuthError::Validation("Password must be at least 6 characters"))
        ));
    }
    assert!(service.login("admin", &secret("secret123")).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn unknown_admin_is_refused() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    assert!(fx
        .state
        .service()
        .login("nobody", &secret("secret123"))
        .await?
        .is_none());
    Ok(())
}

#[tokio::test]
async fn inactive_admin_cannot_login_or_use_session() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let service = fx.state.service();
    let success = service
        .login("admin", &secret("secret123"))
        .await?
        .context("expected login success")?;

    assert!(fx.store.set_admin_active(fx.admin_id, false).await);
    assert!(service.login("admin", &secret("secret123")).await?.is_none());
    assert!(service.validate_session(&success.session.token).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn delete_session_is_idempotent() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let service = fx.state.service();
    let success = service
        .login("admin", &secret("secret123"))
        .await?
        .context("expected login success")?;

    assert!(service.delete_session(&success.session.token).await?);
    assert!(!service.logout(&success.session.token).await?);
    assert!(service.validate_session(&success.session.token).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn validate_session_ignores_empty_and_unknown_tokens() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let service = fx.state.service();
    assert!(service.validate_session("").await?.is_none());
    assert!(service.validate_session("not-a-session").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn delete_all_admin_sessions_revokes_every_session() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let service = fx.state.service();
    let first = service.create_session(fx.admin_id).await?;
    let second = service.create_session(fx.admin_id).await?;
    assert_ne!(first.token, second.token);

    assert_eq!(service.delete_all_admin_sessions(fx.admin_id).await?, 2);
    assert!(service.validate_session(&first.token).await?.is_none());
    assert!(service.validate_session(&second.token).await?.is_none());
    assert_eq!(service.delete_all_admin_sessions(fx.admin_id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn cleanup_expired_sessions_removes_only_expired() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let service = fx.state.service();
    let stale = service.create_session(fx.admin_id).await?;
    fx.clock.advance(Duration::days(20));
    let fresh = service.create_session(fx.admin_id).await?;
    fx.clock.advance(Duration::days(11));

    assert_eq!(service.cleanup_expired_sessions().await?, 1);
    assert_eq!(fx.store.session_count().await, 1);
    assert!(fx
        .store
        .session_row(&hash_session_token(&stale.token))
        .await
        .is_none());
    assert!(service.validate_session(&fresh.token).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn session_ttl_follows_config() -> Result<()> {
    let config = AuthConfig::new(Environment::Development).with_session_ttl_seconds(60);
    let fx = fixture_with_config(config, "admin", "secret123").await;
    let service = fx.state.service();
    let session = service.create_session(fx.admin_id).await?;
    assert_eq!(session.expires_at, fx.clock.now() + Duration::seconds(60));

    fx.clock.advance(Duration::seconds(61));
    assert!(service.validate_session(&session.token).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn create_admin_provisions_once() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let service = fx.state.service();
    let new_admin = || NewAdmin {
        username: "owner".to_string(),
        email: " Owner@Example.COM ".to_string(),
        password: secret("owner-pass"),
        first_name: Some("Shop".to_string()),
        last_name: None,
    };

    let ProvisionOutcome::Created(admin) = service.create_admin(new_admin()).await? else {
        anyhow::bail!("expected admin to be created");
    };
    assert_eq!(admin.username, "owner");
    assert_eq!(admin.email, "owner@example.com");
    assert!(admin.is_active);

    let stored = fx
        .store
        .find_admin_by_username("owner")
        .await?
        .context("expected stored admin")?;
    assert!(stored.password_hash.starts_with("$argon2id$v=19$m=19456,t=2,p=1$"));

    assert!(matches!(
        service.create_admin(new_admin()).await?,
        ProvisionOutcome::Exists
    ));
    assert!(service.login("owner", &secret("owner-pass")).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn create_admin_validates_input() {
    let fx = fixture("admin", "secret123").await;
    let service = fx.state.service();

    let result = service
        .create_admin(NewAdmin {
            username: "ab".to_string(),
            email: "ab@example.com".to_string(),
            password: secret("owner-pass"),
            first_name: None,
            last_name: None,
        })
        .await;
    assert!(matches!(
        result,
        Err(AuthError::Validation("Username must be between 3 and 50 characters"))
    ));

    let result = service
        .create_admin(NewAdmin {
            username: "owner".to_string(),
            email: "not-an-email".to_string(),
            password: secret("owner-pass"),
            first_name: None,
            last_name: None,
        })
        .await;
    assert!(matches!(
        result,
        Err(AuthError::Validation("Invalid email address"))
    ));
}

#[tokio::test]
async fn malformed_stored_hash_is_internal_error() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let now = fx.clock.now();
    fx.store
        .insert_admin(&Admin {
            id: Uuid::new_v4(),
            username: "broken".to_string(),
            email: "broken@example.com".to_string(),
            password_hash: "not-a-phc-string".to_string(),
            first_name: None,
            last_name: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await?;

    let result = fx.state.service().login("broken", &secret("secret123")).await;
    assert!(matches!(result, Err(AuthError::Internal(_))));
    Ok(())
}

#[tokio::test]
async fn session_store_reports_missing_rows() -> Result<()> {
    let store = MemoryStore::new();
    assert!(!store.delete_session(&[0u8; 32]).await?);
    assert!(store.find_session(&[0u8; 32]).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn session_with_past_expiry_is_rejected_and_deleted() -> Result<()> {
    let fx = fixture("admin", "secret123").await;
    let service = fx.state.service();
    let session = service.create_session(fx.admin_id).await?;
    let token_hash = hash_session_token(&session.token);

    assert!(
        fx.store
            .set_session_expiry(&token_hash, fx.clock.now() - Duration::seconds(1))
            .await
    );
    assert!(service.validate_session(&session.token).await?.is_none());
    assert!(fx.store.session_row(&token_hash).await.is_none());
    Ok(())
}

#[tokio::test]
async fn session_expiry_overflow_is_internal_error() {
    let config =
        AuthConfig::new(Environment::Development).with_session_ttl_seconds(10_000_000_000_000);
    let fx = fixture_with_config(config, "admin", "secret123").await;

    let result = fx.state.service().login("admin", &secret("secret123")).await;
    assert!(matches!(result, Err(AuthError::Internal(_))));
    assert_eq!(fx.store.session_count().await, 0);

    let config = AuthConfig::new(Environment::Development).with_session_ttl_seconds(i64::MAX);
    let fx = fixture_with_config(config, "admin", "secret123").await;
    let result = fx.state.service().create_session(fx.admin_id).await;
    assert!(matches!(result, Err(AuthError::Internal(_))));
}

/// Store whose calls never complete.
struct StalledStore;

#[async_trait]
impl AdminStore for StalledStore {
    async fn find_admin_by_username(&self, _username: &str) -> anyhow::Result<Option<Admin>> {
        std::future::pending().await
    }

    async fn insert_admin(&self, _admin: &Admin) -> anyhow::Result<InsertOutcome> {
        std::future::pending().await
    }
}

#[async_trait]
impl SessionStore for StalledStore {
    async fn insert_session(&self, _session: &SessionRecord) -> anyhow::Result<InsertOutcome> {
        std::future::pending().await
    }

    async fn find_session(
        &self,
        _token_hash: &[u8],
    ) -> anyhow::Result<Option<(SessionRecord, Admin)>> {
        std::future::pending().await
    }

    async fn delete_session(&self, _token_hash: &[u8]) -> anyhow::Result<bool> {
        std::future::pending().await
    }

    async fn delete_admin_sessions(&self, _admin_id: Uuid) -> anyhow::Result<u64> {
        std::future::pending().await
    }

    async fn delete_expired_sessions(&self, _now: DateTime<Utc>) -> anyhow::Result<u64> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn stalled_store_calls_time_out() {
    let store = Arc::new(StalledStore);
    let service = AuthService::new(store.clone(), store, Arc::new(NoopRateLimiter))
        .with_store_timeout(std::time::Duration::from_millis(20));

    let timed_out = |result: Result<_, AuthError>| {
        matches!(result, Err(AuthError::Internal(err)) if err.to_string().contains("timed out"))
    };

    assert!(timed_out(service.validate_session("some-token").await.map(|_| ())));
    assert!(timed_out(
        service.login("admin", &secret("secret123")).await.map(|_| ())
    ));

    let result = service.cleanup_expired_sessions().await;
    assert!(matches!(result, Err(AuthError::Internal(_))));
}
