//! Auth configuration and the shared state handed to handlers.

use chrono::Duration;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::clock::Clock;
use super::rate_limit::{
    MemoryRateLimiter, DEFAULT_LOCKOUT_WINDOW_SECONDS, DEFAULT_MAX_LOGIN_ATTEMPTS,
};
use super::storage::{AdminStore, SessionStore};
use super::service::{AuthService, DEFAULT_SESSION_TTL_SECONDS, DEFAULT_STORE_TIMEOUT_SECONDS};

/// Deployment environment; only production marks cookies `Secure`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("invalid environment: {other}")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    environment: Environment,
    session_ttl_seconds: i64,
    max_login_attempts: u32,
    lockout_window_seconds: i64,
    store_timeout_seconds: u64,
    session_sweep_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(Environment::default())
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            max_login_attempts: DEFAULT_MAX_LOGIN_ATTEMPTS,
            lockout_window_seconds: DEFAULT_LOCKOUT_WINDOW_SECONDS,
            store_timeout_seconds: DEFAULT_STORE_TIMEOUT_SECONDS,
            session_sweep_seconds: 0,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_max_login_attempts(mut self, attempts: u32) -> Self {
        self.max_login_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_lockout_window_seconds(mut self, seconds: i64) -> Self {
        self.lockout_window_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_store_timeout_seconds(mut self, seconds: u64) -> Self {
        self.store_timeout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_sweep_seconds(mut self, seconds: u64) -> Self {
        self.session_sweep_seconds = seconds;
        self
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn max_login_attempts(&self) -> u32 {
        self.max_login_attempts
    }

    #[must_use]
    pub fn lockout_window_seconds(&self) -> i64 {
        self.lockout_window_seconds
    }

    #[must_use]
    pub fn store_timeout_seconds(&self) -> u64 {
        self.store_timeout_seconds
    }

    #[must_use]
    pub fn session_sweep_seconds(&self) -> u64 {
        self.session_sweep_seconds
    }

    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.environment == Environment::Production
    }
}

pub struct AuthState {
    config: AuthConfig,
    service: AuthService,
}

impl AuthState {
    pub fn new(config: AuthConfig, service: AuthService) -> Self {
        Self { config, service }
    }

    /// Wire the service with an in-memory limiter sized from `config`.
    pub fn from_config(
        config: AuthConfig,
        admins: Arc<dyn AdminStore>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rate_limiter = Arc::new(MemoryRateLimiter::new(
            config.max_login_attempts(),
            Duration::try_seconds(config.lockout_window_seconds()).unwrap_or(Duration::MAX),
            clock.clone(),
        ));
        let service = AuthService::new(admins, sessions, rate_limiter)
            .with_clock(clock)
            .with_session_ttl(
                Duration::try_seconds(config.session_ttl_seconds()).unwrap_or(Duration::MAX),
            )
            .with_store_timeout(std::time::Duration::from_secs(
                config.store_timeout_seconds(),
            ));
        Self::new(config, service)
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn service(&self) -> &AuthService {
        &self.service
    }
}
