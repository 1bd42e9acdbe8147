//! Admin authentication: credentials, sessions and login throttling.
//!
//! ## Sessions
//!
//! A successful login issues a 256-bit random token. The client receives it in
//! the `admin-session` cookie; only its SHA-256 digest is persisted. Sessions
//! expire after 30 days by default and are deleted the next time an expired
//! token is presented. An optional background sweep purges the rest.
//!
//! ## Login Throttling
//!
//! Attempts are counted per username within a sliding window (5 attempts per
//! 15 minutes by default). Once the limit is reached every further attempt is
//! refused, correct password or not, until the window has passed since the
//! last counted attempt. A successful login clears the counter.
//!
//! Clients see the same `401 Invalid username or password` for unknown users,
//! wrong passwords, inactive accounts and lockouts.

pub mod clock;
pub(crate) mod login;
pub mod memory;
mod password;
pub(crate) mod principal;
mod rate_limit;
pub mod service;
pub(crate) mod session;
mod state;
pub mod storage;
pub(crate) mod types;
mod utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::MemoryStore;
pub use principal::{AuthenticatedAdmin, CurrentAdmin};
pub use rate_limit::{
    MemoryRateLimiter, NoopRateLimiter, RateLimitDecision, RateLimiter, MAX_LOCKOUT_WINDOW_SECONDS,
};
pub use service::{AuthError, AuthService, LoginSuccess, ProvisionOutcome, MAX_SESSION_TTL_SECONDS};
pub use state::{AuthConfig, AuthState, Environment};
pub use storage::{AdminStore, PgStore, SessionStore};
pub use types::{AuthAdmin, NewAdmin};

#[cfg(test)]
pub(crate) mod tests;
