//! Background purge of expired admin sessions.
//!
//! Expired sessions are already deleted when presented; this bounds the table
//! for sessions that are simply abandoned.

use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{debug, error};

use super::handlers::auth::AuthState;

/// Spawn the sweep loop; `None` when `interval` is zero.
pub fn spawn_session_sweeper(
    auth_state: Arc<AuthState>,
    interval: Duration,
) -> Option<tokio::task::JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        loop {
            sleep(interval).await;
            match auth_state.service().cleanup_expired_sessions().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "purged expired admin sessions"),
                Err(err) => error!("session sweep failed: {err:#}"),
            }
        }
    }))
}
