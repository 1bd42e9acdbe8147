//! Login throttling keyed by the submitted username.
//!
//! The limiter sits behind [`RateLimiter`] so a shared counter store can
//! replace the process-local map when more than one instance serves logins.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::clock::Clock;

pub const DEFAULT_MAX_LOGIN_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOCKOUT_WINDOW_SECONDS: i64 = 15 * 60;
pub const MAX_LOCKOUT_WINDOW_SECONDS: i64 = 24 * 60 * 60;
/// New keys inserted between sweeps of lapsed entries.
const PRUNE_EVERY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    /// Count an attempt for `key` and decide whether it may proceed.
    fn register_attempt(&self, key: &str) -> RateLimitDecision;

    /// Forget every attempt recorded for `key`.
    fn reset(&self, key: &str);
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn register_attempt(&self, _key: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }

    fn reset(&self, _key: &str) {}
}

#[derive(Clone, Copy, Debug)]
struct Attempt {
    count: u32,
    last_attempt: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Attempts {
    entries: HashMap<String, Attempt>,
    inserts_since_prune: usize,
}

/// Process-local limiter. Check and increment happen under one lock, so two
/// concurrent attempts for the same username can never both observe the same
/// count.
pub struct MemoryRateLimiter {
    attempts: Mutex<Attempts>,
    max_attempts: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl MemoryRateLimiter {
    #[must_use]
    pub fn new(max_attempts: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            attempts: Mutex::new(Attempts::default()),
            max_attempts,
            window,
            clock,
        }
    }

    #[must_use]
    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            DEFAULT_MAX_LOGIN_ATTEMPTS,
            Duration::seconds(DEFAULT_LOCKOUT_WINDOW_SECONDS),
            clock,
        )
    }

    #[cfg(test)]
    fn attempts_for(&self, key: &str) -> Option<u32> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get(key)
            .map(|attempt| attempt.count)
    }
}

impl RateLimiter for MemoryRateLimiter {
    fn register_attempt(&self, key: &str) -> RateLimitDecision {
        let now = self.clock.now();
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(attempt) = attempts.entries.get_mut(key) else {
            // Sweep lapsed entries once per batch of new keys so the map stays
            // bounded without scanning it on every insert.
            attempts.inserts_since_prune += 1;
            if attempts.inserts_since_prune >= PRUNE_EVERY {
                let window = self.window;
                attempts
                    .entries
                    .retain(|_, entry| now - entry.last_attempt <= window);
                attempts.inserts_since_prune = 0;
            }
            attempts.entries.insert(
                key.to_string(),
                Attempt {
                    count: 1,
                    last_attempt: now,
                },
            );
            return RateLimitDecision::Allowed;
        };

        if now - attempt.last_attempt > self.window {
            *attempt = Attempt {
                count: 1,
                last_attempt: now,
            };
            return RateLimitDecision::Allowed;
        }

        // Rejected attempts do not touch `last_attempt`: the lockout ends one
        // window after the last counted attempt.
        if attempt.count >= self.max_attempts {
            return RateLimitDecision::Limited;
        }

        attempt.count += 1;
        attempt.last_attempt = now;
        RateLimitDecision::Allowed
    }

    fn reset(&self, key: &str) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::clock::ManualClock;
    use chrono::TimeZone;

    fn limiter() -> (MemoryRateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        (MemoryRateLimiter::with_defaults(clock.clone()), clock)
    }

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        for _ in 0..10 {
            assert_eq!(limiter.register_attempt("admin"), RateLimitDecision::Allowed);
        }
    }

    #[test]
    fn sixth_attempt_inside_window_is_limited() {
        let (limiter, clock) = limiter();
        for _ in 0..5 {
            assert_eq!(limiter.register_attempt("admin"), RateLimitDecision::Allowed);
            clock.advance(Duration::seconds(10));
        }
        assert_eq!(limiter.register_attempt("admin"), RateLimitDecision::Limited);
        assert_eq!(limiter.attempts_for("admin"), Some(5));
    }

    #[test]
    fn keys_are_counted_independently() {
        let (limiter, _clock) = limiter();
        for _ in 0..5 {
            limiter.register_attempt("admin");
        }
        assert_eq!(limiter.register_attempt("admin"), RateLimitDecision::Limited);
        assert_eq!(limiter.register_attempt("editor"), RateLimitDecision::Allowed);
    }

    #[test]
    fn window_elapsing_restarts_the_count() {
        let (limiter, clock) = limiter();
        for _ in 0..5 {
            limiter.register_attempt("admin");
        }
        clock.advance(Duration::seconds(DEFAULT_LOCKOUT_WINDOW_SECONDS + 1));
        assert_eq!(limiter.register_attempt("admin"), RateLimitDecision::Allowed);
        assert_eq!(limiter.attempts_for("admin"), Some(1));
    }

    #[test]
    fn limited_attempts_do_not_extend_the_lockout() {
        let (limiter, clock) = limiter();
        for _ in 0..5 {
            limiter.register_attempt("admin");
        }
        clock.advance(Duration::seconds(DEFAULT_LOCKOUT_WINDOW_SECONDS - 60));
        assert_eq!(limiter.register_attempt("admin"), RateLimitDecision::Limited);

        clock.advance(Duration::seconds(61));
        assert_eq!(limiter.register_attempt("admin"), RateLimitDecision::Allowed);
    }

    #[test]
    fn reset_clears_the_counter() {
        let (limiter, _clock) = limiter();
        for _ in 0..4 {
            limiter.register_attempt("admin");
        }
        limiter.reset("admin");
        assert_eq!(limiter.attempts_for("admin"), None);
        for _ in 0..5 {
            assert_eq!(limiter.register_attempt("admin"), RateLimitDecision::Allowed);
        }
    }

    #[test]
    fn stale_entries_are_pruned_once_per_batch() {
        let (limiter, clock) = limiter();
        limiter.register_attempt("stale");
        clock.advance(Duration::seconds(DEFAULT_LOCKOUT_WINDOW_SECONDS + 1));

        // `stale` was the first insert of the batch; the sweep runs on the last.
        for index in 1..PRUNE_EVERY - 1 {
            limiter.register_attempt(&format!("user-{index}"));
        }
        assert_eq!(limiter.attempts_for("stale"), Some(1));

        limiter.register_attempt("fresh");
        assert_eq!(limiter.attempts_for("stale"), None);
        assert_eq!(limiter.attempts_for("fresh"), Some(1));
        assert_eq!(limiter.attempts_for("user-1"), Some(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_attempts_admit_exactly_max() {
        let (limiter, _clock) = limiter();
        let limiter = Arc::new(limiter);
        let barrier = Arc::new(tokio::sync::Barrier::new(32));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = limiter.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    limiter.register_attempt("admin")
                })
            })
            .collect();

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap() == RateLimitDecision::Allowed {
                allowed += 1;
            }
        }
        assert_eq!(allowed, DEFAULT_MAX_LOGIN_ATTEMPTS);
        assert_eq!(limiter.attempts_for("admin"), Some(DEFAULT_MAX_LOGIN_ATTEMPTS));
    }
}
