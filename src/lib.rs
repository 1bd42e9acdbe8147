//! # Shopkeeper (storefront admin authentication)
//!
//! `shopkeeper` guards the administrative area of a server-rendered storefront.
//! It verifies administrator credentials, issues and validates cookie sessions,
//! throttles repeated login attempts, and gates every `/admin` request.
//!
//! ## Sessions
//!
//! Session tokens are 256-bit random values handed to the browser in an
//! `HttpOnly` cookie. Only a SHA-256 digest of the token is persisted, so a
//! leaked `admin_sessions` table cannot be replayed. Expired sessions are
//! removed lazily the next time they are presented, and optionally by a
//! background sweep.
//!
//! ## Login Throttling
//!
//! Five counted attempts per username inside a 15-minute window lock the
//! username out until the window has passed since the last counted attempt.
//! The lockout is reported with the same generic `401` as a wrong password to
//! avoid account enumeration.
//!
//! ## Access Control
//!
//! Every path under `/admin` requires a valid session except `/admin/login`.
//! Anonymous requests are redirected to the login page with the original path
//! in `redirectTo`; authenticated requests to the login page are redirected to
//! the dashboard.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }
}
