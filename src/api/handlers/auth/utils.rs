//! Small helpers for session tokens and login input validation.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

const USERNAME_MIN_CHARS: usize = 3;
const USERNAME_MAX_CHARS: usize = 50;
const PASSWORD_MIN_CHARS: usize = 6;

/// Create a new session token for the auth cookie.
/// The raw value is only returned to set the cookie; the database stores a hash.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash a session token so raw values never touch the database.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Check login fields before any throttling, storage or hashing happens.
///
/// Returns the trimmed username on success, or a client-facing message.
pub(crate) fn validate_login_input<'a>(
    username: &'a str,
    password: &str,
) -> Result<&'a str, &'static str> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err("Username and password are required");
    }

    let username_chars = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&username_chars) {
        return Err("Username must be between 3 and 50 characters");
    }

    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err("Password must be at least 6 characters");
    }

    Ok(username)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
