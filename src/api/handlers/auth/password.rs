//! Argon2id password hashing for administrator credentials.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

const MEMORY_COST_KIB: u32 = 19_456;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;
const OUTPUT_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(password_hash::Error),
    #[error("malformed password hash: {0}")]
    MalformedHash(password_hash::Error),
    #[error("failed to verify password: {0}")]
    Verify(password_hash::Error),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(OUTPUT_LEN))
        .map_err(|err| PasswordError::Hash(err.into()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash `plaintext` into a PHC string with a fresh random salt.
///
/// # Errors
/// Returns `PasswordError::Hash` if Argon2 fails internally.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(PasswordError::Hash)?;
    Ok(hash.to_string())
}

/// Check `plaintext` against a stored PHC string.
///
/// A mismatch is `Ok(false)`; only an unparsable hash or an internal failure
/// is an error. Parameters are taken from the stored hash.
///
/// # Errors
/// Returns `PasswordError::MalformedHash` if `hash` is not a valid PHC string.
pub fn verify_password(hash: &str, plaintext: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(PasswordError::MalformedHash)?;
    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(err) => Err(PasswordError::Verify(err)),
    }
}
