//! Password hashing and session token helpers.
//!
//! Passwords are hashed with argon2id and stored as PHC-format strings;
//! everything outside this module treats the hash as opaque. Session tokens
//! are 32 random bytes, hex-encoded, stored server-side in the `sessions`
//! table.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Errors from password hashing and verification.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hash a password with argon2id and default parameters.
///
/// Returns the PHC-formatted hash string, which embeds the salt and
/// parameters.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Verify a password against a stored PHC hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::InvalidHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Generate a session token: 32 random bytes, hex-encoded (64 chars).
pub fn generate_session_token() -> String {
    use rand::Rng;
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}
