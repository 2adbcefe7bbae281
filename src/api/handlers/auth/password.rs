//! One-way salted password hashing (Argon2id).
//!
//! The PHC-formatted output embeds the per-call random salt and the
//! parameters, so nothing is stored besides the opaque string.
//! `verify_password` is strictly boolean: malformed stored hashes verify as
//! `false` instead of surfacing an error to callers.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use thiserror::Error;

/// Minimum accepted password length at registration, change, and reset.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum accepted password length, bounds Argon2 input size.
pub const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    TooShort,
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    TooLong,
    #[error("password hashing failed")]
    Hash,
}

/// Validate the password policy without touching the hasher.
///
/// # Errors
/// Returns `TooShort` or `TooLong` when outside the accepted bounds.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::TooLong);
    }
    Ok(())
}

/// Hash a password with Argon2id and a fresh random salt.
///
/// # Errors
/// Returns an error when the policy rejects the password or hashing fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    validate_password(password)?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| PasswordError::Hash)?;
    Ok(hash.to_string())
}

/// Constant-time verification of a password against a stored PHC string.
/// Any parse or verification failure yields `false`.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("Secret123").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Secret123", &hash));
        assert!(!verify_password("secret123", &hash));
    }

    #[test]
    fn two_hashes_of_same_password_differ() {
        let first = hash_password("Secret123").expect("hashing should succeed");
        let second = hash_password("Secret123").expect("hashing should succeed");
        // Per-call random salt embedded in the PHC output.
        assert_ne!(first, second);
        assert!(verify_password("Secret123", &first));
        assert!(verify_password("Secret123", &second));
    }

    #[test]
    fn verify_returns_false_for_malformed_hash() {
        assert!(!verify_password("Secret123", "not-a-phc-string"));
        assert!(!verify_password("Secret123", ""));
    }

    #[test]
    fn policy_rejects_short_and_long() {
        assert!(matches!(
            validate_password("short"),
            Err(PasswordError::TooShort)
        ));
        let long = "x".repeat(MAX_PASSWORD_LENGTH + 1);
        assert!(matches!(
            validate_password(&long),
            Err(PasswordError::TooLong)
        ));
        assert!(validate_password("LongEnough1").is_ok());
        assert!(hash_password("short").is_err());
    }
}
