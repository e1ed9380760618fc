//! Password hashing, verification, and signup credential policy
//!
//! Uses Argon2id for password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AppError;

/// Special characters a password may (and must) draw from
const PASSWORD_SPECIALS: &str = "@$!%*?&";

const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 20;
const USERNAME_MIN_LEN: usize = 3;

/// Hash a password using Argon2id
///
/// # Errors
/// Returns an error if hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {e}")))
}

/// Verify a password against a hash
///
/// # Errors
/// Returns an error if the stored hash cannot be parsed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Password service for dependency injection
#[derive(Debug, Clone, Default)]
pub struct PasswordService;

impl PasswordService {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash_password(password)
    }

    /// Verify a password and return `InvalidCredentials` on mismatch
    pub fn verify_or_error(&self, password: &str, hash: &str) -> Result<(), AppError> {
        if verify_password(password, hash)? {
            Ok(())
        } else {
            Err(AppError::InvalidCredentials)
        }
    }
}

/// Validate a signup username
///
/// At least three characters, ASCII letters and digits only.
pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username.chars().count() < USERNAME_MIN_LEN {
        return Err(AppError::validation(
            "Username must have at least 3 characters.",
        ));
    }

    if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::validation(
            "Username must contain only alphanumeric characters.",
        ));
    }

    Ok(())
}

/// Validate a signup password
///
/// 8-20 characters drawn from letters, digits and `@$!%*?&`, with at least
/// one lowercase letter, one uppercase letter, one digit and one special.
pub fn validate_password_policy(password: &str) -> Result<(), AppError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c);
    let len = password.chars().count();

    let ok = (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len)
        && password.chars().all(allowed)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if ok {
        Ok(())
    } else {
        Err(AppError::validation(
            "Password must be 8-20 characters long and include at least one uppercase letter, \
             one lowercase letter, one number, and one special character.",
        ))
    }
}
