/// Password Hashing and Verification
///
/// `PasswordHasher` is the capability the auth service consumes; bcrypt is
/// the shipped implementation.

use bcrypt::{hash, verify};

use crate::error::{AppError, ValidationError};

// bcrypt only looks at the first 72 bytes
const MAX_PASSWORD_LENGTH: usize = 72;

/// One-way password hashing
pub trait PasswordHasher: Send + Sync {
    /// Hash a raw password
    fn encode(&self, raw: &str) -> Result<String, AppError>;

    /// Check a raw password against a stored hash
    fn matches(&self, raw: &str, hash: &str) -> Result<bool, AppError>;
}

/// bcrypt-backed hasher
#[derive(Debug, Clone)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptPasswordHasher {
    fn encode(&self, raw: &str) -> Result<String, AppError> {
        hash(raw, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn matches(&self, raw: &str, hash: &str) -> Result<bool, AppError> {
        verify(raw, hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}

/// Reject passwords bcrypt cannot hash faithfully
///
/// Any non-empty password up to 72 bytes is accepted; longer ones would be
/// silently truncated by bcrypt.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        ));
    }

    Ok(())
}
