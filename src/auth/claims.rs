/// JWT Claims structure
///
/// Payload shared by access and refresh tokens. The `typ` claim keeps the two
/// from being used interchangeably.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

const JTI_LENGTH: usize = 16;

/// Which kind of credential a token is
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Token type tag
    pub typ: TokenType,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Unique token id, so two tokens minted in the same second differ
    pub jti: String,
}

impl Claims {
    /// Create new claims for a subject
    ///
    /// # Arguments
    /// * `user_id` - User's UUID
    /// * `typ` - Access or refresh
    /// * `expiry_seconds` - Token lifetime in seconds from now
    /// * `issuer` - Issuer identifier
    pub fn new(user_id: Uuid, typ: TokenType, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        let jti = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(JTI_LENGTH)
            .map(char::from)
            .collect();

        Self {
            sub: user_id.to_string(),
            typ,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti,
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns `MalformedToken` if the subject is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::MalformedToken)
    }

    /// A token is no longer acceptable on or after `exp`
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp <= now
    }
}
