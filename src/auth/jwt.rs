/// JWT Token Generation and Validation
///
/// `TokenCodec` mints and checks self-contained HS256 credentials. Access
/// tokens are accepted on signature and expiry alone; refresh tokens must also
/// be present in the refresh-token store, which is the service's concern.

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenType};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    issuer: String,
}

impl TokenCodec {
    pub fn new(config: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry: config.access_token_expiry,
            refresh_token_expiry: config.refresh_token_expiry,
            issuer: config.issuer.clone(),
        }
    }

    /// Access token lifetime in seconds
    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    /// Configured refresh token lifetime, used to compute the stored expiry
    pub fn refresh_token_validity(&self) -> Duration {
        Duration::seconds(self.refresh_token_expiry)
    }

    /// Generate a short-lived access token for a user
    ///
    /// # Errors
    /// Returns error if token encoding fails
    pub fn generate_access_token(&self, user_id: Uuid) -> Result<String, AppError> {
        self.generate(user_id, TokenType::Access, self.access_token_expiry)
    }

    /// Generate a long-lived refresh token for a user
    ///
    /// # Errors
    /// Returns error if token encoding fails
    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<String, AppError> {
        self.generate(user_id, TokenType::Refresh, self.refresh_token_expiry)
    }

    fn generate(&self, user_id: Uuid, typ: TokenType, expiry: i64) -> Result<String, AppError> {
        let claims = Claims::new(user_id, typ, expiry, self.issuer.clone());

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// True only for a correctly signed, unexpired refresh token from this issuer
    pub fn validate_refresh_token(&self, token: &str) -> bool {
        match self.decode(token, true) {
            Ok(claims) => claims.typ == TokenType::Refresh && !claims.is_expired(),
            Err(e) => {
                tracing::debug!("Refresh token rejected: {}", e);
                false
            }
        }
    }

    /// Validate an access token and return its claims
    ///
    /// # Errors
    /// `TokenInvalid` if the token is tampered with, expired, from another
    /// issuer, or is not an access token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.decode(token, true).map_err(|e| {
            tracing::warn!("JWT validation error: {}", e);
            AuthError::TokenInvalid
        })?;

        if claims.typ != TokenType::Access || claims.is_expired() {
            return Err(AuthError::TokenInvalid);
        }
        Ok(claims)
    }

    /// Read the subject of a token the caller has already validated
    ///
    /// Expiry is not re-checked here.
    ///
    /// # Errors
    /// `MalformedToken` if the token cannot be decoded or the subject is not a UUID
    pub fn get_user_id_from_token(&self, token: &str) -> Result<Uuid, AuthError> {
        let claims = self
            .decode(token, false)
            .map_err(|_| AuthError::MalformedToken)?;
        claims.user_id()
    }

    fn decode(
        &self,
        token: &str,
        check_expiry: bool,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = 0;
        validation.validate_exp = check_expiry;

        decode::<Claims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }
}
