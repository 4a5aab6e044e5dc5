/// Authentication Service
///
/// Registration, login and refresh-token rotation. Each refresh token is
/// single-use: it moves from issued to redeemed exactly once, inside one
/// store transaction that also records its replacement.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::jwt::TokenCodec;
use crate::auth::password::{validate_password, PasswordHasher};
use crate::auth::refresh_token::hash_token;
use crate::error::{AppError, AuthError};
use crate::models::User;
use crate::store::{RefreshTokenStore, UserStore};
use crate::validators::is_valid_email;

/// Access and refresh token handed back after login or refresh
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    hasher: Arc<dyn PasswordHasher>,
    codec: TokenCodec,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        hasher: Arc<dyn PasswordHasher>,
        codec: TokenCodec,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            hasher,
            codec,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Create an account
    ///
    /// # Errors
    /// - `Validation` for a malformed email or an empty or over-long password
    /// - `DuplicateEmail` if the email is already registered
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = is_valid_email(email)?;
        validate_password(password)?;

        let password_hash = self.hasher.encode(password)?;
        let user = self.users.save(User::new(email, password_hash)).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Exchange email and password for a fresh token pair
    ///
    /// Unknown email and wrong password both fail with `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = self
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.matches(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let access_token = self.codec.generate_access_token(user.id)?;
        let refresh_token = self.codec.generate_refresh_token(user.id)?;

        self.store_refresh_token(user.id, &refresh_token).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Redeem a refresh token for a new pair, consuming the old token
    ///
    /// # Errors
    /// - `InvalidRefreshToken` if the token is garbled, expired, not a
    ///   refresh token, or its user no longer exists
    /// - `RefreshTokenNotRecognized` if the token was already redeemed,
    ///   revoked, or never issued here
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        if !self.codec.validate_refresh_token(refresh_token) {
            return Err(AuthError::InvalidRefreshToken.into());
        }

        let user_id = self.codec.get_user_id_from_token(refresh_token)?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let hashed = hash_token(refresh_token);

        // Minting has no side effects; nothing is honorable until `rotate` commits.
        let access_token = self.codec.generate_access_token(user.id)?;
        let new_refresh_token = self.codec.generate_refresh_token(user.id)?;
        let expires_at = Utc::now() + self.codec.refresh_token_validity();

        let rotated = self
            .refresh_tokens
            .rotate(user.id, &hashed, &hash_token(&new_refresh_token), expires_at)
            .await?;

        if rotated.is_none() {
            tracing::warn!(user_id = %user.id, "Refresh token reuse or unknown token");
            return Err(AuthError::RefreshTokenNotRecognized.into());
        }

        tracing::info!(user_id = %user.id, "Refresh token rotated");
        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh_token,
        })
    }

    /// Revoke the presented refresh token
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        if !self.codec.validate_refresh_token(refresh_token) {
            return Err(AuthError::InvalidRefreshToken.into());
        }

        let user_id = self.codec.get_user_id_from_token(refresh_token)?;
        let hashed = hash_token(refresh_token);

        self.refresh_tokens
            .find_by_user_id_and_hashed_token(user_id, &hashed)
            .await?
            .ok_or(AuthError::RefreshTokenNotRecognized)?;

        self.refresh_tokens
            .delete_by_user_id_and_hashed_token(user_id, &hashed)
            .await?;

        tracing::info!(user_id = %user_id, "Refresh token revoked");
        Ok(())
    }

    /// Revoke every refresh token of a user; the id comes from a verified access token
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AppError> {
        let removed = self.refresh_tokens.delete_all_for_user(user_id).await?;

        tracing::info!(user_id = %user_id, removed, "All refresh tokens revoked for user");
        Ok(removed)
    }

    /// Drop refresh-token records whose expiry has passed.
    pub async fn purge_expired_tokens(&self) -> Result<u64, AppError> {
        let removed = self.refresh_tokens.delete_expired().await?;

        tracing::info!(removed, "Expired refresh tokens purged");
        Ok(removed)
    }

    /// Look up the account behind a verified access token
    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::TokenInvalid.into())
    }

    // Expiry comes from the configured window, not from the token's `exp`.
    async fn store_refresh_token(&self, user_id: Uuid, raw_token: &str) -> Result<(), AppError> {
        let hashed = hash_token(raw_token);
        let expires_at = Utc::now() + self.codec.refresh_token_validity();

        self.refresh_tokens
            .save(user_id, &hashed, expires_at)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::BcryptPasswordHasher;
    use crate::configuration::JwtSettings;
    use crate::store::InMemoryStore;

    const EMAIL: &str = "a@x.com";
    const PASSWORD: &str = "Password1";

    fn jwt_settings(refresh_token_expiry: i64) -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry,
            issuer: "test".to_string(),
        }
    }

    fn service_with(store: Arc<InMemoryStore>, refresh_token_expiry: i64) -> AuthService {
        AuthService::new(
            store.clone(),
            store,
            Arc::new(BcryptPasswordHasher::new(4)),
            TokenCodec::new(&jwt_settings(refresh_token_expiry)),
        )
    }

    fn service() -> (AuthService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (service_with(store.clone(), 604800), store)
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (auth, store) = service();
        let user = auth.register(EMAIL, PASSWORD).await.unwrap();

        let pair = auth.login(EMAIL, PASSWORD).await.unwrap();
        let claims = auth.codec().validate_access_token(&pair.access_token).unwrap();

        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_ne!(user.password_hash, PASSWORD);
        assert_eq!(store.refresh_token_count().await, 1);
    }

    #[tokio::test]
    async fn test_refresh_token_stored_hashed() {
        let (auth, store) = service();
        let user = auth.register(EMAIL, PASSWORD).await.unwrap();
        let pair = auth.login(EMAIL, PASSWORD).await.unwrap();

        let record = store
            .find_by_user_id_and_hashed_token(user.id, &hash_token(&pair.refresh_token))
            .await
            .unwrap()
            .expect("record stored under the digest");

        assert_ne!(record.hashed_token, pair.refresh_token);
        assert!(store
            .find_by_user_id_and_hashed_token(user.id, &pair.refresh_token)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let (auth, _) = service();
        auth.register(EMAIL, PASSWORD).await.unwrap();

        let err = auth.register(EMAIL, "OtherPassword2").await.unwrap_err();

        assert_eq!(err.auth_kind(), Some(&AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_short_password_register_login_refresh_flow() {
        let (auth, _) = service();
        let user = auth.register("a@x.com", "pw1").await.unwrap();
        assert_eq!(user.email, "a@x.com");

        let first = auth.login("a@x.com", "pw1").await.unwrap();
        let second = auth.refresh(&first.refresh_token).await.unwrap();

        assert_ne!(second.refresh_token, first.refresh_token);
        let replay = auth.refresh(&first.refresh_token).await.unwrap_err();
        assert_eq!(replay.auth_kind(), Some(&AuthError::RefreshTokenNotRecognized));
    }

    #[tokio::test]
    async fn test_register_rejects_empty_password() {
        let (auth, store) = service();
        let err = auth.register(EMAIL, "").await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.find_by_email(EMAIL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (auth, store) = service();
        auth.register(EMAIL, PASSWORD).await.unwrap();

        let wrong_password = auth.login(EMAIL, "WrongPassword1").await.unwrap_err();
        let unknown_email = auth.login("nobody@x.com", PASSWORD).await.unwrap_err();

        assert_eq!(wrong_password.auth_kind(), Some(&AuthError::InvalidCredentials));
        assert_eq!(unknown_email.auth_kind(), Some(&AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(store.refresh_token_count().await, 0);
    }

    #[tokio::test]
    async fn test_refresh_is_single_use() {
        let (auth, _) = service();
        auth.register(EMAIL, PASSWORD).await.unwrap();
        let pair = auth.login(EMAIL, PASSWORD).await.unwrap();

        let rotated = auth.refresh(&pair.refresh_token).await.unwrap();
        let replay = auth.refresh(&pair.refresh_token).await.unwrap_err();

        assert_ne!(rotated.refresh_token, pair.refresh_token);
        assert_eq!(replay.auth_kind(), Some(&AuthError::RefreshTokenNotRecognized));
        // the replacement keeps working
        assert!(auth.refresh(&rotated.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_preserves_subject() {
        let (auth, _) = service();
        let user = auth.register(EMAIL, PASSWORD).await.unwrap();
        let pair = auth.login(EMAIL, PASSWORD).await.unwrap();

        let rotated = auth.refresh(&pair.refresh_token).await.unwrap();
        let claims = auth.codec().validate_access_token(&rotated.access_token).unwrap();

        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(
            auth.codec().get_user_id_from_token(&rotated.refresh_token).unwrap(),
            user.id
        );
    }

    #[tokio::test]
    async fn test_concurrent_refresh_has_one_winner() {
        let (auth, store) = service();
        auth.register(EMAIL, PASSWORD).await.unwrap();
        let pair = auth.login(EMAIL, PASSWORD).await.unwrap();

        let (a, b) = tokio::join!(
            auth.refresh(&pair.refresh_token),
            auth.refresh(&pair.refresh_token)
        );

        let outcomes = [a, b];
        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        let rejected = outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .filter(|e| e.auth_kind() == Some(&AuthError::RefreshTokenNotRecognized))
            .count();

        assert_eq!(wins, 1);
        assert_eq!(rejected, 1);
        assert_eq!(store.refresh_token_count().await, 1);
    }

    #[tokio::test]
    async fn test_expired_refresh_token_rejected_while_stored() {
        let store = Arc::new(InMemoryStore::new());
        let auth = service_with(store.clone(), 0);
        auth.register(EMAIL, PASSWORD).await.unwrap();
        let pair = auth.login(EMAIL, PASSWORD).await.unwrap();

        let err = auth.refresh(&pair.refresh_token).await.unwrap_err();

        assert_eq!(err.auth_kind(), Some(&AuthError::InvalidRefreshToken));
        assert_eq!(store.refresh_token_count().await, 1);
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token_and_garbage() {
        let (auth, _) = service();
        auth.register(EMAIL, PASSWORD).await.unwrap();
        let pair = auth.login(EMAIL, PASSWORD).await.unwrap();

        let with_access = auth.refresh(&pair.access_token).await.unwrap_err();
        let with_garbage = auth.refresh("not-a-token").await.unwrap_err();

        assert_eq!(with_access.auth_kind(), Some(&AuthError::InvalidRefreshToken));
        assert_eq!(with_garbage.auth_kind(), Some(&AuthError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn test_foreign_refresh_token_not_recognized() {
        let (auth, _) = service();
        let user = auth.register(EMAIL, PASSWORD).await.unwrap();

        // correctly signed but never stored
        let minted = auth.codec().generate_refresh_token(user.id).unwrap();
        let err = auth.refresh(&minted).await.unwrap_err();

        assert_eq!(err.auth_kind(), Some(&AuthError::RefreshTokenNotRecognized));
    }

    #[tokio::test]
    async fn test_refresh_for_missing_user() {
        let (auth, _) = service();
        let minted = auth.codec().generate_refresh_token(Uuid::new_v4()).unwrap();

        let err = auth.refresh(&minted).await.unwrap_err();

        assert_eq!(err.auth_kind(), Some(&AuthError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let (auth, _) = service();
        auth.register(EMAIL, PASSWORD).await.unwrap();
        let pair = auth.login(EMAIL, PASSWORD).await.unwrap();

        auth.logout(&pair.refresh_token).await.unwrap();

        let err = auth.refresh(&pair.refresh_token).await.unwrap_err();
        assert_eq!(err.auth_kind(), Some(&AuthError::RefreshTokenNotRecognized));
        let again = auth.logout(&pair.refresh_token).await.unwrap_err();
        assert_eq!(again.auth_kind(), Some(&AuthError::RefreshTokenNotRecognized));
    }

    #[tokio::test]
    async fn test_logout_all_revokes_every_device() {
        let (auth, _) = service();
        let user = auth.register(EMAIL, PASSWORD).await.unwrap();
        let phone = auth.login(EMAIL, PASSWORD).await.unwrap();
        let laptop = auth.login(EMAIL, PASSWORD).await.unwrap();

        assert_eq!(auth.logout_all(user.id).await.unwrap(), 2);

        assert!(auth.refresh(&phone.refresh_token).await.is_err());
        assert!(auth.refresh(&laptop.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_multiple_devices_rotate_independently() {
        let (auth, _) = service();
        auth.register(EMAIL, PASSWORD).await.unwrap();
        let phone = auth.login(EMAIL, PASSWORD).await.unwrap();
        let laptop = auth.login(EMAIL, PASSWORD).await.unwrap();

        assert!(auth.refresh(&phone.refresh_token).await.is_ok());
        assert!(auth.refresh(&laptop.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_expired_tokens_drops_only_dead_records() {
        let store = Arc::new(InMemoryStore::new());
        let short_lived = service_with(store.clone(), 0);
        let long_lived = service_with(store.clone(), 604800);
        short_lived.register(EMAIL, PASSWORD).await.unwrap();
        short_lived.login(EMAIL, PASSWORD).await.unwrap();
        let live = long_lived.login(EMAIL, PASSWORD).await.unwrap();

        assert_eq!(long_lived.purge_expired_tokens().await.unwrap(), 1);

        assert_eq!(store.refresh_token_count().await, 1);
        assert!(long_lived.refresh(&live.refresh_token).await.is_ok());
    }
}
