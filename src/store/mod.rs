/// Repository traits
///
/// The auth and note services only see these traits. `postgres` is the
/// production backend, `memory` keeps everything in process.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Note, RefreshTokenRecord, User};

pub use memory::InMemoryStore;
pub use postgres::{PgNoteStore, PgRefreshTokenStore, PgUserStore};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with `AuthError::DuplicateEmail` if the email is taken.
    async fn save(&self, user: User) -> Result<User, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
}

/// Hashed refresh tokens that are currently honorable
///
/// Expired records are treated as absent by every lookup.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn save(
        &self,
        user_id: Uuid,
        hashed_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, AppError>;

    async fn find_by_user_id_and_hashed_token(
        &self,
        user_id: Uuid,
        hashed_token: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Idempotent; deleting a missing record is not an error
    async fn delete_by_user_id_and_hashed_token(
        &self,
        user_id: Uuid,
        hashed_token: &str,
    ) -> Result<(), AppError>;

    /// Consume `old_hashed_token` and store its replacement as one transaction.
    ///
    /// Returns `None` without changing anything if the old record is absent,
    /// so of two concurrent rotations of the same token exactly one wins.
    async fn rotate(
        &self,
        user_id: Uuid,
        old_hashed_token: &str,
        new_hashed_token: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Drop every record of a user, returning how many were removed
    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError>;

    /// Drop records past their expiry, returning how many were removed
    async fn delete_expired(&self) -> Result<u64, AppError>;
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Insert or replace by id
    ///
    /// Replacing a note held by a different owner fails with `Forbidden`;
    /// the ownership check and the write are one step.
    async fn save(&self, note: Note) -> Result<Note, AppError>;

    /// Notes of one owner, newest first
    async fn find_by_owner_id(&self, owner_id: Uuid) -> Result<Vec<Note>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Note>, AppError>;

    async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError>;
}
