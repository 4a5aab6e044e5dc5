/// PostgreSQL repositories (sqlx)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{NoteStore, RefreshTokenStore, UserStore};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::models::{Note, RefreshTokenRecord, User};

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn save(&self, user: User) -> Result<User, AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                AppError::Auth(AuthError::DuplicateEmail)
            }
            other => other,
        })?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn save(
        &self,
        user_id: Uuid,
        hashed_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, AppError> {
        let record = RefreshTokenRecord::new(user_id, hashed_token.to_string(), expires_at);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, hashed_token, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.hashed_token)
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_user_id_and_hashed_token(
        &self,
        user_id: Uuid,
        hashed_token: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, hashed_token, expires_at, created_at
            FROM refresh_tokens
            WHERE user_id = $1 AND hashed_token = $2 AND expires_at > $3
            "#,
        )
        .bind(user_id)
        .bind(hashed_token)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_by_user_id_and_hashed_token(
        &self,
        user_id: Uuid,
        hashed_token: &str,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND hashed_token = $2")
            .bind(user_id)
            .bind(hashed_token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn rotate(
        &self,
        user_id: Uuid,
        old_hashed_token: &str,
        new_hashed_token: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock: a concurrent rotation of the same token waits here and
        // then finds nothing.
        let existing = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM refresh_tokens
            WHERE user_id = $1 AND hashed_token = $2 AND expires_at > $3
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(old_hashed_token)
        .bind(Utc::now())
        .fetch_optional(&mut tx)
        .await?;

        let Some(old_id) = existing else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(old_id)
            .execute(&mut tx)
            .await?;

        let record =
            RefreshTokenRecord::new(user_id, new_hashed_token.to_string(), new_expires_at);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, hashed_token, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.hashed_token)
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;

        Ok(Some(record))
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub struct PgNoteStore {
    pool: PgPool,
}

impl PgNoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn save(&self, note: Note) -> Result<Note, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO notes (id, title, content, color, created_at, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title,
                content = EXCLUDED.content,
                color = EXCLUDED.color,
                created_at = EXCLUDED.created_at
            WHERE notes.owner_id = EXCLUDED.owner_id
            "#,
        )
        .bind(note.id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.color)
        .bind(note.created_at)
        .bind(note.owner_id)
        .execute(&self.pool)
        .await?;

        // The conflict branch skipped its update: the id belongs to someone else
        if result.rows_affected() == 0 {
            return Err(AuthError::Forbidden.into());
        }

        Ok(note)
    }

    async fn find_by_owner_id(&self, owner_id: Uuid) -> Result<Vec<Note>, AppError> {
        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT id, title, content, color, created_at, owner_id
            FROM notes
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Note>, AppError> {
        let note = sqlx::query_as::<_, Note>(
            "SELECT id, title, content, color, created_at, owner_id FROM notes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(note)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
