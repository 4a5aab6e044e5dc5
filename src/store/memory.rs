/// In-process store
///
/// One async mutex guards every table, so each trait call behaves like a
/// serializable transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{NoteStore, RefreshTokenStore, UserStore};
use crate::error::{AppError, AuthError};
use crate::models::{Note, RefreshTokenRecord, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<(Uuid, String), RefreshTokenRecord>,
    notes: HashMap<Uuid, Note>,
}

impl Tables {
    fn live_token(&self, user_id: Uuid, hashed_token: &str) -> Option<&RefreshTokenRecord> {
        self.refresh_tokens
            .get(&(user_id, hashed_token.to_string()))
            .filter(|record| !record.is_expired())
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refresh records currently held, expired ones included
    pub async fn refresh_token_count(&self) -> usize {
        self.tables.lock().await.refresh_tokens.len()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn save(&self, user: User) -> Result<User, AppError> {
        let mut tables = self.tables.lock().await;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AuthError::DuplicateEmail.into());
        }
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn save(
        &self,
        user_id: Uuid,
        hashed_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, AppError> {
        let record = RefreshTokenRecord::new(user_id, hashed_token.to_string(), expires_at);

        self.tables
            .lock()
            .await
            .refresh_tokens
            .insert((user_id, hashed_token.to_string()), record.clone());

        Ok(record)
    }

    async fn find_by_user_id_and_hashed_token(
        &self,
        user_id: Uuid,
        hashed_token: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.live_token(user_id, hashed_token).cloned())
    }

    async fn delete_by_user_id_and_hashed_token(
        &self,
        user_id: Uuid,
        hashed_token: &str,
    ) -> Result<(), AppError> {
        self.tables
            .lock()
            .await
            .refresh_tokens
            .remove(&(user_id, hashed_token.to_string()));

        Ok(())
    }

    async fn rotate(
        &self,
        user_id: Uuid,
        old_hashed_token: &str,
        new_hashed_token: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let mut tables = self.tables.lock().await;

        if tables.live_token(user_id, old_hashed_token).is_none() {
            return Ok(None);
        }
        tables
            .refresh_tokens
            .remove(&(user_id, old_hashed_token.to_string()));

        let record =
            RefreshTokenRecord::new(user_id, new_hashed_token.to_string(), new_expires_at);
        tables
            .refresh_tokens
            .insert((user_id, new_hashed_token.to_string()), record.clone());

        Ok(Some(record))
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut tables = self.tables.lock().await;
        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|(owner, _), _| *owner != user_id);

        Ok((before - tables.refresh_tokens.len()) as u64)
    }

    async fn delete_expired(&self) -> Result<u64, AppError> {
        let mut tables = self.tables.lock().await;
        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|_, record| !record.is_expired());

        Ok((before - tables.refresh_tokens.len()) as u64)
    }
}

#[async_trait]
impl NoteStore for InMemoryStore {
    async fn save(&self, note: Note) -> Result<Note, AppError> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.notes.get(&note.id) {
            if existing.owner_id != note.owner_id {
                return Err(AuthError::Forbidden.into());
            }
        }

        tables.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn find_by_owner_id(&self, owner_id: Uuid) -> Result<Vec<Note>, AppError> {
        let tables = self.tables.lock().await;
        let mut notes: Vec<Note> = tables
            .notes
            .values()
            .filter(|note| note.owner_id == owner_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(notes)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Note>, AppError> {
        Ok(self.tables.lock().await.notes.get(&id).cloned())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError> {
        self.tables.lock().await.notes.remove(&id);
        Ok(())
    }
}
