/// Note operations
///
/// The owner id is always passed in by the caller (taken from verified access
/// token claims); nothing here reads ambient request state.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AuthError, DatabaseError};
use crate::models::Note;
use crate::store::NoteStore;
use crate::validators::{is_valid_note_content, is_valid_note_title};

/// Fields a client supplies when saving a note
#[derive(Debug, Clone)]
pub struct NoteDraft {
    /// Existing note to overwrite, if any
    pub id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub color: i64,
}

#[derive(Clone)]
pub struct NoteService {
    notes: Arc<dyn NoteStore>,
}

impl NoteService {
    pub fn new(notes: Arc<dyn NoteStore>) -> Self {
        Self { notes }
    }

    /// Create a note, or overwrite one the caller already owns
    pub async fn save(&self, owner_id: Uuid, draft: NoteDraft) -> Result<Note, AppError> {
        let title = is_valid_note_title(&draft.title)?;
        is_valid_note_content(&draft.content)?;

        let id = match draft.id {
            Some(id) => {
                if let Some(existing) = self.notes.find_by_id(id).await? {
                    if existing.owner_id != owner_id {
                        tracing::warn!(
                            user_id = %owner_id,
                            note_id = %id,
                            "Attempt to overwrite another user's note"
                        );
                        return Err(AuthError::Forbidden.into());
                    }
                }
                id
            }
            None => Uuid::new_v4(),
        };

        let note = self
            .notes
            .save(Note {
                id,
                title,
                content: draft.content,
                color: draft.color,
                created_at: Utc::now(),
                owner_id,
            })
            .await?;

        tracing::info!(user_id = %owner_id, note_id = %note.id, "Note saved");
        Ok(note)
    }

    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Note>, AppError> {
        self.notes.find_by_owner_id(owner_id).await
    }

    /// Delete a note the caller owns
    ///
    /// # Errors
    /// - `NotFound` if there is no such note
    /// - `Forbidden` if it belongs to someone else
    pub async fn delete(&self, owner_id: Uuid, note_id: Uuid) -> Result<(), AppError> {
        let note = self
            .notes
            .find_by_id(note_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Note not found".to_string()))?;

        if note.owner_id != owner_id {
            tracing::warn!(
                user_id = %owner_id,
                note_id = %note_id,
                "Attempt to delete another user's note"
            );
            return Err(AuthError::Forbidden.into());
        }

        self.notes.delete_by_id(note_id).await?;

        tracing::info!(user_id = %owner_id, note_id = %note_id, "Note deleted");
        Ok(())
    }
}
