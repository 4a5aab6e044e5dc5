/// Note Routes
///
/// All routes sit behind the JWT middleware; the owner is the subject of the
/// verified access token.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error_context;
use crate::auth::Claims;
use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::models::Note;
use crate::notes::{NoteDraft, NoteService};

#[derive(Deserialize)]
pub struct NoteRequest {
    pub id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub color: i64,
}

#[derive(Serialize)]
pub struct NoteResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub color: i64,
    pub created_at: String,
    pub owner_id: String,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id.to_string(),
            title: note.title,
            content: note.content,
            color: note.color,
            created_at: note.created_at.to_rfc3339(),
            owner_id: note.owner_id.to_string(),
        }
    }
}

/// POST /api/notes
///
/// # Errors
/// - 400: blank title or oversized content
/// - 403: `id` names a note owned by someone else
pub async fn save_note(
    body: web::Json<NoteRequest>,
    claims: web::ReqData<Claims>,
    notes: web::Data<NoteService>,
    request_id: Option<web::ReqData<RequestId>>,
) -> Result<HttpResponse, ApiError> {
    let context = error_context("save_note", request_id);
    let owner_id = claims.user_id().map_err(|e| context.reject(e))?;
    let body = body.into_inner();

    let note = notes
        .save(
            owner_id,
            NoteDraft {
                id: body.id,
                title: body.title,
                content: body.content,
                color: body.color,
            },
        )
        .await
        .map_err(|e| context.reject(e))?;

    Ok(HttpResponse::Ok().json(NoteResponse::from(note)))
}

/// GET /api/notes
pub async fn list_notes(
    claims: web::ReqData<Claims>,
    notes: web::Data<NoteService>,
    request_id: Option<web::ReqData<RequestId>>,
) -> Result<HttpResponse, ApiError> {
    let context = error_context("list_notes", request_id);
    let owner_id = claims.user_id().map_err(|e| context.reject(e))?;

    let response: Vec<NoteResponse> = notes
        .list(owner_id)
        .await
        .map_err(|e| context.reject(e))?
        .into_iter()
        .map(NoteResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(response))
}

/// DELETE /api/notes/{id}
///
/// # Errors
/// - 403: note belongs to someone else
/// - 404: no such note
pub async fn delete_note(
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
    notes: web::Data<NoteService>,
    request_id: Option<web::ReqData<RequestId>>,
) -> Result<HttpResponse, ApiError> {
    let context = error_context("delete_note", request_id);
    let owner_id = claims.user_id().map_err(|e| context.reject(e))?;
    notes
        .delete(owner_id, path.into_inner())
        .await
        .map_err(|e| context.reject(e))?;

    Ok(HttpResponse::NoContent().finish())
}
