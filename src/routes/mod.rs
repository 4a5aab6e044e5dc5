use actix_web::web;

use crate::error::ErrorContext;
use crate::middleware::RequestId;

mod auth;
mod health_check;
mod notes;

pub use auth::{
    get_current_user, login, logout, logout_all, refresh, register, AuthResponse,
    LoginRequest, RefreshRequest, RegisterRequest, UserResponse,
};
pub use health_check::health_check;
pub use notes::{delete_note, list_notes, save_note, NoteRequest, NoteResponse};

/// Error context tagged with the id the request logger assigned
fn error_context(operation: &str, request_id: Option<web::ReqData<RequestId>>) -> ErrorContext {
    let context = ErrorContext::new(operation);
    match request_id {
        Some(id) => context.with_request_id(id.into_inner().0),
        None => context,
    }
}
