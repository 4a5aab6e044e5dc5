/// Authentication Routes
///
/// Registration, login, token refresh, logout and current user information.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::error_context;
use crate::auth::{AuthService, Claims, TokenPair};
use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::models::User;

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh / logout request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthResponse {
    fn new(pair: TokenPair, expires_in: i64) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// User information response
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// POST /auth/register
///
/// # Errors
/// - 400: invalid email, empty or over-long password
/// - 409: email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
    request_id: Option<web::ReqData<RequestId>>,
) -> Result<HttpResponse, ApiError> {
    let context = error_context("user_registration", request_id);

    let user = auth
        .register(&form.email, &form.password)
        .await
        .map_err(|e| context.reject(e))?;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// POST /auth/login
///
/// # Errors
/// - 401: invalid credentials (unknown email and wrong password look the same)
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
    request_id: Option<web::ReqData<RequestId>>,
) -> Result<HttpResponse, ApiError> {
    let context = error_context("user_login", request_id);

    let pair = auth
        .login(&form.email, &form.password)
        .await
        .map_err(|e| context.reject(e))?;

    let expires_in = auth.codec().access_token_expiry();
    Ok(HttpResponse::Ok().json(AuthResponse::new(pair, expires_in)))
}

/// POST /auth/refresh
///
/// Rotates the refresh token: the presented token is consumed and a new pair
/// is returned. Presenting a consumed token again is rejected.
///
/// # Errors
/// - 401: invalid, expired, already-used or unknown refresh token
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
    request_id: Option<web::ReqData<RequestId>>,
) -> Result<HttpResponse, ApiError> {
    let context = error_context("token_refresh", request_id);

    let pair = auth
        .refresh(&form.refresh_token)
        .await
        .map_err(|e| context.reject(e))?;

    let expires_in = auth.codec().access_token_expiry();
    Ok(HttpResponse::Ok().json(AuthResponse::new(pair, expires_in)))
}

/// POST /auth/logout
pub async fn logout(
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
    request_id: Option<web::ReqData<RequestId>>,
) -> Result<HttpResponse, ApiError> {
    let context = error_context("logout", request_id);

    auth.logout(&form.refresh_token)
        .await
        .map_err(|e| context.reject(e))?;

    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/logout-all
///
/// **Requires valid JWT access token**; revokes every refresh token of the caller.
pub async fn logout_all(
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
    request_id: Option<web::ReqData<RequestId>>,
) -> Result<HttpResponse, ApiError> {
    let context = error_context("logout_all", request_id);
    let user_id = claims.user_id().map_err(|e| context.reject(e))?;
    auth.logout_all(user_id)
        .await
        .map_err(|e| context.reject(e))?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/me
///
/// **Requires valid JWT access token**; claims are injected by the JWT middleware.
pub async fn get_current_user(
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
    request_id: Option<web::ReqData<RequestId>>,
) -> Result<HttpResponse, ApiError> {
    let context = error_context("current_user", request_id);
    let user_id = claims.user_id().map_err(|e| context.reject(e))?;
    let user = auth
        .current_user(user_id)
        .await
        .map_err(|e| context.reject(e))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
