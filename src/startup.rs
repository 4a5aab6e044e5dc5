use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthService, BcryptPasswordHasher, TokenCodec};
use crate::configuration::{JwtSettings, PasswordSettings};
use crate::middleware::{JwtMiddleware, RequestLogger};
use crate::notes::NoteService;
use crate::routes::{
    delete_note, get_current_user, health_check, list_notes, login, logout, logout_all, refresh,
    register, save_note,
};
use crate::store::{InMemoryStore, PgNoteStore, PgRefreshTokenStore, PgUserStore};

/// Services wired to PostgreSQL
pub fn postgres_services(
    pool: PgPool,
    jwt: &JwtSettings,
    password: &PasswordSettings,
) -> (AuthService, NoteService) {
    let auth = AuthService::new(
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgRefreshTokenStore::new(pool.clone())),
        Arc::new(BcryptPasswordHasher::new(password.bcrypt_cost)),
        TokenCodec::new(jwt),
    );
    let notes = NoteService::new(Arc::new(PgNoteStore::new(pool)));

    (auth, notes)
}

/// Services sharing one in-process store
pub fn memory_services(jwt: &JwtSettings, password: &PasswordSettings) -> (AuthService, NoteService) {
    let store = Arc::new(InMemoryStore::new());
    let auth = AuthService::new(
        store.clone(),
        store.clone(),
        Arc::new(BcryptPasswordHasher::new(password.bcrypt_cost)),
        TokenCodec::new(jwt),
    );
    let notes = NoteService::new(store);

    (auth, notes)
}

pub fn run(
    listener: TcpListener,
    auth: AuthService,
    notes: NoteService,
) -> Result<Server, std::io::Error> {
    let codec = auth.codec().clone();
    let auth = web::Data::new(auth);
    let notes = web::Data::new(notes);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(auth.clone())
            .app_data(notes.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))
            // Protected routes (require JWT access token)
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(codec.clone()))
                    .route("/me", web::get().to(get_current_user))
                    .route("/logout-all", web::post().to(logout_all))
                    .route("/notes", web::post().to(save_note))
                    .route("/notes", web::get().to(list_notes))
                    .route("/notes/{id}", web::delete().to(delete_note)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
