#![allow(dead_code)]

use std::net::TcpListener;

use notekeeper::auth::AuthService;
use notekeeper::configuration::{get_configuration, DatabaseSettings, JwtSettings, PasswordSettings};
use notekeeper::notes::NoteService;
use notekeeper::startup::{memory_services, postgres_services, run};
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool};

pub const PASSWORD: &str = "SecurePass123";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

pub fn jwt_settings(refresh_token_expiry: i64) -> JwtSettings {
    JwtSettings {
        secret: "integration-test-secret-at-least-32-bytes".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry,
        issuer: "notekeeper-test".to_string(),
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(jwt_settings(604800))
}

fn test_password_settings() -> PasswordSettings {
    PasswordSettings { bcrypt_cost: 4 }
}

pub fn spawn_app_with(jwt: JwtSettings) -> TestApp {
    let (auth, notes) = memory_services(&jwt, &test_password_settings());
    serve(auth, notes)
}

fn serve(auth: AuthService, notes: NoteService) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server = run(listener, auth, notes).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

/// App backed by a fresh, migrated Postgres database
///
/// `None` when no Postgres server is reachable with the configured
/// credentials; callers skip in that case.
pub async fn spawn_pg_app() -> Option<(TestApp, PgPool)> {
    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();

    let pool = configure_database(&configuration.database).await?;
    let (auth, notes) = postgres_services(
        pool.clone(),
        &jwt_settings(604800),
        &test_password_settings(),
    );

    Some((serve(auth, notes), pool))
}

pub async fn configure_database(config: &DatabaseSettings) -> Option<PgPool> {
    let mut connection = match PgConnection::connect(&config.connection_string_without_db()).await {
        Ok(connection) => connection,
        Err(e) => {
            eprintln!("Postgres unavailable, skipping: {}", e);
            return None;
        }
    };
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate the database.");

    Some(pool)
}

impl TestApp {
    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json("/auth/register", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.post_json("/auth/refresh", &json!({ "refresh_token": refresh_token }))
            .await
    }

    /// Register and log in, returning the login response body
    pub async fn signed_in_user(&self, email: &str) -> Value {
        assert_eq!(201, self.register(email, PASSWORD).await.status().as_u16());
        let response = self.login(email, PASSWORD).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse login response")
    }
}
