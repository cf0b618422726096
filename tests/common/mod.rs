//! Shared helpers for the web API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use tempfile::TempDir;
use uuid::Uuid;

use datashare::config::SharingPolicy;
use datashare::datetime;
use datashare::web::handlers::AppState;
use datashare::web::middleware::{JwtClaims, JwtState};
use datashare::web::router::create_router;
use datashare::{Database, FileLifecycleManager, FileStorage, PasswordGuard};

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";

pub const ALICE: i64 = 1;
pub const BOB: i64 = 2;

/// Router under test plus the resources behind it.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub storage: FileStorage,
    _temp: TempDir,
}

/// Create a test server with default limits.
pub async fn create_test_server() -> TestApp {
    create_test_server_with_policy(SharingPolicy::default()).await
}

/// Create a test server with an in-memory database and temp storage.
pub async fn create_test_server_with_policy(policy: SharingPolicy) -> TestApp {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let storage =
        FileStorage::new(temp.path().join("files"), &policy).expect("Failed to create storage");

    let files = FileLifecycleManager::new(db.clone(), storage.clone(), policy)
        .with_password_guard(PasswordGuard::with_params(1024, 1, 1).unwrap());
    let app_state = Arc::new(AppState::new(files));
    let jwt_state = Arc::new(JwtState::new(JWT_SECRET));

    let router = create_router(app_state, jwt_state, &[]);
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        db,
        storage,
        _temp: temp,
    }
}

/// Bearer header value for `owner_id`.
pub fn bearer(owner_id: i64) -> String {
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = JwtClaims {
        sub: owner_id,
        iat: now,
        exp: now + 900,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to encode token");
    format!("Bearer {token}")
}

/// Multipart form with a single file part.
pub fn file_form(filename: &str, mime: &str, content: &[u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(content.to_vec())
            .file_name(filename)
            .mime_type(mime),
    )
}

/// Move a file's expiration into the past.
pub async fn expire(db: &Database, id: &str) {
    let past = datetime::now() - chrono::Duration::seconds(1);
    sqlx::query("UPDATE files SET expires_at = ? WHERE id = ?")
        .bind(datetime::to_db(&past))
        .bind(id)
        .execute(db.pool())
        .await
        .expect("Failed to expire file");
}

/// A random id no file has.
pub fn unknown_id() -> String {
    Uuid::new_v4().to_string()
}
