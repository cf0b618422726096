//! Database schema and migrations for datashare.
//!
//! Migrations are applied in order when the database is opened. The
//! `schema_version` table records which ones have already run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: shared file metadata
    r#"
CREATE TABLE files (
    id                  TEXT PRIMARY KEY,
    owner_id            INTEGER NOT NULL,
    stored_name         TEXT NOT NULL,
    original_name       TEXT NOT NULL,
    relative_path       TEXT NOT NULL,
    size_bytes          INTEGER NOT NULL CHECK (size_bytes > 0),
    mime_type           TEXT NOT NULL,
    download_token      TEXT NOT NULL,
    password_hash       TEXT,            -- Argon2 PHC string, NULL = no password
    expires_at          TEXT NOT NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE UNIQUE INDEX idx_files_download_token ON files(download_token);
CREATE INDEX idx_files_owner_created ON files(owner_id, created_at);
"#,
];
