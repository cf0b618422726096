//! File lifecycle: upload, public retrieval, owner download, listing and
//! deletion of shared files.

use chrono::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::mime::{detect_mime_type, ensure_allowed};
use super::password::{validate_optional_password, PasswordGuard};
use super::record::{FileRecord, FileRecordRepository, ListQuery, NewFileRecord};
use super::storage::FileStorage;
use super::token::TokenGenerator;
use crate::config::SharingPolicy;
use crate::datetime;
use crate::db::Database;
use crate::{Result, ShareError};

/// Advisory shown with the public info of a protected file.
pub const PASSWORD_PROTECTED_MESSAGE: &str = "This file is password protected";

/// Input of [`FileLifecycleManager::upload_file`].
#[derive(Clone)]
pub struct UploadRequest {
    pub content: Vec<u8>,
    pub filename: String,
    /// Content type claimed by the client, if any.
    pub declared_mime_type: Option<String>,
    /// Requested lifetime; the policy default applies when absent.
    pub expiration_days: Option<i64>,
    pub password: Option<String>,
    pub owner_id: i64,
}

impl std::fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadRequest")
            .field("size", &self.content.len())
            .field("filename", &self.filename)
            .field("declared_mime_type", &self.declared_mime_type)
            .field("expiration_days", &self.expiration_days)
            .field("has_password", &self.password.is_some())
            .field("owner_id", &self.owner_id)
            .finish()
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub record: FileRecord,
    pub download_url: String,
}

/// What an anonymous visitor may learn about a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicFileInfo {
    pub original_name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub is_expired: bool,
    pub has_password: bool,
    pub message: Option<String>,
}

/// Opened file ready to stream.
#[derive(Debug)]
pub struct Download {
    pub record: FileRecord,
    pub file: tokio::fs::File,
}

/// One entry in an owner's listing.
#[derive(Debug, Clone)]
pub struct ListedFile {
    pub record: FileRecord,
    pub download_url: String,
    pub is_expired: bool,
}

/// One page of an owner's listing.
#[derive(Debug, Clone)]
pub struct FileListing {
    pub files: Vec<ListedFile>,
    pub total_count: i64,
    pub total_pages: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Enforces the business rules of shared files.
#[derive(Debug, Clone)]
pub struct FileLifecycleManager {
    db: Database,
    storage: FileStorage,
    passwords: PasswordGuard,
    tokens: TokenGenerator,
    policy: SharingPolicy,
}

impl FileLifecycleManager {
    /// Create a manager with default password hashing and token generation.
    pub fn new(db: Database, storage: FileStorage, policy: SharingPolicy) -> Self {
        Self {
            db,
            storage,
            passwords: PasswordGuard::default(),
            tokens: TokenGenerator::new(),
            policy,
        }
    }

    /// Replace the password hasher.
    pub fn with_password_guard(mut self, passwords: PasswordGuard) -> Self {
        self.passwords = passwords;
        self
    }

    /// Replace the token generator.
    pub fn with_token_generator(mut self, tokens: TokenGenerator) -> Self {
        self.tokens = tokens;
        self
    }

    /// Policy this manager enforces.
    pub fn policy(&self) -> &SharingPolicy {
        &self.policy
    }

    /// Public URL for a download token.
    pub fn download_url(&self, token: &str) -> String {
        format!("{}/{}", self.policy.download_base_url, token)
    }

    fn repository(&self) -> FileRecordRepository<'_> {
        FileRecordRepository::new(self.db.pool())
    }

    /// Validate, store and register an upload.
    ///
    /// Bytes are written before the metadata row; if anything after the
    /// write fails the bytes are removed again on a best-effort basis.
    pub async fn upload_file(&self, request: UploadRequest) -> Result<UploadedFile> {
        let size = request.content.len() as u64;
        info!(
            "Upload started: {} ({} bytes) by owner {}",
            request.filename, size, request.owner_id
        );

        if size > self.policy.max_file_size {
            warn!("File too large: {} bytes > {}", size, self.policy.max_file_size);
            return Err(ShareError::FileSizeExceeded {
                size,
                max: self.policy.max_file_size,
            });
        }
        if size == 0 {
            warn!("Empty file rejected: {}", request.filename);
            return Err(ShareError::EmptyFile);
        }

        let declared = request.declared_mime_type.as_deref();
        let mime_type = detect_mime_type(&request.content, &request.filename, declared);
        ensure_allowed(
            &self.policy,
            &request.filename,
            declared,
            &mime_type,
            &request.content,
        )?;

        let days = self.validate_expiration(request.expiration_days)?;
        let password = validate_optional_password(
            request.password.as_deref(),
            self.policy.min_password_length,
        )?;

        let repo = self.repository();
        let mut token = self.tokens.generate_unique_token(&repo).await?;

        let password_hash = match password {
            Some(p) => Some(self.hash_password(p).await?),
            None => None,
        };

        let stored = self
            .storage
            .store(&request.content, request.owner_id, &request.filename)
            .await?;

        let now = datetime::now();
        let mut new_record = NewFileRecord {
            id: Uuid::new_v4(),
            owner_id: request.owner_id,
            stored_name: stored.stored_name,
            original_name: request.filename,
            relative_path: stored.relative_path,
            size_bytes: size as i64,
            mime_type,
            download_token: token.clone(),
            password_hash,
            expires_at: now + Duration::days(days),
            created_at: now,
        };

        let mut attempts = 1;
        let record = loop {
            match repo.try_create(&new_record).await {
                Ok(Some(record)) => break record,
                Ok(None) if attempts < self.tokens.max_attempts() => {
                    warn!(
                        "Download token taken between check and insert, retrying ({}/{})",
                        attempts,
                        self.tokens.max_attempts()
                    );
                    attempts += 1;
                    token = match self.tokens.generate_unique_token(&repo).await {
                        Ok(token) => token,
                        Err(e) => {
                            self.discard_stored(&new_record.relative_path).await;
                            return Err(e);
                        }
                    };
                    new_record.id = Uuid::new_v4();
                    new_record.download_token = token.clone();
                }
                Ok(None) => {
                    error!("Download token conflicts persisted after {} inserts", attempts);
                    self.discard_stored(&new_record.relative_path).await;
                    return Err(ShareError::TokenGenerationFailed { attempts });
                }
                Err(e) => {
                    error!("Failed to save metadata for {}: {}", new_record.relative_path, e);
                    self.discard_stored(&new_record.relative_path).await;
                    return Err(e);
                }
            }
        };

        let download_url = self.download_url(&token);
        info!(
            "Upload complete: id={} owner={} expires_at={} protected={}",
            record.id,
            record.owner_id,
            record.expires_at,
            record.has_password()
        );

        Ok(UploadedFile {
            record,
            download_url,
        })
    }

    fn validate_expiration(&self, requested: Option<i64>) -> Result<i64> {
        let days = requested.unwrap_or(self.policy.default_expiration_days);
        let (min, max) = (
            self.policy.min_expiration_days,
            self.policy.max_expiration_days,
        );
        if days < min || days > max {
            warn!("Invalid expiration days: {}", days);
            return Err(ShareError::InvalidExpiration {
                requested: days,
                min,
                max,
            });
        }
        Ok(days)
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        let guard = self.passwords.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || guard.hash(&password))
            .await
            .map_err(|e| ShareError::Internal(format!("password hashing task failed: {e}")))?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let guard = self.passwords.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || guard.verify(&password, &hash))
            .await
            .map_err(|e| ShareError::Internal(format!("password check task failed: {e}")))
    }

    async fn discard_stored(&self, relative_path: &str) {
        match self.storage.delete(relative_path).await {
            Ok(_) => debug!("Removed orphaned bytes at {}", relative_path),
            Err(e) => error!("Failed to remove orphaned bytes at {}: {}", relative_path, e),
        }
    }

    async fn find_active_by_token(&self, token: &str) -> Result<FileRecord> {
        let record = self.repository().find_by_token(token).await?.ok_or_else(|| {
            warn!("No file for download token {}", token);
            ShareError::NotFound("download link".to_string())
        })?;

        if record.is_expired() {
            warn!(
                "Access to expired file {} (expired at {})",
                record.id, record.expires_at
            );
            return Err(ShareError::Expired {
                expires_at: record.expires_at,
            });
        }
        Ok(record)
    }

    /// Metadata a visitor sees before downloading.
    pub async fn get_public_info(&self, token: &str) -> Result<PublicFileInfo> {
        let record = self.find_active_by_token(token).await?;
        let has_password = record.has_password();

        Ok(PublicFileInfo {
            original_name: record.original_name,
            size_bytes: record.size_bytes,
            mime_type: record.mime_type,
            expires_at: record.expires_at,
            is_expired: false,
            has_password,
            message: has_password.then(|| PASSWORD_PROTECTED_MESSAGE.to_string()),
        })
    }

    /// Open a file for an anonymous visitor, checking the password if set.
    pub async fn download(&self, token: &str, password: Option<&str>) -> Result<Download> {
        let record = self.find_active_by_token(token).await?;

        if let Some(hash) = &record.password_hash {
            let supplied = match password {
                Some(p) if !p.is_empty() => p,
                _ => {
                    warn!("Download of protected file {} without password", record.id);
                    return Err(ShareError::PasswordRequired);
                }
            };
            if !self.verify_password(supplied, hash).await? {
                warn!("Incorrect password for file {}", record.id);
                return Err(ShareError::PasswordIncorrect);
            }
            debug!("Password accepted for file {}", record.id);
        }

        self.open(record).await
    }

    /// Open a file for its owner. No password is asked.
    pub async fn download_as_owner(&self, token: &str, owner_id: i64) -> Result<Download> {
        let record = self
            .repository()
            .find_by_token(token)
            .await?
            .ok_or_else(|| ShareError::NotFound("file".to_string()))?;

        if record.owner_id != owner_id {
            warn!(
                "Owner download of file {} refused for user {}",
                record.id, owner_id
            );
            return Err(ShareError::Forbidden(
                "you are not the owner of this file".to_string(),
            ));
        }
        if record.is_expired() {
            return Err(ShareError::Expired {
                expires_at: record.expires_at,
            });
        }

        self.open(record).await
    }

    async fn open(&self, record: FileRecord) -> Result<Download> {
        match self.storage.load(&record.relative_path).await {
            Ok(file) => {
                info!(
                    "Download started: {} (id={}, {} bytes)",
                    record.original_name, record.id, record.size_bytes
                );
                Ok(Download { record, file })
            }
            Err(e) => {
                error!(
                    "Metadata/storage divergence: file {} has no readable bytes at {}: {}",
                    record.id, record.relative_path, e
                );
                Err(ShareError::NotFound("file content".to_string()))
            }
        }
    }

    /// One page of an owner's files.
    pub async fn list_files(&self, owner_id: i64, query: &ListQuery) -> Result<FileListing> {
        let now = datetime::now();
        let page = self
            .repository()
            .list_by_owner(owner_id, query, now)
            .await?;
        debug!(
            "Listed {} of {} files for owner {}",
            page.records.len(),
            page.total_count,
            owner_id
        );

        let files = page
            .records
            .into_iter()
            .map(|record| ListedFile {
                download_url: self.download_url(&record.download_token),
                is_expired: record.is_expired_at(now),
                record,
            })
            .collect();

        Ok(FileListing {
            files,
            total_count: page.total_count,
            total_pages: page.total_pages,
            page: page.page,
            page_size: page.page_size,
        })
    }

    /// Delete one of the owner's files, whatever its expiry or protection.
    ///
    /// Physical removal is best effort; the metadata row is always removed.
    pub async fn delete_file(&self, file_id: Uuid, owner_id: i64) -> Result<()> {
        let repo = self.repository();
        let Some(record) = repo.find_by_id_and_owner(file_id, owner_id).await? else {
            return Err(if repo.find_by_id(file_id).await?.is_some() {
                warn!("User {} tried to delete file {} they do not own", owner_id, file_id);
                ShareError::Forbidden("you are not the owner of this file".to_string())
            } else {
                ShareError::NotFound("file".to_string())
            });
        };

        if let Err(e) = self.storage.delete(&record.relative_path).await {
            warn!(
                "Could not delete bytes of file {} at {}: {}",
                record.id, record.relative_path, e
            );
        }
        repo.delete(record.id).await?;

        info!("File deleted: id={} owner={}", record.id, owner_id);
        Ok(())
    }
}
