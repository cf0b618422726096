//! Error types for datashare.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Fieldless classification of [`ShareError`].
///
/// Callers that only need to branch on the failure category (the web layer
/// mapping to status codes, metrics, tests) match on this instead of the
/// payload-carrying variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyFile,
    FileSizeExceeded,
    DisallowedFileType,
    InvalidExpiration,
    WeakPassword,
    NotFound,
    Expired,
    PasswordRequired,
    PasswordIncorrect,
    Forbidden,
    TokenGenerationFailed,
    StorageFailure,
    Database,
    Config,
    Internal,
}

/// Common error type for datashare.
#[derive(Error, Debug)]
pub enum ShareError {
    /// Uploaded content has zero bytes.
    #[error("cannot upload an empty file")]
    EmptyFile,

    /// Uploaded content is larger than the configured maximum.
    #[error("file size {size} bytes exceeds maximum allowed size of {max} bytes")]
    FileSizeExceeded { size: u64, max: u64 },

    /// Filename extension or MIME type is on the denylist.
    #[error("file type not allowed: {0}")]
    DisallowedFileType(String),

    /// Requested lifetime is outside the configured horizon.
    #[error("expiration days must be between {min} and {max}, got {requested}")]
    InvalidExpiration { requested: i64, min: i64, max: i64 },

    /// Supplied password is shorter than the minimum length.
    #[error("password must be at least {min_length} characters long")]
    WeakPassword { min_length: usize },

    /// Token or id does not resolve, or the stored bytes are gone.
    #[error("{0} not found")]
    NotFound(String),

    /// The record exists but its expiration has passed.
    #[error("file expired at {}", .expires_at.to_rfc3339())]
    Expired { expires_at: DateTime<Utc> },

    /// The file is password protected and no password was supplied.
    #[error("this file is password protected")]
    PasswordRequired,

    /// The supplied password does not match.
    #[error("incorrect password")]
    PasswordIncorrect,

    /// The caller does not own the record.
    #[error("access denied: {0}")]
    Forbidden(String),

    /// Every token draw collided with an existing record.
    #[error("could not generate a unique token after {attempts} attempts")]
    TokenGenerationFailed { attempts: usize },

    /// Physical byte storage failed.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected server-side fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ShareError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShareError::EmptyFile => ErrorKind::EmptyFile,
            ShareError::FileSizeExceeded { .. } => ErrorKind::FileSizeExceeded,
            ShareError::DisallowedFileType(_) => ErrorKind::DisallowedFileType,
            ShareError::InvalidExpiration { .. } => ErrorKind::InvalidExpiration,
            ShareError::WeakPassword { .. } => ErrorKind::WeakPassword,
            ShareError::NotFound(_) => ErrorKind::NotFound,
            ShareError::Expired { .. } => ErrorKind::Expired,
            ShareError::PasswordRequired => ErrorKind::PasswordRequired,
            ShareError::PasswordIncorrect => ErrorKind::PasswordIncorrect,
            ShareError::Forbidden(_) => ErrorKind::Forbidden,
            ShareError::TokenGenerationFailed { .. } => ErrorKind::TokenGenerationFailed,
            ShareError::StorageFailure(_) => ErrorKind::StorageFailure,
            ShareError::Database(_) => ErrorKind::Database,
            ShareError::Config(_) => ErrorKind::Config,
            ShareError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Expiration timestamp carried by [`ShareError::Expired`].
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ShareError::Expired { expires_at } => Some(*expires_at),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for ShareError {
    fn from(e: sqlx::Error) -> Self {
        ShareError::Database(e.to_string())
    }
}

impl From<std::io::Error> for ShareError {
    fn from(e: std::io::Error) -> Self {
        ShareError::StorageFailure(e.to_string())
    }
}

/// Result type alias for datashare operations.
pub type Result<T> = std::result::Result<T, ShareError>;
