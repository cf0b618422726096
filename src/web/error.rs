//! API error handling for the datashare web API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{ErrorKind, ShareError};

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Rejected upload or malformed request (400).
    BadRequest,
    /// Missing or invalid bearer token (401).
    Unauthorized,
    /// Protected file requested without a password (401).
    PasswordRequired,
    /// Protected file requested with the wrong password (401).
    PasswordIncorrect,
    /// Caller does not own the file (403).
    Forbidden,
    /// Unknown token or id (404).
    NotFound,
    /// File past its expiration (410).
    Expired,
    /// Upload larger than allowed (413).
    PayloadTooLarge,
    /// Internal server error (500).
    InternalError,
    /// Bytes could not be stored (507).
    InsufficientStorage,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::PasswordRequired => StatusCode::UNAUTHORIZED,
            ErrorCode::PasswordIncorrect => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Expired => StatusCode::GONE,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InsufficientStorage => StatusCode::INSUFFICIENT_STORAGE,
        }
    }

    /// Code a core error kind is reported under.
    pub fn from_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::EmptyFile
            | ErrorKind::DisallowedFileType
            | ErrorKind::InvalidExpiration
            | ErrorKind::WeakPassword => ErrorCode::BadRequest,
            ErrorKind::FileSizeExceeded => ErrorCode::PayloadTooLarge,
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::Expired => ErrorCode::Expired,
            ErrorKind::PasswordRequired => ErrorCode::PasswordRequired,
            ErrorKind::PasswordIncorrect => ErrorCode::PasswordIncorrect,
            ErrorKind::Forbidden => ErrorCode::Forbidden,
            ErrorKind::StorageFailure => ErrorCode::InsufficientStorage,
            ErrorKind::TokenGenerationFailed
            | ErrorKind::Database
            | ErrorKind::Config
            | ErrorKind::Internal => ErrorCode::InternalError,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// When the requested file expired (only for expired files).
    #[serde(rename = "expirationDate", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    expires_at: Option<DateTime<Utc>>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            expires_at: None,
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                expires_at: self.expires_at,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ShareError> for ApiError {
    fn from(err: ShareError) -> Self {
        let code = ErrorCode::from_kind(err.kind());
        let message = match code {
            ErrorCode::InternalError => {
                tracing::error!("Internal error: {}", err);
                "An internal error occurred".to_string()
            }
            ErrorCode::InsufficientStorage => {
                tracing::error!("Storage error: {}", err);
                "The file could not be stored".to_string()
            }
            _ => err.to_string(),
        };

        Self {
            code,
            message,
            expires_at: err.expires_at(),
        }
    }
}
