//! Response DTOs for the web API.
//!
//! Field names are camelCase to match the browser client. Password hashes
//! never appear here.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::file::{FileListing, FileRecord, ListedFile, PublicFileInfo, UploadedFile};

/// File metadata returned after an upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadResponse {
    pub id: Uuid,
    pub filename: String,
    pub file_size: i64,
    pub mime_type: String,
    pub download_token: String,
    pub download_url: String,
    pub expiration_date: DateTime<Utc>,
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
}

impl FileUploadResponse {
    fn from_record(record: FileRecord, download_url: String) -> Self {
        Self {
            has_password: record.has_password(),
            id: record.id,
            filename: record.original_name,
            file_size: record.size_bytes,
            mime_type: record.mime_type,
            download_token: record.download_token,
            download_url,
            expiration_date: record.expires_at,
            created_at: record.created_at,
        }
    }
}

impl From<UploadedFile> for FileUploadResponse {
    fn from(uploaded: UploadedFile) -> Self {
        Self::from_record(uploaded.record, uploaded.download_url)
    }
}

/// One entry of the owner's file history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadataResponse {
    #[serde(flatten)]
    pub file: FileUploadResponse,
    pub is_expired: bool,
}

impl From<ListedFile> for FileMetadataResponse {
    fn from(listed: ListedFile) -> Self {
        Self {
            file: FileUploadResponse::from_record(listed.record, listed.download_url),
            is_expired: listed.is_expired,
        }
    }
}

/// Page of the owner's file history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    pub files: Vec<FileMetadataResponse>,
    pub total_elements: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub page_size: i64,
}

impl From<FileListing> for FileListResponse {
    fn from(listing: FileListing) -> Self {
        Self {
            files: listing.files.into_iter().map(Into::into).collect(),
            total_elements: listing.total_count,
            total_pages: listing.total_pages,
            current_page: listing.page,
            page_size: listing.page_size,
        }
    }
}

/// Public information about a download token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfoResponse {
    pub original_filename: String,
    pub file_size: i64,
    pub mime_type: String,
    pub expiration_date: DateTime<Utc>,
    pub is_expired: bool,
    pub has_password: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<PublicFileInfo> for FileInfoResponse {
    fn from(info: PublicFileInfo) -> Self {
        Self {
            original_filename: info.original_name,
            file_size: info.size_bytes,
            mime_type: info.mime_type,
            expiration_date: info.expires_at,
            is_expired: info.is_expired,
            has_password: info.has_password,
            message: info.message,
        }
    }
}
