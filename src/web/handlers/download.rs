//! Token-keyed download handlers.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::file::Download;
use crate::web::dto::{DownloadRequest, FileInfoResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// Response header carrying the file id.
pub const X_FILE_ID: &str = "x-file-id";

/// Response header marking an owner download.
pub const X_OWNER_DOWNLOAD: &str = "x-owner-download";

/// `Content-Disposition` for a shared file's original name.
///
/// The quoted `filename` is a printable-ASCII fallback. When the fallback
/// differs from the original name, the exact name follows as an RFC 5987
/// `filename*`.
fn content_disposition(original_name: &str) -> HeaderValue {
    let fallback: String = original_name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c.is_ascii() && c != '"' && c != '\\' { c } else { '_' })
        .collect();

    let value = if fallback == original_name {
        format!("attachment; filename=\"{fallback}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            urlencoding::encode(original_name)
        )
    };
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Build a streaming response for an opened file.
fn stream_response(download: Download, owner: bool) -> Result<Response, ApiError> {
    let record = download.record;
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &record.mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&record.original_name),
        )
        .header(header::CONTENT_LENGTH, record.size_bytes)
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(X_FILE_ID, record.id.to_string());
    if owner {
        builder = builder.header(X_OWNER_DOWNLOAD, "true");
    }

    builder
        .body(Body::from_stream(ReaderStream::new(download.file)))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /api/download/{token} - Public information about a shared file.
pub async fn get_file_info(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<FileInfoResponse>, ApiError> {
    let info = state.files.get_public_info(&token).await?;
    Ok(Json(info.into()))
}

/// POST /api/download/{token} - Download a shared file.
///
/// Body: optional JSON `{ "password": "..." }`.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    body: Option<Json<DownloadRequest>>,
) -> Result<Response, ApiError> {
    let password = body.and_then(|Json(req)| req.password);
    let download = state.files.download(&token, password.as_deref()).await?;
    stream_response(download, false)
}

/// GET /api/download/owner/{token} - Download one of the caller's files
/// without its password.
pub async fn download_file_as_owner(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let download = state
        .files
        .download_as_owner(&token, user.owner_id())
        .await?;
    stream_response(download, true)
}
