//! Owner-side file handlers: upload, history and deletion.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::file::UploadRequest;
use crate::web::dto::{FileListResponse, FileUploadResponse, ListFilesQuery};
use crate::web::error::{ApiError, ErrorCode};
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

fn multipart_error(e: MultipartError) -> ApiError {
    tracing::warn!("Failed to read multipart data: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(ErrorCode::PayloadTooLarge, "Request body too large")
    } else {
        ApiError::bad_request("Invalid multipart data")
    }
}

/// Parse the optional `expirationDays` form field.
fn parse_expiration_days(raw: &str) -> Result<Option<i64>, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| ApiError::bad_request("expirationDays must be an integer"))
}

/// POST /api/files - Upload a file.
///
/// Multipart fields: `file` (required), `expirationDays`, `password`.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileUploadResponse>), ApiError> {
    let mut filename: Option<String> = None;
    let mut declared_mime_type: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;
    let mut expiration_days: Option<i64> = None;
    let mut password: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                declared_mime_type = field.content_type().map(|s| s.to_string());
                content = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
            }
            "expirationDays" => {
                let raw = field.text().await.map_err(multipart_error)?;
                expiration_days = parse_expiration_days(&raw)?;
            }
            "password" => {
                password = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let content = content.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let filename = filename.unwrap_or_default();

    let uploaded = state
        .files
        .upload_file(UploadRequest {
            content,
            filename,
            declared_mime_type,
            expiration_days,
            password,
            owner_id: user.owner_id(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(uploaded.into())))
}

/// GET /api/files - Page through the caller's files.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<FileListResponse>, ApiError> {
    let listing = state
        .files
        .list_files(user.owner_id(), &query.to_list_query())
        .await?;
    Ok(Json(listing.into()))
}

/// DELETE /api/files/{id} - Delete one of the caller's files.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(file_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let file_id =
        Uuid::parse_str(&file_id).map_err(|_| ApiError::bad_request("Invalid file id"))?;
    state.files.delete_file(file_id, user.owner_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expiration_days() {
        assert_eq!(parse_expiration_days("3").unwrap(), Some(3));
        assert_eq!(parse_expiration_days(" 7 ").unwrap(), Some(7));
        assert_eq!(parse_expiration_days("").unwrap(), None);
        assert_eq!(parse_expiration_days("0").unwrap(), Some(0));
        assert!(parse_expiration_days("soon").is_err());
    }
}
