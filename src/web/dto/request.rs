//! Request DTOs for the web API.

use serde::Deserialize;

use crate::file::{ListQuery, DEFAULT_PAGE_SIZE};

/// Body of a public download request.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadRequest {
    /// Password for protected files.
    #[serde(default)]
    pub password: Option<String>,
}

/// Query string of the file listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    /// Zero-based page (default 0).
    pub page: Option<i64>,
    /// Page size (default 20, at most 100).
    pub size: Option<i64>,
    /// `property[,asc|desc]` (default `createdAt,desc`).
    pub sort: Option<String>,
    /// Include expired files (default true).
    pub include_expired: Option<bool>,
}

impl ListFilesQuery {
    /// Normalize into a repository query.
    pub fn to_list_query(&self) -> ListQuery {
        ListQuery::new(
            self.page.unwrap_or(0),
            self.size.unwrap_or(DEFAULT_PAGE_SIZE),
            self.sort.as_deref(),
            self.include_expired.unwrap_or(true),
        )
    }
}
