//! Physical file storage for datashare.
//!
//! Files are laid out per owner and upload date:
//! ```text
//! {root}/
//! └── 42/
//!     └── 2024/
//!         └── 03/
//!             └── 01/
//!                 └── 6f1c..._report.pdf
//! ```
//!
//! Relative paths are persisted in the metadata store and come back on every
//! load and delete, so each call re-checks that the resolved path stays under
//! the root.

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SharingPolicy;
use crate::{Result, ShareError};

/// Longest sanitized name kept in a stored filename, in characters.
pub const MAX_STORED_NAME_LEN: usize = 200;

/// Location of bytes written by [`FileStorage::store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Path relative to the storage root, `/`-separated.
    pub relative_path: String,
    /// Final path component (`{uuid}_{sanitized name}`).
    pub stored_name: String,
}

/// File storage rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Canonical storage root.
    root: PathBuf,
    max_file_size: u64,
}

impl FileStorage {
    /// Create storage under `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>, policy: &SharingPolicy) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| {
            ShareError::StorageFailure(format!(
                "cannot create storage root {}: {e}",
                root.display()
            ))
        })?;
        let root = root.canonicalize()?;
        info!("File storage initialized at {}", root.display());

        Ok(Self {
            root,
            max_file_size: policy.max_file_size,
        })
    }

    /// Canonical storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` under a fresh owner/date partitioned path.
    pub async fn store(
        &self,
        content: &[u8],
        owner_id: i64,
        original_name: &str,
    ) -> Result<StoredFile> {
        if content.is_empty() {
            return Err(ShareError::EmptyFile);
        }
        let size = content.len() as u64;
        if size > self.max_file_size {
            return Err(ShareError::FileSizeExceeded {
                size,
                max: self.max_file_size,
            });
        }

        let stored_name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(original_name));
        let date_dir = chrono::Utc::now().format("%Y/%m/%d");
        let relative_path = format!("{owner_id}/{date_dir}/{stored_name}");

        let target = self.resolve(&relative_path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                error!("Failed to create directory {}: {}", parent.display(), e);
                ShareError::StorageFailure(format!("cannot create directory: {e}"))
            })?;
        }

        if let Err(e) = write_new(&target, content).await {
            error!("Failed to store file {}: {}", relative_path, e);
            return Err(ShareError::StorageFailure(format!("cannot write file: {e}")));
        }

        info!("File stored: {} ({} bytes)", relative_path, size);
        Ok(StoredFile {
            relative_path,
            stored_name,
        })
    }

    /// Open a stored file for reading.
    ///
    /// Paths outside the root, absent files and unreadable files all
    /// report [`ShareError::NotFound`].
    pub async fn load(&self, relative_path: &str) -> Result<fs::File> {
        let path = self.resolve(relative_path).map_err(|_| {
            warn!("Refused to load path outside storage root: {}", relative_path);
            ShareError::NotFound(format!("file {relative_path}"))
        })?;
        let path = self.ensure_existing_within(&path).await.map_err(|e| {
            warn!("Cannot resolve stored file {}: {}", relative_path, e);
            ShareError::NotFound(format!("file {relative_path}"))
        })?;

        fs::File::open(&path).await.map_err(|e| {
            warn!("Cannot open stored file {}: {}", relative_path, e);
            ShareError::NotFound(format!("file {relative_path}"))
        })
    }

    /// Delete a stored file.
    ///
    /// Returns `Ok(false)` when the file was already gone. Paths resolving
    /// outside the root are refused with [`ShareError::Forbidden`] and
    /// nothing is touched.
    pub async fn delete(&self, relative_path: &str) -> Result<bool> {
        let path = self.resolve(relative_path).map_err(|e| {
            warn!("Refused to delete path outside storage root: {}", relative_path);
            e
        })?;

        let path = match self.ensure_existing_within(&path).await {
            Ok(path) => path,
            Err(ShareError::NotFound(_)) => {
                warn!("File to delete does not exist: {}", relative_path);
                return Ok(false);
            }
            Err(e) => {
                warn!("Refused to delete {}: {}", relative_path, e);
                return Err(e);
            }
        };

        fs::remove_file(&path).await?;
        info!("File deleted: {}", relative_path);
        Ok(true)
    }

    /// Whether a stored file exists and lies within the root.
    pub async fn exists(&self, relative_path: &str) -> bool {
        match self.resolve(relative_path) {
            Ok(path) => self.ensure_existing_within(&path).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Lexically resolve `relative_path` under the root.
    ///
    /// Rejects absolute paths and any `..` component.
    fn resolve(&self, relative_path: &str) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        let mut depth = 0;
        for component in Path::new(relative_path).components() {
            match component {
                Component::Normal(c) => {
                    resolved.push(c);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(outside_root(relative_path));
                }
            }
        }
        if depth == 0 || !resolved.starts_with(&self.root) {
            return Err(outside_root(relative_path));
        }
        Ok(resolved)
    }

    /// Follow symlinks on an existing path and re-check containment.
    async fn ensure_existing_within(&self, path: &Path) -> Result<PathBuf> {
        let canonical = match fs::canonicalize(path).await {
            Ok(p) => p,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ShareError::NotFound(format!("file {}", path.display())));
            }
            Err(e) => return Err(e.into()),
        };
        if !canonical.starts_with(&self.root) {
            return Err(outside_root(&path.display().to_string()));
        }
        debug!("Resolved stored file {}", canonical.display());
        Ok(canonical)
    }
}

fn outside_root(relative_path: &str) -> ShareError {
    ShareError::Forbidden(format!("path {relative_path} is outside the storage root"))
}

async fn write_new(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;

    let written = match file.write_all(content).await {
        Ok(()) => file.sync_all().await,
        Err(e) => Err(e),
    };
    if written.is_err() {
        // Only remove what this call created.
        drop(file);
        if let Err(e) = fs::remove_file(path).await {
            warn!("Failed to remove partial file {}: {}", path.display(), e);
        }
    }
    written
}

/// Make a client-supplied filename safe to embed in a stored name.
///
/// Characters outside `[A-Za-z0-9._-]` become `_`, runs of `_` collapse to
/// one, and a blank result becomes `unnamed`.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars().take(MAX_STORED_NAME_LEN) {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    if out.is_empty() || out.chars().all(|c| c == '.' || c == '_') {
        "unnamed".to_string()
    } else {
        out
    }
}
