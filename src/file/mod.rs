//! Shared file handling for datashare.
//!
//! - [`token`]: unguessable download tokens
//! - [`password`]: optional download passwords
//! - [`storage`]: byte storage confined to a root directory
//! - [`mime`]: content type detection and the denylist
//! - [`record`]: file metadata and its repository
//! - [`service`]: the lifecycle rules tying the above together

pub mod mime;
pub mod password;
pub mod record;
pub mod service;
pub mod storage;
pub mod token;

pub use mime::{detect_mime_type, ensure_allowed, OCTET_STREAM};
pub use password::{validate_optional_password, PasswordGuard};
pub use record::{
    parse_sort, FilePage, FileRecord, FileRecordRepository, ListQuery, NewFileRecord,
    SortDirection, SortKey, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use service::{
    Download, FileLifecycleManager, FileListing, ListedFile, PublicFileInfo, UploadRequest,
    UploadedFile, PASSWORD_PROTECTED_MESSAGE,
};
pub use storage::{sanitize_filename, FileStorage, StoredFile};
pub use token::{TokenGenerator, TokenLookup, MAX_TOKEN_ATTEMPTS};
