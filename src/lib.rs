//! datashare - time-limited, optionally password-protected file sharing.
//!
//! Authenticated owners upload files and receive an unguessable download
//! link valid for one to seven days. Anyone holding the link can download
//! the file until it expires, supplying the password when one was set.

pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::{Config, SharingPolicy};
pub use db::Database;
pub use error::{ErrorKind, Result, ShareError};
pub use file::{
    FileLifecycleManager, FileRecord, FileStorage, ListQuery, PasswordGuard, TokenGenerator,
    UploadRequest,
};
pub use web::WebServer;
