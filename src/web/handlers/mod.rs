//! API handlers for the web API.

pub mod download;
pub mod files;

pub use download::*;
pub use files::*;

use crate::file::FileLifecycleManager;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// File lifecycle rules.
    pub files: FileLifecycleManager,
}

impl AppState {
    /// Create a new application state.
    pub fn new(files: FileLifecycleManager) -> Self {
        Self { files }
    }
}
