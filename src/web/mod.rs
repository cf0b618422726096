//! Web API module for datashare.
//!
//! A thin HTTP layer over [`crate::file::FileLifecycleManager`]: it parses
//! requests, maps error kinds to status codes and streams downloads.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
