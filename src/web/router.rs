//! Router configuration for the web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    delete_file, download_file, download_file_as_owner, get_file_info, list_files, upload_file,
    AppState,
};
use super::middleware::{create_cors_layer, jwt_auth, JwtState};

/// Headroom above the largest accepted file for multipart framing and the
/// other form fields.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
) -> Router {
    let max_file_size = usize::try_from(app_state.files.policy().max_file_size).unwrap_or(usize::MAX);
    let body_limit = max_file_size.saturating_add(MULTIPART_OVERHEAD);

    // Authenticated owner routes
    let file_routes = Router::new()
        .route("/", get(list_files).post(upload_file))
        .route("/:id", delete(delete_file))
        .layer(DefaultBodyLimit::max(body_limit));

    // Token-keyed routes; only the owner download needs a bearer token
    let download_routes = Router::new()
        .route("/owner/:token", get(download_file_as_owner))
        .route("/:token", get(get_file_info).post(download_file));

    let api_routes = Router::new()
        .nest("/files", file_routes)
        .nest("/download", download_routes);

    // Clone jwt_state for the middleware closure
    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
