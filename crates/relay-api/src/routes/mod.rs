//! Route definitions

use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::handlers::{auth, health, upload};
use crate::state::AppState;

/// Create the HTTP router. The WebSocket route is merged in by the server.
pub fn create_router(upload_root: &Path, max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .merge(upload_routes(max_upload_bytes))
        .merge(auth_routes())
        .nest_service("/uploads", ServeDir::new(upload_root))
}

/// Health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health_check))
}

/// Upload routes, with the body limit raised to the configured file size
fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload/file", post(upload::upload_files))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Authentication routes
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
}
