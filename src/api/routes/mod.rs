//! API route modules.

pub mod downloads;
pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/video-download", post(downloads::video_download))
        .route("/video-details", post(downloads::video_details))
        .with_state(state)
}
