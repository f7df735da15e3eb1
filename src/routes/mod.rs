mod api;
mod pages;

pub use api::*;
pub use pages::*;

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Room for the text fields on top of the largest accepted file.
const TEXT_FIELDS_ALLOWANCE: usize = 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes + TEXT_FIELDS_ALLOWANCE;

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/kp",
            post(submit_proposal).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/*rest", any(api_not_found))
        .fallback_service(static_files(&state.config.static_folder))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
