use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

/// GET /
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": "URL Shortener API is running!",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "shorten": "POST /shorten",
            "redirect": "GET /:shortId",
            "stats": "GET /stats/:shortId",
        },
        "totalUrls": state.resolver.global_stats().total_links,
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "message": "The requested endpoint does not exist",
        })),
    )
}
