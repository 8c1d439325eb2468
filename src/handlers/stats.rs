use crate::{
    error::AppError,
    models::{AccessEvent, GlobalStats},
    AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStatsResponse {
    pub short_id: String,
    pub original_url: String,
    pub short_url: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: Option<DateTime<Utc>>,
    pub total_clicks: u64,
    pub analytics: ClickAnalytics,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickAnalytics {
    pub clicks: u64,
    pub recent_clicks: Vec<AccessEvent>,
}

/// GET /stats/:short_id
pub async fn link_stats(
    State(state): State<Arc<AppState>>,
    Path(short_id): Path<String>,
) -> Result<Json<LinkStatsResponse>, AppError> {
    let stats = state.resolver.stats(&short_id)?;
    let record = stats.record;

    Ok(Json(LinkStatsResponse {
        short_url: state.config.short_url(&record.identifier),
        short_id: record.identifier,
        original_url: record.target_url,
        created_at: record.created_at,
        last_accessed: record.last_accessed_at,
        total_clicks: record.click_count,
        analytics: ClickAnalytics {
            clicks: record.click_count,
            recent_clicks: stats.recent_events,
        },
    }))
}

/// GET /api/stats
pub async fn global_stats(State(state): State<Arc<AppState>>) -> Json<GlobalStats> {
    Json(state.resolver.global_stats())
}
