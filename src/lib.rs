use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

pub mod analytics;
pub mod config;
pub mod error;
pub mod handlers;
pub mod id;
pub mod models;
pub mod service;
pub mod store;

use analytics::AnalyticsLog;
use handlers::limit::{shorten_limiter, ShortenLimiter};
use id::IdGenerator;
use service::{ResolveService, ShortenService};
use store::LinkStore;

/// Largest accepted request body.
const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Single-segment paths owned by static routes. A short link with one of
/// these identifiers could never be reached.
pub const RESERVED_IDENTIFIERS: [&str; 2] = ["health", "shorten"];

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub config: config::AppConfig,
    pub shortener: ShortenService,
    pub resolver: ResolveService,
    pub shorten_limiter: Option<ShortenLimiter>,
}

impl AppState {
    /// Fresh, empty store and analytics log wired to both services.
    pub fn new(config: config::AppConfig) -> Self {
        let store = LinkStore::new();
        let analytics = AnalyticsLog::new();
        let generator =
            IdGenerator::with_alphabet(&config.id_alphabet, config.id_length, config.id_max_attempts);

        Self {
            shortener: ShortenService::new(store.clone(), analytics.clone(), generator)
                .with_reserved(RESERVED_IDENTIFIERS),
            resolver: ResolveService::new(store, analytics),
            shorten_limiter: config.shorten_rate_limit.map(shorten_limiter),
            config,
        }
    }
}

// ── Router ─────────────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(state.config.cors_origins.clone()))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let shorten = post(handlers::shorten::shorten).layer(middleware::from_fn_with_state(
        state.clone(),
        handlers::limit::shorten_quota,
    ));

    Router::new()
        // API status
        .route("/", get(handlers::api::index))
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/shorten", shorten)
        .route("/api/stats", get(handlers::stats::global_stats))
        .route("/stats/:short_id", get(handlers::stats::link_stats))
        // Short-link redirect, after the static routes above
        .route("/:short_id", get(handlers::redirect::redirect))
        .fallback(handlers::api::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}
