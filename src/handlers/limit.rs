use super::client_ip;
use crate::{error::AppError, AppState};
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};

/// Per-client quota keyed by client IP.
pub type ShortenLimiter = DefaultKeyedRateLimiter<String>;

/// `per_minute` requests per client, refilled evenly over the minute.
pub fn shorten_limiter(per_minute: NonZeroU32) -> ShortenLimiter {
    RateLimiter::keyed(Quota::per_minute(per_minute))
}

/// Middleware on `POST /shorten`: reject the request with 429 once the
/// client's quota is spent. Clients without a known address share one bucket.
pub async fn shorten_quota(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(limiter) = &state.shorten_limiter {
        let client = client_ip(
            request.headers(),
            connect_info.map(|ConnectInfo(addr)| addr),
            state.config.trust_proxy,
        )
        .unwrap_or_else(|| "Unknown".to_owned());

        if limiter.check_key(&client).is_err() {
            tracing::warn!(%client, "Shorten rate limit exceeded");
            return Err(AppError::TooManyRequests(
                "Too many requests from this IP, please try again later.".into(),
            ));
        }
    }

    Ok(next.run(request).await)
}
