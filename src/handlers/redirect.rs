use super::client_ip;
use crate::{error::AppError, models::ClientInfo, AppState};
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, sync::Arc};

/// GET /:short_id
///
/// 1. Resolve the identifier; the click and access event are recorded as
///    part of the lookup.
/// 2. Return a 301 redirect to the exact stored URL.
pub async fn redirect(
    State(state): State<Arc<AppState>>,
    Path(short_id): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let client = ClientInfo {
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        client_address: client_ip(
            &headers,
            connect_info.map(|ConnectInfo(addr)| addr),
            state.config.trust_proxy,
        ),
    };

    let target_url = state.resolver.resolve(&short_id, &client)?;

    Ok((
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, target_url)],
    )
        .into_response())
}
