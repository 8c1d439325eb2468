use axum::http::HeaderMap;
use std::net::SocketAddr;

pub mod api;
pub mod limit;
pub mod redirect;
pub mod shorten;
pub mod stats;

/// Determine the client IP.
///
/// X-Forwarded-For (first entry) and X-Real-IP are only consulted when
/// `trust_proxy` is set; otherwise any client could forge them.
pub(crate) fn client_ip(
    headers: &HeaderMap,
    addr: Option<SocketAddr>,
    trust_proxy: bool,
) -> Option<String> {
    if trust_proxy {
        if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            if let Some(ip) = xff.split(',').next().map(str::trim) {
                if !ip.is_empty() {
                    return Some(ip.to_owned());
                }
            }
        }

        if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
            let real_ip = real_ip.trim();
            if !real_ip.is_empty() {
                return Some(real_ip.to_owned());
            }
        }
    }

    addr.map(|addr| addr.ip().to_string())
}
