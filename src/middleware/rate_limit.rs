use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::{AppState, error::AppError};

const UNKNOWN_CLIENT: &str = "unknown";

pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let key = client_key(req.headers(), peer, state.config.trust_proxy);

    if !state.limiter.allow(&key) {
        tracing::info!(client = %key, path = %req.uri().path(), "Request throttled");
        return Err(AppError::RateLimitExceeded);
    }

    Ok(next.run(req).await)
}

/// 解析限流所用的客户端标识
///
/// 只有在受信任代理之后才读取转发头，`X-Forwarded-For` 取最右侧一项（由代理追加）
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let forwarded = trust_proxy
        .then(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .or_else(|| {
                    headers
                        .get("x-forwarded-for")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.rsplit(',').map(str::trim).find(|ip| !ip.is_empty()))
                })
        })
        .flatten();

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => UNKNOWN_CLIENT.to_string(),
    }
}
