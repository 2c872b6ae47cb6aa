//! 核心中间件模块

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::{sync::Arc, time::Instant};
use tracing::{info, warn};

use super::error::CoreError;

/// 请求日志中间件
pub async fn request_logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let response = next.run(req).await;
    let status = response.status();
    let duration = start.elapsed();

    info!(
        "{} {} - {} - {}ms - User-Agent: {:?}",
        method,
        uri,
        status,
        duration.as_millis(),
        user_agent
    );

    response
}

pub const API_KEY_HEADER: &str = "x-api-key";

/// API Key 认证中间件
///
/// 状态中保存期望的 key；请求头 `X-API-KEY` 必须与之完全相同。
pub async fn api_key_middleware(
    State(expected): State<Arc<str>>,
    req: Request,
    next: Next,
) -> Result<Response, CoreError> {
    let authorized = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|key| key == &*expected);

    if !authorized {
        warn!("Rejected request to {} without a valid API key", req.uri());
        return Err(CoreError::Unauthorized);
    }

    Ok(next.run(req).await)
}
