//! # 内部接口认证中间件
//!
//! 从 `x-internal-token` 或 `Authorization: Bearer` 中提取令牌，
//! 与配置令牌做恒定时间比较，不匹配一律401。

use crate::error::ProxyError;
use crate::management::server::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Axum内部令牌认证中间件
pub async fn internal_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get("x-internal-token")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
        .or_else(|| {
            request
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(extract_bearer_token)
                .map(ToString::to_string)
        });

    let Some(token) = presented else {
        return ProxyError::unauthorized("缺少内部令牌").into_response();
    };

    if !constant_time_eq(token.as_bytes(), state.config.internal_token.as_bytes()) {
        return ProxyError::unauthorized("内部令牌不匹配").into_response();
    }

    next.run(request).await
}

/// 提取 Bearer Token
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// 恒定时间比较，避免按时间侧信道猜测令牌
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"same-token", b"same-token"));
        assert!(!constant_time_eq(b"same-token", b"different!"));
        assert!(!constant_time_eq(b"short", b"longer-token"));
    }
}
