//! # 镜像内容处理器
//!
//! `/m/{slug}` 与 `/m/{slug}/*tail` 的入口，转交代理流水线。

use crate::error::ProxyError;
use crate::management::server::AppState;
use crate::proxy;
use axum::body::Body;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, Method, Response};

/// 镜像站点根路径
pub async fn mirror_root(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
) -> Result<Response<Body>, ProxyError> {
    proxy::handle_mirror_request(&state, &slug, "", query.as_deref(), &method, &headers).await
}

/// 镜像站点子路径
pub async fn mirror_tail(
    State(state): State<AppState>,
    Path((slug, tail)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
) -> Result<Response<Body>, ProxyError> {
    proxy::handle_mirror_request(&state, &slug, &tail, query.as_deref(), &method, &headers).await
}
