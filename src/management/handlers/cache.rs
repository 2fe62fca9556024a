//! # 缓存管理处理器

use crate::error::ProxyError;
use crate::management::response::ok_with;
use crate::management::server::AppState;
use axum::extract::{Path, State};
use axum::response::Response;
use serde_json::json;

/// `POST /internal/cache/purge` 清空全部缓存
pub async fn purge_all(State(state): State<AppState>) -> Result<Response, ProxyError> {
    let removed = state.cache.purge_all().await?;
    state
        .registry
        .record_event(
            "info",
            "cache-purge",
            None,
            &format!("清空缓存，移除{removed}条"),
            Some(json!({ "removed": removed })),
        )
        .await;
    Ok(ok_with(json!({ "removed": removed })))
}

/// `POST /internal/cache/purge/{slug}` 清除指定slug的缓存
pub async fn purge_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ProxyError> {
    let removed = state.cache.purge_by_slug(&slug).await?;
    state
        .registry
        .record_event(
            "info",
            "cache-purge",
            Some(&slug),
            &format!("清除 {slug} 缓存，移除{removed}条"),
            Some(json!({ "removed": removed })),
        )
        .await;
    Ok(ok_with(json!({ "removed": removed })))
}
