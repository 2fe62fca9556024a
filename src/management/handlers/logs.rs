//! # 事件日志查询处理器

use crate::error::ProxyError;
use crate::management::response::ok_with;
use crate::management::server::AppState;
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

/// 单次查询的默认/最大条数
const DEFAULT_LIMIT: u64 = 100;
const MAX_LIMIT: u64 = 1000;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<u64>,
    pub kind: Option<String>,
    pub slug: Option<String>,
}

/// `GET /internal/logs` 最近事件
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Response, ProxyError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let events = state
        .registry
        .recent_events(limit, query.kind.as_deref(), query.slug.as_deref())
        .await?;
    Ok(ok_with(json!({ "events": events })))
}
