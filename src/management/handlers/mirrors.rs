//! # 镜像记录管理处理器

use crate::error::ProxyError;
use crate::management::response::ok_with;
use crate::management::server::AppState;
use axum::extract::{Path, State};
use axum::response::Response;
use serde_json::json;

/// `GET /internal/mirrors` 所有镜像记录
pub async fn list(State(state): State<AppState>) -> Result<Response, ProxyError> {
    let mirrors = state.registry.list_mirrors().await?;
    Ok(ok_with(json!({ "mirrors": mirrors })))
}

/// `POST /internal/mirrors/{slug}/disable`
pub async fn disable(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ProxyError> {
    set_disabled(&state, &slug, true).await
}

/// `POST /internal/mirrors/{slug}/enable`
pub async fn enable(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ProxyError> {
    set_disabled(&state, &slug, false).await
}

async fn set_disabled(state: &AppState, slug: &str, disabled: bool) -> Result<Response, ProxyError> {
    let mirror = state.registry.set_disabled(slug, disabled).await?;
    let action = if disabled { "停用" } else { "启用" };
    state
        .registry
        .record_event(
            "info",
            "admin-action",
            Some(slug),
            &format!("镜像 {slug} 已{action}"),
            Some(json!({ "disabled": disabled })),
        )
        .await;
    Ok(ok_with(json!({ "mirror": mirror })))
}
