//! # 服务开关处理器

use crate::management::response::ok_with;
use crate::management::server::AppState;
use axum::extract::State;
use axum::response::Response;
use serde_json::json;

/// `POST /internal/service/disable`
pub async fn disable(State(state): State<AppState>) -> Response {
    set_disabled(&state, true).await
}

/// `POST /internal/service/enable`
pub async fn enable(State(state): State<AppState>) -> Response {
    set_disabled(&state, false).await
}

async fn set_disabled(state: &AppState, disabled: bool) -> Response {
    state.set_service_disabled(disabled);
    let action = if disabled { "停用" } else { "启用" };
    state
        .registry
        .record_event(
            "info",
            "admin-action",
            None,
            &format!("服务已{action}"),
            Some(json!({ "serviceDisabled": disabled })),
        )
        .await;
    ok_with(json!({ "serviceDisabled": disabled }))
}
