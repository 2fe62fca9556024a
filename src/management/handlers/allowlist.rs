//! # 白名单管理处理器

use crate::allowlist::{AllowlistEntry, AllowlistPatch};
use crate::error::ProxyError;
use crate::management::response::{ok_empty, ok_with};
use crate::management::server::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowlistUpsertRequest {
    #[serde(default)]
    pub id: String,
    pub host: String,
    #[serde(default)]
    pub allow_subdomains: bool,
    #[serde(default)]
    pub schemes: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub label: Option<String>,
}

const fn default_true() -> bool {
    true
}

impl AllowlistUpsertRequest {
    fn into_entry(self, id_override: Option<String>) -> AllowlistEntry {
        AllowlistEntry {
            id: id_override.unwrap_or(self.id),
            host: self.host,
            allow_subdomains: self.allow_subdomains,
            schemes: self.schemes,
            enabled: self.enabled,
            label: self.label,
        }
    }
}

/// `GET /internal/allowlist`
pub async fn list(State(state): State<AppState>) -> Response {
    ok_with(json!({ "entries": state.allowlist.list() }))
}

/// `POST /internal/allowlist`
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<AllowlistUpsertRequest>,
) -> Result<Response, ProxyError> {
    let entry = state.allowlist.upsert(request.into_entry(None))?;
    record_admin_action(&state, &format!("白名单新增 {}", entry.id)).await;
    Ok(ok_with(json!({ "entry": entry })))
}

/// `PUT /internal/allowlist/{id}`
pub async fn upsert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AllowlistUpsertRequest>,
) -> Result<Response, ProxyError> {
    let entry = state.allowlist.upsert(request.into_entry(Some(id)))?;
    record_admin_action(&state, &format!("白名单更新 {}", entry.id)).await;
    Ok(ok_with(json!({ "entry": entry })))
}

/// `PATCH /internal/allowlist/{id}`
pub async fn patch_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<AllowlistPatch>,
) -> Result<Response, ProxyError> {
    let entry = state.allowlist.patch(&id, patch)?;
    record_admin_action(&state, &format!("白名单修改 {id}")).await;
    Ok(ok_with(json!({ "entry": entry })))
}

/// `DELETE /internal/allowlist/{id}`
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ProxyError> {
    if !state.allowlist.remove(&id)? {
        return Err(ProxyError::not_found(format!("白名单规则 {id}")));
    }
    record_admin_action(&state, &format!("白名单删除 {id}")).await;
    Ok(ok_empty())
}

/// `POST /internal/allowlist/reload`
pub async fn reload(State(state): State<AppState>) -> Result<Response, ProxyError> {
    let entries = state.allowlist.reload()?;
    record_admin_action(&state, &format!("白名单重载，共{entries}条")).await;
    Ok(ok_with(json!({ "entries": entries })))
}

async fn record_admin_action(state: &AppState, message: &str) {
    state
        .registry
        .record_event("info", "admin-action", None, message, None)
        .await;
}
