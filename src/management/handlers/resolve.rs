//! # 解析处理器
//!
//! `POST /api/resolve`：登记镜像并返回 launch URL；
//! `POST /internal/resolve-test`：只跑校验不落库的试运行。

use crate::error::ProxyError;
use crate::guard;
use crate::management::response::ok_with;
use crate::management::server::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;
use url::Url;

/// 请求体URL的最大长度
const MAX_URL_LEN: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// 解析并登记目标URL
pub async fn resolve(
    State(state): State<AppState>,
    body: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Response, ProxyError> {
    let url = validated_url(body)?;
    let outcome = state.registry.resolve_target_url(&url).await?;
    Ok(ok_with(serde_json::to_value(outcome)?))
}

/// 试运行解析：只做防护与白名单校验，不创建记录
pub async fn resolve_test(
    State(state): State<AppState>,
    body: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Response, ProxyError> {
    let raw = validated_url(body)?;

    let verdict = dry_run(&state, &raw).await;
    let response = match verdict {
        Ok((target_origin, rule_id)) => json!({
            "url": raw,
            "allowed": true,
            "targetOrigin": target_origin,
            "matchedRule": rule_id,
        }),
        Err(e) => json!({
            "url": raw,
            "allowed": false,
            "error": e.kind(),
        }),
    };
    Ok(ok_with(response))
}

async fn dry_run(state: &AppState, raw: &str) -> Result<(String, String), ProxyError> {
    let url = Url::parse(raw).map_err(|e| ProxyError::invalid_url(format!("{raw}: {e}")))?;
    guard::assert_safe_url(&url, state.config.enable_http).await?;
    let Some(rule) = state.allowlist.match_url(&url) else {
        return Err(ProxyError::domain_not_allowed(
            url.host_str().unwrap_or_default().to_string(),
        ));
    };
    Ok((url.origin().ascii_serialization(), rule.id))
}

/// 提取并校验请求体里的URL
fn validated_url(body: Result<Json<ResolveRequest>, JsonRejection>) -> Result<String, ProxyError> {
    let Json(request) = body.map_err(|e| ProxyError::invalid_body(e.to_string()))?;
    let url = request.url.unwrap_or_default();
    let url = url.trim();
    if url.is_empty() {
        return Err(ProxyError::MissingUrl);
    }
    if url.len() > MAX_URL_LEN {
        return Err(ProxyError::invalid_url(format!(
            "URL超过{MAX_URL_LEN}字符"
        )));
    }
    Ok(url.to_string())
}
