//! # 镜像请求流水线
//!
//! 状态机：方法门禁 → 停用检查 → slug查找 → 缓存读取 →
//! 带校验的上游抓取 → 大小门禁 → 内容重写 → 响应组装 → 缓存写入。

use super::headers::filter_response_headers;
use super::upstream::{FetchLimits, fetch_with_redirects};
use crate::app::AppContext;
use crate::cache::{CachedResponse, cache_key};
use crate::error::{ErrorCategory, ProxyError, Result};
use crate::logging::{LogComponent, LogStage, log_proxy_error};
use crate::rewrite::{rewrite_css, rewrite_html};
use crate::{ldebug, linfo};
use axum::body::Body;
use axum::http::{HeaderMap, Method, Response};
use serde_json::json;
use std::collections::BTreeMap;
use url::Url;

/// 处理一次镜像请求
///
/// 错误会被记入事件日志（前置门禁失败除外），再交由上层映射状态码。
pub async fn handle_mirror_request(
    ctx: &AppContext,
    slug: &str,
    tail: &str,
    raw_query: Option<&str>,
    method: &Method,
    inbound_headers: &HeaderMap,
) -> Result<Response<Body>> {
    let request_id = format!("{:08x}", rand::random::<u32>());

    match mirror_inner(ctx, &request_id, slug, tail, raw_query, method, inbound_headers).await {
        Ok(response) => Ok(response),
        Err(e) => {
            if should_record_event(&e) {
                let level = match e.category() {
                    ErrorCategory::Client => "warn",
                    ErrorCategory::Server => "error",
                };
                ctx.registry
                    .record_event(
                        level,
                        e.event_kind(),
                        Some(slug),
                        &e.to_string(),
                        Some(json!({ "tail": tail, "error": e.kind() })),
                    )
                    .await;
            }
            log_proxy_error(
                &request_id,
                LogStage::ResponseFailure,
                LogComponent::Pipeline,
                "mirror_request",
                "镜像请求失败",
                &e,
            );
            Err(e)
        }
    }
}

/// 前置门禁（405/503/404）不进事件日志，其余失败都记录
const fn should_record_event(e: &ProxyError) -> bool {
    !matches!(
        e,
        ProxyError::MethodNotAllowed { .. }
            | ProxyError::ServiceDisabled
            | ProxyError::MirrorNotFound { .. }
    )
}

#[allow(clippy::too_many_arguments)]
async fn mirror_inner(
    ctx: &AppContext,
    request_id: &str,
    slug: &str,
    tail: &str,
    raw_query: Option<&str>,
    method: &Method,
    inbound_headers: &HeaderMap,
) -> Result<Response<Body>> {
    if *method != Method::GET && *method != Method::HEAD {
        return Err(ProxyError::method_not_allowed(method.to_string()));
    }
    if ctx.is_service_disabled() {
        return Err(ProxyError::ServiceDisabled);
    }

    let Some(mirror) = ctx.registry.find_by_slug(slug).await? else {
        return Err(ProxyError::mirror_not_found(slug.to_string()));
    };
    if mirror.disabled {
        return Err(ProxyError::mirror_not_found(slug.to_string()));
    }

    let upstream_url = build_upstream_url(&mirror.target_origin, tail, raw_query)?;
    let key = cache_key("GET", upstream_url.as_str());

    // 缓存只服务GET
    if *method == Method::GET {
        if let Some(hit) = ctx.cache.get(slug, &key).await? {
            ldebug!(
                request_id,
                LogStage::CacheRead,
                LogComponent::Cache,
                "cache_hit",
                &format!("缓存命中 {upstream_url}")
            );
            ctx.registry
                .record_event(
                    "info",
                    "cache-hit",
                    Some(slug),
                    &format!("缓存命中 {upstream_url}"),
                    Some(json!({ "url": upstream_url.as_str() })),
                )
                .await;
            return build_response(hit.status, &hit.headers, Some(hit.body), "HIT");
        }
        ctx.registry
            .record_event(
                "info",
                "cache-miss",
                Some(slug),
                &format!("缓存未命中 {upstream_url}"),
                Some(json!({ "url": upstream_url.as_str() })),
            )
            .await;
    }

    let outcome = fetch_with_redirects(
        &ctx.http_client,
        &ctx.allowlist,
        method,
        upstream_url,
        inbound_headers,
        ctx.config.enable_http,
        ctx.config.upstream_timeout_ms,
        FetchLimits {
            max_html_bytes: ctx.config.max_html_bytes,
            max_binary_bytes: ctx.config.max_binary_bytes,
        },
    )
    .await?;

    linfo!(
        request_id,
        LogStage::UpstreamFetch,
        LogComponent::Pipeline,
        "upstream_done",
        &format!("上游响应 {} {}", outcome.status, outcome.final_url),
        method = %method,
        body_bytes = outcome.body.len()
    );

    let final_path = {
        let path = outcome.final_url.path();
        let search = outcome
            .final_url
            .query()
            .map(|q| format!("?{q}"))
            .unwrap_or_default();
        format!("{path}{search}")
    };

    // HEAD 短路：只回状态与过滤后的头，不读体、不写缓存
    if *method == Method::HEAD {
        let headers = filter_response_headers(&outcome.headers, false);
        if let Err(e) = ctx.registry.touch(mirror.id, Some(final_path)).await {
            tracing::warn!(slug = slug, error = %e, "lastPath更新失败");
        }
        return build_response(outcome.status, &headers, None, "MISS");
    }

    // 内容重写：HTML与CSS改写站内引用，其余原样透传
    let content_type = outcome
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let (body, rewritten) = if content_type.contains("text/html") {
        let html = String::from_utf8_lossy(&outcome.body);
        let rewritten_html = rewrite_html(&html, &outcome.final_url, &mirror.target_origin, slug)?;
        (rewritten_html.into_bytes(), true)
    } else if content_type.contains("text/css") {
        let css = String::from_utf8_lossy(&outcome.body);
        let rewritten_css = rewrite_css(&css, &outcome.final_url, &mirror.target_origin, slug);
        (rewritten_css.into_bytes(), true)
    } else {
        (outcome.body, false)
    };

    let headers = filter_response_headers(&outcome.headers, rewritten);

    // 缓存写入：仅2xx的GET；快照不含 x-cache 等合成头
    if (200..300).contains(&outcome.status) {
        let entry = CachedResponse {
            status: outcome.status,
            headers: headers.clone(),
            body: body.clone(),
            content_type: (!content_type.is_empty()).then(|| content_type.clone()),
            cached_at: chrono::Utc::now().timestamp_millis(),
        };
        if let Err(e) = ctx.cache.set(slug, &key, &entry).await {
            tracing::warn!(slug = slug, error = %e, "缓存写入失败");
        }
    }

    if let Err(e) = ctx.registry.touch(mirror.id, Some(final_path)).await {
        tracing::warn!(slug = slug, error = %e, "lastPath更新失败");
    }

    build_response(outcome.status, &headers, Some(body), "MISS")
}

/// 由目标origin + tail + 原始查询串构造上游URL
fn build_upstream_url(target_origin: &str, tail: &str, raw_query: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(target_origin)
        .map_err(|e| ProxyError::internal(format!("登记的origin非法 {target_origin}: {e}")))?;
    let tail = tail.trim_start_matches('/');
    url.set_path(&format!("/{tail}"));
    // 原始查询串原样透传，present-but-empty（裸 `?`）也保留
    url.set_query(raw_query);
    Ok(url)
}

/// 组装出站响应
///
/// `x-cache` 与 `x-robots-tag` 永远在此处新写，缓存快照里的同名头被忽略。
fn build_response(
    status: u16,
    headers: &BTreeMap<String, String>,
    body: Option<Vec<u8>>,
    cache_state: &str,
) -> Result<Response<Body>> {
    let mut builder = Response::builder().status(status);
    for (name, value) in headers {
        if name == "x-cache" || name == "x-robots-tag" {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder = builder
        .header("x-cache", cache_state)
        .header("x-robots-tag", "noindex, nofollow");

    builder
        .body(body.map_or_else(Body::empty, Body::from))
        .map_err(|e| ProxyError::internal_with_source("响应组装失败", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_url_joins_tail_and_query() {
        let url = build_upstream_url("https://example.com", "a/b", Some("q=1")).unwrap();
        assert_eq!(url.as_str(), "https://example.com/a/b?q=1");

        let url = build_upstream_url("https://example.com", "", None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/");

        // 裸 `?`（有查询串但为空）原样保留
        let url = build_upstream_url("https://example.com", "a", Some("")).unwrap();
        assert_eq!(url.as_str(), "https://example.com/a?");

        // 多余的前导斜杠被归一
        let url = build_upstream_url("https://example.com:8443", "///x", None).unwrap();
        assert_eq!(url.as_str(), "https://example.com:8443/x");
    }

    #[test]
    fn response_always_carries_robots_and_cache_markers() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/html".to_string());
        // 缓存快照里的合成头不得泄漏到响应
        headers.insert("x-cache".to_string(), "MISS".to_string());

        let resp = build_response(200, &headers, Some(b"ok".to_vec()), "HIT").unwrap();
        assert_eq!(resp.headers().get("x-cache").unwrap(), "HIT");
        assert_eq!(
            resp.headers().get("x-robots-tag").unwrap(),
            "noindex, nofollow"
        );
        assert_eq!(resp.headers().get("content-type").unwrap(), "text/html");
    }
}
