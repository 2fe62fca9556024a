//! # 上游抓取
//!
//! 手动跟随重定向（至多5跳），每一跳都重新过SSRF防护与白名单，
//! 每一跳各自计一个完整的超时周期。响应体带上限读取，超限立即中断。

use super::headers::FORWARD_REQUEST_HEADERS;
use crate::allowlist::AllowlistStore;
use crate::error::{ProxyError, Result};
use crate::guard;
use axum::http::{HeaderMap, Method};
use reqwest::header::LOCATION;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// 重定向跟随上限
pub const MAX_REDIRECT_HOPS: u32 = 5;

/// 响应体大小上限（按content-type分档）
#[derive(Debug, Clone, Copy)]
pub struct FetchLimits {
    pub max_html_bytes: usize,
    pub max_binary_bytes: usize,
}

/// 一次上游抓取的结果
pub struct FetchOutcome {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// 重定向跟随后的最终URL，内容重写以它为基准
    pub final_url: Url,
}

/// 带重定向校验的上游抓取
pub async fn fetch_with_redirects(
    client: &reqwest::Client,
    allowlist: &AllowlistStore,
    method: &Method,
    start_url: Url,
    inbound_headers: &HeaderMap,
    allow_http: bool,
    timeout_ms: u64,
    limits: FetchLimits,
) -> Result<FetchOutcome> {
    let mut current = start_url;
    let mut hops = 0u32;

    loop {
        // 每一跳都重新校验：重定向不得把请求带出安全边界
        guard::assert_safe_url(&current, allow_http).await?;
        if allowlist.match_url(&current).is_none() {
            return Err(ProxyError::domain_not_allowed(
                current.host_str().unwrap_or_default().to_string(),
            ));
        }

        let mut request = client
            .request(method.clone(), current.clone())
            .timeout(Duration::from_millis(timeout_ms))
            .header("cache-control", "no-cache")
            .header("pragma", "no-cache");
        for name in FORWARD_REQUEST_HEADERS {
            if let Some(value) = inbound_headers.get(*name) {
                request = request.header(*name, value.clone());
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_fetch_error(e, &current, timeout_ms))?;

        let status = response.status();
        if status.is_redirection()
            && let Some(location) = response.headers().get(LOCATION)
        {
            let location = location.to_str().map_err(|_| {
                ProxyError::bad_gateway(format!("{current} 返回非法Location头"))
            })?;
            let next = current.join(location).map_err(|e| {
                ProxyError::bad_gateway(format!("重定向目标无法解析 {location}: {e}"))
            })?;

            hops += 1;
            if hops > MAX_REDIRECT_HOPS {
                return Err(ProxyError::too_many_redirects(hops));
            }
            debug!(from = %current, to = %next, hop = hops, "跟随重定向");
            current = next;
            continue;
        }

        let headers = response.headers().clone();
        let body = if *method == Method::HEAD {
            Vec::new()
        } else {
            read_body_capped(response, &headers, limits, &current, timeout_ms).await?
        };

        return Ok(FetchOutcome {
            status: status.as_u16(),
            headers,
            body,
            final_url: current,
        });
    }
}

/// 按上限读取响应体，超限立即中断连接
async fn read_body_capped(
    mut response: reqwest::Response,
    headers: &HeaderMap,
    limits: FetchLimits,
    url: &Url,
    timeout_ms: u64,
) -> Result<Vec<u8>> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let is_html = content_type.contains("text/html");
    let cap = if is_html {
        limits.max_html_bytes
    } else {
        limits.max_binary_bytes
    };

    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| classify_fetch_error(e, url, timeout_ms))?
    {
        if body.len() + chunk.len() > cap {
            let size = body.len() + chunk.len();
            return Err(if is_html {
                ProxyError::HtmlTooLarge { size, limit: cap }
            } else {
                ProxyError::BinaryTooLarge { size, limit: cap }
            });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// 抓取错误归类：超时 / 连接失败 / 其他
fn classify_fetch_error(e: reqwest::Error, url: &Url, timeout_ms: u64) -> ProxyError {
    if e.is_timeout() {
        ProxyError::upstream_timeout_with_source(url.to_string(), timeout_ms, e)
    } else if e.is_connect() {
        ProxyError::bad_gateway_with_source(format!("连接 {url} 失败"), e)
    } else {
        ProxyError::bad_gateway_with_source(format!("请求 {url} 失败"), e)
    }
}
