//! # 响应/请求头过滤策略
//!
//! 丢弃与保留列表以常量枚举，不在运行时计算。

use reqwest::header::HeaderMap;
use std::collections::BTreeMap;

/// HTTP/1.1 定义的逐跳头，不得由中间层转发
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "transfer-encoding",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "upgrade",
];

/// 无条件丢弃：上游CSP会拦碎改写后的站内链接；set-cookie 不做会话透传
pub const ALWAYS_DROP_HEADERS: &[&str] = &["content-security-policy", "set-cookie"];

/// 响应体被改写后失效的头
pub const REWRITTEN_DROP_HEADERS: &[&str] = &["content-length", "content-encoding", "etag"];

/// 允许向上游转发的入站请求头
pub const FORWARD_REQUEST_HEADERS: &[&str] = &["user-agent", "accept", "accept-language"];

/// 过滤上游响应头
///
/// 丢弃逐跳头与无条件丢弃列表；`rewritten` 为真时再丢弃随body失效的头。
/// 仅保留可表示为字符串的值。
#[must_use]
pub fn filter_response_headers(upstream: &HeaderMap, rewritten: bool) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (name, value) in upstream {
        let name_str = name.as_str().to_ascii_lowercase();
        if HOP_BY_HOP_HEADERS.contains(&name_str.as_str())
            || ALWAYS_DROP_HEADERS.contains(&name_str.as_str())
        {
            continue;
        }
        if rewritten && REWRITTEN_DROP_HEADERS.contains(&name_str.as_str()) {
            continue;
        }
        if let Ok(value_str) = value.to_str() {
            out.insert(name_str, value_str.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    fn upstream_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            ("content-type", "text/html; charset=utf-8"),
            ("connection", "keep-alive"),
            ("transfer-encoding", "chunked"),
            ("set-cookie", "sid=1"),
            ("content-security-policy", "default-src 'self'"),
            ("content-length", "120"),
            ("etag", "\"abc\""),
            ("x-powered-by", "origin"),
        ] {
            headers.append(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        headers
    }

    #[test]
    fn drops_hop_by_hop_and_blocked() {
        let out = filter_response_headers(&upstream_headers(), false);
        assert!(!out.contains_key("connection"));
        assert!(!out.contains_key("transfer-encoding"));
        assert!(!out.contains_key("set-cookie"));
        assert!(!out.contains_key("content-security-policy"));
        assert_eq!(out.get("content-type").unwrap(), "text/html; charset=utf-8");
        assert_eq!(out.get("content-length").unwrap(), "120");
        assert_eq!(out.get("x-powered-by").unwrap(), "origin");
    }

    #[test]
    fn rewritten_body_drops_stale_entity_headers() {
        let out = filter_response_headers(&upstream_headers(), true);
        assert!(!out.contains_key("content-length"));
        assert!(!out.contains_key("etag"));
        assert!(out.contains_key("content-type"));
    }
}
