//! # SSRF 防护模块
//!
//! 对每一个出站URL（包括每个重定向目标）做安全校验：
//! 拒绝私有、回环、链路本地与云元数据地址，防止代理被用作内网跳板。
//!
//! 主机名若是IP字面量则直接校验；否则解析DNS并校验所有返回地址。

use crate::error::{ProxyError, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::warn;
use url::{Host, Url};

/// 被明确封禁的主机名
const BLOCKED_HOSTNAMES: &[&str] = &["localhost", "metadata.google.internal", "169.254.169.254"];

/// 校验出站URL是否安全
///
/// 失败时返回 `invalid_scheme` / `credentials_not_allowed` / `invalid_url` /
/// `ssrf_blocked` / `dns_resolution_failed` 对应的错误。
pub async fn assert_safe_url(url: &Url, allow_http: bool) -> Result<()> {
    match url.scheme() {
        "https" => {}
        "http" if allow_http => {}
        "http" => {
            return Err(ProxyError::invalid_scheme(
                "http 目标未开启（MIRROR_ENABLE_HTTP）",
            ));
        }
        other => {
            return Err(ProxyError::invalid_scheme(format!(
                "不支持的scheme: {other}"
            )));
        }
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(ProxyError::credentials_not_allowed(format!(
            "{} 携带userinfo",
            url.host_str().unwrap_or_default()
        )));
    }

    let Some(host) = url.host() else {
        return Err(ProxyError::invalid_url("URL缺少主机名"));
    };

    match host {
        Host::Ipv4(ip) => assert_safe_ip(IpAddr::V4(ip), url.host_str().unwrap_or_default()),
        Host::Ipv6(ip) => assert_safe_ip(IpAddr::V6(ip), url.host_str().unwrap_or_default()),
        Host::Domain(domain) => {
            let domain = domain.to_ascii_lowercase();
            assert_safe_hostname(&domain)?;
            resolve_and_check(&domain).await
        }
    }
}

/// 校验主机名是否在封禁列表内
fn assert_safe_hostname(hostname: &str) -> Result<()> {
    if BLOCKED_HOSTNAMES.contains(&hostname) || hostname.ends_with(".localhost") {
        warn!(host = hostname, "SSRF拦截: 保留主机名");
        return Err(ProxyError::ssrf_blocked(format!("保留主机名: {hostname}")));
    }
    Ok(())
}

/// 解析DNS并校验每一个返回地址
async fn resolve_and_check(hostname: &str) -> Result<()> {
    // 端口仅用于满足 lookup_host 的地址格式，不参与校验
    let addrs: Vec<IpAddr> = tokio::net::lookup_host((hostname, 443))
        .await
        .map_err(|e| {
            ProxyError::dns_resolution_failed_with_source(format!("无法解析 {hostname}"), e)
        })?
        .map(|addr| addr.ip())
        .collect();

    if addrs.is_empty() {
        return Err(ProxyError::dns_resolution_failed(format!(
            "{hostname} 没有DNS记录"
        )));
    }

    for addr in addrs {
        assert_safe_ip(addr, hostname)?;
    }
    Ok(())
}

/// 校验单个IP地址
fn assert_safe_ip(addr: IpAddr, host_display: &str) -> Result<()> {
    let blocked = match addr {
        IpAddr::V4(v4) => blocked_ipv4_range(v4),
        IpAddr::V6(v6) => blocked_ipv6_range(v6),
    };

    if let Some(range) = blocked {
        warn!(host = host_display, ip = %addr, range = range, "SSRF拦截: 受保护地址段");
        return Err(ProxyError::ssrf_blocked(format!(
            "{host_display} 解析到受保护地址 {addr} ({range})"
        )));
    }
    Ok(())
}

/// IPv4封禁段判定，命中时返回段名
fn blocked_ipv4_range(ip: Ipv4Addr) -> Option<&'static str> {
    let [a, b, c, _] = ip.octets();
    match (a, b, c) {
        (0, ..) => Some("0.0.0.0/8"),
        (10, ..) => Some("10.0.0.0/8"),
        (100, 64..=127, _) => Some("100.64.0.0/10"),
        (127, ..) => Some("127.0.0.0/8"),
        (169, 254, _) => Some("169.254.0.0/16"),
        (172, 16..=31, _) => Some("172.16.0.0/12"),
        (192, 0, 0) => Some("192.0.0.0/24"),
        (192, 0, 2) => Some("192.0.2.0/24"),
        (192, 168, _) => Some("192.168.0.0/16"),
        (198, 18..=19, _) => Some("198.18.0.0/15"),
        (198, 51, 100) => Some("198.51.100.0/24"),
        (203, 0, 113) => Some("203.0.113.0/24"),
        (224.., ..) => Some("224.0.0.0/4+"),
        _ => None,
    }
}

/// IPv6封禁段判定，命中时返回段名
fn blocked_ipv6_range(ip: Ipv6Addr) -> Option<&'static str> {
    if ip.is_loopback() {
        return Some("::1");
    }
    if ip.is_unspecified() {
        return Some("::");
    }

    // IPv4映射地址按映射前的IPv4规则判定
    if let Some(v4) = ip.to_ipv4_mapped() {
        return blocked_ipv4_range(v4);
    }

    let segments = ip.segments();
    // 唯一本地地址 fc00::/7（含 fd00::/8）
    if (segments[0] & 0xfe00) == 0xfc00 {
        return Some("fc00::/7");
    }
    // 链路本地 fe80::/10
    if (segments[0] & 0xffc0) == 0xfe80 {
        return Some("fe80::/10");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let err = assert_safe_url(&parse("ftp://example.com/"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_scheme");

        let err = assert_safe_url(&parse("file:///etc/passwd"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_scheme");
    }

    #[tokio::test]
    async fn http_requires_opt_in() {
        let err = assert_safe_url(&parse("http://93.184.216.34/"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_scheme");

        assert!(assert_safe_url(&parse("http://93.184.216.34/"), true)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn rejects_userinfo() {
        let err = assert_safe_url(&parse("https://user:pw@example.com/"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "credentials_not_allowed");

        let err = assert_safe_url(&parse("https://user@example.com/"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "credentials_not_allowed");
    }

    #[tokio::test]
    async fn blocks_reserved_hostnames() {
        for raw in [
            "https://localhost/",
            "https://foo.localhost/",
            "https://metadata.google.internal/computeMetadata/",
            "https://169.254.169.254/latest/meta-data/",
        ] {
            let err = assert_safe_url(&parse(raw), false).await.unwrap_err();
            assert_eq!(err.kind(), "ssrf_blocked", "{raw}");
        }
    }

    #[tokio::test]
    async fn blocks_private_ipv4_literals() {
        for raw in [
            "https://0.1.2.3/",
            "https://10.0.0.1/",
            "https://100.64.1.1/",
            "https://127.0.0.1/",
            "https://169.254.1.1/",
            "https://172.16.0.1/",
            "https://172.31.255.255/",
            "https://192.0.0.1/",
            "https://192.0.2.5/",
            "https://192.168.1.1/",
            "https://198.18.0.1/",
            "https://198.19.200.3/",
            "https://198.51.100.7/",
            "https://203.0.113.9/",
            "https://224.0.0.1/",
            "https://255.255.255.255/",
        ] {
            let err = assert_safe_url(&parse(raw), false).await.unwrap_err();
            assert_eq!(err.kind(), "ssrf_blocked", "{raw}");
        }
    }

    #[tokio::test]
    async fn blocks_private_ipv6_literals() {
        for raw in [
            "https://[::1]/",
            "https://[::]/",
            "https://[fc00::1]/",
            "https://[fd12:3456::1]/",
            "https://[fe80::1]/",
            "https://[::ffff:10.0.0.1]/",
            "https://[::ffff:192.168.1.1]/",
        ] {
            let err = assert_safe_url(&parse(raw), false).await.unwrap_err();
            assert_eq!(err.kind(), "ssrf_blocked", "{raw}");
        }
    }

    #[tokio::test]
    async fn allows_public_addresses() {
        assert!(assert_safe_url(&parse("https://93.184.216.34/"), false)
            .await
            .is_ok());
        assert!(assert_safe_url(&parse("https://[2606:2800:220:1::1]/"), false)
            .await
            .is_ok());
        // 172.32.x 不在 172.16.0.0/12 范围内
        assert!(assert_safe_url(&parse("https://172.32.0.1/"), false)
            .await
            .is_ok());
        // 198.20.x 不在 198.18.0.0/15 范围内
        assert!(assert_safe_url(&parse("https://198.20.0.1/"), false)
            .await
            .is_ok());
    }

    #[test]
    fn ipv4_range_table() {
        assert_eq!(blocked_ipv4_range(Ipv4Addr::new(8, 8, 8, 8)), None);
        assert_eq!(
            blocked_ipv4_range(Ipv4Addr::new(100, 127, 0, 1)),
            Some("100.64.0.0/10")
        );
        assert_eq!(blocked_ipv4_range(Ipv4Addr::new(100, 128, 0, 1)), None);
        assert_eq!(
            blocked_ipv4_range(Ipv4Addr::new(239, 1, 2, 3)),
            Some("224.0.0.0/4+")
        );
    }
}
