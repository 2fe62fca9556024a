//! # 白名单模块
//!
//! 正向放行策略：仅允许镜像明确登记的 host + scheme 组合。
//! 规则持久化为单个JSON文档，内存快照供请求路径无锁读取。

mod store;

use serde::{Deserialize, Serialize};

pub use store::AllowlistStore;

/// 一条白名单规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowlistEntry {
    /// slug 形式的标识
    pub id: String,
    /// 小写主机名，无前后点号
    pub host: String,
    #[serde(default)]
    pub allow_subdomains: bool,
    /// {https, http} 的非空子集，缺省为 ["https"]
    #[serde(default = "default_schemes")]
    pub schemes: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// 白名单JSON文档（磁盘形态）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowlistFile {
    pub version: u32,
    pub entries: Vec<AllowlistEntry>,
}

impl Default for AllowlistFile {
    fn default() -> Self {
        Self {
            version: 1,
            entries: Vec::new(),
        }
    }
}

/// 部分更新输入
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowlistPatch {
    pub host: Option<String>,
    pub allow_subdomains: Option<bool>,
    pub schemes: Option<Vec<String>>,
    pub enabled: Option<bool>,
    pub label: Option<String>,
}

fn default_schemes() -> Vec<String> {
    vec!["https".to_string()]
}

const fn default_enabled() -> bool {
    true
}

/// 主机名归一化：去空白、转小写、去掉首尾点号
#[must_use]
pub fn normalize_host(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().trim_matches('.').to_string()
}

impl AllowlistEntry {
    /// 判定该规则是否匹配给定的 scheme + host
    #[must_use]
    pub fn matches(&self, scheme: &str, host: &str) -> bool {
        if !self.enabled {
            return false;
        }
        if !self.schemes.iter().any(|s| s == scheme) {
            return false;
        }
        if host == self.host {
            return true;
        }
        // 子域匹配要求严格的点边界后缀
        self.allow_subdomains && host.ends_with(&format!(".{}", self.host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(host: &str, allow_subdomains: bool) -> AllowlistEntry {
        AllowlistEntry {
            id: host.replace('.', "-"),
            host: host.to_string(),
            allow_subdomains,
            schemes: default_schemes(),
            enabled: true,
            label: None,
        }
    }

    #[test]
    fn normalize_host_strips_dots_and_case() {
        assert_eq!(normalize_host("  Example.COM. "), "example.com");
        assert_eq!(normalize_host(".foo.bar"), "foo.bar");
    }

    #[test]
    fn exact_match_only_without_subdomains() {
        let e = entry("example.com", false);
        assert!(e.matches("https", "example.com"));
        assert!(!e.matches("https", "sub.example.com"));
        assert!(!e.matches("http", "example.com"));
    }

    #[test]
    fn subdomain_match_requires_dot_boundary() {
        let e = entry("example.com", true);
        assert!(e.matches("https", "sub.example.com"));
        assert!(e.matches("https", "a.b.example.com"));
        // 后缀碰瓷不应命中
        assert!(!e.matches("https", "evilexample.com"));
    }

    #[test]
    fn disabled_entry_never_matches() {
        let mut e = entry("example.com", true);
        e.enabled = false;
        assert!(!e.matches("https", "example.com"));
    }
}
