//! # 缓存键命名规范
//!
//! 缓存键 = `sha256("<METHOD>:<finalURL>")` 的十六进制；
//! 磁盘文件名前缀由 slug 折叠而来，避免路径注入。

use sha2::{Digest, Sha256};

/// slug 文件名前缀的最大长度
const SAFE_SLUG_MAX_LEN: usize = 80;

/// 生成缓存键：`sha256("METHOD:url")` 的 hex
#[must_use]
pub fn cache_key(method: &str, url: &str) -> String {
    let digest = Sha256::digest(format!("{method}:{url}").as_bytes());
    format!("{digest:x}")
}

/// 将 slug 折叠为文件名安全形式
///
/// `[A-Za-z0-9_-]` 以外的字符折叠为 `_`，并截断到80个字符。
#[must_use]
pub fn safe_slug(slug: &str) -> String {
    slug.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(SAFE_SLUG_MAX_LEN)
        .collect()
}

/// 条目文件名主干：`<safeSlug>_<cacheKey>`
#[must_use]
pub fn entry_stem(slug: &str, key: &str) -> String {
    format!("{}_{key}", safe_slug(slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_hex_sha256() {
        let key = cache_key("GET", "https://example.com/");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        // 方法参与散列
        assert_ne!(key, cache_key("HEAD", "https://example.com/"));
    }

    #[test]
    fn safe_slug_folds_and_truncates() {
        assert_eq!(safe_slug("example-com"), "example-com");
        assert_eq!(safe_slug("a.b/c"), "a_b_c");
        let long = "x".repeat(120);
        assert_eq!(safe_slug(&long).len(), 80);
    }
}
