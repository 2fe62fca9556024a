//! slug 派生规则：小写主机名，非字母数字折叠为 `-`，截断到48。

/// slug 主干的最大长度
const BASE_SLUG_MAX_LEN: usize = 48;

/// 从主机名派生 slug 主干
///
/// 连续的非 `[a-z0-9]` 字符折叠为单个 `-`，去掉首尾 `-`；
/// 结果为空时退化为 `site`。
#[must_use]
pub fn base_slug(host: &str) -> String {
    let mut out = String::with_capacity(host.len());
    let mut pending_dash = false;

    for c in host.to_ascii_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }

    let mut slug: String = out.chars().take(BASE_SLUG_MAX_LEN).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "site".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_non_alphanumerics() {
        assert_eq!(base_slug("example.com"), "example-com");
        assert_eq!(base_slug("www.Example.COM"), "www-example-com");
        assert_eq!(base_slug("a__b..c"), "a-b-c");
    }

    #[test]
    fn strips_leading_and_trailing_dashes() {
        assert_eq!(base_slug(".example."), "example");
        assert_eq!(base_slug("--x--"), "x");
    }

    #[test]
    fn truncates_to_48_chars() {
        let host = "a".repeat(100);
        assert_eq!(base_slug(&host).len(), 48);
    }

    #[test]
    fn empty_input_falls_back_to_site() {
        assert_eq!(base_slug(""), "site");
        assert_eq!(base_slug("..."), "site");
    }
}
