//! # 内容重写模块
//!
//! 将HTML/CSS中指向目标站点自身的引用改写到 `/m/<slug>/…` 之下，
//! 其余引用原样保留。跨站链接不做镜像。

mod css;
mod html;
mod srcset;

use url::Url;

pub use css::rewrite_css;
pub use html::rewrite_html;

/// HTML属性值的跳过前缀
const HTML_SKIP_SCHEMES: &[&str] = &["data:", "mailto:", "tel:", "javascript:"];
/// CSS url() 的跳过前缀
const CSS_SKIP_SCHEMES: &[&str] = &["data:"];

/// 一次重写任务的公共上下文
pub(crate) struct RewriteTarget<'a> {
    /// 重定向跟随后的最终上游URL，相对引用以它为基准
    pub base_url: &'a Url,
    /// 镜像登记的目标origin（`<scheme>://<host>[:<port>]`）
    pub target_origin: &'a str,
    /// `/m/<slug>` 前缀
    pub mirror_prefix: String,
}

impl<'a> RewriteTarget<'a> {
    pub(crate) fn new(base_url: &'a Url, target_origin: &'a str, slug: &str) -> Self {
        Self {
            base_url,
            target_origin,
            mirror_prefix: format!("/m/{slug}"),
        }
    }

    /// 尝试重写单个URL值
    ///
    /// 返回 `None` 表示保持原值：空白值、锚点、跳过协议、
    /// 已在镜像路径之下、解析失败或origin不属于目标站点。
    pub(crate) fn rewrite(&self, raw: &str, skip_schemes: &[&str]) -> Option<String> {
        let value = raw.trim();
        if value.is_empty() || value.starts_with('#') {
            return None;
        }
        let lower = value.to_ascii_lowercase();
        if skip_schemes.iter().any(|s| lower.starts_with(s)) {
            return None;
        }
        // 已重写过的值保持不动（二次重写是无操作）
        if value == self.mirror_prefix
            || value.strip_prefix(&self.mirror_prefix).is_some_and(|rest| {
                rest.starts_with('/') || rest.starts_with('?')
            })
        {
            return None;
        }

        let resolved = self.base_url.join(value).ok()?;
        if resolved.origin().ascii_serialization() != self.target_origin {
            return None;
        }

        let path = resolved.path();
        let search = resolved.query().map(|q| format!("?{q}")).unwrap_or_default();
        if path == "/" {
            Some(format!("{}{search}", self.mirror_prefix))
        } else {
            Some(format!("{}{path}{search}", self.mirror_prefix))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target<'a>(base: &'a Url) -> RewriteTarget<'a> {
        RewriteTarget::new(base, "https://example.com", "example-com")
    }

    #[test]
    fn rewrites_in_origin_references() {
        let base = Url::parse("https://example.com/a/b").unwrap();
        let t = target(&base);
        assert_eq!(
            t.rewrite("/x?q=1", HTML_SKIP_SCHEMES).unwrap(),
            "/m/example-com/x?q=1"
        );
        assert_eq!(
            t.rewrite("relative", HTML_SKIP_SCHEMES).unwrap(),
            "/m/example-com/a/relative"
        );
        assert_eq!(
            t.rewrite("https://example.com/", HTML_SKIP_SCHEMES).unwrap(),
            "/m/example-com"
        );
        // 协议相对引用
        assert_eq!(
            t.rewrite("//example.com/y", HTML_SKIP_SCHEMES).unwrap(),
            "/m/example-com/y"
        );
    }

    #[test]
    fn leaves_foreign_and_special_values() {
        let base = Url::parse("https://example.com/").unwrap();
        let t = target(&base);
        assert!(t.rewrite("https://other.com/x", HTML_SKIP_SCHEMES).is_none());
        assert!(t.rewrite("#anchor", HTML_SKIP_SCHEMES).is_none());
        assert!(t.rewrite("data:image/png;base64,AA==", HTML_SKIP_SCHEMES).is_none());
        assert!(t.rewrite("mailto:x@example.com", HTML_SKIP_SCHEMES).is_none());
        assert!(t.rewrite("tel:+123", HTML_SKIP_SCHEMES).is_none());
        assert!(t.rewrite("JavaScript:void(0)", HTML_SKIP_SCHEMES).is_none());
        assert!(t.rewrite("   ", HTML_SKIP_SCHEMES).is_none());
    }

    #[test]
    fn already_mirrored_value_is_fixed_point() {
        let base = Url::parse("https://example.com/").unwrap();
        let t = target(&base);
        assert!(t.rewrite("/m/example-com/x", HTML_SKIP_SCHEMES).is_none());
        assert!(t.rewrite("/m/example-com?q=1", HTML_SKIP_SCHEMES).is_none());
        // 前缀相似但不同的slug不受影响
        assert!(t.rewrite("/m/example-common/x", HTML_SKIP_SCHEMES).is_some());
    }

    #[test]
    fn port_distinguishes_origin() {
        let base = Url::parse("https://example.com/").unwrap();
        let t = target(&base);
        assert!(t.rewrite("https://example.com:8443/x", HTML_SKIP_SCHEMES).is_none());
    }
}
