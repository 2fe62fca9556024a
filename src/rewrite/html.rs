//! # HTML重写器
//!
//! 基于 lol_html 的流式改写，分两遍：
//! 第一遍探测 `<meta name="robots">` 是否已存在；
//! 第二遍删除 `<base>`、改写站内属性引用、必要时向 `<head>` 注入 robots 元信息。

use super::{HTML_SKIP_SCHEMES, RewriteTarget, srcset::rewrite_srcset};
use crate::error::{ProxyError, Result};
use lol_html::html_content::ContentType;
use lol_html::{HtmlRewriter, Settings, element};
use std::cell::Cell;
use url::Url;

/// 注入的 robots 元信息
const ROBOTS_META: &str = r#"<meta name="robots" content="noindex,nofollow">"#;

/// (选择器, 待改写属性) 列表
const REWRITE_ATTRS: &[(&str, &str)] = &[
    ("a[href]", "href"),
    ("link[href]", "href"),
    ("script[src]", "src"),
    ("img[src]", "src"),
    ("source[src]", "src"),
    ("video[src]", "src"),
    ("video[poster]", "poster"),
    ("audio[src]", "src"),
    ("iframe[src]", "src"),
    ("form[action]", "action"),
];

/// 携带 srcset 的选择器
const SRCSET_SELECTORS: &[&str] = &["img[srcset]", "source[srcset]"];

/// 重写一份HTML文档
///
/// `base_url` 为重定向跟随后的最终上游URL；`target_origin` 为镜像登记的
/// origin；站外引用原样保留。
pub fn rewrite_html(html: &str, base_url: &Url, target_origin: &str, slug: &str) -> Result<String> {
    let target = RewriteTarget::new(base_url, target_origin, slug);
    let has_robots = detect_robots_meta(html)?;

    let mut output = Vec::with_capacity(html.len() + ROBOTS_META.len());
    let mut handlers = Vec::new();

    // 移除 <base>，镜像路径下的相对解析交给浏览器默认规则
    handlers.push(element!("base", |el| {
        el.remove();
        Ok(())
    }));

    if !has_robots {
        handlers.push(element!("head", |el| {
            el.prepend(ROBOTS_META, ContentType::Html);
            Ok(())
        }));
    }

    for (selector, attr) in REWRITE_ATTRS {
        let target = &target;
        handlers.push(element!(*selector, move |el| {
            if let Some(value) = el.get_attribute(attr)
                && let Some(rewritten) = target.rewrite(&value, HTML_SKIP_SCHEMES)
            {
                el.set_attribute(attr, &rewritten)?;
            }
            Ok(())
        }));
    }

    for selector in SRCSET_SELECTORS {
        let target = &target;
        handlers.push(element!(*selector, move |el| {
            if let Some(value) = el.get_attribute("srcset")
                && let Some(rewritten) =
                    rewrite_srcset(&value, |url| target.rewrite(url, HTML_SKIP_SCHEMES))
            {
                el.set_attribute("srcset", &rewritten)?;
            }
            Ok(())
        }));
    }

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: handlers,
            ..Settings::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| ProxyError::internal_with_source("HTML重写失败", e))?;
    rewriter
        .end()
        .map_err(|e| ProxyError::internal_with_source("HTML重写失败", e))?;

    String::from_utf8(output)
        .map_err(|e| ProxyError::internal_with_source("HTML重写输出非UTF-8", e))
}

/// 探测文档中是否已有 `<meta name="robots">`
fn detect_robots_meta(html: &str) -> Result<bool> {
    let found = Cell::new(false);

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("meta[name]", |el| {
                let is_robots = el
                    .get_attribute("name")
                    .is_some_and(|name| name.eq_ignore_ascii_case("robots"));
                if is_robots {
                    found.set(true);
                }
                Ok(())
            })],
            ..Settings::default()
        },
        |_: &[u8]| {},
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| ProxyError::internal_with_source("HTML解析失败", e))?;
    rewriter
        .end()
        .map_err(|e| ProxyError::internal_with_source("HTML解析失败", e))?;

    Ok(found.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://example.com";
    const SLUG: &str = "example-com";

    fn base() -> Url {
        Url::parse("https://example.com/page/index.html").unwrap()
    }

    fn run(html: &str) -> String {
        rewrite_html(html, &base(), ORIGIN, SLUG).unwrap()
    }

    #[test]
    fn rewrites_in_origin_links() {
        let out = run(r#"<a href="/x">x</a><a href="https://other.com/y">y</a>"#);
        assert!(out.contains(r#"<a href="/m/example-com/x">"#));
        assert!(out.contains(r#"<a href="https://other.com/y">"#));
    }

    #[test]
    fn rewrites_relative_against_base_url() {
        let out = run(r#"<img src="pic.png">"#);
        assert!(out.contains(r#"<img src="/m/example-com/page/pic.png">"#));
    }

    #[test]
    fn strips_base_elements() {
        let out = run(r#"<head><base href="/deep/"><title>t</title></head>"#);
        assert!(!out.contains("<base"));
        assert!(out.contains("<title>t</title>"));
    }

    #[test]
    fn injects_robots_meta_when_absent() {
        let out = run("<html><head><title>t</title></head><body></body></html>");
        assert!(out.contains(r#"<meta name="robots" content="noindex,nofollow">"#));
        // 注入在head起始处
        let head_pos = out.find("<head>").unwrap();
        let meta_pos = out.find("<meta name=\"robots\"").unwrap();
        assert!(meta_pos > head_pos);
        assert!(meta_pos < out.find("<title>").unwrap());
    }

    #[test]
    fn keeps_existing_robots_meta() {
        let html = r#"<head><meta name="ROBOTS" content="none"></head>"#;
        let out = run(html);
        assert_eq!(out.matches("robots").count() + out.matches("ROBOTS").count(), 1);
    }

    #[test]
    fn rewrites_srcset_segments() {
        let out = run(r#"<img srcset="/a.png 1x, https://cdn.other/b.png 2x">"#);
        assert!(out.contains("/m/example-com/a.png 1x, https://cdn.other/b.png 2x"));
    }

    #[test]
    fn rewrites_form_action_and_iframe() {
        let out = run(r#"<form action="/submit"></form><iframe src="/frame"></iframe>"#);
        assert!(out.contains(r#"<form action="/m/example-com/submit">"#));
        assert!(out.contains(r#"<iframe src="/m/example-com/frame">"#));
    }

    #[test]
    fn skips_special_schemes() {
        let html = r##"<a href="javascript:void(0)">a</a><a href="#sec">b</a><img src="data:image/gif;base64,AA==">"##;
        let out = run(html);
        assert!(out.contains("javascript:void(0)"));
        assert!(out.contains("#sec"));
        assert!(out.contains("data:image/gif;base64,AA=="));
    }

    #[test]
    fn rewrite_is_idempotent() {
        let html = r#"<html><head></head><body><a href="/x">x</a><img srcset="/a.png 1x"></body></html>"#;
        let once = run(html);
        let twice = run(&once);
        assert_eq!(once, twice);
    }
}
