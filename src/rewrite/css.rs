//! # CSS重写器
//!
//! 逐字节扫描，只改写 `url(...)` 函数参数与 `@import` 的字符串参数，
//! 其余token（含注释与无关字符串）原样保留。

use super::{CSS_SKIP_SCHEMES, RewriteTarget};
use url::Url;

/// 重写一份CSS文本
#[must_use]
pub fn rewrite_css(css: &str, base_url: &Url, target_origin: &str, slug: &str) -> String {
    let target = RewriteTarget::new(base_url, target_origin, slug);
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut i = 0usize;

    while i < bytes.len() {
        // 注释整体跳过
        if bytes[i..].starts_with(b"/*") {
            let end = find_subslice(&bytes[i + 2..], b"*/")
                .map_or(bytes.len(), |pos| i + 2 + pos + 2);
            out.push_str(&css[i..end]);
            i = end;
            continue;
        }

        // url( 函数
        if starts_with_url_fn(bytes, i) {
            let (consumed, rewritten) = rewrite_url_fn(css, i, &target);
            out.push_str(&rewritten);
            i = consumed;
            continue;
        }

        // @import 后的裸字符串参数（url() 形式由上面的分支处理）
        if starts_with_ignore_case(bytes, i, b"@import") && is_boundary(bytes, i + 7) {
            out.push_str(&css[i..i + 7]);
            i += 7;
            let ws_end = skip_whitespace(bytes, i);
            out.push_str(&css[i..ws_end]);
            i = ws_end;
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let (consumed, rewritten) = rewrite_string_token(css, i, &target);
                out.push_str(&rewritten);
                i = consumed;
            }
            continue;
        }

        // 无关字符串原样保留，避免误改 content: "..." 之类
        if bytes[i] == b'"' || bytes[i] == b'\'' {
            let end = string_token_end(bytes, i);
            out.push_str(&css[i..end]);
            i = end;
            continue;
        }

        let ch_len = utf8_len(bytes[i]);
        out.push_str(&css[i..i + ch_len]);
        i += ch_len;
    }

    out
}

/// 处理一个 `url(...)`，返回（扫描终点, 输出文本）
fn rewrite_url_fn(css: &str, start: usize, target: &RewriteTarget<'_>) -> (usize, String) {
    let bytes = css.as_bytes();
    // "url(" 之后
    let mut i = start + 4;
    i = skip_whitespace(bytes, i);

    if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
        let quote = bytes[i] as char;
        let end = string_token_end(bytes, i);
        let inner = &css[i + 1..end.saturating_sub(1).max(i + 1)];
        let close = find_close_paren(bytes, end);
        match target.rewrite(inner, CSS_SKIP_SCHEMES) {
            Some(new_url) => (close, format!("url({quote}{new_url}{quote})")),
            None => (close, css[start..close].to_string()),
        }
    } else {
        // 无引号形式：读到右括号
        let close = find_close_paren(bytes, i);
        let inner_end = close.saturating_sub(1);
        let inner = css[i..inner_end].trim();
        match target.rewrite(inner, CSS_SKIP_SCHEMES) {
            Some(new_url) => (close, format!("url({new_url})")),
            None => (close, css[start..close].to_string()),
        }
    }
}

/// 处理一个字符串token，返回（扫描终点, 输出文本）
fn rewrite_string_token(css: &str, start: usize, target: &RewriteTarget<'_>) -> (usize, String) {
    let bytes = css.as_bytes();
    let quote = bytes[start] as char;
    let end = string_token_end(bytes, start);
    let inner = &css[start + 1..end.saturating_sub(1).max(start + 1)];
    match target.rewrite(inner, CSS_SKIP_SCHEMES) {
        Some(new_url) => (end, format!("{quote}{new_url}{quote}")),
        None => (end, css[start..end].to_string()),
    }
}

/// `url(` 且前一个字符不是标识符成分（排除 `-moz-url(` 之类误配）
fn starts_with_url_fn(bytes: &[u8], i: usize) -> bool {
    if !starts_with_ignore_case(bytes, i, b"url(") {
        return false;
    }
    if i == 0 {
        return true;
    }
    let prev = bytes[i - 1];
    !(prev.is_ascii_alphanumeric() || prev == b'_' || prev == b'-')
}

fn starts_with_ignore_case(bytes: &[u8], i: usize, needle: &[u8]) -> bool {
    bytes.len() >= i + needle.len()
        && bytes[i..i + needle.len()].eq_ignore_ascii_case(needle)
}

/// 后一个位置不是标识符成分
fn is_boundary(bytes: &[u8], i: usize) -> bool {
    bytes.get(i).is_none_or(|&b| !(b.is_ascii_alphanumeric() || b == b'-' || b == b'_'))
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// 字符串token的终点（含收尾引号），处理反斜杠转义
fn string_token_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// 右括号之后的位置；未闭合时返回末尾
fn find_close_paren(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() {
        if bytes[i] == b')' {
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

const fn utf8_len(b: u8) -> usize {
    match b {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://example.com";
    const SLUG: &str = "example-com";

    fn run(css: &str) -> String {
        let base = Url::parse("https://example.com/css/site.css").unwrap();
        rewrite_css(css, &base, ORIGIN, SLUG)
    }

    #[test]
    fn rewrites_unquoted_and_quoted_url() {
        assert_eq!(
            run("body { background: url(/bg.png); }"),
            "body { background: url(/m/example-com/bg.png); }"
        );
        assert_eq!(
            run(r#"body { background: url("/bg.png"); }"#),
            r#"body { background: url("/m/example-com/bg.png"); }"#
        );
        assert_eq!(
            run("a { cursor: url('pointer.cur'); }"),
            "a { cursor: url('/m/example-com/css/pointer.cur'); }"
        );
    }

    #[test]
    fn leaves_data_uri_anchor_and_foreign() {
        let css = "i { background: url(data:image/png;base64,AA==); }";
        assert_eq!(run(css), css);
        let css = "i { mask: url(#clip); }";
        assert_eq!(run(css), css);
        let css = "i { background: url(https://cdn.other/x.png); }";
        assert_eq!(run(css), css);
    }

    #[test]
    fn rewrites_import_string_and_url_forms() {
        assert_eq!(
            run(r#"@import "/theme.css";"#),
            r#"@import "/m/example-com/theme.css";"#
        );
        assert_eq!(
            run("@import url(/theme.css) screen;"),
            "@import url(/m/example-com/theme.css) screen;"
        );
        assert_eq!(
            run("@IMPORT 'other.css';"),
            "@IMPORT '/m/example-com/css/other.css';"
        );
    }

    #[test]
    fn preserves_comments_and_plain_strings() {
        let css = r#"/* url(/not-rewritten.png) */ .x { content: "/plain"; }"#;
        assert_eq!(run(css), css);
    }

    #[test]
    fn preserves_surrounding_whitespace() {
        let css = "div {\n  background:   url( /a.png );\n}";
        let out = run(css);
        assert!(out.starts_with("div {\n  background:   url("));
        assert!(out.contains("/m/example-com/a.png"));
    }

    #[test]
    fn rewrite_is_idempotent() {
        let css = "body { background: url(/bg.png); } @import \"/t.css\";";
        let once = run(css);
        assert_eq!(run(&once), once);
    }
}
