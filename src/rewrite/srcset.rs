//! srcset 属性处理：逗号分段（括号内的逗号不算分隔符），
//! 每段取 `<url> <descriptor?>`，仅重写URL部分。

/// 重写 srcset 值；没有任何URL被改写时返回 `None`
pub(crate) fn rewrite_srcset<F>(value: &str, rewrite: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut changed = false;
    let mut segments = Vec::new();

    for segment in split_outside_parens(value) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (url, descriptor) = match segment.split_once(char::is_whitespace) {
            Some((url, rest)) => (url, Some(rest.trim())),
            None => (segment, None),
        };

        let rewritten = match rewrite(url) {
            Some(new_url) => {
                changed = true;
                new_url
            }
            None => url.to_string(),
        };

        match descriptor {
            Some(descriptor) if !descriptor.is_empty() => {
                segments.push(format!("{rewritten} {descriptor}"));
            }
            _ => segments.push(rewritten),
        }
    }

    changed.then(|| segments.join(", "))
}

/// 按括号外的逗号切分
fn split_outside_parens(value: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&value[start..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_rewrite(url: &str) -> Option<String> {
        url.strip_prefix('/').map(|rest| format!("/m/s/{rest}"))
    }

    #[test]
    fn rewrites_each_segment_url() {
        let out = rewrite_srcset("/a.png 1x, /b.png 2x", fake_rewrite).unwrap();
        assert_eq!(out, "/m/s/a.png 1x, /m/s/b.png 2x");
    }

    #[test]
    fn keeps_descriptor_and_foreign_urls() {
        let out =
            rewrite_srcset("https://cdn.other/c.png 1x, /d.png 480w", fake_rewrite).unwrap();
        assert_eq!(out, "https://cdn.other/c.png 1x, /m/s/d.png 480w");
    }

    #[test]
    fn none_when_nothing_changes() {
        assert!(rewrite_srcset("https://cdn.other/c.png 1x", fake_rewrite).is_none());
    }

    #[test]
    fn commas_inside_parens_do_not_split() {
        let segments = split_outside_parens("image-set(url(a,b)) 1x, /e.png 2x");
        assert_eq!(segments.len(), 2);
    }
}
