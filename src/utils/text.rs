//! 文本工具：slug、Markdown 摘要、按字符截断
//!
//! 所有长度都按 Unicode 字符计算，不按字节。

/// CJK 统一表意文字（含扩展 A/B 与兼容区）
fn is_han(ch: char) -> bool {
    matches!(ch as u32,
        0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xF900..=0xFAFF
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2EBEF
        | 0x3007)
}

/// 从标题生成 slug
///
/// 小写 ASCII 字母、数字和汉字保留，空白与连字符折叠为单个 `-`，其余字符丢弃。
/// 结果可能为空（例如标题全是标点），由调用方兜底。
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || is_han(ch) {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
        }
    }

    slug
}

/// 按字符截断，超长时追加 "..."
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &s[..byte_idx]),
        None => s.to_string(),
    }
}

/// 按字符截取前 n 个字符（不加省略号）
pub fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 去掉 Markdown 标记，得到纯文本
///
/// 移除代码块、行内代码和图片，链接只保留文字，去掉标题/引用/列表前缀和强调符号，最后折叠空白。
pub fn strip_markdown(content: &str) -> String {
    let mut plain = String::with_capacity(content.len());
    let mut in_fence = false;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let body = strip_line_prefix(trimmed);
        strip_inline(body, &mut plain);
        plain.push(' ');
    }

    collapse_whitespace(&plain)
}

fn strip_line_prefix(line: &str) -> &str {
    let mut rest = line;
    loop {
        let before = rest;
        rest = rest.trim_start_matches('>').trim_start();
        let hashes = rest.len() - rest.trim_start_matches('#').len();
        if (1..=6).contains(&hashes) {
            rest = rest[hashes..].trim_start();
        }
        for marker in ["- ", "* ", "+ "] {
            if let Some(stripped) = rest.strip_prefix(marker) {
                rest = stripped.trim_start();
            }
        }
        if rest == before {
            return rest;
        }
    }
}

fn strip_inline(line: &str, out: &mut String) {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '`' => {
                // 行内代码整体丢弃
                match chars[i + 1..].iter().position(|&c| c == '`') {
                    Some(end) => i += end + 2,
                    None => i += 1,
                }
            }
            '!' if chars.get(i + 1) == Some(&'[') => match parse_link(&chars, i + 1) {
                Some((_, next)) => i = next,
                None => {
                    out.push('!');
                    i += 1;
                }
            },
            '[' => match parse_link(&chars, i) {
                Some((text, next)) => {
                    strip_inline(&text, out);
                    i = next;
                }
                None => {
                    out.push('[');
                    i += 1;
                }
            },
            '*' => i += 1,
            '~' if chars.get(i + 1) == Some(&'~') => i += 2,
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
}

/// 解析 `[text](url)`，返回 (text, 下一个字符位置)
fn parse_link(chars: &[char], open: usize) -> Option<(String, usize)> {
    let close = open + 1 + chars[open + 1..].iter().position(|&c| c == ']')?;
    if chars.get(close + 1) != Some(&'(') {
        return None;
    }
    let paren_close = close + 2 + chars[close + 2..].iter().position(|&c| c == ')')?;
    let text: String = chars[open + 1..close].iter().collect();
    Some((text, paren_close + 1))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 生成摘要：去 Markdown 后按字符截断
pub fn generate_excerpt(content: &str, max_chars: usize) -> String {
    truncate_chars(&strip_markdown(content), max_chars)
}

/// XML 文本转义（用于 sitemap / RSS 中的非 CDATA 字段）
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// CDATA 段内不能出现 `]]>`，拆成两个 CDATA 段
pub fn cdata(s: &str) -> String {
    format!("<![CDATA[{}]]>", s.replace("]]>", "]]]]><![CDATA[>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_ascii() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Rust 2024: What's New?  "), "rust-2024-whats-new");
        assert_eq!(slugify("a -- b"), "a-b");
        assert_eq!(slugify("C++ & Rust"), "c-rust");
    }

    #[test]
    fn test_slugify_keeps_cjk() {
        assert_eq!(slugify("我的 第一篇 Blog"), "我的-第一篇-blog");
        assert_eq!(slugify("Rust 学习笔记"), "rust-学习笔记");
    }

    #[test]
    fn test_slugify_only_punctuation_is_empty() {
        assert_eq!(slugify("!!! ???"), "");
    }

    #[test]
    fn test_truncate_by_chars_not_bytes() {
        assert_eq!(truncate_chars("你好世界", 2), "你好...");
        assert_eq!(truncate_chars("你好", 2), "你好");
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(take_chars("你好世界", 3), "你好世");
        assert_eq!(char_len("你好a"), 3);
    }

    #[test]
    fn test_strip_markdown() {
        let md = "# Title\n\nSome **bold** and *italic* text with `code` and a [link](https://x.com).\n\n```rust\nfn main() {}\n```\n\n> quoted\n- item one\n![img](a.png)~~gone~~";
        assert_eq!(
            strip_markdown(md),
            "Title Some bold and italic text with and a link. quoted item one gone"
        );
    }

    #[test]
    fn test_generate_excerpt() {
        let md = "## 标题\n\n这是一段**很长**的正文内容";
        assert_eq!(generate_excerpt(md, 5), "标题 这是...");
        assert_eq!(generate_excerpt("short", 200), "short");
    }

    #[test]
    fn test_escape_xml_and_cdata() {
        assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
        assert_eq!(cdata("x]]>y"), "<![CDATA[x]]]]><![CDATA[>y]]>");
    }
}
