use std::collections::HashSet;

use super::TextSanitizer;

// 内容按原始文本处理的元素，只能靠闭合标签结束
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title", "xmp", "noscript"];

/// 去除 HTML 标记，只保留文本。
///
/// 黑名单中的元素连同整个子树（包括其中的文本）一起删除，其余标签只去掉标记本身。
/// 无法解析的标记按"剥离后放行"处理：未闭合的标签或注释会吞掉余下的内容，
/// 而不是把半个标签留在输出里。结果会去掉首尾空白。
#[derive(Debug, Clone)]
pub struct HtmlSanitizer {
    blocked: HashSet<String>,
}

impl HtmlSanitizer {
    pub fn new<I, S>(blocked_elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            blocked: blocked_elements
                .into_iter()
                .map(|name| name.as_ref().trim().to_ascii_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    fn strip(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find('<') {
            out.push_str(&rest[..start]);
            rest = self.consume(&mut out, &rest[start + 1..]);
        }

        out.push_str(rest);
        out
    }

    /// 处理一个 `<` 之后的内容，返回尚未处理的部分。
    ///
    /// 删掉一段标记后，如果输出末尾是作为文本保留的 `<` 或 `</`，它和后面的内容
    /// 可能拼成新的标签（如 `<<b></b>script>`），此时把它取回来和剩余内容一起重新解析。
    fn consume<'a>(&self, out: &mut String, body: &'a str) -> &'a str {
        let mut markup = Markup::parse(body);
        let mut body = body;
        loop {
            let after = match markup {
                Markup::Text => {
                    out.push('<');
                    return body;
                }
                Markup::Unterminated => return "",
                Markup::Ignored { len } => &body[len..],
                Markup::Tag(tag) => {
                    let after = &body[tag.len..];
                    if tag.kind != TagKind::Close && self.blocked.contains(&tag.name) {
                        // 非 void 元素上的自闭合斜杠不结束元素
                        skip_element(after, &tag.name)
                    } else {
                        after
                    }
                }
            };

            if out.ends_with("</") {
                out.truncate(out.len() - 2);
                markup = match Markup::parse_close(after) {
                    Markup::Text => {
                        out.push_str("</");
                        return after;
                    }
                    other => other,
                };
            } else if out.ends_with('<') {
                out.truncate(out.len() - 1);
                markup = Markup::parse(after);
            } else {
                return after;
            }
            body = after;
        }
    }
}

impl TextSanitizer for HtmlSanitizer {
    fn name(&self) -> &'static str {
        "html"
    }

    fn sanitize(&self, text: &str) -> String {
        // strip 已在单趟内重新解析拼出来的标签，这里再重复到不再变化为止。
        // strip 只会删除内容，所以一定会收敛。
        let mut current = self.strip(text);
        loop {
            let next = self.strip(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current.trim().to_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    SelfClosing,
}

#[derive(Debug)]
struct Tag {
    name: String,
    kind: TagKind,
    /// 标签在 `<` 之后部分（含 `>`）的字节长度
    len: usize,
}

#[derive(Debug)]
enum Markup {
    /// 普通的 `<` 字符，例如 `a < b`
    Text,
    /// 注释、doctype、处理指令
    Ignored { len: usize },
    Tag(Tag),
    Unterminated,
}

impl Markup {
    /// `body` 是 `<` 之后的内容，返回的长度都相对于 `body`
    fn parse(body: &str) -> Markup {
        if let Some(comment) = body.strip_prefix("!--") {
            return match comment.find("-->") {
                Some(end) => Markup::Ignored { len: 3 + end + 3 },
                None => Markup::Unterminated,
            };
        }

        let bytes = body.as_bytes();
        match bytes.first() {
            Some(b'!') | Some(b'?') => match body.find('>') {
                Some(end) => Markup::Ignored { len: end + 1 },
                None => Markup::Unterminated,
            },
            Some(b'/') => match Markup::parse_close(&body[1..]) {
                Markup::Tag(tag) => Markup::Tag(Tag {
                    len: tag.len + 1,
                    ..tag
                }),
                other => other,
            },
            Some(c) if c.is_ascii_alphabetic() => parse_tag(body, TagKind::Open),
            _ => Markup::Text,
        }
    }

    /// `body` 是 `</` 之后的内容
    fn parse_close(body: &str) -> Markup {
        match body.as_bytes().first() {
            Some(c) if c.is_ascii_alphabetic() => parse_tag(body, TagKind::Close),
            _ => Markup::Text,
        }
    }
}

fn parse_tag(body: &str, kind: TagKind) -> Markup {
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-' || bytes[i] == b':')
    {
        i += 1;
    }
    let name = body[..i].to_ascii_lowercase();

    // 属性值里的 `>` 不结束标签
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => {
                let kind = if kind == TagKind::Open && i > 0 && bytes[i - 1] == b'/' {
                    TagKind::SelfClosing
                } else {
                    kind
                };
                return Markup::Tag(Tag {
                    name,
                    kind,
                    len: i + 1,
                });
            }
            None => {}
        }
        i += 1;
    }

    Markup::Unterminated
}

/// 跳过被屏蔽元素的剩余部分，返回闭合标签之后的内容；找不到闭合标签时丢弃全部剩余内容。
fn skip_element<'a>(after: &'a str, name: &str) -> &'a str {
    if RAW_TEXT_ELEMENTS.contains(&name) {
        return skip_raw_text(after, name);
    }

    let mut depth = 1usize;
    let mut rest = after;
    while let Some(start) = rest.find('<') {
        let body = &rest[start + 1..];
        rest = match Markup::parse(body) {
            Markup::Tag(tag) if tag.name == name => {
                match tag.kind {
                    TagKind::Open => depth += 1,
                    TagKind::Close => {
                        depth -= 1;
                        if depth == 0 {
                            return &body[tag.len..];
                        }
                    }
                    TagKind::SelfClosing => {}
                }
                &body[tag.len..]
            }
            Markup::Tag(tag) => &body[tag.len..],
            Markup::Ignored { len } => &body[len..],
            Markup::Text => body,
            Markup::Unterminated => return "",
        };
    }
    ""
}

fn skip_raw_text<'a>(after: &'a str, name: &str) -> &'a str {
    let bytes = after.as_bytes();
    let name = name.as_bytes();

    for (pos, _) in after.match_indices("</") {
        let name_start = pos + 2;
        let name_end = name_start + name.len();
        let matches_name = bytes
            .get(name_start..name_end)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name));
        if !matches_name {
            continue;
        }
        match bytes.get(name_end) {
            // `</scripts>` 之类不是闭合标签
            Some(b) if b.is_ascii_alphanumeric() || *b == b'-' => continue,
            _ => {
                return match after[name_end..].find('>') {
                    Some(gt) => &after[name_end + gt + 1..],
                    None => "",
                };
            }
        }
    }
    ""
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> HtmlSanitizer {
        HtmlSanitizer::new(["script", "style", "iframe", "svg"])
    }

    #[test]
    fn strips_markup_and_drops_script_subtree() {
        let output = sanitizer().sanitize("<b>Hello</b> <script>alert(1)</script>");

        assert_eq!(output, "Hello");
        assert!(!output.contains("script"));
        assert!(!output.contains("alert"));
    }

    #[test]
    fn self_closing_blocked_element_still_drops_its_body() {
        let output = HtmlSanitizer::new(["script"]).sanitize("hi <script/>alert(1)</script>");
        assert_eq!(output, "hi");

        assert_eq!(sanitizer().sanitize("a<style />p{}</style>b<iframe/>x</iframe>c"), "abc");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(sanitizer().sanitize("   plain text \n"), "plain text");
        assert_eq!(sanitizer().sanitize(""), "");
    }

    #[test]
    fn keeps_text_of_permitted_elements() {
        assert_eq!(
            sanitizer().sanitize(r#"<p class="x">Price is <a href="/l/1?a=1&b=2">here</a></p>"#),
            "Price is here"
        );
    }

    #[test]
    fn blocked_tags_are_case_insensitive() {
        assert_eq!(
            sanitizer().sanitize("ok <SCRIPT type='text/javascript'>x()</ScRiPt> done"),
            "ok  done"
        );
    }

    #[test]
    fn raw_text_is_not_parsed_as_markup() {
        assert_eq!(
            sanitizer().sanitize("a<script>if (x<y) { s = '</b>'; }</script>b"),
            "ab"
        );
    }

    #[test]
    fn nested_blocked_elements_are_removed_whole() {
        assert_eq!(
            sanitizer().sanitize("x<svg><svg><text>hidden</text></svg>still hidden</svg>y"),
            "xy"
        );
    }

    #[test]
    fn quoted_angle_bracket_does_not_end_tag() {
        assert_eq!(sanitizer().sanitize(r#"<img alt="a > b" src=x>caption"#), "caption");
    }

    #[test]
    fn comments_and_doctype_are_removed() {
        assert_eq!(sanitizer().sanitize("<!DOCTYPE html>a<!-- secret -->b"), "ab");
    }

    #[test]
    fn plain_less_than_is_kept() {
        assert_eq!(sanitizer().sanitize("3 < 5 and 1 <= 2 <3"), "3 < 5 and 1 <= 2 <3");
    }

    #[test]
    fn malformed_markup_degrades_to_strip() {
        assert_eq!(sanitizer().sanitize("before <script>never closed"), "before");
        assert_eq!(sanitizer().sanitize("before <b unterminated"), "before");
        assert_eq!(sanitizer().sanitize("before <!-- open comment"), "before");
    }

    #[test]
    fn rebuilt_tags_are_stripped_again() {
        let output = sanitizer().sanitize("<<b></b>script>alert(1)<</b>/script>");
        assert!(!output.to_lowercase().contains("<script"));
        assert!(!output.contains("alert"));
    }

    #[test]
    fn nested_rebuilt_tags_are_stripped_in_linear_time() {
        let n = 20_000;
        let opening = format!("{}{}", "<".repeat(n), "b>".repeat(n));
        let closing = format!("{}{}", "</".repeat(n), "b>".repeat(n));

        let started = std::time::Instant::now();
        assert_eq!(sanitizer().sanitize(&opening), "");
        assert_eq!(sanitizer().sanitize(&closing), "");
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn many_raw_text_elements_are_skipped() {
        let input = "<script>x</script>ok ".repeat(5_000);

        let started = std::time::Instant::now();
        let output = sanitizer().sanitize(&input);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
        assert!(!output.contains('x'));
        assert!(output.starts_with("ok ok"));
    }

    #[test]
    fn unicode_text_survives() {
        assert_eq!(sanitizer().sanitize("<i>你好</i>，世界 ✓"), "你好，世界 ✓");
    }
}
