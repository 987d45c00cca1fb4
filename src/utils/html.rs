//! Minimal HTML tag scanning.
//!
//! The reference document is machine-maintained and well-formed, so a full
//! DOM is unnecessary; tags are matched with a small syntax-aware tokenizer
//! that tracks byte spans, letting callers splice the source text directly.
//! Raw text elements (script, style) are honored: their content is never
//! tokenized, per the HTML spec.

use std::str::CharIndices;

// =============================================================================
// Tag tokens
// =============================================================================

/// Whether a token is an opening or a closing tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
}

/// A single tag token with its byte span in the source document.
#[derive(Debug, Clone)]
pub struct Tag {
    pub kind: TagKind,
    /// Tag name, lowercased.
    pub name: String,
    /// Parsed attributes (opening tags only).
    pub attrs: Vec<(String, String)>,
    /// Byte offset of the `<`.
    pub start: usize,
    /// Byte offset one past the `>`.
    pub end: usize,
}

impl Tag {
    /// Look up an attribute value by (case-sensitive) name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Check kind and name in one go.
    pub fn is(&self, kind: TagKind, name: &str) -> bool {
        self.kind == kind && self.name == name
    }
}

/// Check if tag content is raw text (never tokenized as markup).
#[inline]
pub fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

// =============================================================================
// Scanner
// =============================================================================

/// Tokenize every tag in the document, in document order.
///
/// Comments and doctype declarations are skipped. The content of raw text
/// elements is skipped up to the matching closing tag.
pub fn scan(html: &str) -> Vec<Tag> {
    let mut tags = Vec::new();
    let mut pos = 0;

    while let Some(offset) = html[pos..].find('<') {
        let start = pos + offset;
        let rest = &html[start..];

        if rest.starts_with("<!--") {
            pos = match html[start..].find("-->") {
                Some(i) => start + i + 3,
                None => html.len(),
            };
            continue;
        }
        if rest.starts_with("<!") {
            pos = skip_past_gt(html, start);
            continue;
        }

        let (kind, name_start) = if rest.starts_with("</") {
            (TagKind::Close, start + 2)
        } else {
            (TagKind::Open, start + 1)
        };

        let Some(name) = read_tag_name(html, name_start) else {
            // Stray `<` (e.g. inside text content); not a tag.
            pos = start + 1;
            continue;
        };

        let attrs_start = name_start + name.len();
        let end = scan_tag_end(html, attrs_start);
        let attrs = if kind == TagKind::Open && end > attrs_start {
            let inner = html[attrs_start..end - 1].trim_end_matches('/');
            parse_attributes(inner)
        } else {
            Vec::new()
        };

        tags.push(Tag {
            kind,
            name: name.clone(),
            attrs,
            start,
            end,
        });

        // Raw text content runs until the matching close tag.
        pos = if kind == TagKind::Open && is_raw_text_element(&name) {
            skip_raw_text(html, end, &name)
        } else {
            end
        };
    }

    tags
}

/// Read a tag name at `pos`; `None` if the character there cannot start one.
fn read_tag_name(html: &str, pos: usize) -> Option<String> {
    let mut name = String::new();
    for c in html[pos..].chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            name.push(c.to_ascii_lowercase());
        } else {
            break;
        }
    }
    (!name.is_empty()).then_some(name)
}

/// Find the byte offset one past the `>` closing a tag, honoring quoted
/// attribute values.
fn scan_tag_end(html: &str, from: usize) -> usize {
    let mut quote: Option<char> = None;
    for (i, c) in html[from..].char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return from + i + 1,
            _ => {}
        }
    }
    html.len()
}

/// Skip past a `>` from `start` (used for doctype declarations).
fn skip_past_gt(html: &str, start: usize) -> usize {
    match html[start..].find('>') {
        Some(i) => start + i + 1,
        None => html.len(),
    }
}

/// Return the offset of the closing tag terminating a raw text element,
/// searched case-insensitively.
fn skip_raw_text(html: &str, from: usize, name: &str) -> usize {
    let needle = format!("</{name}");
    let lower = html[from..].to_ascii_lowercase();
    match lower.find(&needle) {
        Some(i) => from + i,
        None => html.len(),
    }
}

// =============================================================================
// Attribute Parsing
// =============================================================================

/// Parse HTML-style attributes from a string.
///
/// Input: `src="Base/Object.js" defer`
/// Output: `vec![("src", "Base/Object.js"), ("defer", "")]`
pub fn parse_attributes(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = s.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }

        // Read attribute name
        let mut name = String::new();
        name.push(c);
        while let Some(&(_, next)) = chars.peek() {
            if next == '=' || next.is_whitespace() {
                break;
            }
            name.push(next);
            chars.next();
        }

        skip_whitespace(&mut chars);

        // Check for value
        if chars.peek().is_some_and(|&(_, c)| c == '=') {
            chars.next(); // consume '='
            skip_whitespace(&mut chars);

            let value = match chars.peek() {
                Some(&(_, q @ ('"' | '\''))) => {
                    chars.next();
                    let mut val = String::new();
                    for (_, c) in chars.by_ref() {
                        if c == q {
                            break;
                        }
                        val.push(c);
                    }
                    val
                }
                _ => {
                    // Unquoted value (read until whitespace)
                    let mut val = String::new();
                    while let Some(&(_, c)) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        val.push(c);
                        chars.next();
                    }
                    val
                }
            };

            attrs.push((name, value));
        } else {
            // Boolean attribute (no value)
            attrs.push((name, String::new()));
        }
    }

    attrs
}

fn skip_whitespace(chars: &mut std::iter::Peekable<CharIndices<'_>>) {
    while chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
        chars.next();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_basic_tags() {
        let html = r#"<html><head><link rel="stylesheet" href="Main.css"></head></html>"#;
        let tags = scan(html);
        assert_eq!(tags.len(), 5);
        assert!(tags[0].is(TagKind::Open, "html"));
        assert!(tags[1].is(TagKind::Open, "head"));
        assert!(tags[2].is(TagKind::Open, "link"));
        assert_eq!(tags[2].attr("rel"), Some("stylesheet"));
        assert_eq!(tags[2].attr("href"), Some("Main.css"));
        assert!(tags[3].is(TagKind::Close, "head"));
        assert!(tags[4].is(TagKind::Close, "html"));
    }

    #[test]
    fn test_scan_spans_cover_tag_text() {
        let html = r#"  <script src="Base/Object.js"></script>"#;
        let tags = scan(html);
        assert_eq!(tags.len(), 2);
        assert_eq!(&html[tags[0].start..tags[0].end], r#"<script src="Base/Object.js">"#);
        assert_eq!(&html[tags[1].start..tags[1].end], "</script>");
    }

    #[test]
    fn test_scan_raw_text_content_not_tokenized() {
        let html = "<script>if (a < b) { run(\"</div>\") }</script><p></p>";
        let tags = scan(html);
        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        // Nothing inside the script body shows up as a tag; the search for
        // the terminator is textual, so a quoted "</..." would end it, but
        // `a < b` never does.
        assert!(names.starts_with(&["script"]));
        assert!(!names.contains(&"div"));
    }

    #[test]
    fn test_scan_skips_comments_and_doctype() {
        let html = "<!DOCTYPE html><!-- <script src=\"x.js\"> --><body></body>";
        let tags = scan(html);
        assert_eq!(tags.len(), 2);
        assert!(tags[0].is(TagKind::Open, "body"));
    }

    #[test]
    fn test_scan_self_closing_link() {
        let html = r#"<link rel="stylesheet" href="Main.css" />"#;
        let tags = scan(html);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].attr("href"), Some("Main.css"));
    }

    #[test]
    fn test_scan_quoted_gt_in_attribute() {
        let html = r#"<meta content="a > b"><p>"#;
        let tags = scan(html);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].attr("content"), Some("a > b"));
        assert!(tags[1].is(TagKind::Open, "p"));
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes(r#"a="1" b='2' c=3 disabled"#);
        assert_eq!(attrs.len(), 4);
        assert_eq!(attrs[0], ("a".to_string(), "1".to_string()));
        assert_eq!(attrs[1], ("b".to_string(), "2".to_string()));
        assert_eq!(attrs[2], ("c".to_string(), "3".to_string()));
        assert_eq!(attrs[3], ("disabled".to_string(), "".to_string()));
    }
}
