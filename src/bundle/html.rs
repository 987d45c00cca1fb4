//! Reference-document rewriting.
//!
//! Produces the final served document from the reference document: every
//! external resource tag is stripped, inline script blocks are relocated
//! (verbatim, in order) ahead of the injected bundle references, and the
//! security policy is relaxed for runtime evaluation. Tag matching uses the
//! span-tracking scanner, so removal is a byte-range splice rather than a
//! line pattern.

use crate::config::BundleConfig;
use crate::debug;
use crate::utils::html::{self, TagKind};

/// Fixed cosmetic override injected into every rewritten document.
const STYLE_OVERRIDE: &str = "<style> .tab-bar > .navigation-bar > .item.group > .item {height: 16px} .tab-bar > .navigation-bar > .item.group > .item.device-settings { display: none } </style>";

/// Rewrite the reference document for serving against the bundled
/// artifacts.
pub fn rewrite(document: &str, config: &BundleConfig) -> String {
    let tags = html::scan(document);

    // Spans to drop, in document order: external script elements,
    // stylesheet links, and inline script blocks (saved for relocation).
    let mut removals: Vec<(usize, usize)> = Vec::new();
    let mut inline_blocks: Vec<&str> = Vec::new();

    for (i, tag) in tags.iter().enumerate() {
        if tag.is(TagKind::Open, "script") {
            let Some(close) = tags[i + 1..]
                .iter()
                .find(|t| t.is(TagKind::Close, "script"))
            else {
                continue;
            };
            if tag.attr("src").is_none() {
                inline_blocks.push(&document[tag.start..close.end]);
            }
            removals.push(line_span(document, tag.start, close.end));
        } else if tag.is(TagKind::Open, "link") && tag.attr("rel") == Some("stylesheet") {
            removals.push(line_span(document, tag.start, tag.end));
        }
    }

    // Splice the document, skipping removed spans.
    let mut out = String::with_capacity(document.len());
    let mut pos = 0;
    for (start, end) in removals {
        if start < pos {
            continue;
        }
        out.push_str(&document[pos..start]);
        pos = end;
    }
    out.push_str(&document[pos..]);

    // Inline blocks first, then the bundle references, then the override,
    // all immediately before the closing head tag.
    let mut injection = String::new();
    for block in &inline_blocks {
        injection.push_str("    ");
        injection.push_str(block);
        injection.push('\n');
    }
    injection.push_str(&format!(
        "    <link rel=\"stylesheet\" href=\"{}\">\n",
        config.style_bundle
    ));
    injection.push_str(&format!(
        "    <script src=\"{}\"></script>\n",
        config.script_bundle
    ));
    injection.push_str("    ");
    injection.push_str(STYLE_OVERRIDE);
    injection.push('\n');

    let out = match out.find("</head>") {
        Some(idx) => format!("{}{}{}", &out[..idx], injection, &out[idx..]),
        None => {
            debug!("html"; "no closing head tag; injections skipped");
            out
        }
    };

    // Relax the content security policy: the bundle's legacy third-party
    // code may evaluate at runtime.
    out.replacen("; script-src ", "; script-src 'unsafe-eval' ", 1)
}

/// Expand a span to swallow its line when the element sits alone on it:
/// leading indentation and the trailing newline go with the tag.
fn line_span(document: &str, start: usize, end: usize) -> (usize, usize) {
    let bytes = document.as_bytes();

    let mut line_start = start;
    while line_start > 0 && matches!(bytes[line_start - 1], b' ' | b'\t') {
        line_start -= 1;
    }
    let at_line_start = line_start == 0 || bytes[line_start - 1] == b'\n';

    let mut line_end = end;
    while line_end < bytes.len() && matches!(bytes[line_end], b' ' | b'\t' | b'\r') {
        line_end += 1;
    }
    let at_line_end = line_end >= bytes.len() || bytes[line_end] == b'\n';

    if at_line_start && at_line_end {
        if line_end < bytes.len() {
            line_end += 1; // swallow the newline
        }
        (line_start, line_end)
    } else {
        (start, end)
    }
}

// =============================================================================
// Tests
// =============================================================================
