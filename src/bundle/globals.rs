//! Global identifier set shared by the patch pipeline and the passthrough
//! resolver.
//!
//! Names come from the `globals` table of the checkout's ESLint
//! configuration plus two hard-coded names the lint config never lists.
//! Both consumers must see the same set: a name known to only one of them
//! either fails import resolution or leaves legacy code without its
//! binding at runtime.

use crate::{debug, log};
use regex::Regex;
use rustc_hash::FxHashSet;
use std::{fs, path::Path, sync::OnceLock};

/// Names treated as process-wide globals that the lint configuration does
/// not list.
const HARD_CODED: [&str; 2] = ["IterableWeakSet", "isWebKitInjectedScript"];

/// Identifier names considered process-wide globals.
#[derive(Debug, Clone)]
pub struct GlobalSet {
    names: FxHashSet<String>,
}

impl GlobalSet {
    /// Load from an ESLint configuration file. A missing file contributes
    /// nothing (the hard-coded names are always present); an unparsable
    /// file is logged and skipped.
    pub fn load(eslintrc: &Path) -> Self {
        let mut set = Self::hard_coded();
        match fs::read_to_string(eslintrc) {
            Ok(raw) => match parse_globals(&raw) {
                Ok(parsed) => set.names.extend(parsed),
                Err(e) => {
                    log!("globals"; "ignoring unparsable {}: {}", eslintrc.display(), e);
                }
            },
            Err(_) => {
                debug!("globals"; "no lint configuration at {}", eslintrc.display());
            }
        }
        set
    }

    /// Only the hard-coded names.
    pub fn hard_coded() -> Self {
        Self {
            names: HARD_CODED.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Build from explicit names (tests and callers with their own source).
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Extract the `globals` keys from ESLint JSON, which routinely carries
/// comments and trailing commas.
fn parse_globals(raw: &str) -> serde_json::Result<Vec<String>> {
    let cleaned = strip_trailing_commas(&strip_comments(raw));
    let value: serde_json::Value = serde_json::from_str(&cleaned)?;
    Ok(value
        .get("globals")
        .and_then(|g| g.as_object())
        .map(|globals| globals.keys().cloned().collect())
        .unwrap_or_default())
}

/// Remove `//` and `/* */` comments, honoring string literals.
fn strip_comments(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.peek().is_some_and(|&n| n != '\n') {
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Remove commas dangling before a closing brace or bracket.
fn strip_trailing_commas(raw: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r",(\s*[}\]])").unwrap());
    re.replace_all(raw, "$1").into_owned()
}

// =============================================================================
// Tests
// =============================================================================
