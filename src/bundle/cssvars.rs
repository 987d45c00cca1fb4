//! Image-to-variable stylesheet transform.
//!
//! Phase 1 runs per stylesheet as the engine loads it: image `url()`
//! references are replaced with custom-property lookups and recorded in the
//! collector. Phase 2 runs once, after the full style bundle text exists:
//! every recorded asset is inlined as a base64 data URI inside a single
//! `:root` block prepended to the bundle. Deferring the emit consolidates
//! an asset referenced from several files into one declaration, and the
//! insertion point only exists once all files are merged.
//!
//! The collector is passed through the build explicitly: phase 1 borrows it
//! mutably, phase 2 consumes it by value. It is emitted exactly once.

use crate::{debug, log};
use crate::utils::path::normalize;
use base64::Engine as _;
use base64::prelude::BASE64_STANDARD;
use regex::{Captures, Regex};
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)url\(\s*["']?([^"'()]*/)?([^/"'()]+?\.(svg|png))(#[^"')]+)?["']?\s*\)"#)
            .unwrap()
    })
}

/// Mapping from generated custom-property names to the assets they stand
/// for. Fragment-bearing references live in their own map and carry the
/// fragment in their property name, so a file referenced both whole and by
/// fragment yields distinct declarations.
#[derive(Debug, Default)]
pub struct AssetCollector {
    /// property name → absolute file path
    whole: FxHashMap<String, PathBuf>,
    /// property name → (absolute file path, `#fragment`)
    fragments: FxHashMap<String, (PathBuf, String)>,
}

impl AssetCollector {
    /// Phase 1: rewrite every image reference in one stylesheet into a
    /// variable reference, recording the mapping.
    pub fn rewrite(&mut self, file: &Path, contents: &str) -> String {
        let dir = file.parent().unwrap_or(Path::new("."));

        url_regex()
            .replace_all(contents, |caps: &Captures| {
                let prefix = caps.get(1).map_or("", |m| m.as_str());
                let filename = &caps[2];
                let ext = caps[3].to_ascii_lowercase();
                let fragment = caps.get(4).map(|m| m.as_str());

                let stem = &filename[..filename.len() - ext.len() - 1];
                let full = normalize(&dir.join(prefix).join(filename));

                let var_name = match fragment {
                    Some(frag) => {
                        let name = format!(
                            "--{}-{}-{}",
                            sanitize(stem),
                            ext,
                            sanitize(frag.trim_start_matches('#'))
                        );
                        self.record_fragment(name, full, frag)
                    }
                    None => {
                        let name = format!("--{}-{}", sanitize(stem), ext);
                        self.record_whole(name, full)
                    }
                };

                format!("var({var_name})")
            })
            .into_owned()
    }

    fn record_whole(&mut self, name: String, path: PathBuf) -> String {
        if let Some(previous) = self.whole.insert(name.clone(), path.clone())
            && previous != path
        {
            debug!("cssvars"; "{} now points at {} (was {})", name, path.display(), previous.display());
        }
        name
    }

    fn record_fragment(&mut self, name: String, path: PathBuf, fragment: &str) -> String {
        let value = (path, fragment.to_string());
        if let Some(previous) = self.fragments.insert(name.clone(), value.clone())
            && previous != value
        {
            debug!("cssvars"; "{} now points at {}{} (was {}{})",
                name, value.0.display(), value.1, previous.0.display(), previous.1);
        }
        name
    }

    /// Number of recorded mappings across both maps.
    pub fn len(&self) -> usize {
        self.whole.len() + self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.whole.is_empty() && self.fragments.is_empty()
    }

    /// Phase 2: consume the collector and prepend one consolidated
    /// declaration block to the assembled bundle text. A missing asset is
    /// logged and skipped; the build continues.
    pub fn emit(self, bundle: String) -> String {
        let mut entries: Vec<(String, PathBuf, String)> = self
            .whole
            .into_iter()
            .map(|(name, path)| (name, path, String::new()))
            .chain(
                self.fragments
                    .into_iter()
                    .map(|(name, (path, frag))| (name, path, frag)),
            )
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut decls = Vec::new();
        for (name, path, fragment) in entries {
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(_) => {
                    log!("warning"; "missing image {}", path.display());
                    continue;
                }
            };
            let data = BASE64_STANDARD.encode(&bytes);
            let mime = mime_for(&path);
            decls.push(format!("  {name}: url(\"data:{mime};base64,{data}{fragment}\");"));
        }

        if decls.is_empty() {
            return bundle;
        }

        log!("bundle"; "inlined {} image variable(s)", decls.len());
        format!(":root {{\n{}\n}}\n\n{}", decls.join("\n"), bundle)
    }
}

/// Data-URI MIME type derived from the asset extension.
fn mime_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if ext == "svg" {
        "image/svg+xml".to_string()
    } else {
        format!("image/{ext}")
    }
}

/// Lowercase and collapse everything outside `[a-z0-9]` to `-`.
fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_replaces_reference_with_variable() {
        let mut collector = AssetCollector::default();
        let css = "div { background: url(Images/Gear.svg); }";
        let out = collector.rewrite(Path::new("/ui/Views/Main.css"), css);

        assert_eq!(out, "div { background: var(--gear-svg); }");
        assert_eq!(collector.len(), 1);
        assert_eq!(
            collector.whole.get("--gear-svg"),
            Some(&PathBuf::from("/ui/Views/Images/Gear.svg"))
        );
    }

    #[test]
    fn test_fragment_and_whole_references_stay_distinct() {
        let mut collector = AssetCollector::default();
        let css = "a { background: url(icon.svg); }\nb { background: url(icon.svg#frag); }";
        let out = collector.rewrite(Path::new("/ui/Main.css"), css);

        assert!(out.contains("var(--icon-svg)"));
        assert!(out.contains("var(--icon-svg-frag)"));
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn test_same_asset_across_files_collapses_to_one_mapping() {
        let mut collector = AssetCollector::default();
        collector.rewrite(Path::new("/ui/A.css"), "a { background: url(Images/Gear.svg); }");
        collector.rewrite(Path::new("/ui/B.css"), "b { background: url(/Images/Gear.svg); }");
        // Both resolve to different absolute paths only if the prefix
        // differs; same-directory references share one entry.
        collector.rewrite(Path::new("/ui/C.css"), "c { background: url(Images/Gear.svg); }");
        assert_eq!(collector.whole.len(), 1);
    }

    #[test]
    fn test_non_image_urls_untouched() {
        let mut collector = AssetCollector::default();
        let css = "@font-face { src: url(Fonts/Menlo.woff2); }";
        let out = collector.rewrite(Path::new("/ui/Main.css"), css);
        assert_eq!(out, css);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_emit_inlines_base64_and_preserves_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let svg = dir.path().join("icon.svg");
        fs::write(&svg, "<svg/>").unwrap();

        let mut collector = AssetCollector::default();
        let css = format!(
            "a {{ background: url({0}); }}\nb {{ background: url({0}#frag); }}",
            svg.display()
        );
        let rewritten = collector.rewrite(&dir.path().join("Main.css"), &css);
        let out = collector.emit(rewritten);

        let encoded = BASE64_STANDARD.encode("<svg/>");
        assert!(out.starts_with(":root {\n"));
        assert!(out.contains(&format!(
            "--icon-svg: url(\"data:image/svg+xml;base64,{encoded}\");"
        )));
        assert!(out.contains(&format!(
            "--icon-svg-frag: url(\"data:image/svg+xml;base64,{encoded}#frag\");"
        )));
    }

    #[test]
    fn test_emit_skips_missing_assets_softly() {
        let mut collector = AssetCollector::default();
        let rewritten = collector.rewrite(
            Path::new("/nonexistent/Main.css"),
            "a { background: url(gone.png); }",
        );
        let out = collector.emit(rewritten);

        // The variable reference stays, the declaration is skipped, and no
        // empty :root block is emitted.
        assert!(out.contains("var(--gone-png)"));
        assert!(!out.contains(":root"));
    }

    #[test]
    fn test_emit_without_mappings_leaves_bundle_unchanged() {
        let collector = AssetCollector::default();
        assert_eq!(collector.emit("body {}".into()), "body {}");
    }

    #[test]
    fn test_sanitized_names() {
        let mut collector = AssetCollector::default();
        let out = collector.rewrite(
            Path::new("/ui/Main.css"),
            "a { background: url(Activity Viewer.PNG); }",
        );
        assert!(out.contains("var(--activity-viewer-png)"));
    }
}
