//! Minimal bundling engine.
//!
//! Loads manifest-ordered sources, applies the patch pipeline to each
//! script as it is loaded, wraps every script in its own scope, and
//! concatenates in order. Import specifiers found in loaded sources go
//! through the resolution policy chain; a resolved file is bundled exactly
//! once, emitted ahead of its importer. The engine is sequential by
//! design: one build is one run to completion.

use super::cssvars::AssetCollector;
use super::globals::GlobalSet;
use super::patch::{PatchPipeline, REGISTRY_PRELUDE};
use crate::config::BundleConfig;
use crate::debug;
use crate::utils::path::normalize;
use anyhow::{Context, Result};
use regex::Regex;
use rustc_hash::FxHashSet;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*import\s+(?:[^'";]+\s+from\s+)?["']([^"']+)["']\s*;?[ \t]*\r?\n?"#)
            .unwrap()
    })
}

fn css_import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*@import\s+(?:url\(\s*)?["']?([^"'()\s;]+)["']?\s*\)?\s*;[ \t]*\r?\n?"#)
            .unwrap()
    })
}

/// Outcome of resolving an import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    /// Satisfied by a published global; the import is dropped.
    External,
    /// Load and bundle the file at this path.
    Source(PathBuf),
    /// Nothing matched; dropped with a warning.
    Unresolved,
}

pub struct Engine<'a> {
    ui_root: PathBuf,
    globals: &'a GlobalSet,
    config: &'a BundleConfig,
    patches: PatchPipeline<'a>,
    bundled: FxHashSet<PathBuf>,
}

impl<'a> Engine<'a> {
    pub fn new(
        ui_root: PathBuf,
        globals: &'a GlobalSet,
        config: &'a BundleConfig,
        patches: PatchPipeline<'a>,
    ) -> Self {
        Self {
            ui_root,
            globals,
            config,
            patches,
            bundled: FxHashSet::default(),
        }
    }

    /// Resolve an import specifier against the policy chain.
    fn resolve(&self, specifier: &str, importer_dir: &Path) -> Resolution {
        // Known globals are satisfied externally, never bundled, never a
        // resolution failure.
        if self.globals.contains(specifier) {
            return Resolution::External;
        }
        if let Some(file) = self.config.vendor_file(specifier) {
            return Resolution::Source(normalize(&self.ui_root.join(file)));
        }
        // Root-relative specifiers resolve against the working directory,
        // not the filesystem root.
        if let Some(rest) = specifier.strip_prefix('/') {
            return Resolution::Source(normalize(&self.ui_root.join(rest)));
        }
        if specifier.starts_with("./") || specifier.starts_with("../") {
            return Resolution::Source(normalize(&importer_dir.join(specifier)));
        }
        Resolution::Unresolved
    }

    // =========================================================================
    // Scripts
    // =========================================================================

    /// Bundle the synthetic script entry into a single script text,
    /// headed by the registry prelude.
    pub fn bundle_scripts(&mut self, entry: &str) -> Result<String> {
        let mut out = String::from(REGISTRY_PRELUDE);
        let entry_dir = self.ui_root.clone();
        self.consume_script_imports(entry, &entry_dir, &mut out)?;
        Ok(out)
    }

    /// Bundle every import found in `source` (in order), returning the
    /// source with the import statements removed.
    fn consume_script_imports(
        &mut self,
        source: &str,
        dir: &Path,
        out: &mut String,
    ) -> Result<String> {
        let specifiers: Vec<String> = import_regex()
            .captures_iter(source)
            .map(|caps| caps[1].to_string())
            .collect();

        for specifier in &specifiers {
            match self.resolve(specifier, dir) {
                Resolution::Source(path) => self.load_script(&path, out)?,
                Resolution::External => {}
                Resolution::Unresolved => {
                    debug!("bundle"; "unresolved import \"{specifier}\"");
                }
            }
        }

        Ok(import_regex().replace_all(source, "").into_owned())
    }

    /// Load one script: patch, bundle its imports first, then emit the
    /// body wrapped in its own scope.
    fn load_script(&mut self, path: &Path, out: &mut String) -> Result<()> {
        let path = normalize(path);
        if !self.bundled.insert(path.clone()) {
            return Ok(());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        let patched = self.patches.apply(&path, &raw);

        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.ui_root.clone());
        let body = self.consume_script_imports(&patched, &dir, out)?;

        out.push_str("(() => {\n");
        out.push_str(body.trim());
        out.push_str("\n})();\n");
        Ok(())
    }

    // =========================================================================
    // Stylesheets
    // =========================================================================

    /// Bundle the synthetic style entry into a single stylesheet text.
    /// Image references are rewritten into the collector as each file
    /// loads (phase 1); the collector is emitted by the caller once this
    /// text is complete.
    pub fn bundle_styles(&mut self, entry: &str, collector: &mut AssetCollector) -> Result<String> {
        let mut out = String::new();
        let entry_dir = self.ui_root.clone();
        self.consume_style_imports(entry, &entry_dir, collector, &mut out)?;
        Ok(out)
    }

    fn consume_style_imports(
        &mut self,
        source: &str,
        dir: &Path,
        collector: &mut AssetCollector,
        out: &mut String,
    ) -> Result<String> {
        let specifiers: Vec<String> = css_import_regex()
            .captures_iter(source)
            .map(|caps| caps[1].to_string())
            .collect();

        for specifier in &specifiers {
            match self.resolve(specifier, dir) {
                Resolution::Source(path) => self.load_style(&path, collector, out)?,
                Resolution::External => {}
                Resolution::Unresolved => {
                    debug!("bundle"; "unresolved stylesheet import \"{specifier}\"");
                }
            }
        }

        Ok(css_import_regex().replace_all(source, "").into_owned())
    }

    fn load_style(
        &mut self,
        path: &Path,
        collector: &mut AssetCollector,
        out: &mut String,
    ) -> Result<()> {
        let path = normalize(path);
        if !self.bundled.insert(path.clone()) {
            return Ok(());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.ui_root.clone());
        let body = self.consume_style_imports(&raw, &dir, collector, out)?;
        let rewritten = collector.rewrite(&path, &body);

        let trimmed = rewritten.trim();
        if !trimmed.is_empty() {
            out.push_str(trimmed);
            out.push('\n');
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
