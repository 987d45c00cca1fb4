//! Manifest extraction and entry synthesis.
//!
//! The reference document is the single source of truth for what gets
//! bundled, and in which order: legacy scripts depend on global side
//! effects executing in document order, so the manifest preserves it
//! exactly.

use crate::config::BundleConfig;
use crate::utils::html::{self, TagKind};

/// Ordered resource lists extracted from the reference document.
///
/// Built once per build invocation, immutable thereafter.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

/// Extract the manifest from the reference document text.
///
/// Script and stylesheet paths appear in document order, minus excluded
/// basenames; the configured extra script paths are appended after the
/// scan.
pub fn extract(document: &str, config: &BundleConfig) -> Manifest {
    let mut manifest = Manifest::default();

    for tag in html::scan(document) {
        if tag.kind != TagKind::Open {
            continue;
        }
        match tag.name.as_str() {
            "script" => {
                if let Some(src) = tag.attr("src")
                    && !config.is_excluded(src)
                {
                    manifest.scripts.push(src.to_string());
                }
            }
            "link" => {
                if tag.attr("rel") == Some("stylesheet")
                    && let Some(href) = tag.attr("href")
                    && !config.is_excluded(href)
                {
                    manifest.styles.push(href.to_string());
                }
            }
            _ => {}
        }
    }

    manifest
        .scripts
        .extend(config.inject_scripts.iter().cloned());
    manifest
}

// =============================================================================
// Entry synthesis
// =============================================================================

/// Synthetic aggregate entry documents fed to the engine.
pub struct Entries {
    pub script_entry: String,
    pub style_entry: String,
}

/// Turn the manifest into two entry documents, one importing every script
/// as a side effect, one importing every stylesheet. Import order equals
/// manifest order.
pub fn synthesize(manifest: &Manifest) -> Entries {
    let script_entry = manifest
        .scripts
        .iter()
        .map(|p| format!("import \"./{p}\";"))
        .collect::<Vec<_>>()
        .join("\n");
    let style_entry = manifest
        .styles
        .iter()
        .map(|p| format!("@import \"./{p}\";"))
        .collect::<Vec<_>>()
        .join("\n");

    Entries {
        script_entry,
        style_entry,
    }
}

// =============================================================================
// Tests
// =============================================================================
