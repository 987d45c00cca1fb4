//! Build tier: one sequential pipeline per invocation.
//!
//! Failure at any step aborts the whole build; the three artifacts are
//! written only after all of them exist in memory, so no partial artifact
//! is ever published.

pub mod cssvars;
pub mod engine;
pub mod globals;
pub mod html;
pub mod manifest;
pub mod patch;

use crate::config::InspackConfig;
use crate::log;
use anyhow::{Context, Result};
use std::fs;

/// Final build artifacts, produced atomically for a single invocation.
pub struct Artifacts {
    pub script: String,
    pub style: String,
    pub html: String,
}

/// Run the full pipeline and write the artifacts alongside the reference
/// document.
pub fn build_all(config: &InspackConfig) -> Result<()> {
    let artifacts = build_artifacts(config)?;
    write_artifacts(&artifacts, config)?;
    log!("bundle"; "build complete");
    Ok(())
}

/// Run the pipeline without touching the output files.
pub fn build_artifacts(config: &InspackConfig) -> Result<Artifacts> {
    let ui_root = config.ui_root();
    let reference = ui_root.join(&config.bundle.reference_document);
    let document = fs::read_to_string(&reference)
        .with_context(|| format!("failed to read reference document {}", reference.display()))?;

    let manifest = manifest::extract(&document, &config.bundle);
    let entries = manifest::synthesize(&manifest);
    log!("bundle"; "script entry with {} imports", manifest.scripts.len());
    log!("bundle"; "style entry with {} imports", manifest.styles.len());

    let globals = globals::GlobalSet::load(&ui_root.join(&config.bundle.eslintrc));
    let patches = patch::PatchPipeline::new(&globals);
    let mut engine = engine::Engine::new(ui_root, &globals, &config.bundle, patches);

    let script = engine.bundle_scripts(&entries.script_entry)?;

    let mut collector = cssvars::AssetCollector::default();
    let style_text = engine.bundle_styles(&entries.style_entry, &mut collector)?;
    let style = collector.emit(style_text);

    let html = html::rewrite(&document, &config.bundle);

    Ok(Artifacts {
        script,
        style,
        html,
    })
}

fn write_artifacts(artifacts: &Artifacts, config: &InspackConfig) -> Result<()> {
    let ui_root = config.ui_root();
    let outputs = [
        (&config.bundle.script_bundle, &artifacts.script),
        (&config.bundle.style_bundle, &artifacts.style),
        (&config.bundle.html_output, &artifacts.html),
    ];
    for (name, contents) in outputs {
        let path = ui_root.join(name);
        fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        log!("bundle"; "wrote {}", path.display());
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
