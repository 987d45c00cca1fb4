//! Source patch pipeline: per-library adapters and legacy-global exposure.
//!
//! The engine scopes every file it loads, which hides the implicit
//! top-level bindings legacy inspector files expect to find on the global
//! object. The rules here re-publish those bindings through a statically
//! generated registry, keyed by exact basename or by containing directory.
//! Rule application is a pure text-to-text transform with no dependency on
//! build order, and it never changes a file's behavior for consumers that
//! import it normally.

use super::globals::GlobalSet;
use crate::debug;
use regex::Regex;
use std::{path::Path, sync::OnceLock};

/// Bundle header defining the global registry. Emitted once, ahead of
/// every module body; all patched modules publish through it, so the
/// generated code needs no dynamic evaluation.
pub const REGISTRY_PRELUDE: &str = r#"const __globalRegistry = Object.create(null);
function __registerGlobal(name, value) {
    __globalRegistry[name] = value;
    Object.defineProperty(globalThis, name, {
        value,
        writable: true,
        configurable: true,
        enumerable: true,
    });
    return value;
}
function __runModuleFactory(factory) {
    return factory(globalThis.CodeMirror ??= {});
}
"#;

/// Shim replacing the retired parser library: pulls in the replacement
/// package and publishes it under the legacy global name.
const ESPRIMA_SHIM: &str =
    "import \"esprima-next\";\n__registerGlobal(\"esprima\", globalThis.esprima);\n";

/// Transform rules applied to every source file as the engine loads it.
pub struct PatchPipeline<'a> {
    globals: &'a GlobalSet,
}

impl<'a> PatchPipeline<'a> {
    pub fn new(globals: &'a GlobalSet) -> Self {
        Self { globals }
    }

    /// Apply every matching rule. Basename-keyed adapters are mutually
    /// exclusive and checked first; a directory rule may apply on top.
    pub fn apply(&self, path: &Path, source: &str) -> String {
        let basename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let dirname = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        let mut patched = match basename {
            // The 3D controls expect a pre-existing global namespace;
            // publish it before the library body runs.
            "OrbitControls.js" => format!(
                "const THREE = __registerGlobal(\"THREE\", globalThis.THREE ?? {{}});\n{source}"
            ),
            // The editor core registers its singleton as it runs; publish
            // the result afterwards.
            "codemirror.js" => {
                format!("{source}\n__registerGlobal(\"CodeMirror\", globalThis.CodeMirror);\n")
            }
            // The legacy parser body is discarded entirely.
            "esprima.js" => ESPRIMA_SHIM.to_string(),
            _ => source.to_string(),
        };

        match dirname {
            "Base" | "Views" => {
                patched.push_str(&self.globals_patch(source));
            }
            "CodeMirror" => {
                patched = strip_module_wrapper(patched, path);
                patched.push_str(&self.globals_patch(source));
            }
            _ => {}
        }

        patched
    }

    /// Statements publishing every top-level declaration whose name is in
    /// the global set. The scan runs over the raw source text, so a
    /// basename adapter never hides a declaration from it.
    fn globals_patch(&self, source: &str) -> String {
        let mut stmts = String::new();
        for name in declared_names(source) {
            if self.globals.contains(name) {
                stmts.push_str(&format!("\n__registerGlobal(\"{name}\", {name});"));
            }
        }
        stmts
    }
}

/// Names of top-level `function` / `class` / `var` declarations, in source
/// order, without duplicates. Top-level means unindented: legacy inspector
/// files declare their globals at column zero.
fn declared_names(source: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for line in source.lines() {
        let rest = if let Some(r) = line.strip_prefix("function ") {
            r
        } else if let Some(r) = line.strip_prefix("class ") {
            r
        } else if let Some(r) = line.strip_prefix("var ") {
            r
        } else {
            continue;
        };

        let end = rest
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '$')
            .unwrap_or(rest.len());
        let name = &rest[..end];
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Strip the historical module-definition wrapper (the conditional dispatch
/// supporting several module systems) so only the inner factory remains,
/// invoked directly against the global object. An unmatched shape is left
/// unpatched (the historic lenience) but surfaced as a warning.
fn strip_module_wrapper(source: String, path: &Path) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?s)\(function\(mod\)\s*\{.+?\}\)\(function\(CodeMirror\)").unwrap()
    });

    if re.is_match(&source) {
        re.replace(&source, "__runModuleFactory(function(CodeMirror)")
            .into_owned()
    } else {
        debug!("patch"; "no module wrapper found in {}", path.display());
        source
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn pipeline_globals() -> GlobalSet {
        GlobalSet::from_names(["WI", "Toolbar", "IterableWeakSet"])
    }

    #[test]
    fn test_orbit_controls_prepends_namespace_publish() {
        let globals = pipeline_globals();
        let pipeline = PatchPipeline::new(&globals);
        let source = "THREE.OrbitControls = function () {};";
        let patched = pipeline.apply(Path::new("External/OrbitControls.js"), source);

        assert!(patched.starts_with("const THREE = __registerGlobal(\"THREE\""));
        assert!(patched.ends_with(source));
    }

    #[test]
    fn test_codemirror_core_appends_singleton_publish() {
        let globals = pipeline_globals();
        let pipeline = PatchPipeline::new(&globals);
        let source = "// editor core";
        let patched = pipeline.apply(Path::new("External/codemirror.js"), source);

        assert!(patched.starts_with(source));
        assert!(patched.contains("__registerGlobal(\"CodeMirror\", globalThis.CodeMirror);"));
    }

    #[test]
    fn test_esprima_body_is_discarded_for_shim() {
        let globals = pipeline_globals();
        let pipeline = PatchPipeline::new(&globals);
        let source = "var esprima = legacyParser();";
        let patched = pipeline.apply(Path::new("External/Esprima/esprima.js"), source);

        assert!(!patched.contains("legacyParser"));
        assert!(patched.contains("import \"esprima-next\";"));
        assert!(patched.contains("__registerGlobal(\"esprima\""));
    }

    #[test]
    fn test_base_directory_publishes_matching_declarations() {
        let globals = pipeline_globals();
        let pipeline = PatchPipeline::new(&globals);
        let source = "var WI = {};\nfunction helper() {}\nclass Toolbar {\n}";
        let patched = pipeline.apply(Path::new("Base/WebInspector.js"), source);

        assert!(patched.contains("__registerGlobal(\"WI\", WI);"));
        assert!(patched.contains("__registerGlobal(\"Toolbar\", Toolbar);"));
        // `helper` is not in the global set.
        assert!(!patched.contains("__registerGlobal(\"helper\""));
    }

    #[test]
    fn test_indented_declarations_are_not_top_level() {
        let globals = pipeline_globals();
        let pipeline = PatchPipeline::new(&globals);
        let source = "function outer() {\n    var WI = {};\n}";
        let patched = pipeline.apply(Path::new("Views/View.js"), source);

        assert!(!patched.contains("__registerGlobal(\"WI\""));
    }

    #[test]
    fn test_other_directories_left_untouched() {
        let globals = pipeline_globals();
        let pipeline = PatchPipeline::new(&globals);
        let source = "var WI = {};";
        let patched = pipeline.apply(Path::new("Protocol/Remote.js"), source);
        assert_eq!(patched, source);
    }

    #[test]
    fn test_codemirror_directory_strips_module_wrapper() {
        let globals = pipeline_globals();
        let pipeline = PatchPipeline::new(&globals);
        let source = "(function(mod) {\n  if (typeof exports == \"object\") mod(require(\"../lib/codemirror\"));\n  else mod(CodeMirror);\n})(function(CodeMirror) {\n  CodeMirror.defineMode(\"css\", () => {});\n});";
        let patched = pipeline.apply(Path::new("External/CodeMirror/css.js"), source);

        assert!(patched.starts_with("__runModuleFactory(function(CodeMirror)"));
        assert!(!patched.contains("(function(mod)"));
        assert!(patched.contains("CodeMirror.defineMode"));
    }

    #[test]
    fn test_unmatched_wrapper_is_left_unpatched() {
        let globals = pipeline_globals();
        let pipeline = PatchPipeline::new(&globals);
        let source = "CodeMirror.defineMIME(\"text/css\", \"css\");";
        let patched = pipeline.apply(Path::new("External/CodeMirror/mime.js"), source);
        assert_eq!(patched, source);
    }

    #[test]
    fn test_codemirror_basename_and_directory_rules_compose() {
        let globals = pipeline_globals();
        let pipeline = PatchPipeline::new(&globals);
        let source = "(function(mod) {\n  mod();\n})(function(CodeMirror) {\n});";
        let patched = pipeline.apply(PathBuf::from("External/CodeMirror/codemirror.js").as_path(), source);

        assert!(patched.starts_with("__runModuleFactory(function(CodeMirror)"));
        assert!(patched.contains("__registerGlobal(\"CodeMirror\", globalThis.CodeMirror);"));
    }

    #[test]
    fn test_declared_names() {
        let source = "var A = 1;\nclass B {\n}\nfunction C() {}\nvar A = 2;\nlet D = 3;";
        assert_eq!(declared_names(source), vec!["A", "B", "C"]);
    }
}
