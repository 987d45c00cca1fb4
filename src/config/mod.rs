//! Tool configuration for `inspack.toml`.
//!
//! All fields default to the layout of a stock WebKit checkout, so a config
//! file is optional. Precedence for the listen port: CLI flag, then the
//! `PORT` environment variable, then the config file, then the default.
//!
//! # Sections
//!
//! | Section    | Purpose                                                  |
//! |------------|----------------------------------------------------------|
//! | `[bundle]` | Reference document, exclusions, injections, vendor files |
//! | `[serve]`  | Port, worker pool, restart policy, debug proxy binary    |

mod error;

pub use error::ConfigError;

use crate::cli::{Cli, Commands};
use serde::Deserialize;
use std::{env, fs, path::PathBuf};

/// Relative path from the project root to the inspector UI sources.
pub const UI_ROOT: &str = "WebKit/Source/WebInspectorUI/UserInterface";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing inspack.toml
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InspackConfig {
    /// Project root directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Bundling settings
    pub bundle: BundleConfig,

    /// Delivery tier settings
    pub serve: ServeConfig,
}

impl Default for InspackConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            bundle: BundleConfig::default(),
            serve: ServeConfig::default(),
        }
    }
}

impl InspackConfig {
    /// Load configuration: defaults, overlaid by an optional config file,
    /// then by the environment and CLI arguments.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let root = match &cli.root {
            Some(root) => root.clone(),
            None => env::current_dir()
                .map_err(|e| ConfigError::Io(PathBuf::from("."), e))?,
        };

        let config_path = if cli.config.is_absolute() {
            cli.config.clone()
        } else {
            root.join(&cli.config)
        };

        let mut config = if config_path.is_file() {
            let raw = fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::Io(config_path.clone(), e))?;
            toml::from_str(&raw)?
        } else {
            Self::default()
        };
        config.root = root;

        if let Some(port) = env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.serve.port = port;
        }
        if let Commands::Serve { port: Some(port) } = &cli.command {
            config.serve.port = *port;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.serve.port == 0 {
            return Err(ConfigError::Validation(
                "serve.port must be nonzero".into(),
            ));
        }
        if self.bundle.reference_document.is_empty() {
            return Err(ConfigError::Validation(
                "bundle.reference_document must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Absolute path to the inspector UI source tree, the working directory
    /// of both the build and the delivery tier.
    pub fn ui_root(&self) -> PathBuf {
        self.root.join(&self.bundle.ui_root)
    }
}

// ============================================================================
// [bundle] section
// ============================================================================

/// Bundling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Inspector UI directory, relative to the project root.
    pub ui_root: PathBuf,

    /// Reference HTML document, relative to the UI root.
    pub reference_document: String,

    /// Output name of the script bundle.
    pub script_bundle: String,

    /// Output name of the style bundle.
    pub style_bundle: String,

    /// Output name of the rewritten HTML document.
    pub html_output: String,

    /// Basenames excluded from the manifest. These are deployment-supplied
    /// override files that must not be baked into the bundle.
    pub exclude: Vec<String>,

    /// Script paths appended to the manifest without a corresponding tag.
    pub inject_scripts: Vec<String>,

    /// ESLint configuration contributing global identifier names,
    /// relative to the UI root.
    pub eslintrc: PathBuf,

    /// Bare import specifiers mapped to deployment-supplied files under the
    /// UI root (replacement packages for retired legacy libraries).
    pub vendor: Vec<VendorAlias>,
}

/// A single bare-specifier-to-file mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorAlias {
    pub specifier: String,
    pub file: String,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            ui_root: PathBuf::from(UI_ROOT),
            reference_document: "Main.html".into(),
            script_bundle: "Main.min.js".into(),
            style_bundle: "Main.min.css".into(),
            html_output: "Main.min.html".into(),
            exclude: vec![
                "WebInspectorUIAdditions.js".into(),
                "WebInspectorUIAdditions.css".into(),
            ],
            inject_scripts: vec!["External/Esprima/esprima.js".into()],
            eslintrc: PathBuf::from("../.eslintrc"),
            vendor: vec![VendorAlias {
                specifier: "esprima-next".into(),
                file: "External/Esprima/esprima-next.js".into(),
            }],
        }
    }
}

impl BundleConfig {
    /// Check whether a manifest path is excluded by basename.
    pub fn is_excluded(&self, path: &str) -> bool {
        let basename = basename(path);
        self.exclude.iter().any(|e| e == basename)
    }

    /// Look up a vendor alias for a bare import specifier.
    pub fn vendor_file(&self, specifier: &str) -> Option<&str> {
        self.vendor
            .iter()
            .find(|v| v.specifier == specifier)
            .map(|v| v.file.as_str())
    }
}

/// Final path segment of a slash-separated resource path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

// ============================================================================
// [serve] section
// ============================================================================

/// Delivery tier settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// HTTP port number.
    pub port: u16,

    /// Upper bound on delivery workers; the effective count is
    /// min(max_workers, available hardware parallelism).
    pub max_workers: usize,

    /// What to do when a delivery worker dies.
    pub restart: RestartPolicy,

    /// Debug proxy executable, located on the search path.
    pub proxy_bin: String,

    /// Backend protocol definition filename served from the legacy
    /// subdirectory instead of its nominal location.
    pub backend_commands: String,

    /// Versioned legacy subdirectory substituted for `Protocol` when the
    /// backend protocol definition is requested.
    pub legacy_protocol_dir: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: 9220,
            max_workers: 4,
            restart: RestartPolicy::LogOnly,
            proxy_bin: "ios_webkit_debug_proxy".into(),
            backend_commands: "InspectorBackendCommands.js".into(),
            legacy_protocol_dir: "Protocol/Legacy/iOS/18.4".into(),
        }
    }
}

/// Worker restart policy. The historic behavior is to log the death and
/// leave the gap; respawning is opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    LogOnly,
    Respawn,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_checkout() {
        let config = InspackConfig::default();
        assert_eq!(config.bundle.ui_root, PathBuf::from(UI_ROOT));
        assert_eq!(config.bundle.reference_document, "Main.html");
        assert_eq!(config.serve.port, 9220);
        assert_eq!(config.serve.max_workers, 4);
        assert_eq!(config.serve.restart, RestartPolicy::LogOnly);
        assert_eq!(config.serve.proxy_bin, "ios_webkit_debug_proxy");
    }

    #[test]
    fn test_excluded_basenames() {
        let config = BundleConfig::default();
        assert!(config.is_excluded("WebInspectorUIAdditions.js"));
        assert!(config.is_excluded("Base/WebInspectorUIAdditions.css"));
        assert!(!config.is_excluded("Base/Object.js"));
    }

    #[test]
    fn test_vendor_alias_lookup() {
        let config = BundleConfig::default();
        assert_eq!(
            config.vendor_file("esprima-next"),
            Some("External/Esprima/esprima-next.js")
        );
        assert_eq!(config.vendor_file("left-pad"), None);
    }

    #[test]
    fn test_toml_section_parsing() {
        let raw = r#"
            [serve]
            port = 9333
            restart = "respawn"

            [bundle]
            exclude = ["Custom.js"]

            [[bundle.vendor]]
            specifier = "esprima-next"
            file = "External/esprima.js"
        "#;
        let config: InspackConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.serve.port, 9333);
        assert_eq!(config.serve.restart, RestartPolicy::Respawn);
        assert!(config.bundle.is_excluded("Custom.js"));
        assert!(!config.bundle.is_excluded("WebInspectorUIAdditions.js"));
        assert_eq!(
            config.bundle.vendor_file("esprima-next"),
            Some("External/esprima.js")
        );
    }

    #[test]
    fn test_validation_rejects_zero_port() {
        let mut config = InspackConfig::default();
        config.serve.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("Base/Object.js"), "Object.js");
        assert_eq!(basename("Object.js"), "Object.js");
        assert_eq!(basename("/External/Esprima/esprima.js"), "esprima.js");
    }
}
