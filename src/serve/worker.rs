//! Static delivery worker.
//!
//! Each worker is single-threaded and stateless: it maps request paths to
//! files under the UI root, with two rewrites applied in order. The
//! canonical entry path is served from the rewritten document, and the
//! backend protocol definition is redirected to its versioned legacy
//! subdirectory. A missing file is a 404; no other error status exists
//! here.

use super::state;
use crate::config::InspackConfig;
use crate::log;
use crate::utils::mime;
use anyhow::Result;
use std::{fs, path::PathBuf, sync::Arc};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Worker accept loop. Returns when the server is unblocked or shutdown
/// is requested.
pub fn run(id: usize, server: Arc<Server>, config: Arc<InspackConfig>) {
    log!("serve"; "worker {} started on port {}", id, config.serve.port);
    while !state::is_shutdown() {
        let request = match server.recv() {
            Ok(request) => request,
            Err(_) => break,
        };
        if let Err(e) = handle_request(request, &config) {
            log!("serve"; "request error: {e}");
        }
    }
}

/// Handle a single request: resolve, read, respond.
fn handle_request(request: Request, config: &InspackConfig) -> Result<()> {
    let url = request.url().to_string();
    let path = resolve_path(&url, config);

    let short = path
        .strip_prefix(config.ui_root())
        .map(|p| format!("⌂/{}", p.display()))
        .unwrap_or_else(|_| path.display().to_string());
    log!("serve"; "{}: {} ({})", request.method(), url, short);

    match fs::read(&path) {
        Ok(data) => {
            let response = Response::from_data(data)
                .with_header(make_header("Content-Type", mime::from_path(&path)));
            request.respond(response)?;
        }
        Err(_) => {
            let response = Response::from_string("404: File not found")
                .with_status_code(StatusCode(404))
                .with_header(make_header("Content-Type", mime::types::PLAIN));
            request.respond(response)?;
        }
    }
    Ok(())
}

/// Map a request URL to a file under the UI root, applying the two
/// path rewrites in order.
pub fn resolve_path(url: &str, config: &InspackConfig) -> PathBuf {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let mut rel = path.trim_start_matches('/').to_string();

    // (i) the canonical entry is served from the rewritten artifact
    if rel == config.bundle.reference_document {
        rel = config.bundle.html_output.clone();
    }

    // (ii) the backend protocol definition lives in the legacy subdirectory
    if rel.contains(&config.serve.backend_commands) {
        rel = rel.replacen("Protocol", &config.serve.legacy_protocol_dir, 1);
        log!("serve"; "rewriting {}", url);
    }

    config.ui_root().join(rel)
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config() -> InspackConfig {
        let mut config = InspackConfig::default();
        config.root = PathBuf::from("/project");
        config
    }

    #[test]
    fn test_entry_path_served_from_rewritten_artifact() {
        let config = test_config();
        let path = resolve_path("/Main.html", &config);
        assert_eq!(path, config.ui_root().join("Main.min.html"));
    }

    #[test]
    fn test_backend_commands_redirected_to_legacy_subdirectory() {
        let config = test_config();
        let path = resolve_path("/Protocol/InspectorBackendCommands.js", &config);
        assert_eq!(
            path,
            config
                .ui_root()
                .join("Protocol/Legacy/iOS/18.4/InspectorBackendCommands.js")
        );
    }

    #[test]
    fn test_ordinary_paths_map_straight_through() {
        let config = test_config();
        let path = resolve_path("/Images/Gear.svg", &config);
        assert_eq!(path, config.ui_root().join("Images/Gear.svg"));
    }

    #[test]
    fn test_query_string_stripped() {
        let config = test_config();
        let path = resolve_path("/Main.html?ws=localhost:9222", &config);
        assert_eq!(path, config.ui_root().join("Main.min.html"));
    }

    #[test]
    fn test_other_protocol_files_not_rewritten() {
        let config = test_config();
        let path = resolve_path("/Protocol/RemoteObject.js", &config);
        assert_eq!(path, config.ui_root().join("Protocol/RemoteObject.js"));
    }
}
