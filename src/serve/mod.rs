//! Delivery tier: worker pool, static file service, debug-proxy
//! supervision.
//!
//! Independent of the build tier: it serves whatever artifacts the last
//! build left next to the reference document.

mod pool;
mod proxy;
pub mod state;
mod worker;

use crate::config::InspackConfig;
use crate::log;
use anyhow::Result;
use std::sync::Arc;
use tiny_http::Server;

/// Bind the shared listening port, start the worker pool, launch the
/// debug proxy, and supervise until the process is terminated.
pub fn run(config: &InspackConfig) -> Result<()> {
    let rewritten = config.ui_root().join(&config.bundle.html_output);
    if !rewritten.is_file() {
        log!("serve"; "no {} found; run `inspack build` first", config.bundle.html_output);
    }

    let port = config.serve.port;
    let server = Server::http(("0.0.0.0", port))
        .map_err(|e| anyhow::anyhow!("failed to bind port {}: {}", port, e))?;
    let server = Arc::new(server);
    state::register_server(Arc::clone(&server));

    let config = Arc::new(config.clone());
    let workers = pool::WorkerPool::start(Arc::clone(&server), Arc::clone(&config));

    let _proxy = proxy::supervise(&config);
    log!("serve"; "▷ http://localhost:{}/ ◁", port.saturating_add(1));

    workers.supervise();
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
