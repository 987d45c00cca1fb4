//! Delivery worker pool.
//!
//! A bounded number of workers share one bound listening port; accepted
//! connections are distributed among them by the server. Requests are
//! stateless, so workers share nothing mutable. A dead worker is handled
//! per the configured restart policy; the historic default logs the death
//! and leaves the gap.

use super::worker;
use crate::config::{InspackConfig, RestartPolicy};
use crate::log;
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};
use tiny_http::Server;

/// Effective worker count: bounded by configuration and by available
/// hardware parallelism, never zero.
pub fn worker_count(max_workers: usize) -> usize {
    let parallelism = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    max_workers.min(parallelism).max(1)
}

pub struct WorkerPool {
    server: Arc<Server>,
    config: Arc<InspackConfig>,
    workers: Vec<(usize, JoinHandle<()>)>,
}

impl WorkerPool {
    /// Spawn the workers against an already-bound server.
    pub fn start(server: Arc<Server>, config: Arc<InspackConfig>) -> Self {
        let count = worker_count(config.serve.max_workers);
        let workers = (0..count)
            .map(|id| (id, spawn_worker(id, &server, &config)))
            .collect();
        log!("serve"; "{} delivery worker(s) on port {}", count, config.serve.port);
        Self {
            server,
            config,
            workers,
        }
    }

    /// Monitor the workers until the process is terminated. Blocks the
    /// calling thread; with the log-only policy a dead worker leaves a
    /// gap, never a crash of the whole tier.
    pub fn supervise(mut self) {
        loop {
            thread::sleep(Duration::from_millis(500));

            let mut i = 0;
            while i < self.workers.len() {
                if self.workers[i].1.is_finished() {
                    let (id, handle) = self.workers.remove(i);
                    let _ = handle.join();
                    log!("serve"; "worker {} died", id);

                    match self.config.serve.restart {
                        RestartPolicy::Respawn => {
                            self.workers
                                .push((id, spawn_worker(id, &self.server, &self.config)));
                            log!("serve"; "worker {} respawned", id);
                        }
                        RestartPolicy::LogOnly => {}
                    }
                } else {
                    i += 1;
                }
            }
        }
    }
}

fn spawn_worker(
    id: usize,
    server: &Arc<Server>,
    config: &Arc<InspackConfig>,
) -> JoinHandle<()> {
    let server = Arc::clone(server);
    let config = Arc::clone(config);
    thread::spawn(move || worker::run(id, server, config))
}

// =============================================================================
// Tests
// =============================================================================
