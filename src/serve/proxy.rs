//! External debug-proxy supervision.
//!
//! The proxy executable is located on the search path and pointed at the
//! served entry URL. When the supervisor's stdout is an interactive
//! terminal the proxy runs under a pseudo-terminal, preserving its
//! control-sequence output; otherwise it is a plain piped subprocess.
//! Output lines are filtered before logging: terminal-clear control
//! sequences and blank lines are dropped. The proxy is supervised but not
//! restarted if it exits.

use crate::config::InspackConfig;
use crate::log;
use anyhow::Result;
use portable_pty::{CommandBuilder, NativePtySystem, PtySize, PtySystem};
use std::{
    io::{BufRead, BufReader, IsTerminal},
    path::Path,
    process::{Command, Stdio},
    thread::{self, JoinHandle},
};

/// Look up and launch the proxy. Returns `None` (after an informational
/// log) when the executable is not on the search path.
pub fn supervise(config: &InspackConfig) -> Option<JoinHandle<()>> {
    let bin = match which::which(&config.serve.proxy_bin) {
        Ok(bin) => bin,
        Err(_) => {
            log!("proxy"; "{} not found on search path", config.serve.proxy_bin);
            return None;
        }
    };

    let entry_url = format!(
        "http://localhost:{}/{}",
        config.serve.port, config.bundle.reference_document
    );
    let use_pty = std::io::stdout().is_terminal();

    Some(thread::spawn(move || {
        let result = if use_pty {
            run_pty(&bin, &entry_url)
        } else {
            run_piped(&bin, &entry_url)
        };
        match result {
            Ok(()) => log!("proxy"; "exited"),
            Err(e) => log!("proxy"; "failed: {e}"),
        }
    }))
}

/// Run under a pseudo-terminal so the proxy keeps emitting its terminal
/// output.
fn run_pty(bin: &Path, entry_url: &str) -> Result<()> {
    let mut cmd = CommandBuilder::new(bin);
    cmd.args(["-f", entry_url]);

    let pty_system = NativePtySystem::default();
    let pair = pty_system.openpty(PtySize {
        rows: 24,
        cols: 80,
        pixel_width: 0,
        pixel_height: 0,
    })?;

    let mut child = pair.slave.spawn_command(cmd)?;
    drop(pair.slave);

    let reader = pair.master.try_clone_reader()?;
    log_lines(BufReader::new(reader));

    let _ = child.wait()?;
    drop(pair.master);
    Ok(())
}

/// Plain subprocess with piped stdout (non-interactive supervisor).
fn run_piped(bin: &Path, entry_url: &str) -> Result<()> {
    let mut child = Command::new(bin)
        .args(["-f", entry_url])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    if let Some(stdout) = child.stdout.take() {
        log_lines(BufReader::new(stdout));
    }
    let _ = child.wait()?;
    Ok(())
}

fn log_lines<R: BufRead>(reader: R) {
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if let Some(line) = filter_line(&line) {
            log!("proxy"; "{}", line);
        }
    }
}

/// Drop terminal-clear control output and blank lines; trim the rest.
fn filter_line(line: &str) -> Option<&str> {
    if line.starts_with('\u{1b}') {
        return None;
    }
    let trimmed = line.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// =============================================================================
// Tests
// =============================================================================
