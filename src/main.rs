//! Inspack - bundles the WebKit Web Inspector UI and serves it to a remote
//! debugging client.

#![allow(dead_code)]

mod bundle;
mod cli;
mod config;
mod logger;
mod serve;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::InspackConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    serve::state::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = InspackConfig::load(&cli)?;

    match &cli.command {
        Commands::Build => bundle::build_all(&config),
        Commands::Serve { .. } => serve::run(&config),
    }
}
