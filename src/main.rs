//! devpack - on-demand development bundler with live reload.

mod actor;
mod cli;
mod compiler;
mod config;
mod core;
mod embed;
mod entry;
mod gate;
mod hmr;
mod logger;
mod reloader;
mod tracker;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{DevConfig, init_config};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = init_config(DevConfig::load(&cli)?);

    match &cli.command {
        Commands::Serve { .. } => cli::serve::serve(),
        Commands::Check { routes } => cli::check::check_pages(config, routes),
    }
}
