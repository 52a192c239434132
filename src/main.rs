//! Quire - document package tool.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use quire::cli::{self, Cli};
use quire::config::QuireConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    quire::logger::set_verbose(cli.verbose);

    let config = QuireConfig::load(cli.config.as_deref())?;
    if let Some(path) = &config.config_path {
        quire::debug!("config"; "using {}", path.display());
    }

    cli::run(&cli, &config)
}
