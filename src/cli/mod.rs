//! Command-line interface module.
//!
//! Every command edits or inspects packages offline: documents are opened
//! with a [`DetachedEngine`](crate::engine::DetachedEngine), so nothing is
//! compiled here.

mod args;
mod check;
mod edit;
mod info;
mod new;

pub use args::{Cli, Commands};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::QuireConfig;
use crate::document::Document;
use crate::engine::DetachedEngine;
use crate::package::PACKAGE_EXTENSION;

/// Run a parsed command.
pub fn run(cli: &Cli, config: &QuireConfig) -> Result<()> {
    match &cli.command {
        Commands::New { path, empty } => new::new_package(&package_path(path), *empty, config),
        Commands::Info { package } => info::show(package, config),
        Commands::Check { package } => check::check(package, config),
        Commands::Rename { package, path, name } => edit::rename(package, path, name, config),
        Commands::SetMain { package, path } => edit::set_main(package, path, config),
    }
}

/// Append the package extension when missing.
pub fn package_path(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == PACKAGE_EXTENSION) {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(PACKAGE_EXTENSION);
        PathBuf::from(name)
    }
}

/// Open a package without an engine or watcher.
fn open(package: &Path, config: &QuireConfig) -> Result<Document> {
    let mut options = config.document_options();
    options.watch = false;
    Document::open(package, Box::new(DetachedEngine::new()), options)
        .with_context(|| format!("failed to open `{}`", package.display()))
}
