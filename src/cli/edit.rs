//! `quire rename` and `quire set-main`

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::QuireConfig;
use crate::log;
use crate::source::SourcePath;

pub fn rename(package: &Path, path: &str, name: &str, config: &QuireConfig) -> Result<()> {
    let document = super::open(package, config)?;
    let source = SourcePath::parse(path)?;

    let renamed = document
        .rename(&source, name)
        .map_err(|e| match e.hint() {
            Some(hint) => anyhow::anyhow!("{e}\n  hint: {hint}"),
            None => anyhow::Error::from(e),
        })
        .with_context(|| format!("cannot rename `{source}`"))?;
    document.save(package)?;

    log!("rename"; "{} -> {}", source, renamed);
    Ok(())
}

pub fn set_main(package: &Path, path: &str, config: &QuireConfig) -> Result<()> {
    let document = super::open(package, config)?;
    let source = SourcePath::parse(path)?;

    document
        .set_main_source(&source)
        .with_context(|| format!("cannot use `{source}` as main source"))?;
    document.save(package)?;

    log!("main"; "main source is now {}", source);
    Ok(())
}
