//! `quire info`

use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::config::QuireConfig;
use crate::source::{SourceKind, SourceNode, SourceTree};

pub fn show(package: &Path, config: &QuireConfig) -> Result<()> {
    let document = super::open(package, config)?;
    let metadata = document.metadata();

    println!("{}", document.title().bold());
    println!("  main:        {}", metadata.main_source);
    if let Some(last) = &metadata.last_opened_source {
        match metadata.last_edited_line {
            Some(line) => println!("  last opened: {} (line {})", last, line + 1),
            None => println!("  last opened: {}", last),
        }
    }
    if let Some(preview) = document.current_preview() {
        println!("  preview:     PDF {}, {} page(s)", preview.version(), preview.page_count());
    }
    println!();

    let listing = document.with_tree(render_tree);
    print!("{listing}");
    Ok(())
}

/// Indented listing, one node per line.
fn render_tree(tree: &SourceTree) -> String {
    let mut out = String::new();
    for id in tree.walk() {
        let (Some(node), Ok(path)) = (tree.get(id), tree.path(id)) else {
            continue;
        };
        let indent = "  ".repeat(path.depth());
        out.push_str(&format!("{indent}{}\n", describe(node)));
    }
    out
}

fn describe(node: &SourceNode) -> String {
    match node.kind() {
        SourceKind::Folder => format!("{}/", node.name()),
        kind => {
            let size = node.bytes().map_or(0, <[u8]>::len);
            format!("{} ({}, {} bytes)", node.name(), kind.label(), size)
        }
    }
}
