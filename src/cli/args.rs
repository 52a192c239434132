//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Quire document package tool
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: nearest quire.toml)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Print debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a new document package
    #[command(visible_alias = "n")]
    New {
        /// Package path; `.quire` is appended when missing
        #[arg(value_hint = clap::ValueHint::DirPath)]
        path: PathBuf,

        /// Start with an empty main source
        #[arg(long)]
        empty: bool,
    },

    /// Show the source tree and metadata of a package
    #[command(visible_alias = "i")]
    Info {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        package: PathBuf,
    },

    /// Check that a package survives a load/save round-trip unchanged
    #[command(visible_alias = "c")]
    Check {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        package: PathBuf,
    },

    /// Rename a source inside a package
    Rename {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        package: PathBuf,

        /// Source path, e.g. `/chapters/intro.typ`
        path: String,

        /// New name (a single path component)
        name: String,
    },

    /// Set the compile entry point of a package
    SetMain {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        package: PathBuf,

        /// Text source path, e.g. `/main.typ`
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rename() {
        let cli = Cli::parse_from(["quire", "-v", "rename", "Doc.quire", "/main.typ", "index.typ"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Rename { package, path, name } => {
                assert_eq!(package, PathBuf::from("Doc.quire"));
                assert_eq!(path, "/main.typ");
                assert_eq!(name, "index.typ");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_new_with_global_config() {
        let cli = Cli::parse_from(["quire", "new", "Thesis", "--empty", "--config", "q.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("q.toml")));
        assert!(matches!(cli.command, Commands::New { empty: true, .. }));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
