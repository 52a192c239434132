//! Package load/save errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::source::SourceError;

/// Errors that abort a package load or save. A failed load never yields a
/// partial document.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("`{0}` is not a document package (expected a directory)")]
    NotAPackage(PathBuf),

    #[error("package `{0}` has no metadata record")]
    MissingMetadata(PathBuf),

    #[error("metadata record `{path}` is corrupt")]
    CorruptMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("package `{0}` has no sources folder")]
    MissingSources(PathBuf),

    #[error("`{0}` already exists")]
    AlreadyExists(PathBuf),

    #[error("invalid source tree in package")]
    Source(#[from] SourceError),

    #[error("IO error at `{0}`")]
    Io(PathBuf, #[source] std::io::Error),
}

impl PackageError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |err| Self::Io(path, err)
    }
}
