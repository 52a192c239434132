//! Source tree error types.

use thiserror::Error;

use super::{SourceKind, SourcePath};

/// Errors raised by source tree operations.
///
/// All of these are recoverable: the tree is left unchanged when one is
/// returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("invalid source name `{0}`")]
    InvalidName(String),

    #[error("invalid source path `{0}`")]
    InvalidPath(String),

    #[error("a source named `{0}` already exists")]
    Collision(SourcePath),

    #[error("no source at `{0}`")]
    NotFound(SourcePath),

    #[error("`{0}` is not a folder")]
    NotAFolder(SourcePath),

    #[error("`{0}` is a folder")]
    IsAFolder(SourcePath),

    #[error("`{0}` is not a text source")]
    NotText(SourcePath),

    /// The leaf's variant disagrees with what its name and payload read
    /// back as.
    #[error("`{path}` cannot hold {kind} content, it would be read back as {stored}")]
    KindMismatch {
        path: SourcePath,
        kind: SourceKind,
        stored: SourceKind,
    },

    #[error("source handle no longer refers to a node in this tree")]
    StaleHandle,
}

impl SourceError {
    /// Short hint shown alongside the error in user-facing output.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Collision(_) => Some("choose a different file name"),
            Self::InvalidName(_) => Some("names cannot start with `.` or contain `/`"),
            Self::KindMismatch {
                kind: SourceKind::Text,
                ..
            } => Some("text sources need a `.typ` name"),
            Self::KindMismatch {
                kind: SourceKind::Image,
                ..
            } => Some("image payloads must decode as a supported bitmap"),
            _ => None,
        }
    }
}
