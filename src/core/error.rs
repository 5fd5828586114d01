//! Defines the custom error types for the `core` module.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias used by every fallible operation in the crate.
pub type ScopeResult<T> = Result<T, ScopeError>;

/// The primary error type for the `core` module.
///
/// Every variant is fatal for the invocation that produced it. Failures on a
/// single entry during a walk are not raised; they are recorded on the node as
/// an [`EntryError`].
#[derive(Debug, Error)]
pub enum ScopeError {
    /// A configuration file exists but could not be read or is unusable.
    #[error("configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// A configuration file is not valid TOML or has fields of the wrong type.
    #[error("failed to parse {}: {source}", path.display())]
    ConfigParse {
        #[source]
        source: toml::de::Error,
        path: PathBuf,
    },

    /// Represents an I/O error, typically from file system operations.
    #[error("I/O error for path {}: {source}", path.display())]
    Io {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// A requested scan target does not exist.
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// A path given for explain or as a file edit lies outside the repository root.
    #[error("path {} is outside the repository root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// No repository root or common ancestor could be established for the targets.
    #[error("no common ancestor found for the requested paths")]
    NoCommonAncestor,

    /// A rule could not be compiled.
    #[error("invalid pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },
}

impl ScopeError {
    pub(crate) fn io(source: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    pub(crate) fn pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

/// Coarse classification of a per-entry filesystem failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryErrorKind {
    PermissionDenied,
    NotFound,
    Other,
}

impl From<io::ErrorKind> for EntryErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Other,
        }
    }
}

/// A failure on a single entry encountered mid-walk.
///
/// Recorded on the affected node; the walk continues past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryError {
    pub path: PathBuf,
    pub kind: EntryErrorKind,
    pub message: String,
}

impl EntryError {
    pub fn from_io(path: &Path, err: &io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            kind: err.kind().into(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for EntryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}
