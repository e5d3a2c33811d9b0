//! Error type for the status database.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, writing or checking the installed-tree
/// status database.
#[derive(Error, Debug)]
pub enum StatusError {
    /// The status log or an update file could not be read or written.
    #[error("io error at {}: {source}", path.display())]
    Io {
        /// The path the operation targeted.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A paragraph failed to parse or was missing a required field.
    #[error("malformed status paragraph: {0}")]
    Malformed(String),

    /// Two packages' listfiles both claim the same installed path.
    #[error("'{name}' conflicts with already-installed '{owner}' over {}", path.display())]
    FileConflicts {
        /// The package being installed.
        name: String,
        /// The package that already owns the path.
        owner: String,
        /// The conflicting relative path.
        path: PathBuf,
    },
}

impl StatusError {
    /// Build an [`StatusError::Io`] from a path and an underlying `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
