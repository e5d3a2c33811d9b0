//! Shared error kinds for portsmith.
//!
//! Every fallible operation in the core returns one of the variants below
//! instead of a generic string error. Each variant carries an [`ErrorCode`]
//! that pins it to one of the four subsystems (`P`lanner, `A`bi, `C`ache,
//! `S`tatus/executor) so that log lines and test assertions can match on a
//! stable code rather than a message string.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Stable, subsystem-prefixed identifier for an [`Error`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A port name could not be resolved by the [`PortProvider`](crate) interface.
    PortNotFound,
    /// Two constraints on one node used incompatible [`VersionScheme`](crate::VersionScheme)s.
    VersionSchemeMismatch,
    /// A resolved version fell below the project baseline without an override.
    BaselineViolation,
    /// The dependency graph contains a cycle.
    DependencyCycle,
    /// A requested feature is not declared by the port.
    UnknownFeature,
    /// A port or feature's `supports` expression evaluated to false.
    Unsupported,
    /// The out-of-process builder exited with failure.
    BuildFailed,
    /// An install action's files collide with an already-installed package.
    FileConflicts,
    /// A cache backend returned a corrupted archive.
    CacheCorrupt,
    /// A cache backend could not be reached.
    CacheBackendDown,
    /// The status database log could not be read or written.
    IoError,
}

impl ErrorCode {
    /// The stable short code, e.g. `P-CYCLE`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PortNotFound => "P-NOT-FOUND",
            Self::VersionSchemeMismatch => "P-SCHEME-MISMATCH",
            Self::BaselineViolation => "P-BASELINE",
            Self::DependencyCycle => "P-CYCLE",
            Self::UnknownFeature => "P-UNKNOWN-FEATURE",
            Self::Unsupported => "P-UNSUPPORTED",
            Self::BuildFailed => "X-BUILD-FAILED",
            Self::FileConflicts => "X-FILE-CONFLICT",
            Self::CacheCorrupt => "C-CORRUPT",
            Self::CacheBackendDown => "C-BACKEND-DOWN",
            Self::IoError => "S-IO",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared error type for the portsmith core.
#[derive(Error, Debug)]
pub enum Error {
    /// Port lookup failed.
    #[error("[{code}] port '{name}' not found")]
    PortNotFound {
        /// Stable error code.
        code: ErrorCode,
        /// The port name that was requested.
        name: String,
    },

    /// Two minimum-version constraints on the same node used different schemes.
    #[error("[{code}] version scheme mismatch for '{name}': {scheme_a} vs {scheme_b}")]
    VersionSchemeMismatch {
        /// Stable error code.
        code: ErrorCode,
        /// The port name whose constraints disagreed.
        name: String,
        /// The first scheme encountered.
        scheme_a: String,
        /// The second, incompatible scheme.
        scheme_b: String,
    },

    /// A resolved version is lower than the project baseline.
    #[error("[{code}] '{name}' resolved to {resolved} which is below baseline {baseline}")]
    BaselineViolation {
        /// Stable error code.
        code: ErrorCode,
        /// The port name.
        name: String,
        /// The version the planner resolved to.
        resolved: String,
        /// The baseline minimum version.
        baseline: String,
    },

    /// A cycle was found among install actions.
    #[error("[{code}] dependency cycle: {}", cycle.join(" -> "))]
    DependencyCycle {
        /// Stable error code.
        code: ErrorCode,
        /// The full cycle, in traversal order, repeating the first node at the end.
        cycle: Vec<String>,
    },

    /// A requested feature is not declared by its port.
    #[error("[{code}] '{name}' has no feature '{feature}'")]
    UnknownFeature {
        /// Stable error code.
        code: ErrorCode,
        /// The port name.
        name: String,
        /// The unknown feature name.
        feature: String,
    },

    /// A port or feature is unsupported on its target triplet.
    #[error("[{code}] '{name}' is not supported: {reason}")]
    Unsupported {
        /// Stable error code.
        code: ErrorCode,
        /// The port or feature name.
        name: String,
        /// Human-readable reason (the `supports` expression text).
        reason: String,
    },

    /// The out-of-process builder failed.
    #[error("[{code}] build failed for '{name}': {message}")]
    BuildFailed {
        /// Stable error code.
        code: ErrorCode,
        /// The port name.
        name: String,
        /// Builder-provided failure message.
        message: String,
    },

    /// Two packages both claim the same installed path.
    #[error("[{code}] '{name}' conflicts with already-installed '{owner}' over {}", path.display())]
    FileConflicts {
        /// Stable error code.
        code: ErrorCode,
        /// The package being installed.
        name: String,
        /// The package that already owns the path.
        owner: String,
        /// The conflicting relative path.
        path: PathBuf,
    },

    /// A cache backend's archive failed integrity verification.
    #[error("[{code}] cache archive for tag {abi_tag} from backend '{backend}' is corrupt: {message}")]
    CacheCorrupt {
        /// Stable error code.
        code: ErrorCode,
        /// The ABI tag that was being restored.
        abi_tag: String,
        /// The offending backend's [`kind`](crate) tag.
        backend: String,
        /// Description of the corruption.
        message: String,
    },

    /// A cache backend could not be reached for this run.
    #[error("[{code}] cache backend '{backend}' is unavailable: {message}")]
    CacheBackendDown {
        /// Stable error code.
        code: ErrorCode,
        /// The offending backend's `kind` tag.
        backend: String,
        /// Description of the failure.
        message: String,
    },

    /// The status log or installed tree could not be read or written.
    #[error("[{code}] io error at {}: {message}", path.display())]
    Io {
        /// Stable error code.
        code: ErrorCode,
        /// The path the operation targeted.
        path: PathBuf,
        /// Description of the failure.
        message: String,
        /// The underlying OS error, if any.
        #[source]
        source: Option<std::io::Error>,
    },

    /// A paragraph (status record or source control file) failed to parse.
    #[error("[{code}] malformed paragraph: {message}")]
    Paragraph {
        /// Stable error code.
        code: ErrorCode,
        /// Description of the malformed input.
        message: String,
    },
}

impl Error {
    /// The stable code attached to this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::PortNotFound { code, .. }
            | Self::VersionSchemeMismatch { code, .. }
            | Self::BaselineViolation { code, .. }
            | Self::DependencyCycle { code, .. }
            | Self::UnknownFeature { code, .. }
            | Self::Unsupported { code, .. }
            | Self::BuildFailed { code, .. }
            | Self::FileConflicts { code, .. }
            | Self::CacheCorrupt { code, .. }
            | Self::CacheBackendDown { code, .. }
            | Self::Io { code, .. }
            | Self::Paragraph { code, .. } => *code,
        }
    }

    /// Build an [`Error::Io`] from a path and an underlying `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            code: ErrorCode::IoError,
            path: path.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;
