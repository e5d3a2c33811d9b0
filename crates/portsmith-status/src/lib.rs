//! The installed-tree status database (`spec.md` §4.4).
//!
//! On disk, under the installed root:
//!
//! ```text
//! vcpkg/status                     append-only log of StatusParagraphs
//! vcpkg/updates/<NNNNN>            numbered append-only increments
//! vcpkg/info/<spec>_<version>_<triplet>.list   file manifest per package
//! <triplet>/...                    the actual installed files
//! ```
//!
//! Every mutation is written to a fresh `updates/<NNNNN>` file before any
//! observable file-tree change happens, so replaying the log after a crash
//! reproduces the last durable state.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod db;
mod error;
mod listfile;
mod types;

pub use db::StatusDatabase;
pub use error::StatusError;
pub use listfile::{check_conflicts, EntryKind, ListEntry, Listfile};
pub use types::{BinaryParagraph, InstallState, StatusParagraph, Want};

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, StatusError>;
