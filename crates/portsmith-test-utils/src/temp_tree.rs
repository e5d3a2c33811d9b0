//! A throwaway installed tree plus its loaded [`StatusDatabase`], for tests
//! that exercise the executor or status crate without hand-rolling a
//! `TempDir` + `vcpkg/` layout every time.

use std::path::{Path, PathBuf};

use portsmith_status::StatusDatabase;
use tempfile::TempDir;

/// An installed root backed by a [`TempDir`], with its status database
/// already loaded.
#[derive(Debug)]
pub struct TempInstalledTree {
    dir: TempDir,
    pub status: StatusDatabase,
}

impl TempInstalledTree {
    /// Create an empty installed tree and load its (empty) status database.
    pub fn new() -> portsmith_status::Result<Self> {
        let dir = TempDir::new().expect("failed to create temp dir");
        let status = StatusDatabase::load(dir.path().join("vcpkg"))?;
        Ok(Self { dir, status })
    }

    /// The installed root path.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// The `vcpkg/info` directory, where listfiles live.
    #[must_use]
    pub fn info_dir(&self) -> PathBuf {
        self.dir.path().join("vcpkg").join("info")
    }

    /// A fresh, empty staging directory under this tree, distinct from the
    /// installed root.
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.dir.path().join("staging")
    }
}
