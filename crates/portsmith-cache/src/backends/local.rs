//! The local-directory backend (`spec.md` §4.3.1): `<root>/<ab>/<abi>.zip`
//! sharding by the tag's first two hex characters, atomic writes via a
//! same-directory temp file and rename.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use portsmith_core::error::Error;
use portsmith_core::{AHashMap, Result};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::backend::{BackendCapabilities, CacheBackend};

#[derive(Debug)]
pub struct LocalDirectoryBackend {
    root: PathBuf,
}

impl LocalDirectoryBackend {
    /// Open (creating if needed) a local-directory cache rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::io(&root, e))?;
        Ok(Self { root })
    }

    fn shard_path(&self, tag: &str) -> PathBuf {
        let shard = if tag.len() >= 2 { &tag[..2] } else { "00" };
        self.root.join(shard).join(format!("{tag}.zip"))
    }
}

#[async_trait]
impl CacheBackend for LocalDirectoryBackend {
    fn kind(&self) -> &'static str {
        "local"
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities { preflight: true, read: true, write: true }
    }

    async fn preflight_batch(&self, tags: &[String]) -> Result<AHashMap<String, bool>> {
        Ok(tags.iter().map(|tag| (tag.clone(), self.shard_path(tag).exists())).collect())
    }

    async fn read(&self, tag: &str) -> Result<Option<Vec<u8>>> {
        let path = self.shard_path(tag);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path).map_err(|e| Error::io(&path, e))?;
        Ok(Some(data))
    }

    async fn write(&self, tag: &str, archive: &[u8]) -> Result<()> {
        let path = self.shard_path(tag);
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
        std::io::Write::write_all(&mut temp, archive).map_err(|e| Error::io(&path, e))?;
        temp.persist(&path).map_err(|e| Error::io(&path, e.error))?;
        debug!(tag, bytes = archive.len(), path = %path.display(), "wrote local cache entry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn round_trips_through_the_shard_layout() {
        let dir = TempDir::new().unwrap();
        let backend = LocalDirectoryBackend::open(dir.path()).unwrap();

        backend.write("abcdef0123", b"archive bytes").await.unwrap();
        assert!(dir.path().join("ab").join("abcdef0123.zip").exists());

        let data = backend.read("abcdef0123").await.unwrap();
        assert_eq!(data, Some(b"archive bytes".to_vec()));
    }

    #[tokio::test]
    async fn preflight_reports_misses_without_reading() {
        let dir = TempDir::new().unwrap();
        let backend = LocalDirectoryBackend::open(dir.path()).unwrap();
        backend.write("tag1", b"x").await.unwrap();

        let result = backend.preflight_batch(&["tag1".to_string(), "tag2".to_string()]).await.unwrap();
        assert_eq!(result.get("tag1"), Some(&true));
        assert_eq!(result.get("tag2"), Some(&false));
    }
}
