//! `BinaryCache` (`spec.md` §4.3): the two arrows, `restore` and `push`,
//! over an ordered list of backends.

use std::path::Path;
use std::sync::Arc;

use portsmith_core::Result;
use tracing::warn;

use crate::archive::{self, ArchiveManifest};
use crate::backend::CacheBackend;
use crate::stats::{CacheStats, CacheStatsSnapshot};
use crate::status::{CacheStatus, TagCoordinator};

/// One backend plus whether a write failure on it is fatal (§4.3.5).
struct BackendSlot {
    backend: Arc<dyn CacheBackend>,
    mandatory: bool,
}

impl std::fmt::Debug for BackendSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSlot").field("kind", &self.backend.kind()).field("mandatory", &self.mandatory).finish()
    }
}

/// Outcome of [`BinaryCache::restore`].
#[derive(Debug)]
pub enum RestoreOutcome {
    /// An archive was fetched, verified, and extracted into the target
    /// directory.
    Restored(ArchiveManifest),
    /// No read-capable backend had this tag.
    Unavailable,
}

/// The ABI-tag-keyed binary cache composed from an ordered backend list.
#[derive(Debug)]
pub struct BinaryCache {
    backends: Vec<BackendSlot>,
    coordinator: TagCoordinator,
    stats: CacheStats,
}

impl Default for BinaryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryCache {
    #[must_use]
    pub fn new() -> Self {
        Self { backends: Vec::new(), coordinator: TagCoordinator::new(), stats: CacheStats::new() }
    }

    /// Append a backend. Order matters: `restore` tries backends in the
    /// order they're added, returning the first hit.
    pub fn add_backend(&mut self, backend: Arc<dyn CacheBackend>, mandatory: bool) -> &mut Self {
        self.backends.push(BackendSlot { backend, mandatory });
        self
    }

    #[must_use]
    pub fn status(&self, tag: &str) -> CacheStatus {
        self.coordinator.status(tag)
    }

    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// §4.3.3: ask every preflight-capable backend to batch-resolve `tags`
    /// in one round trip each, marking hits `Available`. Never marks a tag
    /// `Unavailable` — that's only decided authoritatively by `restore`,
    /// since a backend without preflight capability might still have it.
    pub async fn preflight_batch(&self, tags: &[String]) -> Result<()> {
        if tags.is_empty() {
            return Ok(());
        }
        for slot in &self.backends {
            if !slot.backend.capabilities().preflight {
                continue;
            }
            match slot.backend.preflight_batch(tags).await {
                Ok(hits) => {
                    for (tag, hit) in hits {
                        if hit {
                            self.coordinator.mark_available(&tag);
                        }
                    }
                }
                Err(error) => warn!(backend = slot.backend.kind(), %error, "preflight failed, treated as no hits"),
            }
        }
        Ok(())
    }

    /// §4.3's `restore` arrow, serialized per tag by [`TagCoordinator`].
    pub async fn restore(&self, tag: &str, dest: &Path) -> Result<RestoreOutcome> {
        let manifest = self
            .coordinator
            .restore_once(tag, || async {
                for slot in &self.backends {
                    if !slot.backend.capabilities().read {
                        continue;
                    }
                    let bytes = match slot.backend.read(tag).await {
                        Ok(Some(bytes)) => bytes,
                        Ok(None) => continue,
                        Err(error) => {
                            warn!(backend = slot.backend.kind(), tag, %error, "read failed, treated as miss");
                            continue;
                        }
                    };
                    match archive::unpack_archive(&bytes, dest, tag, slot.backend.kind()) {
                        Ok(manifest) => return Ok(Some(manifest)),
                        Err(error) => {
                            warn!(backend = slot.backend.kind(), tag, %error, "archive corrupt, falling through");
                            continue;
                        }
                    }
                }
                Ok(None)
            })
            .await?;

        match manifest {
            Some(manifest) => {
                let bytes: u64 = manifest.entries.len() as u64;
                self.stats.record_restore_hit(bytes);
                Ok(RestoreOutcome::Restored(manifest))
            }
            None => {
                self.stats.record_restore_miss();
                Ok(RestoreOutcome::Unavailable)
            }
        }
    }

    /// §4.3's `push` arrow: pack `package_dir` once and upload to every
    /// write-capable backend. A mandatory backend's write failure is fatal
    /// (propagated); a best-effort backend's is warned and skipped, per
    /// §4.3.5.
    pub async fn push(&self, tag: &str, package_dir: &Path) -> Result<()> {
        self.coordinator
            .push_once(tag, || async {
                let writers: Vec<_> = self.backends.iter().filter(|s| s.backend.capabilities().write).collect();
                if writers.is_empty() {
                    return Ok(());
                }
                let archive = archive::pack_directory(package_dir)?;
                for slot in writers {
                    match slot.backend.write(tag, &archive).await {
                        Ok(()) => self.stats.record_push(archive.len() as u64),
                        Err(error) if slot.mandatory => {
                            self.stats.record_push_failure();
                            return Err(error);
                        }
                        Err(error) => {
                            self.stats.record_push_failure();
                            warn!(backend = slot.backend.kind(), tag, %error, "write failed on best-effort backend, skipped");
                        }
                    }
                }
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::LocalDirectoryBackend;
    use tempfile::TempDir;

    #[tokio::test]
    async fn push_then_restore_round_trips() {
        let cache_dir = TempDir::new().unwrap();
        let mut cache = BinaryCache::new();
        cache.add_backend(Arc::new(LocalDirectoryBackend::open(cache_dir.path()).unwrap()), true);

        let package = TempDir::new().unwrap();
        std::fs::write(package.path().join("libzlib.a"), b"fake static lib").unwrap();

        cache.push("abcdef0123456789", package.path()).await.unwrap();

        let dest = TempDir::new().unwrap();
        let outcome = cache.restore("abcdef0123456789", dest.path()).await.unwrap();
        match outcome {
            RestoreOutcome::Restored(manifest) => assert_eq!(manifest.entries.len(), 1),
            RestoreOutcome::Unavailable => panic!("expected a hit"),
        }
        assert_eq!(std::fs::read(dest.path().join("libzlib.a")).unwrap(), b"fake static lib");
        assert_eq!(cache.status("abcdef0123456789"), CacheStatus::Restored);
    }

    #[tokio::test]
    async fn restore_with_no_backends_is_unavailable() {
        let cache = BinaryCache::new();
        let dest = TempDir::new().unwrap();
        let outcome = cache.restore("nope", dest.path()).await.unwrap();
        assert!(matches!(outcome, RestoreOutcome::Unavailable));
        assert_eq!(cache.status("nope"), CacheStatus::Unavailable);
    }

    #[tokio::test]
    async fn preflight_marks_hits_available_without_restoring() {
        let cache_dir = TempDir::new().unwrap();
        let local = LocalDirectoryBackend::open(cache_dir.path()).unwrap();
        local.write("tag1", b"x").await.unwrap();

        let mut cache = BinaryCache::new();
        cache.add_backend(Arc::new(local), true);

        cache.preflight_batch(&["tag1".to_string(), "tag2".to_string()]).await.unwrap();
        assert_eq!(cache.status("tag1"), CacheStatus::Available);
        assert_eq!(cache.status("tag2"), CacheStatus::Unknown);
    }
}
