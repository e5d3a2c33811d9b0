//! The per-tag `CacheStatus` state machine (`spec.md` §4.3.2).

use std::sync::Arc;

use dashmap::DashMap;
use portsmith_core::{Error, ErrorCode};
use tokio::sync::Mutex as AsyncMutex;

use crate::archive::ArchiveManifest;

/// A tag's place in the restore/push lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// No backend has been asked about this tag yet.
    Unknown,
    /// A preflight hit said some backend has it, but it hasn't been fetched.
    Available,
    /// The archive was fetched and extracted this run.
    Restored,
    /// Every read backend declined, or the only hit turned out corrupt.
    Unavailable,
}

/// Tracks [`CacheStatus`] per ABI tag and serializes restore/push so that,
/// per §4.3.2, **at most one restore and at most one push happens per tag
/// across the whole run** — concurrent requests for the same tag block on a
/// per-tag lock; the first to acquire it does the work and everyone after
/// sees the already-settled status.
#[derive(Debug, Default)]
pub struct TagCoordinator {
    status: DashMap<String, CacheStatus>,
    restored: DashMap<String, ArchiveManifest>,
    restore_locks: DashMap<String, Arc<AsyncMutex<()>>>,
    push_locks: DashMap<String, Arc<AsyncMutex<()>>>,
    pushed: DashMap<String, Result<(), String>>,
}

impl TagCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status for `tag`, or `Unknown` if never touched.
    #[must_use]
    pub fn status(&self, tag: &str) -> CacheStatus {
        self.status.get(tag).map_or(CacheStatus::Unknown, |s| *s)
    }

    /// `unknown -> available` on a preflight hit. Never downgrades a tag
    /// that's already `Restored`.
    pub fn mark_available(&self, tag: &str) {
        self.status
            .entry(tag.to_string())
            .and_modify(|s| {
                if *s == CacheStatus::Unknown {
                    *s = CacheStatus::Available;
                }
            })
            .or_insert(CacheStatus::Available);
    }

    /// The manifest of an already-`Restored` tag, if this run restored it.
    #[must_use]
    pub fn restored_manifest(&self, tag: &str) -> Option<ArchiveManifest> {
        self.restored.get(tag).map(|m| m.clone())
    }

    /// Run `restore` under this tag's lock. If a previous call already
    /// settled the tag to `Restored` or `Unavailable`, `restore` is never
    /// invoked again and the cached outcome is returned instead.
    pub async fn restore_once<F, Fut>(&self, tag: &str, restore: F) -> crate::Result<Option<ArchiveManifest>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = crate::Result<Option<ArchiveManifest>>>,
    {
        let lock = self.restore_locks.entry(tag.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone();
        let _guard = lock.lock().await;

        match self.status(tag) {
            CacheStatus::Restored => return Ok(self.restored_manifest(tag)),
            CacheStatus::Unavailable => return Ok(None),
            _ => {}
        }

        let outcome = restore().await?;
        match &outcome {
            Some(manifest) => {
                self.status.insert(tag.to_string(), CacheStatus::Restored);
                self.restored.insert(tag.to_string(), manifest.clone());
            }
            None => {
                self.status.insert(tag.to_string(), CacheStatus::Unavailable);
            }
        }
        Ok(outcome)
    }

    /// Run `push` under this tag's lock, at most once per tag per run.
    /// Concurrent callers block on the lock and all receive the winner's
    /// actual outcome, including a mandatory-backend write failure.
    pub async fn push_once<F, Fut>(&self, tag: &str, push: F) -> crate::Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = crate::Result<()>>,
    {
        let lock = self.push_locks.entry(tag.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone();
        let _guard = lock.lock().await;

        if let Some(outcome) = self.pushed.get(tag) {
            return outcome.clone().map_err(|message| Error::CacheBackendDown {
                code: ErrorCode::CacheBackendDown,
                backend: tag.to_string(),
                message,
            });
        }

        let result = push().await;
        self.pushed.insert(tag.to_string(), result.as_ref().map(|()| ()).map_err(ToString::to_string));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_becomes_available_on_preflight_hit() {
        let coord = TagCoordinator::new();
        assert_eq!(coord.status("abc"), CacheStatus::Unknown);
        coord.mark_available("abc");
        assert_eq!(coord.status("abc"), CacheStatus::Available);
    }

    #[tokio::test]
    async fn restore_once_runs_the_closure_only_once() {
        let coord = TagCoordinator::new();
        let calls = std::sync::atomic::AtomicUsize::new(0);

        for _ in 0..3 {
            let result = coord
                .restore_once("tag", || async {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(Some(ArchiveManifest { entries: vec![("a".to_string(), "deadbeef".to_string())] }))
                })
                .await
                .unwrap();
            assert!(result.is_some());
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_tag_stays_unavailable() {
        let coord = TagCoordinator::new();
        let result = coord.restore_once("tag", || async { Ok(None) }).await.unwrap();
        assert!(result.is_none());
        assert_eq!(coord.status("tag"), CacheStatus::Unavailable);

        let second = coord.restore_once("tag", || async { panic!("should not run again") }).await.unwrap();
        assert!(second.is_none());
    }
}
