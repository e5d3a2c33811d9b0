//! The `CacheBackend` trait (`spec.md` §4.3.1): each backend implements
//! some subset of `{preflight-batch, read, write}`.

use async_trait::async_trait;
use portsmith_core::AHashMap;

/// Which of the three operations a backend actually supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    pub preflight: bool,
    pub read: bool,
    pub write: bool,
}

/// One cache tier. The cache composes an ordered list of these; backends
/// without a capability simply aren't asked for it.
#[async_trait]
pub trait CacheBackend: Send + Sync + std::fmt::Debug {
    /// A short, stable identifier used in logs and in [`Error::CacheCorrupt`](portsmith_core::Error::CacheCorrupt)/
    /// [`Error::CacheBackendDown`](portsmith_core::Error::CacheBackendDown) messages.
    fn kind(&self) -> &'static str;

    /// Which operations this backend supports.
    fn capabilities(&self) -> BackendCapabilities;

    /// Batch-resolve every tag in `tags` to whether this backend holds an
    /// archive for it. Backends without `preflight` capability are never
    /// called; the cache falls back to discovering availability via `read`.
    async fn preflight_batch(&self, tags: &[String]) -> portsmith_core::Result<AHashMap<String, bool>>;

    /// Fetch the archive bytes for `tag`, or `None` if this backend doesn't
    /// have it. A backend-level failure (network error, bad credentials) is
    /// an `Err`; the caller treats both as a miss per §4.3.5.
    async fn read(&self, tag: &str) -> portsmith_core::Result<Option<Vec<u8>>>;

    /// Upload `archive` under `tag`.
    async fn write(&self, tag: &str, archive: &[u8]) -> portsmith_core::Result<()>;
}
