//! The null backend (`spec.md` §4.3.1): supports nothing, used for dry runs
//! so the cache layer has at least one backend to iterate without touching
//! any storage.

use async_trait::async_trait;
use portsmith_core::{AHashMap, Result};

use crate::backend::{BackendCapabilities, CacheBackend};

#[derive(Debug, Default)]
pub struct NullBackend;

impl NullBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheBackend for NullBackend {
    fn kind(&self) -> &'static str {
        "null"
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities { preflight: false, read: false, write: false }
    }

    async fn preflight_batch(&self, tags: &[String]) -> Result<AHashMap<String, bool>> {
        Ok(tags.iter().map(|t| (t.clone(), false)).collect())
    }

    async fn read(&self, _tag: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn write(&self, _tag: &str, _archive: &[u8]) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn never_has_anything() {
        let backend = NullBackend::new();
        assert_eq!(backend.read("tag").await.unwrap(), None);
    }
}
