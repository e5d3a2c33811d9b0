//! The templated HTTP GET/PUT backend (`spec.md` §4.3.1), also reused for
//! the NuGet-like feed kind — a NuGet feed is, at the wire level, just a
//! GET/PUT pair against a URL built from the same (spec, tag) identity, so
//! it needs no separate implementation, only a different `UrlTemplate`.

use async_trait::async_trait;
use portsmith_core::error::{Error, ErrorCode};
use portsmith_core::{AHashMap, Result};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::backend::{BackendCapabilities, CacheBackend};

/// The identity a URL template is filled in with: `{name}`, `{triplet}`,
/// `{version}`, `{sha}` per §4.3.1. The ABI tag itself fills `{sha}` since
/// it's the cache key, not a content hash of anything in particular.
#[derive(Debug, Clone)]
pub struct UrlTemplate {
    pub get: String,
    pub put: String,
}

impl UrlTemplate {
    fn fill(template: &str, name: &str, triplet: &str, version: &str, tag: &str) -> String {
        template
            .replace("{name}", name)
            .replace("{triplet}", triplet)
            .replace("{version}", version)
            .replace("{sha}", tag)
    }
}

/// A read/write HTTP backend addressed by a templated URL pair.
#[derive(Debug)]
pub struct HttpBackend {
    client: Client,
    template: UrlTemplate,
    name: String,
    triplet: String,
    version: String,
    read: bool,
    write: bool,
}

impl HttpBackend {
    /// Build a backend for one package identity's archive. The planner's
    /// caller constructs one of these per action rather than one shared
    /// instance, since the identity the template fills in is per-package.
    #[must_use]
    pub fn new(client: Client, template: UrlTemplate, name: impl Into<String>, triplet: impl Into<String>, version: impl Into<String>) -> Self {
        Self { client, template, name: name.into(), triplet: triplet.into(), version: version.into(), read: true, write: true }
    }

    /// A NuGet-like feed is the same templated GET/PUT shape, wrapping the
    /// (spec, tag) as a package version.
    #[must_use]
    pub fn nuget_like(client: Client, feed_url: &str, name: impl Into<String>, triplet: impl Into<String>) -> Self {
        let name = name.into();
        let triplet = triplet.into();
        let template = UrlTemplate {
            get: format!("{feed_url}/package/{{name}}.{{sha}}.nupkg"),
            put: format!("{feed_url}/api/v2/package"),
        };
        Self { client, template, name, triplet, version: "0.0.0-abi".to_string(), read: true, write: true }
    }

    fn url(&self, template: &str, tag: &str) -> String {
        UrlTemplate::fill(template, &self.name, &self.triplet, &self.version, tag)
    }

    fn down(&self, message: impl Into<String>) -> Error {
        Error::CacheBackendDown { code: ErrorCode::CacheBackendDown, backend: self.kind().to_string(), message: message.into() }
    }
}

#[async_trait]
impl CacheBackend for HttpBackend {
    fn kind(&self) -> &'static str {
        "http"
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities { preflight: false, read: self.read, write: self.write }
    }

    async fn preflight_batch(&self, tags: &[String]) -> Result<AHashMap<String, bool>> {
        // No batch HEAD endpoint in the plain GET/PUT contract; every tag
        // reports unknown and falls through to `read` during restore.
        Ok(tags.iter().map(|t| (t.clone(), false)).collect())
    }

    async fn read(&self, tag: &str) -> Result<Option<Vec<u8>>> {
        if !self.read {
            return Ok(None);
        }
        let url = self.url(&self.template.get, tag);
        let response = self.client.get(&url).send().await.map_err(|e| self.down(e.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let bytes = response.bytes().await.map_err(|e| self.down(e.to_string()))?;
                Ok(Some(bytes.to_vec()))
            }
            status => Err(self.down(format!("GET {url} returned {status}"))),
        }
    }

    async fn write(&self, tag: &str, archive: &[u8]) -> Result<()> {
        if !self.write {
            return Ok(());
        }
        let url = self.url(&self.template.put, tag);
        let response = self.client.put(&url).body(archive.to_vec()).send().await.map_err(|e| self.down(e.to_string()))?;
        if !response.status().is_success() {
            return Err(self.down(format!("PUT {url} returned {}", response.status())));
        }
        debug!(tag, bytes = archive.len(), %url, "pushed to http backend");
        Ok(())
    }
}
