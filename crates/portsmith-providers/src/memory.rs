//! In-memory reference implementations of the three provider traits, used
//! by tests and by callers running against a fixed, pre-loaded port set.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::RwLock;
use portsmith_core::error::{Error, ErrorCode};
use portsmith_core::{PackageSpec, Result, SchemedVersion, Triplet};

use crate::scf::SourceControlFile;
use crate::traits::{BaselineProvider, CMakeVarProvider, PortProvider};

/// A fixed table of port name -> every known version's control file,
/// newest-first.
#[derive(Default)]
pub struct InMemoryPortProvider {
    ports: RwLock<HashMap<String, Vec<SourceControlFile>>>,
}

impl InMemoryPortProvider {
    /// An empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a version of a port, most-recently-added wins ties in
    /// "latest" lookups (insertion order is preserved as newest-first).
    pub fn insert(&self, scf: SourceControlFile) {
        self.ports
            .write()
            .entry(scf.name.clone())
            .or_default()
            .insert(0, scf);
    }
}

#[async_trait]
impl PortProvider for InMemoryPortProvider {
    async fn get_control_file(&self, port_name: &str) -> Result<SourceControlFile> {
        self.ports
            .read()
            .get(port_name)
            .and_then(|versions| versions.first())
            .cloned()
            .ok_or_else(|| Error::PortNotFound {
                code: ErrorCode::PortNotFound,
                name: port_name.to_string(),
            })
    }

    async fn get_control_file_at(
        &self,
        port_name: &str,
        version: &SchemedVersion,
    ) -> Result<SourceControlFile> {
        self.ports
            .read()
            .get(port_name)
            .and_then(|versions| {
                versions
                    .iter()
                    .find(|scf| scf.version.version().text() == version.version().text()
                        && scf.version.version().port_version() == version.version().port_version())
            })
            .cloned()
            .ok_or_else(|| Error::PortNotFound {
                code: ErrorCode::PortNotFound,
                name: port_name.to_string(),
            })
    }

    async fn get_port_versions(&self, port_name: &str) -> Result<Vec<SchemedVersion>> {
        Ok(self
            .ports
            .read()
            .get(port_name)
            .map(|versions| versions.iter().map(|scf| scf.version.clone()).collect())
            .unwrap_or_default())
    }
}

/// A fixed port-name -> baseline-version table.
#[derive(Default)]
pub struct InMemoryBaselineProvider {
    baseline: HashMap<String, SchemedVersion>,
}

impl InMemoryBaselineProvider {
    /// A provider with no baseline at all (classic mode).
    #[must_use]
    pub fn classic() -> Self {
        Self::default()
    }

    /// A provider with an explicit baseline map (versioned mode).
    #[must_use]
    pub fn versioned(baseline: HashMap<String, SchemedVersion>) -> Self {
        Self { baseline }
    }
}

#[async_trait]
impl BaselineProvider for InMemoryBaselineProvider {
    async fn baseline_for(&self, port_name: &str) -> Option<SchemedVersion> {
        self.baseline.get(port_name).cloned()
    }

    fn has_baseline(&self) -> bool {
        !self.baseline.is_empty()
    }
}

/// A cmake-var provider backed by a fixed table, for tests that don't need
/// to invoke a real toolchain.
#[derive(Default)]
pub struct InMemoryCMakeVarProvider {
    generic: RwLock<HashMap<String, HashMap<String, String>>>,
    per_spec: RwLock<HashMap<PackageSpec, HashMap<String, String>>>,
}

impl InMemoryCMakeVarProvider {
    /// An empty provider; every spec's vars default to empty until
    /// registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register the vars a real toolchain probe would have produced for
    /// `spec`.
    pub fn register(&self, spec: PackageSpec, vars: HashMap<String, String>) {
        self.per_spec.write().insert(spec, vars);
    }

    /// Pre-register the vars for a bare triplet.
    pub fn register_triplet(&self, triplet: &Triplet, vars: HashMap<String, String>) {
        self.generic.write().insert(triplet.as_str().to_string(), vars);
    }
}

#[async_trait]
impl CMakeVarProvider for InMemoryCMakeVarProvider {
    async fn load_generic_triplet_vars(&self, triplet: &Triplet) -> Result<()> {
        self.generic
            .write()
            .entry(triplet.as_str().to_string())
            .or_default();
        Ok(())
    }

    async fn load_tag_vars(&self, requests: &[(PackageSpec, PathBuf)]) -> Result<()> {
        let mut guard = self.per_spec.write();
        for (spec, _dir) in requests {
            guard.entry(spec.clone()).or_default();
        }
        Ok(())
    }

    fn get_tag_vars(&self, spec: &PackageSpec) -> Option<HashMap<String, String>> {
        self.per_spec.read().get(spec).cloned()
    }
}
