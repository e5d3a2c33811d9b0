//! The three interfaces the planner consumes from the registry/toolchain
//! layer (`spec.md` §6).

use std::collections::HashMap;

use async_trait::async_trait;
use portsmith_core::{PackageSpec, Result, SchemedVersion, Triplet};

use crate::scf::SourceControlFile;

/// Resolves a port name (optionally at a specific version) to its metadata.
///
/// Implementations live outside the core (the registry layer); this crate
/// only defines the shape of the answer the planner needs.
#[async_trait]
pub trait PortProvider: Send + Sync {
    /// The latest (or, in versioned mode, the baseline-selected) control
    /// file for `port_name`.
    async fn get_control_file(&self, port_name: &str) -> Result<SourceControlFile>;

    /// The control file for `port_name` at an exact version.
    async fn get_control_file_at(
        &self,
        port_name: &str,
        version: &SchemedVersion,
    ) -> Result<SourceControlFile>;

    /// Every version of `port_name` the registry knows about, newest first.
    async fn get_port_versions(&self, port_name: &str) -> Result<Vec<SchemedVersion>>;
}

/// Resolves a port name to the project's baseline minimum version.
///
/// Returns `None` in classic mode (no manifest baseline) or when the port is
/// simply absent from the baseline file.
#[async_trait]
pub trait BaselineProvider: Send + Sync {
    /// The baseline minimum version for `port_name`, if any.
    async fn baseline_for(&self, port_name: &str) -> Option<SchemedVersion>;

    /// Whether this provider has a baseline at all (classic vs. versioned
    /// mode selector — see `spec.md` §4.1.1).
    fn has_baseline(&self) -> bool;
}

/// Batch-evaluates triplet/feature platform expressions by invoking the
/// toolchain once per batched request.
///
/// Callers must load vars for every reachable spec (via [`load_tag_vars`])
/// before calling [`get_tag_vars`] — the contract is "populate in bulk, read
/// one at a time", matching `spec.md` §4.1.3's one-batch-load requirement.
///
/// [`load_tag_vars`]: CMakeVarProvider::load_tag_vars
/// [`get_tag_vars`]: CMakeVarProvider::get_tag_vars
#[async_trait]
pub trait CMakeVarProvider: Send + Sync {
    /// Load the vars for a bare triplet (used for host/target checks that
    /// don't depend on any specific port).
    async fn load_generic_triplet_vars(&self, triplet: &Triplet) -> Result<()>;

    /// Batch-load vars for a set of (package spec, port directory) pairs.
    async fn load_tag_vars(&self, requests: &[(PackageSpec, std::path::PathBuf)]) -> Result<()>;

    /// Read back the vars loaded for `spec` by a prior batch call.
    ///
    /// Returns `None` if `spec` was never loaded — callers must not call
    /// this before the matching `load_*` call completes.
    fn get_tag_vars(&self, spec: &PackageSpec) -> Option<HashMap<String, String>>;
}
