//! The `AbiEngine` orchestrator (`spec.md` §4.2).

use portsmith_core::{AHashMap, AbiInfo, PackageSpec, Result, Triplet, CORE_FEATURE};
use portsmith_planner::{ActionPlan, PlanAction};
use portsmith_status::StatusDatabase;
use tracing::{debug, trace};

use crate::config::AbiConfig;
use crate::inputs::{
    compiler_info_abi, dependency_entries, feature_set_entry, fold_entries, port_directory_entries,
    tool_version_entry, toolset_abi, triplet_abi, version_entry, AbiEntry, CmakeHelper, CompilerInfo, ToolsetInfo,
};
use crate::manifest::render_manifest;
use crate::sbom::{render_sbom, SbomFile};

/// Computes `package_abi` tags over an [`ActionPlan`] and applies the
/// rebuild decision of §4.2.3.
#[derive(Debug)]
pub struct AbiEngine {
    config: AbiConfig,
}

impl AbiEngine {
    /// Build an engine with the given configuration.
    #[must_use]
    pub fn new(config: AbiConfig) -> Self {
        Self { config }
    }

    /// Compute ABI tags for every install action in `plan`, in the order
    /// they already appear (the planner guarantees this is topological), and
    /// demote any action whose tag matches what's already installed.
    pub fn compute(
        &self,
        plan: &mut ActionPlan,
        status: &StatusDatabase,
        host_triplet: &Triplet,
        helpers: &AHashMap<PackageSpec, Vec<CmakeHelper>>,
        compiler: Option<&CompilerInfo>,
        toolset: &ToolsetInfo,
    ) -> Result<()> {
        let mut tags: AHashMap<PackageSpec, String> = AHashMap::default();
        let mut to_demote = Vec::new();

        for action in plan.actions_mut() {
            let PlanAction::Install(install) = action else { continue };

            let Some(dir) = install.package_directory.clone() else {
                trace!(spec = %install.spec, "no package directory, abi withheld");
                continue;
            };
            if self.config.track_compiler && compiler.is_none() {
                trace!(spec = %install.spec, "compiler tracking on but no probe supplied, abi withheld");
                continue;
            }

            let mut entries = vec![feature_set_entry(&install.resolved_features)];
            entries.extend(port_directory_entries(&dir)?);

            let mut dep_tags = Vec::with_capacity(install.dependency_edges.len());
            let mut complete = true;
            for dep in &install.dependency_edges {
                let triplet = if dep.host { host_triplet.clone() } else { install.spec.triplet().clone() };
                let target = PackageSpec::new(dep.port.clone(), triplet);
                let tag = tags.get(&target).cloned().or_else(|| {
                    status.get(&target, CORE_FEATURE).and_then(|p| p.package.abi_tag.clone())
                });
                match tag {
                    Some(tag) => dep_tags.push((dep.port.clone(), tag)),
                    None => {
                        complete = false;
                        break;
                    }
                }
            }
            if !complete {
                trace!(spec = %install.spec, "a dependency has no known abi tag, abi withheld");
                continue;
            }
            entries.extend(dependency_entries(&dep_tags));

            let port_helpers = helpers.get(&install.spec).cloned().unwrap_or_default();
            let triplet_tag = triplet_abi(install.spec.triplet().as_str(), host_triplet.as_str(), &port_helpers);
            entries.push(AbiEntry::new("triplet_abi", triplet_tag.clone()));

            let compiler_tag = compiler.map(compiler_info_abi);
            if let Some(tag) = &compiler_tag {
                entries.push(AbiEntry::new("compiler_abi", tag.clone()));
            }

            let toolset_tag = toolset_abi(toolset);
            entries.push(AbiEntry::new("toolset_abi", toolset_tag.clone()));

            entries.push(version_entry(&install.version));
            entries.push(tool_version_entry(&self.config.tool_abi_tag));

            let mut hasher = portsmith_core::ContentHasher::new();
            fold_entries(&entries, &mut hasher);
            let package_abi = hasher.finish();

            let manifest_text = render_manifest(&entries);
            let sbom_files: Vec<SbomFile> = entries
                .iter()
                .filter_map(|e| {
                    e.key.strip_prefix("portfile:").map(|name| SbomFile { file_name: name.to_string(), sha512: e.value.clone() })
                })
                .collect();
            let scf_license = install.control_file.as_ref().and_then(|scf| scf.license.clone());
            let sbom_json = render_sbom(
                install.spec.name(),
                install.version.version().text(),
                scf_license.as_deref(),
                &sbom_files,
                chrono::Utc::now(),
            );

            tags.insert(install.spec.clone(), package_abi.clone());

            install.abi_info = Some(AbiInfo {
                toolset_abi: Some(toolset_tag),
                compiler_abi: compiler_tag,
                triplet_abi: Some(triplet_tag),
                package_abi: Some(package_abi.clone()),
                manifest_text,
                sbom_json,
            });

            let already_matches = !self.config.force_rebuild
                && status
                    .get(&install.spec, CORE_FEATURE)
                    .and_then(|p| p.package.abi_tag.clone())
                    .is_some_and(|installed_tag| installed_tag == package_abi);
            if already_matches {
                install.cached = true;
                to_demote.push(install.spec.clone());
            }
        }

        for spec in &to_demote {
            plan.demote_to_cached(spec);
        }
        debug!(computed = tags.len(), demoted = to_demote.len(), "abi computation complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portsmith_core::{Dependency, Triplet as T, Version, VersionScheme};
    use portsmith_planner::{InstallPlanAction, InstallReason};
    use portsmith_status::{BinaryParagraph, StatusParagraph};
    use tempfile::TempDir;

    fn triplet() -> T {
        T::new("x64-linux")
    }

    fn package_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("portfile.cmake"), b"message(status hi)").unwrap();
        dir
    }

    fn install_action(name: &str, dir: &TempDir, deps: Vec<Dependency>) -> InstallPlanAction {
        InstallPlanAction {
            spec: PackageSpec::new(name, triplet()),
            version: portsmith_core::SchemedVersion::new(VersionScheme::Relaxed, Version::new("1.0", 0)),
            resolved_features: vec![CORE_FEATURE.to_string()],
            dependency_edges: deps,
            control_file: None,
            abi_info: None,
            package_directory: Some(dir.path().to_path_buf()),
            reason: InstallReason::UserRequested,
            cached: false,
        }
    }

    fn toolset() -> ToolsetInfo {
        ToolsetInfo { version: "1".to_string(), path_fingerprint: "abc".to_string() }
    }

    #[test]
    fn computes_a_package_abi_for_a_leaf_action() {
        let dir = package_dir();
        let action = install_action("zlib", &dir, Vec::new());
        let mut plan = ActionPlan::from_actions(vec![PlanAction::Install(action)]);
        let status_dir = TempDir::new().unwrap();
        let status = StatusDatabase::load(status_dir.path()).unwrap();

        let engine = AbiEngine::new(AbiConfig::new("v1"));
        engine
            .compute(&mut plan, &status, &triplet(), &AHashMap::default(), None, &toolset())
            .unwrap();

        let install = plan.install_actions().next().unwrap();
        assert!(install.abi_info.as_ref().unwrap().is_complete());
    }

    #[test]
    fn matching_installed_tag_demotes_to_cached() {
        let dir = package_dir();
        let action = install_action("zlib", &dir, Vec::new());
        let mut plan = ActionPlan::from_actions(vec![PlanAction::Install(action.clone())]);
        let status_dir = TempDir::new().unwrap();
        let status = StatusDatabase::load(status_dir.path()).unwrap();

        let engine = AbiEngine::new(AbiConfig::new("v1"));
        engine
            .compute(&mut plan, &status, &triplet(), &AHashMap::default(), None, &toolset())
            .unwrap();
        let first_tag = plan.install_actions().next().unwrap().abi_info.as_ref().unwrap().package_abi.clone().unwrap();

        status
            .append(StatusParagraph::installed(BinaryParagraph {
                spec: action.spec.clone(),
                version: Version::new("1.0", 0),
                feature: CORE_FEATURE.to_string(),
                dependencies: Vec::new(),
                abi_tag: Some(first_tag),
            }))
            .unwrap();

        let mut plan2 = ActionPlan::from_actions(vec![PlanAction::Install(action)]);
        engine
            .compute(&mut plan2, &status, &triplet(), &AHashMap::default(), None, &toolset())
            .unwrap();
        assert!(plan2.is_empty());
    }

    #[test]
    fn missing_package_directory_withholds_the_tag() {
        let mut action = install_action("zlib", &package_dir(), Vec::new());
        action.package_directory = None;
        let mut plan = ActionPlan::from_actions(vec![PlanAction::Install(action)]);
        let status_dir = TempDir::new().unwrap();
        let status = StatusDatabase::load(status_dir.path()).unwrap();

        let engine = AbiEngine::new(AbiConfig::new("v1"));
        engine
            .compute(&mut plan, &status, &triplet(), &AHashMap::default(), None, &toolset())
            .unwrap();

        let install = plan.install_actions().next().unwrap();
        assert!(install.abi_info.is_none());
    }
}
