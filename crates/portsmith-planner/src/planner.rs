//! `DependencyPlanner` — ties version resolution, feature fixed-point,
//! topological ordering and status-database interaction together into the
//! `plan` contract of `spec.md` §4.1.

use std::collections::HashMap;

use portsmith_core::{AHashMap, AHashSet, FullPackageSpec, PackageSpec, SchemedVersion, CORE_FEATURE};
use portsmith_providers::{BaselineProvider, CMakeVarProvider, PortProvider};
use portsmith_status::StatusDatabase;
use tracing::{debug, info};

use crate::action::{ActionPlan, InstallPlanAction, InstallReason, PlanAction, RemovePlanAction, RemoveReason};
use crate::config::PlannerConfig;
use crate::features::{self, FeatureResolution};
use crate::graph;
use crate::version_resolve;

/// Computes an [`ActionPlan`] from a set of top-level requests, the current
/// installed state, and the three provider interfaces.
#[derive(Debug)]
pub struct DependencyPlanner {
    config: PlannerConfig,
}

impl DependencyPlanner {
    /// Build a planner with the given flags.
    #[must_use]
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Plan the install of `requests` against `status`.
    #[tracing::instrument(skip_all, fields(requests = requests.len()))]
    pub async fn plan(
        &self,
        requests: &[FullPackageSpec],
        status: &StatusDatabase,
        port_provider: &dyn PortProvider,
        baseline: &dyn BaselineProvider,
        cmake_vars: &dyn CMakeVarProvider,
    ) -> portsmith_core::Result<ActionPlan> {
        let roots: Vec<(PackageSpec, Vec<String>)> = requests
            .iter()
            .map(|r| (r.spec().clone(), r.features().to_vec()))
            .collect();

        let mut first_pass = features::resolve_features(&roots, port_provider, cmake_vars, &self.config).await?;
        if baseline.has_baseline() {
            self.reconcile_versions(&mut first_pass, port_provider, baseline).await?;
        }
        let mismatched = self.mismatched_specs(&first_pass, status);

        let cascaded = self.propagate_reinstalls(&mismatched, status, &first_pass);

        let resolution = if cascaded.is_empty() {
            first_pass
        } else {
            let mut combined_roots = roots;
            for spec in &cascaded {
                if let Some(feats) = self.currently_installed_features(spec, status) {
                    combined_roots.push((spec.clone(), feats));
                }
            }
            features::resolve_features(&combined_roots, port_provider, cmake_vars, &self.config).await?
        };

        let to_rebuild: AHashSet<PackageSpec> = mismatched.into_iter().chain(cascaded).collect();

        debug!(installs = resolution.features.len(), rebuilds = to_rebuild.len(), "planning complete");

        self.build_plan(&resolution, &to_rebuild, status)
    }

    /// Versioned mode (§4.1.1): re-resolve every reached spec's version
    /// against the baseline plus every `min_version` constraint that
    /// targets it, and refetch the control file when that moves the
    /// version past what the first feature-walk picked.
    ///
    /// Doesn't re-walk the new control file's own dependencies — a second
    /// `min_version` bump introduced only by a refetch won't itself be
    /// chased further.
    async fn reconcile_versions(
        &self,
        resolution: &mut FeatureResolution,
        port_provider: &dyn PortProvider,
        baseline: &dyn BaselineProvider,
    ) -> portsmith_core::Result<()> {
        let mut minima: AHashMap<PackageSpec, Vec<SchemedVersion>> = AHashMap::default();
        for (depender, deps) in &resolution.edges {
            for dep in deps {
                let Some(min_version) = &dep.min_version else { continue };
                let triplet = if dep.host { self.config.host_triplet.clone() } else { depender.triplet().clone() };
                let target = PackageSpec::new(dep.port.clone(), triplet);
                minima.entry(target).or_default().push(min_version.clone());
            }
        }

        let overrides: HashMap<String, SchemedVersion> = HashMap::new();
        let specs: Vec<PackageSpec> = resolution.features.keys().cloned().collect();
        for spec in specs {
            let Some(current) = resolution.control_files.get(&spec) else { continue };
            let spec_minima = minima.get(&spec).cloned().unwrap_or_default();
            let resolved = version_resolve::resolve_versioned(spec.name(), baseline, &spec_minima, &overrides).await?;
            if resolved.version().text() != current.version.version().text()
                || resolved.version().port_version() != current.version.version().port_version()
            {
                let refetched = port_provider.get_control_file_at(spec.name(), &resolved).await?;
                resolution.control_files.insert(spec.clone(), refetched);
            }
        }
        Ok(())
    }

    /// Any spec the planner resolved that's already installed but either at
    /// a different version, or with a feature set the installed copy
    /// doesn't already cover (§4.1.5, §9's feature-add decision: a feature
    /// set change always forces remove+install here).
    fn mismatched_specs(&self, resolution: &FeatureResolution, status: &StatusDatabase) -> AHashSet<PackageSpec> {
        let mut out = AHashSet::default();
        for (spec, features) in &resolution.features {
            let installed = status.installed_features(spec);
            if installed.is_empty() {
                continue;
            }
            let installed_names: AHashSet<&str> = installed.iter().map(|p| p.package.feature.as_str()).collect();
            let requested_is_superset = features.iter().all(|f| installed_names.contains(f.as_str()));

            let Some(scf) = resolution.control_files.get(spec) else { continue };
            let installed_version_matches = installed
                .first()
                .is_some_and(|p| p.package.version.text() == scf.version.version().text()
                    && p.package.version.port_version() == scf.version.version().port_version());

            if !requested_is_superset || !installed_version_matches {
                out.insert(spec.clone());
            }
        }
        out
    }

    /// Walk the status database's reverse-dependency graph from `removed`,
    /// finding every installed spec not already part of the plan that
    /// transitively depends on something being removed.
    fn propagate_reinstalls(
        &self,
        removed: &AHashSet<PackageSpec>,
        status: &StatusDatabase,
        resolution: &FeatureResolution,
    ) -> AHashSet<PackageSpec> {
        let mut reverse: AHashMap<String, Vec<PackageSpec>> = AHashMap::default();
        for paragraph in status.all_installed() {
            if !paragraph.package.is_core() {
                continue;
            }
            for dep_name in &paragraph.package.dependencies {
                reverse.entry(dep_name.clone()).or_default().push(paragraph.package.spec.clone());
            }
        }

        let mut out = AHashSet::default();
        let mut worklist: Vec<PackageSpec> = removed.iter().cloned().collect();
        while let Some(spec) = worklist.pop() {
            let Some(dependents) = reverse.get(&spec.canonical_name()) else { continue };
            for dependent in dependents {
                if removed.contains(dependent) || resolution.features.contains_key(dependent) {
                    continue;
                }
                if out.insert(dependent.clone()) {
                    worklist.push(dependent.clone());
                }
            }
        }
        out
    }

    fn currently_installed_features(&self, spec: &PackageSpec, status: &StatusDatabase) -> Option<Vec<String>> {
        let paragraphs = status.installed_features(spec);
        if paragraphs.is_empty() {
            return None;
        }
        Some(
            paragraphs
                .into_iter()
                .map(|p| p.package.feature)
                .filter(|f| f != CORE_FEATURE)
                .collect(),
        )
    }

    fn build_plan(
        &self,
        resolution: &FeatureResolution,
        to_rebuild: &AHashSet<PackageSpec>,
        status: &StatusDatabase,
    ) -> portsmith_core::Result<ActionPlan> {
        let specs: Vec<PackageSpec> = resolution.features.keys().cloned().collect();

        let mut edges: AHashMap<PackageSpec, Vec<PackageSpec>> = AHashMap::default();
        for (spec, deps) in &resolution.edges {
            let targets: Vec<PackageSpec> = deps
                .iter()
                .map(|d| {
                    let triplet = if d.host { self.config.host_triplet.clone() } else { spec.triplet().clone() };
                    PackageSpec::new(d.port.clone(), triplet)
                })
                .filter(|t| resolution.features.contains_key(t))
                .collect();
            if !targets.is_empty() {
                edges.insert(spec.clone(), targets);
            }
        }

        let ordered = graph::topological_order(&specs, &edges)?;

        let mut actions = Vec::with_capacity(ordered.len() * 2);
        for spec in ordered {
            let Some(scf) = resolution.control_files.get(&spec) else { continue };
            let already_installed = !status.installed_features(&spec).is_empty();
            let needs_rebuild = to_rebuild.contains(&spec);

            if needs_rebuild && already_installed {
                actions.push(PlanAction::Remove(RemovePlanAction {
                    spec: spec.clone(),
                    reason: RemoveReason::Superseded,
                }));
            }

            let mut resolved_features: Vec<String> =
                resolution.features.get(&spec).cloned().unwrap_or_default().into_iter().collect();
            resolved_features.sort();

            let reason = if already_installed {
                InstallReason::Rebuild
            } else if resolution.edges.values().any(|deps| {
                deps.iter().any(|d| {
                    let triplet = if d.host { self.config.host_triplet.clone() } else { spec.triplet().clone() };
                    PackageSpec::new(d.port.clone(), triplet) == spec
                })
            }) {
                InstallReason::Dependency
            } else {
                InstallReason::UserRequested
            };

            actions.push(PlanAction::Install(InstallPlanAction {
                spec: spec.clone(),
                version: scf.version.clone(),
                resolved_features,
                dependency_edges: resolution.edges.get(&spec).cloned().unwrap_or_default(),
                control_file: Some(scf.clone()),
                abi_info: None,
                package_directory: None,
                reason,
                cached: false,
            }));
        }

        info!(actions = actions.len(), "action plan built");
        Ok(ActionPlan::from_actions(actions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portsmith_core::{Dependency, FullPackageSpec, Triplet, Version, VersionScheme, CORE_FEATURE};
    use portsmith_providers::{InMemoryBaselineProvider, InMemoryCMakeVarProvider, InMemoryPortProvider, SourceControlFile};
    use portsmith_status::{BinaryParagraph, StatusDatabase, StatusParagraph};
    use tempfile::TempDir;

    fn triplet() -> Triplet {
        Triplet::new("x64-linux")
    }

    fn spec(name: &str) -> PackageSpec {
        PackageSpec::new(name, triplet())
    }

    fn scf(name: &str, version: &str, deps: Vec<Dependency>) -> SourceControlFile {
        SourceControlFile {
            name: name.to_string(),
            version: SchemedVersion::new(VersionScheme::Relaxed, Version::new(version, 0)),
            dependencies: deps,
            default_features: Vec::new(),
            license: None,
            supports: None,
            features: Vec::new(),
        }
    }

    fn planner() -> DependencyPlanner {
        DependencyPlanner::new(PlannerConfig::new(triplet()))
    }

    #[tokio::test]
    async fn plans_a_leaf_install_with_no_dependencies() {
        let ports = InMemoryPortProvider::new();
        ports.insert(scf("zlib", "1.2", Vec::new()));
        let dir = TempDir::new().unwrap();
        let status = StatusDatabase::load(dir.path()).unwrap();

        let plan = planner()
            .plan(
                &[FullPackageSpec::new(spec("zlib"), Vec::new())],
                &status,
                &ports,
                &InMemoryBaselineProvider::classic(),
                &InMemoryCMakeVarProvider::new(),
            )
            .await
            .unwrap();

        assert_eq!(plan.len(), 1);
        let install = plan.install_actions().next().unwrap();
        assert_eq!(install.spec, spec("zlib"));
        assert_eq!(install.reason, InstallReason::UserRequested);
    }

    #[tokio::test]
    async fn orders_dependency_before_dependent() {
        let ports = InMemoryPortProvider::new();
        ports.insert(scf("zlib", "1.2", Vec::new()));
        ports.insert(scf("libpng", "1.6", vec![Dependency::simple("zlib")]));
        let dir = TempDir::new().unwrap();
        let status = StatusDatabase::load(dir.path()).unwrap();

        let plan = planner()
            .plan(
                &[FullPackageSpec::new(spec("libpng"), Vec::new())],
                &status,
                &ports,
                &InMemoryBaselineProvider::classic(),
                &InMemoryCMakeVarProvider::new(),
            )
            .await
            .unwrap();

        let order: Vec<String> = plan.install_actions().map(|a| a.spec.name().to_string()).collect();
        assert_eq!(order, vec!["zlib".to_string(), "libpng".to_string()]);
        let libpng = plan.install_actions().find(|a| a.spec.name() == "libpng").unwrap();
        assert_eq!(libpng.reason, InstallReason::UserRequested);
        let zlib = plan.install_actions().find(|a| a.spec.name() == "zlib").unwrap();
        assert_eq!(zlib.reason, InstallReason::Dependency);
    }

    #[tokio::test]
    async fn already_installed_superset_is_a_no_op() {
        let ports = InMemoryPortProvider::new();
        ports.insert(scf("zlib", "1.2", Vec::new()));

        let dir = TempDir::new().unwrap();
        let status = StatusDatabase::load(dir.path()).unwrap();
        status
            .append(StatusParagraph::installed(BinaryParagraph {
                spec: spec("zlib"),
                version: Version::new("1.2", 0),
                feature: CORE_FEATURE.to_string(),
                dependencies: Vec::new(),
                abi_tag: Some("deadbeef".to_string()),
            }))
            .unwrap();

        let plan = planner()
            .plan(
                &[FullPackageSpec::new(spec("zlib"), Vec::new())],
                &status,
                &ports,
                &InMemoryBaselineProvider::classic(),
                &InMemoryCMakeVarProvider::new(),
            )
            .await
            .unwrap();

        let zlib = plan.install_actions().find(|a| a.spec.name() == "zlib").unwrap();
        assert_eq!(zlib.reason, InstallReason::Rebuild);
        assert!(plan.actions().iter().all(|a| !matches!(a, PlanAction::Remove(_))));
    }

    #[tokio::test]
    async fn version_bump_schedules_remove_then_install() {
        let ports = InMemoryPortProvider::new();
        ports.insert(scf("zlib", "1.3", Vec::new()));

        let dir = TempDir::new().unwrap();
        let status = StatusDatabase::load(dir.path()).unwrap();
        status
            .append(StatusParagraph::installed(BinaryParagraph {
                spec: spec("zlib"),
                version: Version::new("1.2", 0),
                feature: CORE_FEATURE.to_string(),
                dependencies: Vec::new(),
                abi_tag: Some("deadbeef".to_string()),
            }))
            .unwrap();

        let plan = planner()
            .plan(
                &[FullPackageSpec::new(spec("zlib"), Vec::new())],
                &status,
                &ports,
                &InMemoryBaselineProvider::classic(),
                &InMemoryCMakeVarProvider::new(),
            )
            .await
            .unwrap();

        assert!(plan.actions().iter().any(|a| matches!(a, PlanAction::Remove(r) if r.spec == spec("zlib"))));
        let install = plan.install_actions().find(|a| a.spec.name() == "zlib").unwrap();
        assert_eq!(install.version.version().text(), "1.3");
    }

    #[tokio::test]
    async fn versioned_mode_picks_the_highest_minimum() {
        let ports = InMemoryPortProvider::new();
        ports.insert(scf("zlib", "1.0", Vec::new()));
        ports.insert(scf("zlib", "1.2", Vec::new()));
        let mut dep = Dependency::simple("zlib");
        dep.min_version = Some(SchemedVersion::new(VersionScheme::Relaxed, Version::new("1.2", 0)));
        ports.insert(scf("libpng", "1.6", vec![dep]));

        let baseline = InMemoryBaselineProvider::versioned(HashMap::from([(
            "zlib".to_string(),
            SchemedVersion::new(VersionScheme::Relaxed, Version::new("1.0", 0)),
        )]));
        let dir = TempDir::new().unwrap();
        let status = StatusDatabase::load(dir.path()).unwrap();

        let plan = planner()
            .plan(
                &[FullPackageSpec::new(spec("libpng"), Vec::new())],
                &status,
                &ports,
                &baseline,
                &InMemoryCMakeVarProvider::new(),
            )
            .await
            .unwrap();

        let zlib = plan.install_actions().find(|a| a.spec.name() == "zlib").unwrap();
        assert_eq!(zlib.version.version().text(), "1.2");
    }
}
