//! `InstallExecutor` (`spec.md` §4.5): walks the ordered `ActionPlan`,
//! driving cache restore, the out-of-process builder, conflict detection,
//! and status commits, with a bounded worker pool over independent actions.

use std::path::Path;
use std::sync::Arc;

use portsmith_cache::{BinaryCache, RestoreOutcome};
use portsmith_core::error::Error;
use portsmith_core::{AHashMap, AHashSet, PackageSpec};
use portsmith_planner::{ActionPlan, ActionResult, InstallPlanAction, PlanAction, RemovePlanAction};
use portsmith_status::{check_conflicts, Listfile, StatusDatabase, StatusParagraph};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::builder::{BuildRequest, PortBuilder};
use crate::config::ExecutorConfig;
use crate::listfile_walk::listfile_from_tree;

/// What happened to one plan action.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub spec: PackageSpec,
    pub result: ActionResult,
}

/// Executes an [`ActionPlan`] against an installed tree.
pub struct InstallExecutor {
    builder: Arc<dyn PortBuilder>,
    cache: Option<Arc<BinaryCache>>,
    config: ExecutorConfig,
}

impl std::fmt::Debug for InstallExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallExecutor").field("config", &self.config).finish()
    }
}

impl InstallExecutor {
    #[must_use]
    pub fn new(builder: Arc<dyn PortBuilder>, cache: Option<Arc<BinaryCache>>, config: ExecutorConfig) -> Self {
        Self { builder, cache, config }
    }

    /// Execute every action in `plan`, in topological layers, against
    /// `status`. `installed_root` is the tree install actions land files
    /// under (`<installed_root>/<triplet>/...`); `staging_root` is scratch
    /// space for the builder and cache restores, distinct per action.
    #[tracing::instrument(skip_all, fields(actions = plan.actions().len()))]
    pub async fn run(
        &self,
        plan: &ActionPlan,
        status: &Arc<StatusDatabase>,
        installed_root: &Path,
        staging_root: &Path,
    ) -> portsmith_core::Result<Vec<ActionOutcome>> {
        let layers = layer_actions(plan.actions());
        let mut outcomes = Vec::new();
        let mut failed: AHashSet<String> = AHashSet::default();

        for layer in layers {
            let runnable: Vec<_> = layer
                .into_iter()
                .filter(|action| {
                    let name = action_name(action);
                    let deps_ok = match action {
                        PlanAction::Install(install) => {
                            !install.dependency_edges.iter().any(|d| failed.contains(&d.port))
                        }
                        PlanAction::Remove(_) => true,
                    };
                    if !deps_ok {
                        outcomes.push(ActionOutcome { spec: action_spec(action), result: ActionResult::CascadedDueToMissingDependencies });
                        failed.insert(name);
                    }
                    deps_ok
                })
                .collect();

            if runnable.is_empty() {
                continue;
            }

            let semaphore = Arc::new(Semaphore::new(self.config.worker_count.min(runnable.len()).max(1)));
            let mut handles = Vec::with_capacity(runnable.len());
            for action in runnable {
                let semaphore = semaphore.clone();
                let status = status.clone();
                let cache = self.cache.clone();
                let builder = self.builder.clone();
                let config = self.config.clone();
                let installed_root = installed_root.to_path_buf();
                let staging_root = staging_root.to_path_buf();

                handles.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                    run_one_action(&action, &status, cache.as_deref(), builder.as_ref(), &config, &installed_root, &staging_root).await
                }));
            }

            for handle in handles {
                let outcome = handle.await.map_err(|e| Error::BuildFailed {
                    code: portsmith_core::error::ErrorCode::BuildFailed,
                    name: "<worker>".to_string(),
                    message: e.to_string(),
                })??;
                if matches!(outcome.result, ActionResult::BuildFailed | ActionResult::FileConflicts) {
                    failed.insert(outcome.spec.name().to_string());
                    if !self.config.keep_going {
                        outcomes.push(outcome);
                        return Ok(outcomes);
                    }
                }
                outcomes.push(outcome);
            }
        }

        Ok(outcomes)
    }
}

fn action_name(action: &PlanAction) -> String {
    action_spec(action).name().to_string()
}

fn action_spec(action: &PlanAction) -> PackageSpec {
    match action {
        PlanAction::Install(i) => i.spec.clone(),
        PlanAction::Remove(r) => r.spec.clone(),
    }
}

/// Group actions into layers where every action's dependencies (by port
/// name) are in a strictly earlier layer, preserving the plan's own
/// ordering invariant. Matching by port name rather than full
/// `PackageSpec` is deliberately conservative: a host-triplet dependency
/// still forces its dependent into a later layer even if the exact triplet
/// lookup would otherwise miss.
fn layer_actions(actions: &[PlanAction]) -> Vec<Vec<PlanAction>> {
    let mut last_level: AHashMap<String, usize> = AHashMap::default();
    let mut levels = Vec::with_capacity(actions.len());

    for action in actions {
        let name = action_name(action);
        let mut level = last_level.get(&name).copied().map_or(0, |l| l + 1);
        if let PlanAction::Install(install) = action {
            for dep in &install.dependency_edges {
                if let Some(&dep_level) = last_level.get(&dep.port) {
                    level = level.max(dep_level + 1);
                }
            }
        }
        last_level.insert(name, level);
        levels.push(level);
    }

    let max_level = levels.iter().copied().max().unwrap_or(0);
    let mut layers: Vec<Vec<PlanAction>> = (0..=max_level).map(|_| Vec::new()).collect();
    for (action, level) in actions.iter().zip(levels) {
        layers[level].push(action.clone());
    }
    layers
}

async fn run_one_action(
    action: &PlanAction,
    status: &StatusDatabase,
    cache: Option<&BinaryCache>,
    builder: &dyn PortBuilder,
    config: &ExecutorConfig,
    installed_root: &Path,
    staging_root: &Path,
) -> portsmith_core::Result<ActionOutcome> {
    match action {
        PlanAction::Remove(remove) => run_remove(remove, status, installed_root).await,
        PlanAction::Install(install) => run_install(install, status, cache, builder, config, installed_root, staging_root).await,
    }
}

async fn run_remove(remove: &RemovePlanAction, status: &StatusDatabase, installed_root: &Path) -> portsmith_core::Result<ActionOutcome> {
    let Some(paragraph) = status.get(&remove.spec, portsmith_core::CORE_FEATURE) else {
        return Ok(ActionOutcome { spec: remove.spec.clone(), result: ActionResult::Removed });
    };
    let version_key = version_key(paragraph.package.version.text(), paragraph.package.version.port_version());
    let info_dir = installed_root.join("vcpkg").join("info");
    let listfile = Listfile::read(&info_dir, &remove.spec, &version_key).map_err(status_err)?;

    for entry in listfile.removal_order() {
        let path = installed_root.join(remove.spec.triplet().as_str()).join(&entry.path);
        if entry.is_dir() {
            let _ = std::fs::remove_dir(&path);
        } else {
            let _ = std::fs::remove_file(&path);
        }
    }
    Listfile::delete(&info_dir, &remove.spec, &version_key).map_err(status_err)?;

    let mut removed_paragraph = paragraph.package.clone();
    removed_paragraph.abi_tag = None;
    status.append(StatusParagraph::removed(removed_paragraph)).map_err(status_err)?;

    info!(spec = %remove.spec, "removed");
    Ok(ActionOutcome { spec: remove.spec.clone(), result: ActionResult::Removed })
}

#[allow(clippy::too_many_arguments)]
async fn run_install(
    install: &InstallPlanAction,
    status: &StatusDatabase,
    cache: Option<&BinaryCache>,
    builder: &dyn PortBuilder,
    config: &ExecutorConfig,
    installed_root: &Path,
    staging_root: &Path,
) -> portsmith_core::Result<ActionOutcome> {
    if install.cached && !config.force_rebuild {
        return Ok(ActionOutcome { spec: install.spec.clone(), result: ActionResult::Cached });
    }

    let abi_tag = install.abi_info.as_ref().and_then(|a| a.package_abi.clone());
    let action_staging = staging_root.join(install.spec.canonical_name());
    let _ = std::fs::remove_dir_all(&action_staging);
    std::fs::create_dir_all(&action_staging).map_err(|e| Error::io(&action_staging, e))?;

    if let (Some(cache), Some(tag)) = (cache, abi_tag.as_deref()) {
        if !config.force_rebuild {
            if let RestoreOutcome::Restored(manifest) = cache.restore(tag, &action_staging).await? {
                let digests: AHashMap<&str, &str> =
                    manifest.entries.iter().map(|(path, digest)| (path.as_str(), digest.as_str())).collect();
                let tree_matches = digests.iter().all(|(path, expected)| {
                    portsmith_core::hash_file(&action_staging.join(path)).is_ok_and(|actual| actual == *expected)
                });
                if tree_matches {
                    return finish_install(install, &action_staging, status, installed_root, Some(cache), tag).await;
                }
                warn!(spec = %install.spec, "restored tree failed hash verification, treated as a cache miss");
            }
        }
    }

    let half_installed = StatusParagraph::half_installed(binary_paragraph(install, abi_tag.clone()));
    status.append(half_installed).map_err(status_err)?;

    let request = BuildRequest {
        spec: install.spec.clone(),
        features: install.resolved_features.clone(),
        port_directory: install.package_directory.clone().unwrap_or_default(),
        dependency_roots: Vec::new(),
        host_triplet: install.spec.triplet().clone(),
        staging_directory: action_staging.clone(),
    };

    if let Err(error) = builder.build(&request).await {
        warn!(spec = %install.spec, %error, "build failed, leaving half-installed paragraph");
        return Ok(ActionOutcome { spec: install.spec.clone(), result: ActionResult::BuildFailed });
    }

    finish_install(install, &action_staging, status, installed_root, cache, abi_tag.as_deref().unwrap_or_default()).await
}

async fn finish_install(
    install: &InstallPlanAction,
    action_staging: &Path,
    status: &StatusDatabase,
    installed_root: &Path,
    cache: Option<&BinaryCache>,
    abi_tag: &str,
) -> portsmith_core::Result<ActionOutcome> {
    let listfile = listfile_from_tree(action_staging)?;

    let installed = status.all_installed();
    let existing_listfiles: Vec<(String, Listfile)> = installed
        .iter()
        .filter(|p| p.package.spec != install.spec)
        .map(|p| {
            let version_key = version_key(p.package.version.text(), p.package.version.port_version());
            let info_dir = installed_root.join("vcpkg").join("info");
            let lf = Listfile::read(&info_dir, &p.package.spec, &version_key).unwrap_or_default();
            (p.package.spec.canonical_name(), lf)
        })
        .collect();
    let existing_refs: Vec<(String, &Listfile)> = existing_listfiles.iter().map(|(name, lf)| (name.clone(), lf)).collect();

    if let Some(conflict) = check_conflicts(&install.spec.canonical_name(), &listfile, &existing_refs) {
        warn!(spec = %install.spec, %conflict, "file conflict detected");
        status.append(StatusParagraph::removed(binary_paragraph(install, None))).map_err(status_err)?;
        return Ok(ActionOutcome { spec: install.spec.clone(), result: ActionResult::FileConflicts });
    }

    let triplet_root = installed_root.join(install.spec.triplet().as_str());
    for entry in listfile.entries() {
        let target = triplet_root.join(&entry.path);
        if entry.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        } else {
            let source = action_staging.join(&entry.path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            std::fs::rename(&source, &target).map_err(|e| Error::io(&target, e))?;
        }
    }

    let version_key = version_key(install.version.version().text(), install.version.version().port_version());
    let info_dir = installed_root.join("vcpkg").join("info");
    std::fs::create_dir_all(&info_dir).map_err(|e| Error::io(&info_dir, e))?;
    listfile.write(&info_dir, &install.spec, &version_key).map_err(status_err)?;

    let abi_tag = if abi_tag.is_empty() { None } else { Some(abi_tag.to_string()) };
    status.append(StatusParagraph::installed(binary_paragraph(install, abi_tag.clone()))).map_err(status_err)?;

    if let (Some(cache), Some(tag)) = (cache, abi_tag.as_deref()) {
        if let Err(error) = cache.push(tag, &triplet_root).await {
            warn!(spec = %install.spec, %error, "cache push failed");
        }
    }

    debug!(spec = %install.spec, "installed");
    Ok(ActionOutcome { spec: install.spec.clone(), result: ActionResult::Succeeded })
}

fn binary_paragraph(install: &InstallPlanAction, abi_tag: Option<String>) -> portsmith_status::BinaryParagraph {
    portsmith_status::BinaryParagraph {
        spec: install.spec.clone(),
        version: install.version.version().clone(),
        feature: portsmith_core::CORE_FEATURE.to_string(),
        dependencies: install.dependency_edges.iter().map(|d| format!("{}:{}", d.port, install.spec.triplet())).collect(),
        abi_tag,
    }
}

fn version_key(text: &str, port_version: u64) -> String {
    if port_version == 0 {
        text.to_string()
    } else {
        format!("{text}#{port_version}")
    }
}

fn status_err(e: portsmith_status::StatusError) -> Error {
    match e {
        portsmith_status::StatusError::Io { path, source } => Error::io(path, source),
        portsmith_status::StatusError::Malformed(message) => {
            Error::Paragraph { code: portsmith_core::error::ErrorCode::IoError, message }
        }
        portsmith_status::StatusError::FileConflicts { name, owner, path } => {
            Error::FileConflicts { code: portsmith_core::error::ErrorCode::FileConflicts, name, owner, path }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixtureBuilder;
    use portsmith_cache::backends::LocalDirectoryBackend;
    use portsmith_core::{AbiInfo, SchemedVersion, Triplet, VersionScheme};
    use portsmith_planner::InstallReason;
    use tempfile::TempDir;

    fn spec(name: &str) -> PackageSpec {
        PackageSpec::new(name, Triplet::new("x64-linux"))
    }

    fn install_action(name: &str, abi_tag: &str, deps: Vec<&str>) -> InstallPlanAction {
        InstallPlanAction {
            spec: spec(name),
            version: SchemedVersion::new(VersionScheme::Relaxed, portsmith_core::Version::new("1.0", 0)),
            resolved_features: vec![portsmith_core::CORE_FEATURE.to_string()],
            dependency_edges: deps.into_iter().map(portsmith_core::Dependency::simple).collect(),
            control_file: None,
            abi_info: Some(AbiInfo {
                toolset_abi: None,
                compiler_abi: None,
                triplet_abi: None,
                package_abi: Some(abi_tag.to_string()),
                manifest_text: String::new(),
                sbom_json: String::new(),
            }),
            package_directory: None,
            reason: InstallReason::UserRequested,
            cached: false,
        }
    }

    fn executor(builder: Arc<dyn PortBuilder>, cache: Option<Arc<BinaryCache>>) -> InstallExecutor {
        InstallExecutor::new(builder, cache, ExecutorConfig::new().with_keep_going(true))
    }

    #[tokio::test]
    async fn installs_a_single_action_via_the_builder() {
        let installed = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let status = Arc::new(StatusDatabase::load(installed.path().join("vcpkg")).unwrap());

        let builder = Arc::new(FixtureBuilder { files: vec![("lib/libz.a", b"zz")], fail: false });
        let plan = ActionPlan::from_actions(vec![PlanAction::Install(install_action("zlib", "a".repeat(128).as_str(), vec![]))]);

        let outcomes = executor(builder, None).run(&plan, &status, installed.path(), staging.path()).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0].result, ActionResult::Succeeded));
        assert!(status.is_installed(&spec("zlib"), portsmith_core::CORE_FEATURE));
        assert!(installed.path().join("x64-linux/lib/libz.a").exists());
    }

    #[tokio::test]
    async fn restores_from_cache_without_invoking_the_builder() {
        let installed = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let status = Arc::new(StatusDatabase::load(installed.path().join("vcpkg")).unwrap());

        let abi_tag = "b".repeat(128);
        let seed_tree = TempDir::new().unwrap();
        std::fs::write(seed_tree.path().join("lib.txt"), b"contents").unwrap();
        let mut cache = BinaryCache::default();
        let local = Arc::new(LocalDirectoryBackend::open(cache_dir.path()).unwrap());
        cache.add_backend(local, true);
        cache.push(&abi_tag, seed_tree.path()).await.unwrap();
        let cache = Arc::new(cache);

        let builder = Arc::new(FixtureBuilder { files: vec![], fail: true });
        let plan = ActionPlan::from_actions(vec![PlanAction::Install(install_action("zlib", &abi_tag, vec![]))]);

        let outcomes = executor(builder, Some(cache)).run(&plan, &status, installed.path(), staging.path()).await.unwrap();

        assert!(matches!(outcomes[0].result, ActionResult::Succeeded));
        assert!(installed.path().join("x64-linux/lib.txt").exists());
    }

    #[tokio::test]
    async fn build_failure_cascades_to_dependents() {
        let installed = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let status = Arc::new(StatusDatabase::load(installed.path().join("vcpkg")).unwrap());

        let builder = Arc::new(FixtureBuilder { files: vec![], fail: true });
        let plan = ActionPlan::from_actions(vec![
            PlanAction::Install(install_action("zlib", &"c".repeat(128), vec![])),
            PlanAction::Install(install_action("libpng", &"d".repeat(128), vec!["zlib"])),
        ]);

        let outcomes = executor(builder, None).run(&plan, &status, installed.path(), staging.path()).await.unwrap();

        assert!(matches!(outcomes[0].result, ActionResult::BuildFailed));
        assert!(matches!(outcomes[1].result, ActionResult::CascadedDueToMissingDependencies));
    }

    #[tokio::test]
    async fn conflicting_files_are_rejected() {
        let installed = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let status = Arc::new(StatusDatabase::load(installed.path().join("vcpkg")).unwrap());

        let first = Arc::new(FixtureBuilder { files: vec![("lib/shared.a", b"1")], fail: false });
        let plan_a = ActionPlan::from_actions(vec![PlanAction::Install(install_action("zlib", &"e".repeat(128), vec![]))]);
        executor(first, None).run(&plan_a, &status, installed.path(), staging.path()).await.unwrap();

        let second = Arc::new(FixtureBuilder { files: vec![("lib/shared.a", b"2")], fail: false });
        let plan_b = ActionPlan::from_actions(vec![PlanAction::Install(install_action("libpng", &"f".repeat(128), vec![]))]);
        let outcomes = executor(second, None).run(&plan_b, &status, installed.path(), staging.path()).await.unwrap();

        assert!(matches!(outcomes[0].result, ActionResult::FileConflicts));
        assert!(!status.is_installed(&spec("libpng"), portsmith_core::CORE_FEATURE));
        assert!(status.get(&spec("libpng"), portsmith_core::CORE_FEATURE).unwrap().state != portsmith_status::InstallState::HalfInstalled);
    }

    #[tokio::test]
    async fn remove_walks_the_listfile_in_reverse() {
        let installed = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        let status = Arc::new(StatusDatabase::load(installed.path().join("vcpkg")).unwrap());

        let builder = Arc::new(FixtureBuilder { files: vec![("include/zlib/zlib.h", b"h")], fail: false });
        let plan = ActionPlan::from_actions(vec![PlanAction::Install(install_action("zlib", &"a1".repeat(64), vec![]))]);
        executor(builder, None).run(&plan, &status, installed.path(), staging.path()).await.unwrap();
        assert!(installed.path().join("x64-linux/include/zlib/zlib.h").exists());

        let remove_plan = ActionPlan::from_actions(vec![PlanAction::Remove(RemovePlanAction {
            spec: spec("zlib"),
            reason: portsmith_planner::RemoveReason::UserRequested,
        })]);
        let noop_builder = Arc::new(FixtureBuilder::default());
        let outcomes = executor(noop_builder, None).run(&remove_plan, &status, installed.path(), staging.path()).await.unwrap();

        assert!(matches!(outcomes[0].result, ActionResult::Removed));
        assert!(!installed.path().join("x64-linux/include/zlib/zlib.h").exists());
        assert!(!status.is_installed(&spec("zlib"), portsmith_core::CORE_FEATURE));
    }
}
