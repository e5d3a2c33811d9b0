//! `InstallPlanAction`, `RemovePlanAction` and the ordered `ActionPlan`
//! (`spec.md` §3).

use portsmith_core::{AbiInfo, Dependency, PackageSpec, SchemedVersion};
use portsmith_providers::SourceControlFile;

/// Why an install action was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    /// Directly named in a top-level request.
    UserRequested,
    /// Pulled in to satisfy another action's dependency edge.
    Dependency,
    /// Re-installed after being removed because its ABI tag or version
    /// changed.
    Rebuild,
}

/// Why a remove action was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveReason {
    /// The user asked for this spec to be removed outright.
    UserRequested,
    /// Superseded by a different version or feature set about to be
    /// installed.
    Superseded,
    /// A transitive dependency of this spec is itself being replaced,
    /// propagated up the reverse-dependency graph (§4.1.5).
    DependencyRebuild,
}

/// One resolved install step: a package, its fixed-point feature set, the
/// per-feature edges that produced it, and everything downstream stages
/// attach (control file, ABI info, staging directory).
#[derive(Debug, Clone)]
pub struct InstallPlanAction {
    /// The package and triplet this action installs.
    pub spec: PackageSpec,
    /// The resolved version for this spec.
    pub version: SchemedVersion,
    /// The fixed-point feature set, post-default-expansion,
    /// post-platform-filtering. Always includes `"core"`.
    pub resolved_features: Vec<String>,
    /// Every dependency edge that contributed to `resolved_features`,
    /// already platform-filtered.
    pub dependency_edges: Vec<Dependency>,
    /// The port metadata this action was planned against.
    pub control_file: Option<SourceControlFile>,
    /// The ABI fingerprint, filled in by the ABI engine after planning.
    pub abi_info: Option<AbiInfo>,
    /// Absolute path to the port's recipe directory (for ABI hashing and
    /// the out-of-process builder).
    pub package_directory: Option<std::path::PathBuf>,
    /// Why this action exists.
    pub reason: InstallReason,
    /// Set by the ABI engine once the computed tag matches what's already
    /// installed; the executor then skips straight to success.
    pub cached: bool,
}

impl InstallPlanAction {
    /// The canonical lex sort key the planner's ties break on:
    /// `(port name, triplet canonical name)`.
    #[must_use]
    pub fn sort_key(&self) -> String {
        self.spec.canonical_name()
    }
}

/// One resolved remove step.
#[derive(Debug, Clone)]
pub struct RemovePlanAction {
    /// The package and triplet to remove.
    pub spec: PackageSpec,
    /// Why this removal was scheduled.
    pub reason: RemoveReason,
}

/// One entry of an [`ActionPlan`].
#[derive(Debug, Clone)]
pub enum PlanAction {
    /// Remove a currently-installed spec.
    Remove(RemovePlanAction),
    /// Install (or rebuild) a spec.
    Install(InstallPlanAction),
}

/// The ordered list of actions the executor walks.
///
/// Invariant: for any install action A, every transitive dependency of A
/// appears before A, and any remove action whose spec A overwrites appears
/// before A.
#[derive(Debug, Clone, Default)]
pub struct ActionPlan {
    actions: Vec<PlanAction>,
}

impl ActionPlan {
    /// An empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a plan from an already-ordered action list.
    #[must_use]
    pub fn from_actions(actions: Vec<PlanAction>) -> Self {
        Self { actions }
    }

    /// The actions, in execution order.
    #[must_use]
    pub fn actions(&self) -> &[PlanAction] {
        &self.actions
    }

    /// Mutable access for engines that fill in fields post-planning (ABI
    /// tags, cache hits).
    pub fn actions_mut(&mut self) -> &mut [PlanAction] {
        &mut self.actions
    }

    /// Every install action, in order.
    pub fn install_actions(&self) -> impl Iterator<Item = &InstallPlanAction> {
        self.actions.iter().filter_map(|a| match a {
            PlanAction::Install(i) => Some(i),
            PlanAction::Remove(_) => None,
        })
    }

    /// Remove an install action (and any remove action for the same spec
    /// that preceded it) because the ABI engine found the existing install
    /// already matches — the "demote to Cached" path of §4.2.3.
    pub fn demote_to_cached(&mut self, spec: &PackageSpec) {
        self.actions.retain(|a| match a {
            PlanAction::Install(i) => i.spec != *spec,
            PlanAction::Remove(r) => r.spec != *spec,
        });
    }

    /// Whether the plan has no work to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The number of actions in the plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }
}

/// The outcome of executing one plan action (§4.5, exit signaling).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    /// Built or restored and installed successfully.
    Succeeded,
    /// The ABI tag already matched; nothing was done.
    Cached,
    /// Restored from a binary cache backend.
    Downloaded,
    /// The out-of-process builder exited non-zero.
    BuildFailed,
    /// A target path collided with an already-installed package.
    FileConflicts,
    /// Skipped because a dependency failed or was excluded.
    CascadedDueToMissingDependencies,
    /// Skipped because its `supports` expression evaluated false.
    Excluded,
    /// A remove action completed.
    Removed,
}
