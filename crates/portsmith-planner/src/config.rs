//! Planner flags (`spec.md` §4.1's contract clause (e)).

use portsmith_core::Triplet;

/// What to do when a port's or feature's `supports` expression evaluates
/// false for its target triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedPortAction {
    /// Log a warning and skip the port, cascading to dependents.
    Warn,
    /// Fail the whole plan.
    Error,
}

/// Planner-wide flags.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// The triplet host-dependencies resolve against, regardless of the
    /// depender's target triplet.
    pub host_triplet: Triplet,
    /// Use a port's `HEAD` version instead of its latest/baseline version.
    pub use_head_version: bool,
    /// Treat requested ports as locally editable (skips cache lookups
    /// downstream; the planner only threads the flag through).
    pub editable: bool,
    /// How to handle a `supports`-gated port or feature.
    pub unsupported_port_action: UnsupportedPortAction,
    /// Force a rebuild even when the computed ABI tag matches what's
    /// installed.
    pub force_rebuild: bool,
}

impl PlannerConfig {
    /// A config for `host_triplet`, warning (not erroring) on unsupported
    /// ports, with every other flag at its permissive default.
    #[must_use]
    pub fn new(host_triplet: Triplet) -> Self {
        Self {
            host_triplet,
            use_head_version: false,
            editable: false,
            unsupported_port_action: UnsupportedPortAction::Warn,
            force_rebuild: false,
        }
    }
}
