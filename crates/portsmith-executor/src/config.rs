//! Executor configuration (`spec.md` §5): worker pool sizing and
//! keep-going policy.

/// Tunables for [`crate::InstallExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of actions run concurrently within one topological
    /// layer. Defaults to the detected CPU concurrency; the executor
    /// additionally clamps this to the layer's own size so a layer of one
    /// action never spins up idle workers.
    pub worker_count: usize,
    /// After a non-fatal failure, keep going with independent branches
    /// instead of aborting the whole run.
    pub keep_going: bool,
    /// Force every install action through the builder even when its ABI
    /// tag already matches what's installed or cached.
    pub force_rebuild: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { worker_count: num_cpus::get().max(1), keep_going: true, force_rebuild: false }
    }
}

impl ExecutorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    #[must_use]
    pub fn with_keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }
}
