//! The out-of-process builder seam (`spec.md` §4.5 step 4): "the spec is
//! agnostic about the builder's internals; it only observes success/failure
//! exit and expects a conforming tree under the staging root." Kept as a
//! trait, the same way `portsmith-providers` keeps the registry/toolchain
//! layer behind `PortProvider` rather than baking in a concrete fetcher.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use portsmith_core::{PackageSpec, Triplet};

/// Everything the builder needs to know about one install action.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// The package and triplet being built.
    pub spec: PackageSpec,
    /// The resolved feature set being built.
    pub features: Vec<String>,
    /// The port's recipe directory.
    pub port_directory: PathBuf,
    /// Include/lib roots contributed by already-installed dependencies, in
    /// dependency order.
    pub dependency_roots: Vec<PathBuf>,
    /// The host triplet, for cross builds.
    pub host_triplet: Triplet,
    /// Where the builder must write its conforming output tree, rooted at
    /// the triplet name (§4.3.4). Distinct from the installed root.
    pub staging_directory: PathBuf,
}

/// Builds one port into its staging directory.
#[async_trait]
pub trait PortBuilder: Send + Sync {
    /// Run the build. Returns `Ok(())` only if `request.staging_directory`
    /// now holds a conforming output tree; any other outcome must be an
    /// `Err`, which the executor records as `BuildFailed`.
    async fn build(&self, request: &BuildRequest) -> portsmith_core::Result<()>;
}

/// Invokes a configured external command per build, the way a real
/// toolchain driver would be wired in.
#[derive(Debug)]
pub struct OutOfProcessBuilder {
    program: String,
    extra_args: Vec<String>,
}

impl OutOfProcessBuilder {
    /// `program` is invoked once per action as
    /// `program <port_dir> <staging_dir> <triplet> <features...> extra_args...`.
    #[must_use]
    pub fn new(program: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self { program: program.into(), extra_args }
    }
}

#[async_trait]
impl PortBuilder for OutOfProcessBuilder {
    async fn build(&self, request: &BuildRequest) -> portsmith_core::Result<()> {
        use portsmith_core::error::{Error, ErrorCode};

        let mut command = tokio::process::Command::new(&self.program);
        command
            .arg(&request.port_directory)
            .arg(&request.staging_directory)
            .arg(request.spec.triplet().as_str())
            .args(&request.features)
            .args(&self.extra_args);

        let output = command.output().await.map_err(|e| Error::BuildFailed {
            code: ErrorCode::BuildFailed,
            name: request.spec.name().to_string(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(Error::BuildFailed {
                code: ErrorCode::BuildFailed,
                name: request.spec.name().to_string(),
                message: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(())
    }
}

/// An in-process stand-in builder for tests: writes fixed file contents
/// into the staging directory instead of spawning anything.
#[derive(Debug, Default)]
pub struct FixtureBuilder {
    pub files: Vec<(&'static str, &'static [u8])>,
    pub fail: bool,
}

#[async_trait]
impl PortBuilder for FixtureBuilder {
    async fn build(&self, request: &BuildRequest) -> portsmith_core::Result<()> {
        use portsmith_core::error::{Error, ErrorCode};

        if self.fail {
            return Err(Error::BuildFailed {
                code: ErrorCode::BuildFailed,
                name: request.spec.name().to_string(),
                message: "fixture configured to fail".to_string(),
            });
        }
        for (relative, contents) in &self.files {
            let path = request.staging_directory.join(relative);
            if let Some(parent) = Path::new(relative).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(request.staging_directory.join(parent)).map_err(|e| Error::io(request.staging_directory.join(parent), e))?;
            }
            std::fs::write(&path, contents).map_err(|e| Error::io(path, e))?;
        }
        Ok(())
    }
}
