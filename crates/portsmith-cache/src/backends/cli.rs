//! The CLI-invoked backend (`spec.md` §4.3.1): covers "Object store
//! (generic)" and the "GCS / S3-like / Azure Blob via a configured CLI
//! tool" rows with one implementation, since none of those services has a
//! client SDK in this workspace's dependency stack — a user-supplied
//! command template (`aws s3 cp`, `gcloud storage cp`, `az storage blob
//! upload`, ...) is the portable way to reach any of them.
//!
//! Neither row claims batch preflight, so this backend doesn't either: a
//! `list`/`head` round trip per tag would cost as much as just trying
//! `read`, so availability is only discovered during restore.

use std::process::Stdio;

use async_trait::async_trait;
use portsmith_core::error::{Error, ErrorCode};
use portsmith_core::{AHashMap, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::backend::{BackendCapabilities, CacheBackend};

/// Exit code a `get_command` uses to mean "not found" rather than failure.
pub const NOT_FOUND_EXIT_CODE: i32 = 3;

/// A command template: each argument may contain `{tag}`, substituted with
/// the ABI tag being fetched or pushed.
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandTemplate {
    fn fill(&self, tag: &str) -> (String, Vec<String>) {
        (self.program.clone(), self.args.iter().map(|a| a.replace("{tag}", tag)).collect())
    }
}

#[derive(Debug)]
pub struct CliBackend {
    kind: &'static str,
    get: CommandTemplate,
    put: CommandTemplate,
    read: bool,
    write: bool,
}

impl CliBackend {
    /// A full read/write backend, e.g. `aws s3 cp s3://bucket/{tag}.zip -`
    /// for `get` and `aws s3 cp - s3://bucket/{tag}.zip` for `put`.
    #[must_use]
    pub fn new(kind: &'static str, get: CommandTemplate, put: CommandTemplate) -> Self {
        Self { kind, get, put, read: true, write: true }
    }

    /// A read-only mirror: `write` is a no-op rather than fatal, matching
    /// a best-effort backend's §4.3.5 treatment.
    #[must_use]
    pub fn read_only(kind: &'static str, get: CommandTemplate) -> Self {
        Self { kind, get, put: CommandTemplate { program: String::new(), args: Vec::new() }, read: true, write: false }
    }

    fn down(&self, message: impl Into<String>) -> Error {
        Error::CacheBackendDown { code: ErrorCode::CacheBackendDown, backend: self.kind.to_string(), message: message.into() }
    }
}

#[async_trait]
impl CacheBackend for CliBackend {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities { preflight: false, read: self.read, write: self.write }
    }

    async fn preflight_batch(&self, tags: &[String]) -> Result<AHashMap<String, bool>> {
        Ok(tags.iter().map(|t| (t.clone(), false)).collect())
    }

    async fn read(&self, tag: &str) -> Result<Option<Vec<u8>>> {
        if !self.read {
            return Ok(None);
        }
        let (program, args) = self.get.fill(tag);
        let output = Command::new(&program).args(&args).stdout(Stdio::piped()).stderr(Stdio::piped()).output().await.map_err(|e| self.down(e.to_string()))?;

        if output.status.code() == Some(NOT_FOUND_EXIT_CODE) {
            return Ok(None);
        }
        if !output.status.success() {
            return Err(self.down(format!("{program} exited with {:?}: {}", output.status.code(), String::from_utf8_lossy(&output.stderr))));
        }
        Ok(Some(output.stdout))
    }

    async fn write(&self, tag: &str, archive: &[u8]) -> Result<()> {
        if !self.write {
            warn!(backend = self.kind, tag, "write skipped: read-only cli backend");
            return Ok(());
        }
        let (program, args) = self.put.fill(tag);
        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.down(e.to_string()))?;

        let mut stdin = child.stdin.take().ok_or_else(|| self.down("no stdin handle"))?;
        stdin.write_all(archive).await.map_err(|e| self.down(e.to_string()))?;
        drop(stdin);

        let output = child.wait_with_output().await.map_err(|e| self.down(e.to_string()))?;
        if !output.status.success() {
            return Err(self.down(format!("{program} exited with {:?}: {}", output.status.code(), String::from_utf8_lossy(&output.stderr))));
        }
        debug!(backend = self.kind, tag, bytes = archive.len(), "pushed via cli backend");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn not_found_exit_code_is_a_clean_miss() {
        let backend = CliBackend::new(
            "cli-test",
            CommandTemplate { program: "sh".to_string(), args: vec!["-c".to_string(), format!("exit {NOT_FOUND_EXIT_CODE}")] },
            CommandTemplate { program: "true".to_string(), args: Vec::new() },
        );
        assert_eq!(backend.read("anytag").await.unwrap(), None);
    }

    #[tokio::test]
    async fn successful_get_returns_stdout_bytes() {
        let backend = CliBackend::new(
            "cli-test",
            CommandTemplate { program: "printf".to_string(), args: vec!["archive-for-{tag}".to_string()] },
            CommandTemplate { program: "true".to_string(), args: Vec::new() },
        );
        let data = backend.read("deadbeef").await.unwrap().unwrap();
        assert_eq!(data, b"archive-for-deadbeef");
    }
}
