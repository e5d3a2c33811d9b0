//! The ordered inputs of `spec.md` §4.2.1 and the `key<NUL>value<LF>`
//! combining rule of §4.2.2.

use std::path::Path;

use portsmith_core::error::Error;
use portsmith_core::{hash_file, ContentHasher, Result, SchemedVersion};
use rayon::prelude::*;
use walkdir::WalkDir;

/// One `key<NUL>value<LF>` entry in the combining-rule byte stream.
///
/// Kept as a value type (rather than hashing eagerly) so
/// [`render_manifest`](crate::render_manifest) can serialize the exact same
/// entries §4.2.4 requires without redoing the file walk.
#[derive(Debug, Clone)]
pub struct AbiEntry {
    pub key: String,
    pub value: String,
}

impl AbiEntry {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Feed every entry into `hasher` in order, as `key<NUL>value<LF>`.
pub fn fold_entries(entries: &[AbiEntry], hasher: &mut ContentHasher) {
    for entry in entries {
        hasher.update(entry.key.as_bytes());
        hasher.update(b"\0");
        hasher.update(entry.value.as_bytes());
        hasher.update(b"\n");
    }
}

/// Input #1: a stable textual form of the resolved feature set, sorted.
#[must_use]
pub fn feature_set_entry(features: &[String]) -> AbiEntry {
    let mut sorted = features.to_vec();
    sorted.sort();
    AbiEntry::new("features", sorted.join(";"))
}

/// Input #2: the SHA-512 of every file under `port_dir`, sorted by relative
/// path, as one entry per file keyed by that path. Hashing fans out across
/// `rayon`'s global pool since port directories can hold many independent
/// files and hashing one never depends on another.
pub fn port_directory_entries(port_dir: &Path) -> Result<Vec<AbiEntry>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(port_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::io(port_dir, std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        if entry.file_type().is_file() {
            paths.push(entry.path().to_path_buf());
        }
    }
    paths.sort();

    paths
        .into_par_iter()
        .map(|path| {
            let digest = hash_file(&path)?;
            let relative = path.strip_prefix(port_dir).unwrap_or(&path).to_string_lossy().replace('\\', "/");
            Ok(AbiEntry::new(format!("portfile:{relative}"), digest))
        })
        .collect()
}

/// Input #3: each direct dependency's already-computed `package_abi`, in the
/// order the caller supplies (the engine itself guarantees this is
/// topological order by computing dependencies first).
#[must_use]
pub fn dependency_entries(dependency_tags: &[(String, String)]) -> Vec<AbiEntry> {
    dependency_tags
        .iter()
        .map(|(name, tag)| AbiEntry::new(format!("dependency:{name}"), tag.clone()))
        .collect()
}

/// One cmake helper script referenced by a port's build, identified by its
/// own content hash.
#[derive(Debug, Clone)]
pub struct CmakeHelper {
    pub name: String,
    pub sha512: String,
}

/// Input #4: the triplet-ABI, folding the triplet file, the host triplet
/// file, and every referenced `.cmake` helper's own hash.
#[must_use]
pub fn triplet_abi(triplet_text: &str, host_triplet_text: &str, helpers: &[CmakeHelper]) -> String {
    let mut entries = vec![
        AbiEntry::new("triplet", triplet_text.to_string()),
        AbiEntry::new("host_triplet", host_triplet_text.to_string()),
    ];
    let mut sorted_helpers = helpers.to_vec();
    sorted_helpers.sort_by(|a, b| a.name.cmp(&b.name));
    for helper in &sorted_helpers {
        entries.push(AbiEntry::new(format!("cmake_helper:{}", helper.name), helper.sha512.clone()));
    }
    let mut hasher = ContentHasher::new();
    fold_entries(&entries, &mut hasher);
    hasher.finish()
}

/// A pre-probed compiler identity, supplied by the caller — the engine never
/// invokes a toolchain itself.
#[derive(Debug, Clone)]
pub struct CompilerInfo {
    pub compiler_id: String,
    pub compiler_version: String,
    pub target: String,
    pub probe_output_hash: String,
}

/// Input #5: the compiler-info ABI. Callers that disable compiler tracking
/// never call this; [`crate::engine::AbiEngine`] withholds the whole tag
/// instead.
#[must_use]
pub fn compiler_info_abi(info: &CompilerInfo) -> String {
    let entries = [
        AbiEntry::new("compiler_id", info.compiler_id.clone()),
        AbiEntry::new("compiler_version", info.compiler_version.clone()),
        AbiEntry::new("target", info.target.clone()),
        AbiEntry::new("probe_output", info.probe_output_hash.clone()),
    ];
    let mut hasher = ContentHasher::new();
    fold_entries(&entries, &mut hasher);
    hasher.finish()
}

/// A pre-probed toolset identity.
#[derive(Debug, Clone)]
pub struct ToolsetInfo {
    pub version: String,
    pub path_fingerprint: String,
}

/// Input #6: the toolset ABI.
#[must_use]
pub fn toolset_abi(info: &ToolsetInfo) -> String {
    let entries = [
        AbiEntry::new("toolset_version", info.version.clone()),
        AbiEntry::new("toolset_path", info.path_fingerprint.clone()),
    ];
    let mut hasher = ContentHasher::new();
    fold_entries(&entries, &mut hasher);
    hasher.finish()
}

/// Input #7: the port's declared version (scheme + text + port-version).
#[must_use]
pub fn version_entry(version: &SchemedVersion) -> AbiEntry {
    AbiEntry::new(
        "version",
        format!("{}:{}#{}", version.scheme(), version.version().text(), version.version().port_version()),
    )
}

/// Input #8: the tool's own ABI version tag, as a fixed literal entry.
#[must_use]
pub fn tool_version_entry(tag: &str) -> AbiEntry {
    AbiEntry::new("tool_abi_version", tag.to_string())
}
