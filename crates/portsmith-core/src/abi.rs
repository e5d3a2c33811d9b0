//! `AbiInfo` — the data an [`crate::Error`]-free ABI computation produces.
//!
//! This type is pure data: it has no dependency on how the tag was computed
//! so that [`crate::spec::FullPackageSpec`]-adjacent planning types can carry
//! an `Option<AbiInfo>` without the core crate knowing about the engine that
//! fills it in.

use serde::{Deserialize, Serialize};

/// The per-action ABI fingerprint, once computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiInfo {
    /// Hash of the chosen toolset's identity, if toolset tracking is enabled.
    pub toolset_abi: Option<String>,
    /// Hash of `(compiler id, compiler version, target, toolchain probe)`,
    /// if compiler tracking is enabled.
    pub compiler_abi: Option<String>,
    /// Hash over the triplet files and referenced `.cmake` helper scripts.
    pub triplet_abi: Option<String>,
    /// The full combined SHA-512 hex digest, once every required input was
    /// available.
    pub package_abi: Option<String>,
    /// The exact `key\0value\n` serialization that was hashed to produce
    /// `package_abi`, persisted as `vcpkg_abi_info.txt`-equivalent for audit.
    pub manifest_text: String,
    /// The SPDX 2.2 SBOM JSON document for this action, once computed.
    pub sbom_json: String,
}

impl AbiInfo {
    /// Whether every required input was available and `package_abi` was
    /// actually computed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.package_abi.is_some()
    }
}
