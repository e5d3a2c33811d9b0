//! Engine-wide configuration (`spec.md` §4.2.1's literal input #8, and the
//! compiler-tracking on/off switch of input #5).

/// Configuration for one [`crate::AbiEngine`] run.
#[derive(Debug, Clone)]
pub struct AbiConfig {
    /// The tool's own ABI version tag (input #8), bumped whenever this
    /// engine's input set changes shape.
    pub tool_abi_tag: String,
    /// Whether compiler fingerprinting participates in the hash. When
    /// false, `package_abi` is withheld entirely for every action (§4.2.1
    /// input #5).
    pub track_compiler: bool,
    /// Force every action to rebuild regardless of a matching installed tag.
    pub force_rebuild: bool,
}

impl AbiConfig {
    /// The default configuration: compiler tracking on, no forced rebuild.
    #[must_use]
    pub fn new(tool_abi_tag: impl Into<String>) -> Self {
        Self {
            tool_abi_tag: tool_abi_tag.into(),
            track_compiler: true,
            force_rebuild: false,
        }
    }
}
