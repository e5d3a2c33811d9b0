//! The source control file: a port's core metadata plus its per-feature
//! dependency paragraphs (`spec.md` §3, `SourceControlFile`).

use portsmith_core::{Dependency, PlatformExpr, SchemedVersion, CORE_FEATURE};

/// One feature's declared dependencies, description and support expression.
#[derive(Debug, Clone)]
pub struct FeatureParagraph {
    /// The feature name.
    pub name: String,
    /// Dependencies pulled in when this feature is active.
    pub dependencies: Vec<Dependency>,
    /// Human-readable description (opaque to the planner).
    pub description: String,
    /// Optional `supports` expression; a `false` evaluation makes the
    /// feature unsupported on its target triplet.
    pub supports: Option<PlatformExpr>,
}

/// A port's full metadata as returned by a [`PortProvider`](crate::PortProvider).
#[derive(Debug, Clone)]
pub struct SourceControlFile {
    /// The port name.
    pub name: String,
    /// The scheme-qualified version this file describes.
    pub version: SchemedVersion,
    /// Dependencies of the always-present `core` feature.
    pub dependencies: Vec<Dependency>,
    /// Feature names expanded when a requester asks for `"default"`.
    pub default_features: Vec<String>,
    /// SPDX license expression, if declared.
    pub license: Option<String>,
    /// Optional `supports` expression for the whole port.
    pub supports: Option<PlatformExpr>,
    /// Declared optional features, keyed by name.
    pub features: Vec<FeatureParagraph>,
}

impl SourceControlFile {
    /// Look up a declared feature by name.
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&FeatureParagraph> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Whether `name` is either `core` or a declared feature.
    #[must_use]
    pub fn has_feature(&self, name: &str) -> bool {
        name == CORE_FEATURE || self.feature(name).is_some()
    }
}
