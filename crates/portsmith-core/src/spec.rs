//! `PackageSpec`, `FeatureSpec` and `Dependency` — the identity types the
//! rest of the workspace keys everything on.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::platform::PlatformExpr;
use crate::triplet::Triplet;
use crate::version::SchemedVersion;

/// The implicit feature every port has, regardless of what it declares.
pub const CORE_FEATURE: &str = "core";

/// The pseudo-feature name denoting "whatever the port's declared defaults are".
///
/// This is expanded by the planner and is never stored in a resolved feature set.
pub const DEFAULT_FEATURE: &str = "default";

/// A (port name, triplet) pair. Equality and ordering are lexicographic on the pair.
#[derive(Clone, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    name: String,
    triplet: Triplet,
}

impl PackageSpec {
    /// Build a new spec from a port name and triplet.
    #[must_use]
    pub fn new(name: impl Into<String>, triplet: Triplet) -> Self {
        Self {
            name: name.into(),
            triplet,
        }
    }

    /// The port name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The target triplet.
    #[must_use]
    pub fn triplet(&self) -> &Triplet {
        &self.triplet
    }

    /// Build the `FeatureSpec` for `feature` on this package.
    #[must_use]
    pub fn feature(&self, feature: impl Into<String>) -> FeatureSpec {
        FeatureSpec::new(self.clone(), feature)
    }

    /// The `name:triplet` canonical form used in log lines and listfile names.
    #[must_use]
    pub fn canonical_name(&self) -> String {
        format!("{}:{}", self.name, self.triplet)
    }
}

impl PartialEq for PackageSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.triplet == other.triplet
    }
}

impl std::hash::Hash for PackageSpec {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.triplet.hash(state);
    }
}

impl PartialOrd for PackageSpec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageSpec {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.name.as_str(), self.triplet.as_str()).cmp(&(other.name.as_str(), other.triplet.as_str()))
    }
}

impl fmt::Debug for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

/// A (`PackageSpec`, feature name) pair.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureSpec {
    spec: PackageSpec,
    feature: String,
}

impl FeatureSpec {
    /// Build a new feature spec.
    #[must_use]
    pub fn new(spec: PackageSpec, feature: impl Into<String>) -> Self {
        Self {
            spec,
            feature: feature.into(),
        }
    }

    /// The package this feature belongs to.
    #[must_use]
    pub fn spec(&self) -> &PackageSpec {
        &self.spec
    }

    /// The feature name.
    #[must_use]
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Whether this is the implicit `core` feature.
    #[must_use]
    pub fn is_core(&self) -> bool {
        self.feature == CORE_FEATURE
    }
}

impl fmt::Debug for FeatureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.spec, self.feature)
    }
}

impl fmt::Display for FeatureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.spec, self.feature)
    }
}

/// A package spec together with an explicit, caller-requested feature set.
///
/// This is what a top-level install request looks like before the planner
/// expands `default` and walks dependency edges: `features` is exactly what
/// the caller asked for, not yet the fixed point the planner computes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullPackageSpec {
    spec: PackageSpec,
    features: Vec<String>,
}

impl FullPackageSpec {
    /// Build a request for `spec` with an explicit feature list.
    #[must_use]
    pub fn new(spec: PackageSpec, features: Vec<String>) -> Self {
        Self { spec, features }
    }

    /// The package being requested.
    #[must_use]
    pub fn spec(&self) -> &PackageSpec {
        &self.spec
    }

    /// The caller-requested feature names (may include `"default"`).
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }
}

/// An edge from a feature (or `core`) to a port it requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    /// The port name this dependency targets.
    pub port: String,
    /// Features of `port` that must be present for this edge to be satisfied.
    pub features: Vec<String>,
    /// If true, this dependency resolves against the host triplet rather
    /// than the depender's triplet.
    pub host: bool,
    /// Optional platform expression gating whether this edge is active.
    pub platform: Option<PlatformExpr>,
    /// Optional minimum version constraint (versioned mode only).
    pub min_version: Option<SchemedVersion>,
}

impl Dependency {
    /// Build a simple, unconditional dependency on `port`'s `core` feature.
    #[must_use]
    pub fn simple(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            features: Vec::new(),
            host: false,
            platform: None,
            min_version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, triplet: &str) -> PackageSpec {
        PackageSpec::new(name, Triplet::new(triplet))
    }

    #[test]
    fn ordering_is_lexicographic_on_name_then_triplet() {
        let a = spec("a", "x64-linux");
        let b = spec("a", "x64-windows");
        let c = spec("b", "x64-linux");
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn feature_spec_display() {
        let fs = FeatureSpec::new(spec("zlib", "x64-linux"), "core");
        assert_eq!(fs.to_string(), "zlib:x64-linux[core]");
        assert!(fs.is_core());
    }
}
