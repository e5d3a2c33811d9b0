//! Pre-built port metadata for planner/ABI/executor tests, grounded in the
//! same small "zlib depends on nothing, libpng depends on zlib" shape used
//! across the workspace's own `#[cfg(test)]` modules.

use portsmith_core::{Dependency, PackageSpec, SchemedVersion, Triplet, Version, VersionScheme};
use portsmith_providers::{FeatureParagraph, SourceControlFile};

/// Namespace for fixture builders.
#[derive(Debug)]
pub struct Fixtures;

impl Fixtures {
    /// The `x64-linux` triplet used by most fixtures.
    #[must_use]
    pub fn triplet() -> Triplet {
        Triplet::new("x64-linux")
    }

    /// A relaxed-scheme version, e.g. `1.3.1`.
    #[must_use]
    pub fn version(text: &str) -> SchemedVersion {
        SchemedVersion::new(VersionScheme::Relaxed, Version::new(text, 0))
    }

    /// `name:x64-linux`.
    #[must_use]
    pub fn spec(name: &str) -> PackageSpec {
        PackageSpec::new(name, Self::triplet())
    }

    /// A leaf port with no dependencies.
    #[must_use]
    pub fn zlib() -> SourceControlFile {
        SourceControlFile {
            name: "zlib".to_string(),
            version: Self::version("1.3.1"),
            dependencies: Vec::new(),
            default_features: Vec::new(),
            license: Some("Zlib".to_string()),
            supports: None,
            features: Vec::new(),
        }
    }

    /// A port depending unconditionally on `zlib`, with an optional
    /// `apng` feature that pulls in nothing extra.
    #[must_use]
    pub fn libpng() -> SourceControlFile {
        SourceControlFile {
            name: "libpng".to_string(),
            version: Self::version("1.6.43"),
            dependencies: vec![Dependency::simple("zlib")],
            default_features: Vec::new(),
            license: Some("Libpng".to_string()),
            supports: None,
            features: vec![FeatureParagraph {
                name: "apng".to_string(),
                dependencies: Vec::new(),
                description: "Animated PNG support".to_string(),
                supports: None,
            }],
        }
    }

    /// A port whose `core` feature depends on both `zlib` and `libpng`,
    /// for exercising multi-level dependency closures.
    #[must_use]
    pub fn freetype() -> SourceControlFile {
        SourceControlFile {
            name: "freetype".to_string(),
            version: Self::version("2.13.2"),
            dependencies: vec![Dependency::simple("zlib"), Dependency::simple("libpng")],
            default_features: Vec::new(),
            license: Some("FTL".to_string()),
            supports: None,
            features: Vec::new(),
        }
    }
}
