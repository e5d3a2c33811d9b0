//! `StatusParagraph` and its fields (`spec.md` §3).

use portsmith_core::{PackageSpec, Paragraph, Triplet, Version, CORE_FEATURE};

use crate::error::StatusError;

/// Installation progress of one (package, feature) paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    /// Never installed, or fully removed.
    NotInstalled,
    /// Files are being laid down; an interrupted run may leave this behind.
    HalfInstalled,
    /// Installed and verified.
    Installed,
    /// The install or remove left the package in an unknown condition.
    Error,
}

impl InstallState {
    fn as_str(self) -> &'static str {
        match self {
            Self::NotInstalled => "not-installed",
            Self::HalfInstalled => "half-installed",
            Self::Installed => "installed",
            Self::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "not-installed" => Self::NotInstalled,
            "half-installed" => Self::HalfInstalled,
            "installed" => Self::Installed,
            "error" => Self::Error,
            _ => return None,
        })
    }
}

/// The user's declared intent for a (package, feature) paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Want {
    /// Should be installed.
    Install,
    /// Installed, but excluded from automatic upgrades.
    Hold,
    /// Should be removed, keeping config/user data (not meaningful for this
    /// domain but kept for parity with the on-disk grammar's vocabulary).
    Deinstall,
    /// Should be completely removed.
    Purge,
}

impl Want {
    fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Hold => "hold",
            Self::Deinstall => "deinstall",
            Self::Purge => "purge",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "install" => Self::Install,
            "hold" => Self::Hold,
            "deinstall" => Self::Deinstall,
            "purge" => Self::Purge,
            _ => return None,
        })
    }
}

/// The package/feature identity and declared metadata half of a status
/// paragraph (`spec.md`'s `BinaryParagraph`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryParagraph {
    /// Port name and triplet.
    pub spec: PackageSpec,
    /// Resolved version.
    pub version: Version,
    /// `"core"` or a feature name.
    pub feature: String,
    /// Declared dependencies after platform evaluation, as canonical
    /// `name:triplet` strings.
    pub dependencies: Vec<String>,
    /// The ABI tag this paragraph was built with, if known.
    pub abi_tag: Option<String>,
}

impl BinaryParagraph {
    /// Whether this paragraph describes the always-present `core` feature.
    #[must_use]
    pub fn is_core(&self) -> bool {
        self.feature == CORE_FEATURE
    }
}

/// One record in the status log: identity + declared metadata, plus the
/// install-state/want pair.
///
/// The pair `(want = Install, state = Installed)` is the only "visible"
/// state — everything else means the package is mid-transition or gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusParagraph {
    /// Identity and declared metadata.
    pub package: BinaryParagraph,
    /// Current install progress.
    pub state: InstallState,
    /// Declared intent.
    pub want: Want,
}

impl StatusParagraph {
    /// Build a fresh `half-installed` paragraph for the start of an install.
    #[must_use]
    pub fn half_installed(package: BinaryParagraph) -> Self {
        Self {
            package,
            state: InstallState::HalfInstalled,
            want: Want::Install,
        }
    }

    /// Build the paragraph committed once files have landed successfully.
    #[must_use]
    pub fn installed(package: BinaryParagraph) -> Self {
        Self {
            package,
            state: InstallState::Installed,
            want: Want::Install,
        }
    }

    /// Build the paragraph appended on removal.
    #[must_use]
    pub fn removed(package: BinaryParagraph) -> Self {
        Self {
            package,
            state: InstallState::NotInstalled,
            want: Want::Purge,
        }
    }

    /// Whether this is the one "visible" (fully installed) state.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        matches!(self.want, Want::Install) && matches!(self.state, InstallState::Installed)
    }

    /// The key the status database collapses on: (package spec, feature).
    #[must_use]
    pub fn key(&self) -> (PackageSpec, String) {
        (self.package.spec.clone(), self.package.feature.clone())
    }

    /// Render to the on-disk paragraph text form.
    #[must_use]
    pub fn to_paragraph(&self) -> Paragraph {
        let mut p = Paragraph::new();
        p.push("Package", self.package.spec.name());
        p.push("Version", self.package.version.text());
        if self.package.version.port_version() > 0 {
            p.push("Port-Version", self.package.version.port_version().to_string());
        }
        p.push("Architecture", self.package.spec.triplet().as_str());
        if !self.package.is_core() {
            p.push("Feature", &self.package.feature);
        }
        if let Some(tag) = &self.package.abi_tag {
            p.push("Abi", tag);
        }
        if !self.package.dependencies.is_empty() {
            p.push("Depends", self.package.dependencies.join(", "));
        }
        p.push(
            "Status",
            format!("{} ok {}", self.want.as_str(), self.state.as_str()),
        );
        p
    }

    /// Parse a status paragraph from its on-disk text form.
    pub fn from_paragraph(p: &Paragraph) -> crate::Result<Self> {
        let name = p
            .get("Package")
            .ok_or_else(|| StatusError::Malformed("missing Package field".to_string()))?;
        let version_text = p
            .get("Version")
            .ok_or_else(|| StatusError::Malformed("missing Version field".to_string()))?;
        let port_version = p
            .get("Port-Version")
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|_| StatusError::Malformed("invalid Port-Version".to_string()))?
            .unwrap_or(0);
        let arch = p
            .get("Architecture")
            .ok_or_else(|| StatusError::Malformed("missing Architecture field".to_string()))?;
        let feature = p.get("Feature").unwrap_or(CORE_FEATURE).to_string();
        let abi_tag = p.get("Abi").map(str::to_string);
        let dependencies = p
            .get("Depends")
            .map(|d| d.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        let status = p
            .get("Status")
            .ok_or_else(|| StatusError::Malformed("missing Status field".to_string()))?;
        let mut parts = status.split_whitespace();
        let want = parts
            .next()
            .and_then(Want::parse)
            .ok_or_else(|| StatusError::Malformed(format!("invalid want in Status: {status}")))?;
        let state = parts
            .last()
            .and_then(InstallState::parse)
            .ok_or_else(|| StatusError::Malformed(format!("invalid state in Status: {status}")))?;

        Ok(Self {
            package: BinaryParagraph {
                spec: PackageSpec::new(name, Triplet::new(arch)),
                version: Version::new(version_text, port_version),
                feature,
                dependencies,
                abi_tag,
            },
            state,
            want,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StatusParagraph {
        StatusParagraph::installed(BinaryParagraph {
            spec: PackageSpec::new("zlib", Triplet::new("x64-linux")),
            version: Version::new("1.3", 1),
            feature: CORE_FEATURE.to_string(),
            dependencies: vec!["bzip2:x64-linux".to_string()],
            abi_tag: Some("deadbeef".repeat(16)),
        })
    }

    #[test]
    fn round_trips_through_paragraph_text() {
        let sp = sample();
        let text = sp.to_paragraph().to_text();
        let parsed = Paragraph::parse_all(&text).unwrap();
        let back = StatusParagraph::from_paragraph(&parsed[0]).unwrap();
        assert_eq!(sp, back);
    }

    #[test]
    fn only_install_installed_is_visible() {
        let sp = sample();
        assert!(sp.is_visible());
        let half = StatusParagraph::half_installed(sp.package.clone());
        assert!(!half.is_visible());
    }
}
