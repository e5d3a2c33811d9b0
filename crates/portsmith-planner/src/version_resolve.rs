//! Version resolution (`spec.md` §4.1.1): classic vs. versioned mode.

use std::collections::HashMap;

use portsmith_core::error::{Error, ErrorCode};
use portsmith_core::{Result, SchemedVersion};
use portsmith_providers::BaselineProvider;

/// Resolve the version a port should be installed at.
///
/// In classic mode (`baseline.has_baseline() == false`) every constraint is
/// ignored; the caller is expected to ask the `PortProvider` for its single
/// latest version directly and never call this function in that mode.
///
/// In versioned mode, `minima` is every minimum-version constraint that
/// reached this port (from the baseline itself, from an explicit manifest
/// dependency, and from every depender's `min_version`). The maximum of all
/// minima wins; if an entry in `overrides` names this port, the override
/// wins outright and skips the baseline-violation check.
pub async fn resolve_versioned(
    port_name: &str,
    baseline: &dyn BaselineProvider,
    minima: &[SchemedVersion],
    overrides: &HashMap<String, SchemedVersion>,
) -> Result<SchemedVersion> {
    if let Some(v) = overrides.get(port_name) {
        return Ok(v.clone());
    }

    let baseline_version = baseline.baseline_for(port_name).await;

    let mut resolved = baseline_version.clone();
    for m in minima {
        resolved = Some(match resolved {
            None => m.clone(),
            Some(current) => {
                if current.try_cmp(m, port_name)?.is_lt() {
                    m.clone()
                } else {
                    current
                }
            }
        });
    }

    let Some(resolved) = resolved else {
        return Err(Error::PortNotFound {
            code: ErrorCode::PortNotFound,
            name: port_name.to_string(),
        });
    };

    if let Some(baseline_version) = &baseline_version {
        if resolved.try_cmp(baseline_version, port_name)?.is_lt() {
            return Err(Error::BaselineViolation {
                code: ErrorCode::BaselineViolation,
                name: port_name.to_string(),
                resolved: resolved.to_string(),
                baseline: baseline_version.to_string(),
            });
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portsmith_core::{Version, VersionScheme};
    use portsmith_providers::InMemoryBaselineProvider;

    fn sv(text: &str) -> SchemedVersion {
        SchemedVersion::new(VersionScheme::Relaxed, Version::new(text, 0))
    }

    #[tokio::test]
    async fn highest_minimum_wins() {
        let baseline = InMemoryBaselineProvider::versioned(HashMap::from([("zlib".to_string(), sv("1.0"))]));
        let resolved = resolve_versioned("zlib", &baseline, &[sv("1.2"), sv("1.1")], &HashMap::new())
            .await
            .unwrap();
        assert_eq!(resolved.version().text(), "1.2");
    }

    #[tokio::test]
    async fn below_baseline_is_a_violation() {
        let baseline = InMemoryBaselineProvider::versioned(HashMap::from([("zlib".to_string(), sv("2.0"))]));
        let err = resolve_versioned("zlib", &baseline, &[sv("1.0")], &HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), portsmith_core::ErrorCode::BaselineViolation);
    }

    #[tokio::test]
    async fn override_bypasses_baseline_violation() {
        let baseline = InMemoryBaselineProvider::versioned(HashMap::from([("zlib".to_string(), sv("2.0"))]));
        let overrides = HashMap::from([("zlib".to_string(), sv("1.0"))]);
        let resolved = resolve_versioned("zlib", &baseline, &[], &overrides).await.unwrap();
        assert_eq!(resolved.version().text(), "1.0");
    }
}
