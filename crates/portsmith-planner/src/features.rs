//! Feature fixed-point resolution (`spec.md` §4.1.2-§4.1.3).

use std::collections::VecDeque;

use portsmith_core::error::{Error, ErrorCode};
use portsmith_core::{AHashMap, AHashSet, Dependency, PackageSpec, Result, Triplet, CORE_FEATURE, DEFAULT_FEATURE};
use portsmith_providers::{CMakeVarProvider, PortProvider, SourceControlFile};
use tracing::trace;

use crate::config::{PlannerConfig, UnsupportedPortAction};

/// The fixed-point feature resolution for one planning run.
///
/// For every reachable [`PackageSpec`], `features` holds the resolved set
/// (always including `"core"`, never including the `"default"` placeholder)
/// and `control_files`/`edges` hold what each (spec, feature) resolved
/// against, so the planner can build [`crate::InstallPlanAction`]s directly
/// from this without re-walking providers.
#[derive(Debug, Default)]
pub struct FeatureResolution {
    /// The resolved feature set per spec.
    pub features: AHashMap<PackageSpec, AHashSet<String>>,
    /// The control file each spec was resolved against.
    pub control_files: AHashMap<PackageSpec, SourceControlFile>,
    /// Every dependency edge that was active (post-platform-filter) for each
    /// spec, deduplicated by (port, feature).
    pub edges: AHashMap<PackageSpec, Vec<Dependency>>,
    /// Specs skipped because their `supports` expression was false.
    pub excluded: AHashSet<PackageSpec>,
}

/// Run the worklist fixed point starting from `roots`.
///
/// `resolve_version` maps a port name to the [`SourceControlFile`] already
/// selected for it at its resolved version (the caller runs §4.1.1 first and
/// passes a closure/lookup so this module stays version-resolution-agnostic).
pub async fn resolve_features(
    roots: &[(PackageSpec, Vec<String>)],
    port_provider: &dyn PortProvider,
    cmake_vars: &dyn CMakeVarProvider,
    config: &PlannerConfig,
) -> Result<FeatureResolution> {
    let mut resolution = FeatureResolution::default();
    let mut worklist: VecDeque<(PackageSpec, String)> = VecDeque::new();

    for (spec, requested) in roots {
        for f in requested {
            worklist.push_back((spec.clone(), f.clone()));
        }
        worklist.push_back((spec.clone(), CORE_FEATURE.to_string()));
    }

    // §4.1.3: batch-load cmake vars for every root spec before evaluating any
    // platform expression. Specs discovered mid-walk get their vars loaded
    // lazily the first time they're reached, one request at a time, which is
    // still at most one request per spec since the provider caches.
    let initial: Vec<_> = roots
        .iter()
        .map(|(spec, _)| (spec.clone(), std::path::PathBuf::new()))
        .collect();
    cmake_vars.load_tag_vars(&initial).await?;

    while let Some((spec, raw_feature)) = worklist.pop_front() {
        if resolution.excluded.contains(&spec) {
            continue;
        }

        let scf = match resolution.control_files.get(&spec) {
            Some(scf) => scf.clone(),
            None => {
                let scf = port_provider.get_control_file(spec.name()).await?;
                if let Some(expr) = &scf.supports {
                    let vars = load_vars_for(&spec, cmake_vars).await?;
                    if !expr.evaluate(&vars) {
                        match config.unsupported_port_action {
                            UnsupportedPortAction::Warn => {
                                trace!(spec = %spec, "port unsupported on triplet, excluding");
                                resolution.excluded.insert(spec.clone());
                                continue;
                            }
                            UnsupportedPortAction::Error => {
                                return Err(Error::Unsupported {
                                    code: ErrorCode::Unsupported,
                                    name: spec.name().to_string(),
                                    reason: expr.to_string(),
                                });
                            }
                        }
                    }
                }
                resolution.control_files.insert(spec.clone(), scf.clone());
                scf
            }
        };

        let features = resolution.features.entry(spec.clone()).or_default();
        let feature_names: Vec<String> = if raw_feature == DEFAULT_FEATURE {
            scf.default_features.clone()
        } else {
            vec![raw_feature.clone()]
        };

        for feature in feature_names {
            if feature != CORE_FEATURE && !scf.has_feature(&feature) {
                return Err(Error::UnknownFeature {
                    code: ErrorCode::UnknownFeature,
                    name: spec.name().to_string(),
                    feature,
                });
            }
            if !features.insert(feature.clone()) {
                continue;
            }

            let deps: Vec<Dependency> = if feature == CORE_FEATURE {
                scf.dependencies.clone()
            } else {
                scf.feature(&feature).map(|fp| fp.dependencies.clone()).unwrap_or_default()
            };

            for dep in deps {
                let vars = load_vars_for(&spec, cmake_vars).await?;
                if let Some(expr) = &dep.platform {
                    if !expr.evaluate(&vars) {
                        continue;
                    }
                }
                let target_triplet = if dep.host { config.host_triplet.clone() } else { spec.triplet().clone() };
                let target = PackageSpec::new(dep.port.clone(), target_triplet);

                resolution.edges.entry(spec.clone()).or_default().push(dep.clone());

                let wanted: Vec<String> = if dep.features.is_empty() {
                    vec![DEFAULT_FEATURE.to_string(), CORE_FEATURE.to_string()]
                } else {
                    dep.features.clone()
                };
                for f in wanted {
                    worklist.push_back((target.clone(), f));
                }
            }
        }
    }

    Ok(resolution)
}

async fn load_vars_for(
    spec: &PackageSpec,
    cmake_vars: &dyn CMakeVarProvider,
) -> Result<std::collections::HashMap<String, String>> {
    if let Some(vars) = cmake_vars.get_tag_vars(spec) {
        return Ok(vars);
    }
    cmake_vars
        .load_tag_vars(&[(spec.clone(), std::path::PathBuf::new())])
        .await?;
    Ok(cmake_vars.get_tag_vars(spec).unwrap_or_default())
}

/// Re-export for callers that only need the host-triplet helper during
/// dependency target resolution.
#[must_use]
pub fn host_or_target(dep: &Dependency, host: &Triplet, target: &Triplet) -> Triplet {
    if dep.host { host.clone() } else { target.clone() }
}
