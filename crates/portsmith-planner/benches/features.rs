//! Benchmarks for the feature-set fixed point over a chain of dependent
//! ports (`spec.md` §4.1.2-§4.1.3).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use portsmith_core::{Dependency, FullPackageSpec, PackageSpec, SchemedVersion, Triplet, Version, VersionScheme};
use portsmith_planner::{DependencyPlanner, PlannerConfig};
use portsmith_providers::{InMemoryBaselineProvider, InMemoryCMakeVarProvider, InMemoryPortProvider, SourceControlFile};
use portsmith_status::StatusDatabase;
use tempfile::TempDir;
use tokio::runtime::Runtime;

fn triplet() -> Triplet {
    Triplet::new("x64-linux")
}

fn scf(name: &str, deps: Vec<Dependency>) -> SourceControlFile {
    SourceControlFile {
        name: name.to_string(),
        version: SchemedVersion::new(VersionScheme::Relaxed, Version::new("1.0", 0)),
        dependencies: deps,
        default_features: Vec::new(),
        license: None,
        supports: None,
        features: Vec::new(),
    }
}

/// `port0` depends on nothing; `port(i)` depends on `port(i-1)`, so
/// resolving the top port walks the whole chain.
fn chain_provider(len: usize) -> InMemoryPortProvider {
    let ports = InMemoryPortProvider::new();
    ports.insert(scf("port0", Vec::new()));
    for i in 1..len {
        ports.insert(scf(&format!("port{i}"), vec![Dependency::simple(format!("port{}", i - 1))]));
    }
    ports
}

fn bench_resolve_chain(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("feature_resolution");

    for len in &[10usize, 50, 200] {
        let ports = chain_provider(*len);
        let root = PackageSpec::new(format!("port{}", len - 1), triplet());
        let planner = DependencyPlanner::new(PlannerConfig::new(triplet()));

        group.bench_with_input(BenchmarkId::new("chain", len), len, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let dir = TempDir::new().unwrap();
                    let status = StatusDatabase::load(dir.path()).unwrap();
                    let plan = planner
                        .plan(
                            &[FullPackageSpec::new(root.clone(), Vec::new())],
                            &status,
                            &ports,
                            &InMemoryBaselineProvider::classic(),
                            &InMemoryCMakeVarProvider::new(),
                        )
                        .await
                        .unwrap();
                    black_box(plan)
                })
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolve_chain);
criterion_main!(benches);
