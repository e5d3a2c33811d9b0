//! Proptest strategies for the core value types, used by the planner and
//! ABI crates' property tests.

use portsmith_core::{PlatformExpr, Triplet, Version, VersionScheme};
use proptest::prelude::*;

/// A plausible upstream version text: `MAJOR.MINOR.PATCH` with small digits,
/// matching what the relaxed and semver schemes both accept.
pub fn version_text() -> impl Strategy<Value = String> {
    (0u32..20, 0u32..20, 0u32..20).prop_map(|(major, minor, patch)| format!("{major}.{minor}.{patch}"))
}

/// A [`Version`] with a small, mostly-zero port-version counter.
pub fn version() -> impl Strategy<Value = Version> {
    (version_text(), 0u64..4).prop_map(|(text, port_version)| Version::new(text, port_version))
}

/// One of the four version schemes this workspace's planner must handle.
pub fn version_scheme() -> impl Strategy<Value = VersionScheme> {
    prop_oneof![
        Just(VersionScheme::Semver),
        Just(VersionScheme::Relaxed),
        Just(VersionScheme::Date),
        Just(VersionScheme::String),
    ]
}

/// A triplet drawn from a small realistic set rather than arbitrary text,
/// since the planner treats triplet names as opaque but platform evaluation
/// cares about their conventional `arch-os` shape.
pub fn triplet() -> impl Strategy<Value = Triplet> {
    prop_oneof![
        Just("x64-linux"),
        Just("x64-windows"),
        Just("x64-osx"),
        Just("arm64-osx"),
        Just("arm64-linux"),
    ]
    .prop_map(Triplet::new)
}

/// A bounded-depth platform expression tree: enough `and`/`or`/`not`/`var`
/// nesting to exercise the evaluator without proptest spending all its
/// budget on pathologically deep trees.
pub fn platform_expr() -> impl Strategy<Value = PlatformExpr> {
    let leaf = prop_oneof![
        Just("windows"), Just("linux"), Just("osx"), Just("x64"), Just("arm64"), Just("static"),
    ]
    .prop_map(|v| PlatformExpr::Var(v.to_string()));

    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| PlatformExpr::Not(Box::new(e))),
            prop::collection::vec(inner.clone(), 1..4).prop_map(PlatformExpr::And),
            prop::collection::vec(inner, 1..4).prop_map(PlatformExpr::Or),
        ]
    })
}
