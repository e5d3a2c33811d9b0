//! The ABI fingerprint engine (`spec.md` §4.2).
//!
//! Given the [`portsmith_planner::ActionPlan`] produced by the planner, this
//! crate computes a `package_abi` hex digest for every install action, in
//! topological order (each action's own tag depends on its dependencies'
//! already-computed tags), and either demotes the action to `Cached` when it
//! matches what's already installed or leaves the remove+install pair in
//! place.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod engine;
mod inputs;
mod manifest;
mod sbom;

pub use config::AbiConfig;
pub use engine::AbiEngine;
pub use inputs::{
    compiler_info_abi, port_directory_entries, toolset_abi, triplet_abi, AbiEntry, CmakeHelper, CompilerInfo,
    ToolsetInfo,
};
pub use manifest::render_manifest;
pub use sbom::{render_sbom, SbomFile};
