//! Core types and utilities shared across the portsmith workspace.
//!
//! This crate provides the foundational value types used by every other
//! crate in the workspace:
//!
//! - [`Triplet`] and [`PackageSpec`]/[`FeatureSpec`] — interned target
//!   identifiers and the (name, triplet) pairs the rest of the system keys
//!   everything on.
//! - [`Version`], [`VersionScheme`] and [`SchemedVersion`] — the
//!   scheme-qualified version comparison discipline.
//! - [`Dependency`] and the [`platform`] expression AST/evaluator.
//! - [`paragraph`] — the `Key: value` record grammar shared by the status
//!   database and by source-control-file-shaped metadata.
//! - [`hash`] — streaming SHA-512 content hashing.
//! - [`error`] — the shared error kinds (§7 of the design).

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod abi;
pub mod error;
pub mod hash;
pub mod paragraph;
pub mod platform;
pub mod spec;
pub mod triplet;
pub mod version;

pub use abi::AbiInfo;
pub use error::{Error, ErrorCode, Result};
pub use hash::{hash_bytes, hash_file, ContentHasher, Sha512Digest};
pub use paragraph::Paragraph;
pub use platform::PlatformExpr;
pub use spec::{
    Dependency, FeatureSpec, FullPackageSpec, PackageSpec, CORE_FEATURE, DEFAULT_FEATURE,
};
pub use triplet::Triplet;
pub use version::{SchemedVersion, Version, VersionScheme};

// Re-exported for crates that build on top of the shared concurrent map type.
pub use ahash::{AHashMap, AHashSet};
