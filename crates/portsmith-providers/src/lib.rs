//! Interfaces the planner consumes from the registry/toolchain layer, plus
//! small in-memory reference implementations used by tests and by callers
//! that don't have a real registry wired up.
//!
//! None of the trait methods here parse manifests or invoke external tools —
//! that's the registry/toolchain's job. This crate only defines the shape of
//! the answers the planner needs.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod memory;
mod scf;
mod traits;

pub use memory::{InMemoryBaselineProvider, InMemoryCMakeVarProvider, InMemoryPortProvider};
pub use scf::{FeatureParagraph, SourceControlFile};
pub use traits::{BaselineProvider, CMakeVarProvider, PortProvider};
