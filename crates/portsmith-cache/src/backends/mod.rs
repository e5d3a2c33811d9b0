//! Concrete [`crate::CacheBackend`] implementations for the kinds listed in
//! `spec.md` §4.3.1.

mod cli;
mod http;
mod local;
mod null;

pub use cli::{CliBackend, CommandTemplate, NOT_FOUND_EXIT_CODE};
pub use http::{HttpBackend, UrlTemplate};
pub use local::LocalDirectoryBackend;
pub use null::NullBackend;
