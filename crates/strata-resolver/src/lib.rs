//! Module resolution engine for classic ember packages
//!
//! This crate decides, for every import in a build, which real or synthesized
//! module it refers to, and produces the source text of synthesized modules on
//! demand. It is driven by a host bundler through two entry points sharing one
//! implementation: [`Resolver::resolve_sync`] and [`Resolver::resolve`].
//!
//! ## Architecture
//!
//! - `request`: the immutable [`ModuleRequest`] flowing through the pipeline
//! - `resolver`: before/fallback rules and the step machine driving them
//! - `engines`: partitioning the package graph into engines
//! - `virtual_content`: virtual module ids and their generators
//! - `host`: a filesystem `defaultResolve` for the CLI and tests
//! - `loader`: the hot-reloading resolver singleton

pub mod engines;
pub mod host;
pub mod loader;
pub mod request;
pub mod resolver;
pub mod virtual_content;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export main types
pub use engines::{partition_engines, EnginePartition};
pub use host::FsResolver;
pub use loader::ResolverLoader;
pub use request::{ModuleRequest, Resolution};
pub use resolver::{ResolveTask, Resolver, Step};
pub use virtual_content::{VirtualContent, VirtualResponse};

use strata_core::StrataError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, StrataError>;

/// Specifier of the build-time macros package; never rewritten
pub const MACROS_SPECIFIER: &str = "@strata/macros";
