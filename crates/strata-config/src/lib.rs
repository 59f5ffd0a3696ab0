//! Configuration parsing for Strata
//!
//! This crate handles parsing and validation of package.json files (including
//! the `ember-addon` metadata block) and of the resolver options file written
//! by the build, providing typed views for the package model and the resolver.

pub mod json;
pub mod loader;
pub mod options;

// Re-export main types
pub use json::{AddonMeta, ImplicitKind, PackageJson};
pub use loader::{ConfigLoader, CONFIG_DIR, RESOLVER_CONFIG_FILE};
pub use options::{ActiveAddon, EngineConfig, FastbootFile, ResolverOptions, RoutePattern};

use strata_core::StrataError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, StrataError>;
