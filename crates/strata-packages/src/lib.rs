//! Package model and package caches for Strata
//!
//! This crate answers "which package is this directory, what does its
//! metadata declare, and where do its dependencies live". Lookups are
//! memoized in concurrent maps so many resolutions can share them.
//!
//! Two [`PackageLookup`] implementations are provided: [`PackageCache`] does
//! plain node-style resolution, and [`RewrittenPackageCache`] layers the
//! rewritten-package index on top so relocated packages resolve as if they
//! had never moved.

pub mod cache;
pub mod lookup;
pub mod package;
pub mod rewritten;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixture;

// Re-export main types
pub use cache::PackageCache;
pub use lookup::{collect_dependencies, PackageLookup};
pub use package::Package;
pub use rewritten::{RewrittenIndex, RewrittenPackageCache};

use strata_core::StrataError;

/// Result type for package operations
pub type PackageResult<T> = Result<T, StrataError>;
