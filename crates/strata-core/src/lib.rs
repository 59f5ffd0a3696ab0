//! # strata-core
//!
//! Core types and utilities shared across all Strata crates.
//!
//! This crate provides:
//! - StrataError enum for unified error handling
//! - DependencyKind for the package.json dependency sections
//! - Path and specifier helpers used by the package model and the resolver
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (DependencyKind)
//! - `error`: Error types and result aliases
//! - `utils`: Path and specifier utilities

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{StrataError, StrataResult};
pub use types::DependencyKind;
