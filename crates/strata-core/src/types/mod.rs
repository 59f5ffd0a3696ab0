//! Core data types shared by the package model and the resolver.

pub mod dependency;

// Re-export all public types
pub use dependency::DependencyKind;
