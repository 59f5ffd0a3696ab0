//! Strata benchmarking suite
//!
//! Benchmarks for request resolution, engine partitioning and virtual module
//! generation over generated package trees.

pub mod common;

pub use common::*;
