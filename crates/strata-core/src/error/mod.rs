//! Error types and result aliases for Strata operations.
//!
//! Provides a unified error type covering configuration problems, resolution
//! legality violations, expected not-found states and virtual module decode
//! failures, each with an actionable message.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Code carried by every "package could not be found" error.
pub const MODULE_NOT_FOUND: &str = "MODULE_NOT_FOUND";

/// Unified error type for all Strata operations
#[derive(Error, Debug)]
pub enum StrataError {
    // Config errors
    #[error("Failed to parse {path}: {message}")]
    JsonParse { path: Utf8PathBuf, message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Package lookup errors
    #[error("Could not find package '{name}' from {from}")]
    PackageNotFound { name: String, from: Utf8PathBuf },

    // Resolution legality errors
    #[error("{package} is trying to import from {specifier} but that is not one of its explicit dependencies")]
    UndeclaredDependency { package: String, specifier: String },

    #[error("The engine {engine} uses package.json exports, and engines cannot use package.json exports with relative imports (tried to resolve {specifier})")]
    EngineExportsRelativeImport { engine: String, specifier: String },

    #[error("{file} is part of an app tree contribution and its relative import {specifier} escapes the engine at {engine_root}")]
    AppTreeEscape {
        file: Utf8PathBuf,
        specifier: String,
        engine_root: Utf8PathBuf,
    },

    #[error("Resolution of {specifier} from {from} did not make progress after {hops} steps")]
    ResolutionLoop {
        specifier: String,
        from: Utf8PathBuf,
        hops: usize,
    },

    // Virtual content errors
    #[error("Unknown virtual module: {specifier}")]
    UnknownVirtualModule { specifier: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Strata operations
pub type StrataResult<T> = Result<T, StrataError>;

impl StrataError {
    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a configuration validation error
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            StrataError::JsonParse { .. } => "JSON_PARSE",
            StrataError::ConfigValidation { .. } => "CONFIG_INVALID",
            StrataError::PackageNotFound { .. } => MODULE_NOT_FOUND,
            StrataError::UndeclaredDependency { .. } => "UNDECLARED_DEPENDENCY",
            StrataError::EngineExportsRelativeImport { .. } => "ENGINE_EXPORTS_RELATIVE_IMPORT",
            StrataError::AppTreeEscape { .. } => "APP_TREE_ESCAPE",
            StrataError::ResolutionLoop { .. } => "RESOLUTION_LOOP",
            StrataError::UnknownVirtualModule { .. } => "UNKNOWN_VIRTUAL_MODULE",
            StrataError::Io { .. } => "IO",
        }
    }

    /// Check if this is the expected "package not found" state
    pub fn is_not_found(&self) -> bool {
        self.code() == MODULE_NOT_FOUND
    }

    /// Check if this error is recoverable. Only not-found states are; everything
    /// else must halt the build.
    pub fn is_recoverable(&self) -> bool {
        self.is_not_found()
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            StrataError::PackageNotFound { .. } => {
                Some("Check that the package is installed and declared in package.json")
            },
            StrataError::UndeclaredDependency { .. } => {
                Some("Add the package to dependencies or peerDependencies of the importing package")
            },
            StrataError::EngineExportsRelativeImport { .. } => {
                Some("Remove the exports field from the engine or import the module by package name")
            },
            StrataError::AppTreeEscape { .. } => {
                Some("Import the module by package name instead of a relative path")
            },
            StrataError::UnknownVirtualModule { .. } => {
                Some("Make sure the bundler plugin and the resolver come from the same Strata version")
            },
            StrataError::ConfigValidation { .. } | StrataError::JsonParse { .. } => {
                Some("Regenerate node_modules/.strata/resolver.json and try again")
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_code() {
        let err = StrataError::PackageNotFound {
            name: "lodash".to_string(),
            from: Utf8PathBuf::from("/app"),
        };
        assert_eq!(err.code(), MODULE_NOT_FOUND);
        assert!(err.is_not_found());
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("lodash"));
    }

    #[test]
    fn test_legality_errors_are_fatal() {
        let err = StrataError::UndeclaredDependency {
            package: "strict-pkg".to_string(),
            specifier: "b".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("strict-pkg"));
        assert!(err.to_string().contains("b but that is not one of its explicit dependencies"));
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error;
        let err = StrataError::io(
            "Failed to read package.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.code(), "IO");
        assert!(err.source().is_some());
    }
}
