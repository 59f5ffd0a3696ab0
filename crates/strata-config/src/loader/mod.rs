//! Resolver options discovery and loading

use camino::{Utf8Path, Utf8PathBuf};
use strata_core::StrataError;
use tracing::debug;

use crate::options::{parse_resolver_options, ResolverOptions};
use crate::ConfigResult;

/// Directory holding the files written by the build
pub const CONFIG_DIR: &str = "node_modules/.strata";

/// Resolver options file name
pub const RESOLVER_CONFIG_FILE: &str = "resolver.json";

/// Main configuration loading interface
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Working directory this loader reads from
    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Where the resolver options live for this working directory
    pub fn config_path(&self) -> Utf8PathBuf {
        self.cwd.join(CONFIG_DIR).join(RESOLVER_CONFIG_FILE)
    }

    /// Walk up from the working directory looking for an existing options file,
    /// falling back to the working directory's own location
    pub fn resolve_config_path(&self) -> Utf8PathBuf {
        let mut current = Some(self.cwd.as_path());
        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_DIR).join(RESOLVER_CONFIG_FILE);
            if candidate.is_file() {
                return candidate;
            }
            current = dir.parent();
        }
        self.config_path()
    }

    /// Load resolver options synchronously
    pub fn load(&self) -> ConfigResult<ResolverOptions> {
        let path = self.resolve_config_path();
        debug!(path = %path, "loading resolver options");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| StrataError::io(format!("Failed to read {}", path), e))?;
        self.finish(&content, &path)
    }

    /// Load resolver options asynchronously
    pub async fn load_async(&self) -> ConfigResult<ResolverOptions> {
        let path = self.resolve_config_path();
        debug!(path = %path, "loading resolver options");
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| StrataError::io(format!("Failed to read {}", path), e))?;
        self.finish(&content, &path)
    }

    /// Write options to this working directory's options file
    pub fn write(&self, options: &ResolverOptions) -> ConfigResult<Utf8PathBuf> {
        let path = self.config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StrataError::io(format!("Failed to create {}", parent), e))?;
        }
        let content = serde_json::to_string_pretty(options).map_err(|e| StrataError::JsonParse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content)
            .map_err(|e| StrataError::io(format!("Failed to write {}", path), e))?;
        Ok(path)
    }

    fn finish(&self, content: &str, path: &Utf8Path) -> ConfigResult<ResolverOptions> {
        let mut options = parse_resolver_options(content, path)?;
        options.absolutize(&self.cwd);
        options.validate()?;
        Ok(options)
    }
}
