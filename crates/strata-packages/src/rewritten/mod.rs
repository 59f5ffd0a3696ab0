//! Rewritten-package index
//!
//! Packages the build relocated into a workspace still resolve their
//! dependencies as if they were at their original location, while callers
//! get the relocated package (with its rewritten metadata) back.

use std::collections::HashMap;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::Deserialize;
use strata_config::CONFIG_DIR;
use strata_core::StrataError;
use tracing::debug;

use crate::cache::{canonical, PackageCache};
use crate::lookup::{collect_dependencies, PackageLookup};
use crate::package::Package;
use crate::PackageResult;

/// Location of the index relative to the app root
pub const REWRITTEN_INDEX: &str = "rewritten-packages/index.json";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexFile {
    #[serde(default)]
    packages: IndexMap<String, String>,
    #[serde(default)]
    extra_resolutions: IndexMap<String, Vec<String>>,
}

/// Parsed rewritten-package index with absolute, canonical roots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewrittenIndex {
    /// Original root to relocated root
    pub packages: IndexMap<Utf8PathBuf, Utf8PathBuf>,
    /// Root to additional dependency roots
    pub extra_resolutions: IndexMap<Utf8PathBuf, Vec<Utf8PathBuf>>,
}

impl RewrittenIndex {
    /// Path of the index file for `app_root`
    pub fn path_for(app_root: &Utf8Path) -> Utf8PathBuf {
        app_root.join(CONFIG_DIR).join(REWRITTEN_INDEX)
    }

    /// Load the index for `app_root`; a missing file means nothing moved
    pub fn load(app_root: &Utf8Path) -> PackageResult<Self> {
        let path = Self::path_for(app_root);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| StrataError::io(format!("Failed to read {}", path), e))?;
        Self::parse(&content, &path)
    }

    /// Parse index content. Relative paths are relative to the index file's
    /// directory.
    pub fn parse(content: &str, path: &Utf8Path) -> PackageResult<Self> {
        let file: IndexFile = serde_json::from_str(content).map_err(|e| StrataError::JsonParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let base = path.parent().unwrap_or(Utf8Path::new("/"));
        let absolute = |p: &str| canonical(&base.join(p));

        Ok(Self {
            packages: file
                .packages
                .iter()
                .map(|(old, new)| (absolute(old), absolute(new)))
                .collect(),
            extra_resolutions: file
                .extra_resolutions
                .iter()
                .map(|(root, deps)| (absolute(root), deps.iter().map(|d| absolute(d)).collect()))
                .collect(),
        })
    }
}

/// A [`PackageLookup`] that applies the rewritten-package index on top of a
/// plain [`PackageCache`]
#[derive(Debug)]
pub struct RewrittenPackageCache {
    plain: Arc<PackageCache>,
    old_to_new: HashMap<Utf8PathBuf, Utf8PathBuf>,
    new_to_old: HashMap<Utf8PathBuf, Utf8PathBuf>,
    extra_resolutions: HashMap<Utf8PathBuf, Vec<Utf8PathBuf>>,
    dependencies: DashMap<Utf8PathBuf, Arc<Vec<Arc<Package>>>>,
}

impl RewrittenPackageCache {
    /// Wrap `plain` with `index`
    pub fn new(plain: Arc<PackageCache>, index: RewrittenIndex) -> Self {
        let app_root = plain.app_root().to_path_buf();
        let mut old_to_new = HashMap::new();
        let mut new_to_old = HashMap::new();

        for (old, new) in index.packages {
            if old == app_root {
                debug!(root = %old, "ignoring rewritten-package entry for the app");
                continue;
            }
            new_to_old.insert(new.clone(), old.clone());
            old_to_new.insert(old, new);
        }

        Self {
            plain,
            old_to_new,
            new_to_old,
            extra_resolutions: index.extra_resolutions.into_iter().collect(),
            dependencies: DashMap::new(),
        }
    }

    /// Shared plain cache plus the index found under `app_root`
    pub fn load(app_root: &Utf8Path) -> PackageResult<Self> {
        let plain = PackageCache::shared(app_root);
        let index = RewrittenIndex::load(plain.app_root())?;
        Ok(Self::new(plain, index))
    }

    /// The underlying plain cache
    pub fn plain(&self) -> &Arc<PackageCache> {
        &self.plain
    }

    /// Original root of a possibly relocated root; identity otherwise
    pub fn original_root(&self, root: &Utf8Path) -> Utf8PathBuf {
        let root = canonical(root);
        self.new_to_old.get(&root).cloned().unwrap_or(root)
    }

    /// Relocated version of `pkg`, or `pkg` itself
    pub fn maybe_moved(&self, pkg: Arc<Package>) -> PackageResult<Arc<Package>> {
        match self.old_to_new.get(pkg.root()) {
            Some(new_root) => self.plain.get(new_root),
            None => Ok(pkg),
        }
    }

    fn extra_resolution(&self, name: &str, from: &Package) -> PackageResult<Option<Arc<Package>>> {
        let original = self.original_root(from.root());
        let candidates = self
            .extra_resolutions
            .get(from.root())
            .or_else(|| self.extra_resolutions.get(&original));

        if let Some(roots) = candidates {
            for root in roots {
                let pkg = self.get(root)?;
                if pkg.name() == name {
                    return Ok(Some(pkg));
                }
            }
        }
        Ok(None)
    }
}

impl PackageLookup for RewrittenPackageCache {
    fn app_root(&self) -> &Utf8Path {
        self.plain.app_root()
    }

    fn get(&self, root: &Utf8Path) -> PackageResult<Arc<Package>> {
        let pkg = self.plain.get(root)?;
        self.maybe_moved(pkg)
    }

    fn resolve(&self, name: &str, from: &Package) -> PackageResult<Arc<Package>> {
        if let Some(pkg) = self.extra_resolution(name, from)? {
            return Ok(pkg);
        }

        let original_from = self.plain.get(&self.original_root(from.root()))?;
        let found = self.plain.resolve(name, &original_from)?;
        self.maybe_moved(found)
    }

    fn owning_package(&self, file: &Utf8Path) -> Option<Arc<Package>> {
        let owner = self.plain.owning_package(file)?;
        self.maybe_moved(owner).ok()
    }

    fn dependencies(&self, pkg: &Package) -> PackageResult<Arc<Vec<Arc<Package>>>> {
        if let Some(deps) = self.dependencies.get(pkg.root()) {
            return Ok(deps.clone());
        }
        let deps = Arc::new(collect_dependencies(self, pkg)?);
        Ok(self
            .dependencies
            .entry(pkg.root().to_path_buf())
            .or_insert(deps)
            .clone())
    }

    fn original(&self, pkg: &Package) -> Option<Arc<Package>> {
        let old = self.new_to_old.get(pkg.root())?;
        self.plain.get(old).ok()
    }

    fn moved_to(&self, root: &Utf8Path) -> Option<Utf8PathBuf> {
        self.old_to_new.get(root).cloned()
    }
}

#[cfg(test)]
mod tests;
