//! Memoized package lookups
//!
//! All tables are `DashMap`s populated insert-if-absent: two threads racing
//! on the same key both compute the same value and one of them wins.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strata_core::utils::normalize_path;
use strata_core::StrataError;
use tracing::debug;

use crate::lookup::{collect_dependencies, PackageLookup};
use crate::package::Package;
use crate::PackageResult;

static SHARED: Lazy<DashMap<Utf8PathBuf, Arc<PackageCache>>> = Lazy::new(DashMap::new);

/// Realpath when the path exists, lexical normalization otherwise
pub fn canonical(path: &Utf8Path) -> Utf8PathBuf {
    std::fs::canonicalize(path)
        .ok()
        .and_then(|p| Utf8PathBuf::try_from(p).ok())
        .unwrap_or_else(|| normalize_path(path))
}

/// Plain node-style package cache
#[derive(Debug)]
pub struct PackageCache {
    app_root: Utf8PathBuf,
    /// Canonical root to package
    packages: DashMap<Utf8PathBuf, Arc<Package>>,
    /// (requesting root, name) to resolved root; `None` caches a miss
    resolutions: DashMap<(Utf8PathBuf, String), Option<Utf8PathBuf>>,
    /// Directory to owning package root
    owners: DashMap<Utf8PathBuf, Option<Utf8PathBuf>>,
    dependencies: DashMap<Utf8PathBuf, Arc<Vec<Arc<Package>>>>,
}

impl PackageCache {
    /// Create a new cache for the app at `app_root`
    pub fn new(app_root: &Utf8Path) -> Self {
        Self {
            app_root: canonical(app_root),
            packages: DashMap::new(),
            resolutions: DashMap::new(),
            owners: DashMap::new(),
            dependencies: DashMap::new(),
        }
    }

    /// Process-lifetime cache for `app_root`
    pub fn shared(app_root: &Utf8Path) -> Arc<PackageCache> {
        let key = canonical(app_root);
        SHARED
            .entry(key.clone())
            .or_insert_with(|| Arc::new(PackageCache::new(&key)))
            .clone()
    }

    /// Number of packages loaded so far
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn not_found(name: &str, from: &Package) -> StrataError {
        StrataError::PackageNotFound {
            name: name.to_string(),
            from: from.root().to_path_buf(),
        }
    }

    fn find_in_node_modules(name: &str, from: &Utf8Path) -> Option<Utf8PathBuf> {
        for dir in from.ancestors() {
            if dir.file_name() == Some("node_modules") {
                continue;
            }
            let candidate = dir.join("node_modules").join(name);
            if candidate.join("package.json").is_file() {
                return Some(candidate);
            }
        }
        None
    }

    fn find_owner(dir: &Utf8Path) -> Option<Utf8PathBuf> {
        for candidate in dir.ancestors() {
            if candidate.file_name() == Some("node_modules") {
                return None;
            }
            if candidate.join("package.json").is_file() {
                return Some(candidate.to_path_buf());
            }
        }
        None
    }
}

impl PackageLookup for PackageCache {
    fn app_root(&self) -> &Utf8Path {
        &self.app_root
    }

    fn get(&self, root: &Utf8Path) -> PackageResult<Arc<Package>> {
        let root = canonical(root);
        if let Some(pkg) = self.packages.get(&root) {
            return Ok(pkg.clone());
        }

        let pkg = Arc::new(Package::load(&root, root == self.app_root)?);
        Ok(self.packages.entry(root).or_insert(pkg).clone())
    }

    fn resolve(&self, name: &str, from: &Package) -> PackageResult<Arc<Package>> {
        let key = (from.root().to_path_buf(), name.to_string());
        let cached = self.resolutions.get(&key).map(|entry| entry.clone());

        let found = match cached {
            Some(found) => found,
            None => {
                let found = Self::find_in_node_modules(name, from.root());
                if found.is_none() {
                    debug!(name = %name, from = %from.root(), "package not found");
                }
                self.resolutions.insert(key, found.clone());
                found
            },
        };

        match found {
            Some(root) => self.get(&root),
            None => Err(Self::not_found(name, from)),
        }
    }

    fn owning_package(&self, file: &Utf8Path) -> Option<Arc<Package>> {
        let file = normalize_path(file);
        let dir = if file.is_dir() {
            file
        } else {
            file.parent().map(Utf8Path::to_path_buf)?
        };

        let owner = match self.owners.get(&dir).map(|entry| entry.clone()) {
            Some(owner) => owner,
            None => {
                let owner = Self::find_owner(&dir);
                self.owners.insert(dir, owner.clone());
                owner
            },
        };

        owner.and_then(|root| self.get(&root).ok())
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
}

#[cfg(test)]
mod tests;
