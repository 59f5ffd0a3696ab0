//! Shared helpers for resolver tests

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde_json::{json, Value};
use strata_config::{PackageJson, ResolverOptions};
use strata_core::StrataError;
use strata_packages::{collect_dependencies, Package, PackageCache, PackageLookup, PackageResult};
use strata_packages::{RewrittenIndex, RewrittenPackageCache};

use crate::host::FsResolver;
use crate::request::{ModuleRequest, Resolution};
use crate::resolver::Resolver;
use crate::ResolverResult;

/// A package graph that never touches the filesystem
#[derive(Debug)]
pub(crate) struct InMemoryPackages {
    app_root: Utf8PathBuf,
    packages: IndexMap<Utf8PathBuf, Arc<Package>>,
}

impl InMemoryPackages {
    pub fn new(app_root: &str) -> Self {
        Self {
            app_root: app_root.into(),
            packages: IndexMap::new(),
        }
    }

    /// Add a package from its raw package.json
    pub fn package(mut self, root: &str, package_json: Value) -> Self {
        let root = Utf8PathBuf::from(root);
        let parsed: PackageJson = serde_json::from_value(package_json).unwrap();
        let is_app = root == self.app_root;
        self.packages
            .insert(root.clone(), Arc::new(Package::new(root, parsed, is_app)));
        self
    }

    /// Add a v2 addon named after its directory, with extra `ember-addon`
    /// metadata
    pub fn addon(self, root: &str, meta: Value) -> Self {
        let name = root.rsplit_once("node_modules/").map(|(_, n)| n).unwrap_or(root);
        let mut ember_addon = json!({ "version": 2, "type": "addon" });
        if let (Some(target), Value::Object(extra)) = (ember_addon.as_object_mut(), meta) {
            target.extend(extra);
        }
        self.package(
            root,
            json!({ "name": name, "keywords": ["ember-addon"], "ember-addon": ember_addon }),
        )
    }
}

impl PackageLookup for InMemoryPackages {
    fn app_root(&self) -> &Utf8Path {
        &self.app_root
    }

    fn get(&self, root: &Utf8Path) -> PackageResult<Arc<Package>> {
        self.packages
            .get(root)
            .cloned()
            .ok_or_else(|| StrataError::PackageNotFound {
                name: root.to_string(),
                from: self.app_root.clone(),
            })
    }

    fn resolve(&self, name: &str, from: &Package) -> PackageResult<Arc<Package>> {
        from.root()
            .ancestors()
            .filter(|dir| dir.file_name() != Some("node_modules"))
            .find_map(|dir| self.packages.get(&dir.join("node_modules").join(name)))
            .cloned()
            .ok_or_else(|| StrataError::PackageNotFound {
                name: name.to_string(),
                from: from.root().to_path_buf(),
            })
    }

    fn owning_package(&self, file: &Utf8Path) -> Option<Arc<Package>> {
        self.packages
            .iter()
            .filter(|(root, _)| file.starts_with(root))
            .max_by_key(|(root, _)| root.as_str().len())
            .map(|(_, pkg)| pkg.clone())
    }

    fn dependencies(&self, pkg: &Package) -> PackageResult<Arc<Vec<Arc<Package>>>> {
        collect_dependencies(self, pkg).map(Arc::new)
    }
}

/// A resolver over a private (non-shared) cache of the tree at `app_root`
pub(crate) fn resolver_for(app_root: &Utf8Path, options: ResolverOptions) -> Resolver {
    let plain = Arc::new(PackageCache::new(app_root));
    let index = RewrittenIndex::load(app_root).unwrap();
    Resolver::with_packages(options, Arc::new(RewrittenPackageCache::new(plain, index))).unwrap()
}

/// Resolve with the filesystem host
pub(crate) fn resolve_fs(resolver: &Resolver, specifier: &str, from: &Utf8Path) -> ResolverResult<Resolution> {
    let host = FsResolver::new(resolver.options().resolvable_extensions.clone());
    resolver.resolve_sync(ModuleRequest::new(specifier, from), |request| host.resolve(request))
}
