//! The lookup interface shared by the plain and rewritten caches

use std::collections::HashSet;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;

use crate::package::Package;
use crate::PackageResult;

/// Directory to [`Package`] lookups, node-style package resolution and
/// file ownership.
///
/// Implementations memoize everything and must tolerate concurrent callers
/// racing to fill the same entry.
pub trait PackageLookup: Send + Sync {
    /// Root of the app being built
    fn app_root(&self) -> &Utf8Path;

    /// Package at `root`, realpath-deduplicated
    fn get(&self, root: &Utf8Path) -> PackageResult<Arc<Package>>;

    /// Resolve the package `name` as seen from `from`.
    ///
    /// Fails with a not-found error (see [`strata_core::StrataError::is_not_found`])
    /// when nothing is installed under that name.
    fn resolve(&self, name: &str, from: &Package) -> PackageResult<Arc<Package>>;

    /// Nearest package containing `file`, never crossing a `node_modules` boundary
    fn owning_package(&self, file: &Utf8Path) -> Option<Arc<Package>>;

    /// Resolved dependencies of `pkg`, memoized
    fn dependencies(&self, pkg: &Package) -> PackageResult<Arc<Vec<Arc<Package>>>>;

    /// The package `pkg` was relocated from, if it was relocated
    fn original(&self, _pkg: &Package) -> Option<Arc<Package>> {
        None
    }

    /// Where the package originally at `root` was relocated to
    fn moved_to(&self, _root: &Utf8Path) -> Option<Utf8PathBuf> {
        None
    }

    fn app_package(&self) -> PackageResult<Arc<Package>> {
        self.get(self.app_root())
    }
}

/// Compute the dependency list of `pkg` through `lookup`.
///
/// In-repo addons come first, then every applicable declared dependency in
/// declaration order. Dependencies that are not installed are dropped; other
/// errors propagate.
pub fn collect_dependencies(
    lookup: &dyn PackageLookup,
    pkg: &Package,
) -> PackageResult<Vec<Arc<Package>>> {
    let mut deps: Vec<Arc<Package>> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for root in pkg.in_repo_addon_roots() {
        let dep = lookup.get(&root)?;
        if seen.insert(dep.name().to_string()) {
            deps.push(dep);
        }
    }

    for (name, kind) in pkg.dependency_names() {
        if seen.contains(&name) {
            continue;
        }
        match lookup.resolve(&name, pkg) {
            Ok(dep) => {
                seen.insert(name);
                deps.push(dep);
            },
            Err(e) if e.is_not_found() => {
                if !kind.may_be_missing() {
                    warn!(package = %pkg.name(), dependency = %name, section = kind.section(), "declared dependency is not installed");
                }
            },
            Err(e) => return Err(e),
        }
    }

    Ok(deps)
}
