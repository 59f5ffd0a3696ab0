//! A single installed package

use camino::{Utf8Path, Utf8PathBuf};
use strata_config::json::read_package_json;
use strata_config::{AddonMeta, PackageJson};
use strata_core::DependencyKind;
use tracing::debug;

use crate::PackageResult;

/// An installed package: a directory with a package.json.
///
/// Immutable once constructed. Dependency edges are not stored here because
/// they depend on which lookup (plain or rewritten) is asking; see
/// [`crate::PackageLookup::dependencies`].
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    root: Utf8PathBuf,
    package_json: PackageJson,
    is_app: bool,
}

impl Package {
    /// Create a package from an already parsed package.json
    pub fn new(root: Utf8PathBuf, package_json: PackageJson, is_app: bool) -> Self {
        Self {
            root,
            package_json,
            is_app,
        }
    }

    /// Read `<root>/package.json`
    pub fn load(root: &Utf8Path, is_app: bool) -> PackageResult<Self> {
        let package_json = read_package_json(&root.join("package.json"))?;
        Ok(Self::new(root.to_path_buf(), package_json, is_app))
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn package_json(&self) -> &PackageJson {
        &self.package_json
    }

    pub fn name(&self) -> &str {
        &self.package_json.name
    }

    pub fn version(&self) -> Option<&str> {
        self.package_json.version.as_deref()
    }

    /// Check if this package is the app being built
    pub fn is_app(&self) -> bool {
        self.is_app
    }

    /// Check if this package participates in the ember build at all
    pub fn is_ember_package(&self) -> bool {
        self.is_app || self.package_json.has_keyword("ember-addon")
    }

    /// The `ember-addon` block, whatever its version
    pub fn raw_meta(&self) -> Option<&AddonMeta> {
        self.package_json.ember_addon.as_ref()
    }

    /// The v2 metadata block. `None` unless the package is v2 formatted.
    pub fn meta(&self) -> Option<&AddonMeta> {
        self.raw_meta().filter(|m| m.is_v2())
    }

    /// Check if this is a v2 formatted ember package
    pub fn is_v2_ember_package(&self) -> bool {
        self.is_ember_package() && self.meta().is_some()
    }

    pub fn is_v2_addon(&self) -> bool {
        self.is_v2_ember_package() && self.meta_kind() == Some("addon")
    }

    pub fn is_v2_app(&self) -> bool {
        self.is_v2_ember_package() && self.meta_kind() == Some("app")
    }

    /// Check if this package is an engine
    pub fn is_engine(&self) -> bool {
        self.package_json.has_keyword("ember-addon") && self.package_json.has_keyword("ember-engine")
    }

    pub fn is_lazy_engine(&self) -> bool {
        self.is_engine() && self.raw_meta().map(|m| m.is_lazy()).unwrap_or(false)
    }

    /// Check if this package was mechanically converted from the v1 format
    pub fn is_auto_upgraded(&self) -> bool {
        self.meta().map(|m| m.auto_upgraded).unwrap_or(false)
    }

    /// A v2 addon authored directly in the v2 format
    pub fn is_native_v2(&self) -> bool {
        self.is_v2_addon() && !self.is_auto_upgraded()
    }

    /// Explicit ordering override, 0 when absent
    pub fn order_index(&self) -> i64 {
        self.meta().and_then(|m| m.order_index).unwrap_or(0)
    }

    fn meta_kind(&self) -> Option<&str> {
        self.meta().and_then(|m| m.kind.as_deref())
    }

    /// Dependency sections that apply to this package
    pub fn applicable_kinds(&self) -> &'static [DependencyKind] {
        DependencyKind::applicable(self.is_app)
    }

    /// Declared dependency names from every applicable section, in
    /// declaration order. A name declared in two sections appears once, with
    /// the kind of the first section that declares it.
    pub fn dependency_names(&self) -> Vec<(String, DependencyKind)> {
        let mut names: Vec<(String, DependencyKind)> = Vec::new();
        for kind in self.applicable_kinds() {
            for name in self.package_json.section(*kind).keys() {
                if !names.iter().any(|(n, _)| n == name) {
                    names.push((name.clone(), *kind));
                }
            }
        }
        names
    }

    /// Check if `name` is declared in any applicable section. Never resolves.
    pub fn has_dependency(&self, name: &str) -> bool {
        self.categorize_dependency(name).is_some()
    }

    /// The first applicable section that declares `name`
    pub fn categorize_dependency(&self, name: &str) -> Option<DependencyKind> {
        self.applicable_kinds()
            .iter()
            .copied()
            .find(|kind| self.package_json.section(*kind).contains_key(name))
    }

    /// Roots of in-repo addons declared through `ember-addon.paths`.
    ///
    /// Entries whose package.json does not parse or whose main file is
    /// missing are skipped.
    pub fn in_repo_addon_roots(&self) -> Vec<Utf8PathBuf> {
        let Some(meta) = self.raw_meta() else {
            return Vec::new();
        };

        meta.paths
            .iter()
            .filter_map(|relative| {
                let root = strata_core::utils::normalize_path(&self.root.join(relative));
                match read_package_json(&root.join("package.json")) {
                    Ok(pkg) => {
                        let main = pkg
                            .ember_addon
                            .as_ref()
                            .and_then(|m| m.main.clone())
                            .or_else(|| pkg.main.clone())
                            .unwrap_or_else(|| "index.js".to_string());
                        if root.join(&main).is_file() {
                            Some(root)
                        } else {
                            debug!(package = %self.name(), path = %root, main = %main, "skipping in-repo addon without main file");
                            None
                        }
                    },
                    Err(e) => {
                        debug!(package = %self.name(), path = %root, error = %e, "skipping invalid in-repo addon");
                        None
                    },
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
