//! Filesystem host resolution
//!
//! [`FsResolver`] plays the host bundler's part for the CLI, benchmarks and
//! tests: node-style resolution with extension probing, directory indexes,
//! `main` and `exports`. Virtual ids never resolve here.

pub mod exports;

use camino::{Utf8Path, Utf8PathBuf};
use strata_config::json::read_package_json;
use strata_config::options::DEFAULT_EXTENSIONS;
use strata_core::utils::{is_relative, normalize_path, package_name, package_relative};
use strata_packages::cache::canonical;

use crate::request::{ModuleRequest, Resolution};
use crate::virtual_content::VirtualResponse;
use exports::{resolve_exports, CONDITIONS};

/// Node-style resolution against the real filesystem
#[derive(Debug, Clone)]
pub struct FsResolver {
    extensions: Vec<String>,
}

impl Default for FsResolver {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect())
    }
}

impl FsResolver {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// Resolve `request` as the host bundler would
    pub fn resolve(&self, request: &ModuleRequest) -> Resolution {
        let specifier = request.specifier();
        if VirtualResponse::is_virtual_id(specifier) {
            return Resolution::not_found(request, Some("virtual modules are not on disk".to_string()));
        }
        let specifier = specifier.split('?').next().unwrap_or(specifier);
        let dir = request.from_dir();

        let found = if is_relative(specifier) {
            self.resolve_path(&normalize_path(&dir.join(specifier)))
        } else if specifier.starts_with('/') {
            self.resolve_path(&normalize_path(Utf8Path::new(specifier)))
        } else {
            self.resolve_bare(specifier, dir)
        };

        match found {
            Some(path) => Resolution::found(canonical(&path).to_string()),
            None => Resolution::not_found(
                request,
                Some(format!("Cannot find module '{}' from '{}'", specifier, request.from_file())),
            ),
        }
    }

    fn resolve_path(&self, base: &Utf8Path) -> Option<Utf8PathBuf> {
        self.try_file(base).or_else(|| self.try_dir(base))
    }

    fn try_file(&self, base: &Utf8Path) -> Option<Utf8PathBuf> {
        if base.is_file() {
            return Some(base.to_path_buf());
        }
        self.extensions
            .iter()
            .map(|ext| Utf8PathBuf::from(format!("{}{}", base, ext)))
            .find(|candidate| candidate.is_file())
    }

    fn try_dir(&self, dir: &Utf8Path) -> Option<Utf8PathBuf> {
        if !dir.is_dir() {
            return None;
        }
        let manifest = dir.join("package.json");
        if manifest.is_file() {
            if let Some(main) = read_package_json(&manifest).ok().and_then(|pkg| pkg.main) {
                let main = normalize_path(&dir.join(main));
                if let Some(found) = self.try_file(&main).or_else(|| self.try_index(&main)) {
                    return Some(found);
                }
            }
        }
        self.try_index(dir)
    }

    fn try_index(&self, dir: &Utf8Path) -> Option<Utf8PathBuf> {
        self.extensions
            .iter()
            .map(|ext| dir.join(format!("index{}", ext)))
            .find(|candidate| candidate.is_file())
    }

    fn resolve_bare(&self, specifier: &str, from_dir: &Utf8Path) -> Option<Utf8PathBuf> {
        let name = package_name(specifier)?;
        let subpath = package_relative(specifier, name)?;

        for dir in from_dir.ancestors() {
            if dir.file_name() == Some("node_modules") {
                continue;
            }
            let pkg_dir = dir.join("node_modules").join(name);
            if pkg_dir.is_dir() {
                if let Some(found) = self.resolve_package(&pkg_dir, &subpath) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn resolve_package(&self, pkg_dir: &Utf8Path, subpath: &str) -> Option<Utf8PathBuf> {
        let manifest = pkg_dir.join("package.json");
        let exports = read_package_json(&manifest).ok().and_then(|pkg| pkg.exports);

        match exports {
            Some(exports) => {
                let target = resolve_exports(&exports, subpath, CONDITIONS)?;
                self.try_file(&normalize_path(&pkg_dir.join(target)))
            },
            None if subpath == "." => self.try_dir(pkg_dir),
            None => self.resolve_path(&normalize_path(&pkg_dir.join(subpath))),
        }
    }
}
