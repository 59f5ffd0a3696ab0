//! Rules applied before the host resolves a request

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::json;
use strata_core::utils::{
    explicit_relative, is_relative, is_within, normalize_path, package_name, package_relative, without_extension,
};
use strata_core::StrataError;
use strata_packages::Package;
use tracing::debug;

use super::{
    is_ember_virtual_package, log_transition, Resolver, RESOLVED_WITHIN_MOVED, VIRTUAL_NAMESPACE, VIRTUAL_PEER_DEPS,
    WAS_MOVED_TO,
};
use crate::host::exports::{resolve_exports, CONDITIONS};
use crate::request::ModuleRequest;
use crate::virtual_content::{VendorKind, VirtualResponse};
use crate::{ResolverResult, MACROS_SPECIFIER};

/// File the moved-package rule rehomes requests to; it never exists
const MOVED_PACKAGE_TARGET: &str = "moved-package-target.js";

impl Resolver {
    /// Rewrite a request before the host sees it
    pub fn before_resolve(&self, request: ModuleRequest) -> ResolverResult<ModuleRequest> {
        if request.is_settled() || request.specifier() == MACROS_SPECIFIER {
            return Ok(request);
        }

        let request = self.handle_fastboot_switch(request)?;
        let request = self.handle_virtual_specifier(request)?;
        let request = self.handle_renaming(request)?;
        let request = self.generate_fastboot_switch(request)?;
        let request = self.pre_handle_external(request)?;
        self.handle_moved_packages(request)
    }

    /// `./fastboot` and `./browser` imports made by a fastboot switch
    fn handle_fastboot_switch(&self, request: ModuleRequest) -> ResolverResult<ModuleRequest> {
        let Some(VirtualResponse::FastbootSwitch { target, .. }) = VirtualResponse::decode(request.from_file().as_str())?
        else {
            return Ok(request);
        };
        let fastboot = match request.specifier() {
            "./fastboot" => true,
            "./browser" => false,
            _ => return Ok(request),
        };

        let Some(engine) = self.engine_for_file(&target) else {
            return Ok(request);
        };
        let key = explicit_relative(&engine.root, &target);
        let switch_dir = request.from_dir().to_path_buf();

        if self.is_app_engine(engine) {
            let found = engine
                .fastboot_files
                .iter()
                .find(|(name, _)| without_extension(name, self.extensions()) == key);
            if let Some((_, file)) = found {
                let local = if fastboot {
                    Some(&file.local_filename)
                } else {
                    file.shadowed_filename.as_ref()
                };
                if let Some(local) = local {
                    let specifier = explicit_relative(&switch_dir, &engine.root.join(local));
                    return Ok(log_transition("fastboot switch into app", &request, request.alias(specifier)));
                }
            }
        }

        if let Some(map) = self.merge_map(&engine.root)? {
            if let Some(super::MergeEntry::Both { app_js, fastboot_js }) = map.get(&key, self.extensions()) {
                let entry = if fastboot { fastboot_js } else { app_js };
                let next = request
                    .alias(entry.local_path.clone())
                    .rehome(entry.package_root.join("package.json"));
                return Ok(log_transition("fastboot switch into addon", &request, next));
            }
        }

        Ok(request)
    }

    /// Named virtual modules and path-shaped virtual ids
    fn handle_virtual_specifier(&self, request: ModuleRequest) -> ResolverResult<ModuleRequest> {
        if request.is_settled() {
            return Ok(request);
        }

        if let Some(name) = request.specifier().strip_prefix(VIRTUAL_NAMESPACE) {
            let response = self.named_virtual(name, &request)?;
            return Ok(log_transition("named virtual module", &request, request.virtualize(response)));
        }

        if !VirtualResponse::is_virtual_id(request.specifier()) {
            return Ok(request);
        }
        let Some(id) = self.virtual_candidate(&request)? else {
            return Ok(request);
        };
        match VirtualResponse::decode(&id)? {
            Some(response) => Ok(log_transition("virtual id", &request, request.virtualize(response))),
            None => Ok(request),
        }
    }

    fn named_virtual(&self, name: &str, request: &ModuleRequest) -> ResolverResult<VirtualResponse> {
        let app_root = self.options.app_root.clone();
        let owner_root = || {
            self.packages
                .owning_package(request.from_file())
                .map(|pkg| pkg.root().to_path_buf())
                .unwrap_or_else(|| app_root.clone())
        };

        let response = match name {
            "entrypoint" => VirtualResponse::Entrypoint {
                engine_root: self
                    .engine_for_file(request.from_file())
                    .map(|e| e.root.clone())
                    .unwrap_or_else(|| app_root.clone()),
            },
            "implicit-modules" => VirtualResponse::ImplicitModules {
                package_root: owner_root(),
                test: false,
            },
            "implicit-test-modules" => VirtualResponse::ImplicitModules {
                package_root: owner_root(),
                test: true,
            },
            "vendor.js" => vendor(app_root.clone(), VendorKind::Scripts),
            "vendor.css" => vendor(app_root.clone(), VendorKind::Styles),
            "test-support.js" => vendor(app_root.clone(), VendorKind::TestScripts),
            "test-support.css" => vendor(app_root.clone(), VendorKind::TestStyles),
            _ => {
                return Err(StrataError::UnknownVirtualModule {
                    specifier: request.specifier().to_string(),
                })
            },
        };
        Ok(response)
    }

    /// Absolute form of a specifier that names a virtual file
    fn virtual_candidate(&self, request: &ModuleRequest) -> ResolverResult<Option<String>> {
        let specifier = request.specifier();
        let (path, query) = match specifier.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (specifier, None),
        };
        let with_query = |path: Utf8PathBuf| match query {
            Some(query) => format!("{}?{}", path, query),
            None => path.to_string(),
        };

        if path.starts_with('/') {
            return Ok(Some(specifier.to_string()));
        }
        if is_relative(path) {
            return Ok(Some(with_query(normalize_path(&request.from_dir().join(path)))));
        }

        let Some(name) = package_name(path) else {
            return Ok(None);
        };
        let rest = path[name.len()..].trim_start_matches('/');

        let root = if let Some(engine) = self.engine_by_name(name) {
            engine.root.clone()
        } else {
            let Some(owner) = self.packages.owning_package(request.from_file()) else {
                return Ok(None);
            };
            if owner.name() == name {
                owner.root().to_path_buf()
            } else {
                match self.packages.resolve(name, &owner) {
                    Ok(target) => target.root().to_path_buf(),
                    Err(e) if e.is_not_found() => return Ok(None),
                    Err(e) => return Err(e),
                }
            }
        };
        Ok(Some(with_query(root.join(rest))))
    }

    fn handle_renaming(&self, request: ModuleRequest) -> ResolverResult<ModuleRequest> {
        if request.is_settled() {
            return Ok(request);
        }
        let specifier = request.specifier();
        let Some(name) = package_name(specifier) else {
            return Ok(request);
        };

        for (candidate, replacement) in &self.options.rename_modules {
            if candidate == specifier || self.is_rename_candidate(candidate, specifier) {
                let next = request.alias(replacement.clone());
                return Ok(log_transition("renameModules", &request, next));
            }
        }

        if let Some(replacement) = self.options.rename_packages.get(name) {
            let renamed = format!("{}{}", replacement, &specifier[name.len()..]);
            let next = request.alias(renamed);
            return Ok(log_transition("renamePackages", &request, next));
        }

        let Some(pkg) = self.packages.owning_package(request.from_file()) else {
            return Ok(request);
        };
        if !pkg.is_v2_ember_package() || !self.is_self_name(&pkg, name) {
            return Ok(request);
        }
        let Some(subpath) = package_relative(specifier, name) else {
            return Ok(request);
        };
        let manifest = pkg.root().join("package.json");

        if let Some(exports) = &pkg.package_json().exports {
            if let Some(target) = resolve_exports(exports, &subpath, CONDITIONS) {
                let next = request.alias(target).rehome(manifest);
                return Ok(log_transition("v2 self-import with package.json exports", &request, next));
            }
            return Ok(request);
        }

        if pkg.is_auto_upgraded() || pkg.is_app() {
            let next = request.alias(subpath).rehome(manifest);
            return Ok(log_transition("self-import", &request, next));
        }

        Ok(request)
    }

    /// `renameModules` keys may carry the extension or `/index` the
    /// specifier leaves off
    fn is_rename_candidate(&self, candidate: &str, specifier: &str) -> bool {
        let Some(rest) = candidate.strip_prefix(specifier) else {
            return false;
        };
        self.extensions()
            .iter()
            .any(|ext| rest == ext.as_str() || rest.strip_prefix("/index") == Some(ext.as_str()))
    }

    fn is_self_name(&self, pkg: &Package, name: &str) -> bool {
        pkg.name() == name || (pkg.is_app() && self.options.module_prefix == name)
    }

    /// Relative imports of app files that have a fastboot replacement
    fn generate_fastboot_switch(&self, request: ModuleRequest) -> ResolverResult<ModuleRequest> {
        if request.is_settled() || !is_relative(request.specifier()) {
            return Ok(request);
        }
        let app = self.app_engine()?;
        if app.fastboot_files.is_empty() {
            return Ok(request);
        }
        match self.packages.owning_package(request.from_file()) {
            Some(owner) if owner.root() == app.root => {},
            _ => return Ok(request),
        }

        let target = normalize_path(&request.from_dir().join(request.specifier()));
        if !is_within(&target, &app.root) {
            return Ok(request);
        }
        let key = explicit_relative(&app.root, &target);
        let stem = without_extension(&key, self.extensions()).to_string();
        let Some((_, file)) = app
            .fastboot_files
            .iter()
            .find(|(name, _)| without_extension(name, self.extensions()) == stem)
        else {
            return Ok(request);
        };

        let switch_target = normalize_path(&app.root.join(&stem));
        match &file.shadowed_filename {
            Some(shadowed) => {
                if let Some(VirtualResponse::FastbootSwitch { target, .. }) =
                    VirtualResponse::decode(request.from_file().as_str())?
                {
                    if target == switch_target {
                        return Ok(request);
                    }
                }
                let (names, has_default) = self.read_exports(&app.root.join(shadowed))?;
                let next = request.virtualize(VirtualResponse::FastbootSwitch {
                    target: switch_target,
                    names,
                    has_default,
                });
                Ok(log_transition("shadowed app fastboot", &request, next))
            },
            None => {
                let next = request
                    .alias(file.local_filename.clone())
                    .rehome(app.root.join("package.json"));
                Ok(log_transition("unshadowed app fastboot", &request, next))
            },
        }
    }

    /// Explicit externals, virtual peer dependencies and the strict
    /// dependency check for native v2 addons
    fn pre_handle_external(&self, request: ModuleRequest) -> ResolverResult<ModuleRequest> {
        if request.is_settled() {
            return Ok(request);
        }
        let Some(pkg) = self.packages.owning_package(request.from_file()) else {
            return Ok(request);
        };
        if !pkg.is_v2_ember_package() {
            return Ok(request);
        }
        let specifier = request.specifier();

        let Some(name) = package_name(specifier) else {
            if !is_relative(specifier) {
                return Ok(request);
            }
            let absolute = normalize_path(&request.from_dir().join(specifier));
            if !is_within(&absolute, pkg.root()) {
                debug!(specifier, from = %request.from_file(), "relative import leaves its package");
                return Ok(request);
            }
            let relative = explicit_relative(pkg.root(), &absolute);
            if is_explicit_external(&pkg, &relative) {
                let public = format!("{}{}", pkg.name(), relative.trim_start_matches('.'));
                let next = request.virtualize(VirtualResponse::External { specifier: public });
                return Ok(log_transition("relative external", &request, next));
            }
            return Ok(request);
        };

        if is_explicit_external(&pkg, specifier) {
            let next = request.virtualize(VirtualResponse::External {
                specifier: specifier.to_string(),
            });
            return Ok(log_transition("explicit external", &request, next));
        }

        if VIRTUAL_PEER_DEPS.contains(&name) && !pkg.is_app() && !pkg.has_dependency(name) {
            let next = request.rehome(self.options.app_root.join("package.json"));
            return Ok(log_transition("virtual peer dependency", &request, next));
        }

        if pkg.is_native_v2() && !self.is_reliably_resolvable(&pkg, name) {
            return Err(StrataError::UndeclaredDependency {
                package: pkg.name().to_string(),
                specifier: name.to_string(),
            });
        }

        Ok(request)
    }

    fn is_reliably_resolvable(&self, pkg: &Package, name: &str) -> bool {
        pkg.name() == name
            || pkg.has_dependency(name)
            || VIRTUAL_PEER_DEPS.contains(&name)
            || is_ember_virtual_package(name, &self.ember_version)
    }

    /// Requests into and out of relocated packages
    fn handle_moved_packages(&self, request: ModuleRequest) -> ResolverResult<ModuleRequest> {
        if request.is_settled() {
            return Ok(request);
        }
        let Some(requesting) = self.packages.owning_package(request.from_file()) else {
            return Ok(request);
        };
        let Some(name) = package_name(request.specifier()) else {
            return Ok(request);
        };

        if name != requesting.name() {
            let target = match self.packages.resolve(name, &requesting) {
                Ok(target) => Some(target),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            };
            if let Some(target) = target.filter(|t| self.packages.original(t).is_some()) {
                let from = moved_package_target(target.root(), target.name());
                let rehomed = request.rehome(from);
                if rehomed == request {
                    return Ok(request);
                }
                let next = rehomed
                    .with_meta(RESOLVED_WITHIN_MOVED, json!(true))
                    .with_meta("originalFromFile", json!(request.from_file().as_str()));
                return Ok(log_transition("request targets a moved package", &request, next));
            }
        }

        if let Some(original) = self.packages.original(&requesting) {
            if is_within(request.from_file(), original.root()) {
                return Ok(request);
            }
            let next = request
                .with_meta(WAS_MOVED_TO, json!(request.from_file().as_str()))
                .rehome(original.root().join("package.json"));
            return Ok(log_transition("outbound request from moved package", &request, next));
        }

        Ok(request)
    }
}

fn vendor(app_root: Utf8PathBuf, kind: VendorKind) -> VirtualResponse {
    VirtualResponse::Vendor { app_root, kind }
}

fn is_explicit_external(pkg: &Package, specifier: &str) -> bool {
    pkg.meta()
        .map(|meta| meta.externals.iter().any(|e| e == specifier))
        .unwrap_or(false)
}

/// A file from which node-style lookup finds the relocated package at `root`
fn moved_package_target(root: &Utf8Path, name: &str) -> Utf8PathBuf {
    let levels = if name.starts_with('@') { "../../.." } else { "../.." };
    normalize_path(&root.join(levels).join(MOVED_PACKAGE_TARGET))
}
