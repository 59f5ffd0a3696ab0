//! Rules applied after the host failed to resolve a request

use serde_json::Value;
use strata_config::{ActiveAddon, EngineConfig};
use strata_core::utils::{explicit_relative, is_relative, is_within, normalize_path, package_name, package_relative, without_extension};
use strata_core::StrataError;
use strata_packages::Package;
use tracing::debug;

use super::{is_ember_virtual_package, log_transition, MergeEntry, Resolver, RESOLVED_WITHIN_MOVED, WAS_MOVED_TO};
use crate::request::ModuleRequest;
use crate::virtual_content::VirtualResponse;
use crate::{ResolverResult, MACROS_SPECIFIER};

impl Resolver {
    /// Find another way to satisfy a request the host could not resolve.
    ///
    /// Returns the request unchanged when no rule applies.
    pub fn fallback_resolve(&self, request: ModuleRequest) -> ResolverResult<ModuleRequest> {
        if request.is_settled() || request.specifier() == MACROS_SPECIFIER {
            return Ok(request);
        }

        if request.meta(RESOLVED_WITHIN_MOVED) == Some(&Value::Bool(true)) {
            return Ok(log_transition("moved package target missing", &request, request.not_found()));
        }

        let restored = match request.meta(WAS_MOVED_TO) {
            Some(Value::String(moved_from)) => request.rehome(moved_from.as_str()),
            _ => request.clone(),
        };

        let Some(pkg) = self.packages.owning_package(restored.from_file()) else {
            debug!(from = %restored.from_file(), "no owning package");
            return Ok(request);
        };
        if !pkg.is_ember_package() {
            return Ok(request);
        }

        let next = match package_name(restored.specifier()) {
            Some(name) => self.fallback_bare(&restored, &pkg, name)?,
            None if is_relative(restored.specifier()) => self.fallback_relative(&restored, &pkg)?,
            None => None,
        };
        Ok(next.unwrap_or(request))
    }

    fn fallback_relative(&self, request: &ModuleRequest, pkg: &Package) -> ResolverResult<Option<ModuleRequest>> {
        let target = normalize_path(&request.from_dir().join(request.specifier()));

        if let Some(engine) = self.engine_by_name(pkg.name()).or_else(|| self.engine_by_root(pkg.root())) {
            if is_within(&target, &engine.root) {
                let in_engine = explicit_relative(&engine.root, &target);
                if let Some(next) = self.search_app_tree(request, engine, &in_engine)? {
                    return Ok(Some(log_transition("app tree merge", request, next)));
                }
            }
            return Ok(None);
        }

        let Some((engine, in_app_name)) = self.reverse_search_app_tree(pkg, request) else {
            return Ok(None);
        };
        let logical = normalize_path(&engine.root.join(&in_app_name));
        let dir = logical.parent().unwrap_or(&engine.root);
        let target = normalize_path(&dir.join(request.specifier()));

        if !is_within(&target, &engine.root) {
            return Err(StrataError::AppTreeEscape {
                file: request.from_file().to_path_buf(),
                specifier: request.specifier().to_string(),
                engine_root: engine.root.clone(),
            });
        }
        let engine_pkg = self.packages.get(&engine.root)?;
        if engine_pkg.package_json().exports.is_some() {
            return Err(StrataError::EngineExportsRelativeImport {
                engine: engine.package_name.clone(),
                specifier: request.specifier().to_string(),
            });
        }

        let next = request
            .alias(explicit_relative(&engine.root, &target))
            .rehome(engine.root.join("package.json"));
        Ok(Some(log_transition("relative import from app-js file", request, next)))
    }

    fn fallback_bare(&self, request: &ModuleRequest, pkg: &Package, name: &str) -> ResolverResult<Option<ModuleRequest>> {
        if let Some(addon) = self.locate_active_addon(pkg, name) {
            let next = request.rehome(addon.can_resolve_from_file.clone());
            if &next != request {
                return Ok(Some(log_transition("active addon", request, next)));
            }
        }

        if let Some(engine) = self.engine_by_name(name) {
            if let Some(in_engine) = package_relative(request.specifier(), name) {
                if let Some(next) = self.search_app_tree(request, engine, &in_engine)? {
                    return Ok(Some(log_transition("engine app tree", request, next)));
                }
            }
        }

        if let Some((engine, in_app_name)) = self.reverse_search_app_tree(pkg, request) {
            let next = request.rehome(normalize_path(&engine.root.join(&in_app_name)));
            if &next != request {
                return Ok(Some(log_transition("bare import from app-js file", request, next)));
            }
        }

        if pkg.is_auto_upgraded() || is_ember_virtual_package(name, &self.ember_version) {
            let next = request.virtualize(VirtualResponse::External {
                specifier: request.specifier().to_string(),
            });
            return Ok(Some(log_transition("external", request, next)));
        }

        Ok(None)
    }

    /// Look a name up in an engine's merge map
    fn search_app_tree(
        &self,
        request: &ModuleRequest,
        engine: &EngineConfig,
        in_engine: &str,
    ) -> ResolverResult<Option<ModuleRequest>> {
        let Some(map) = self.merge_map(&engine.root)? else {
            return Ok(None);
        };
        let key = without_extension(in_engine, self.extensions());

        let next = match map.get(key, self.extensions()) {
            None => return Ok(None),
            Some(MergeEntry::AppOnly(entry)) | Some(MergeEntry::FastbootOnly(entry)) => request
                .alias(entry.local_path.clone())
                .rehome(entry.package_root.join("package.json")),
            Some(MergeEntry::Both { app_js, .. }) => {
                let (names, has_default) = self.read_exports(&app_js.package_root.join(&app_js.local_path))?;
                request.virtualize(VirtualResponse::FastbootSwitch {
                    target: normalize_path(&engine.root.join(key)),
                    names,
                    has_default,
                })
            },
        };
        Ok(Some(next))
    }

    /// The engine an addon file was placed into, and its in-engine name
    fn reverse_search_app_tree(&self, pkg: &Package, request: &ModuleRequest) -> Option<(&EngineConfig, String)> {
        let meta = pkg.meta()?;
        let relative = explicit_relative(pkg.root(), request.from_file());
        let relative = without_extension(&relative, self.extensions());

        for engine in &self.options.engines {
            let is_member = engine.active_addons.iter().any(|a| a.root == pkg.root())
                || (!self.is_app_engine(engine) && engine.root == pkg.root());
            if !is_member {
                continue;
            }
            let placed = meta
                .app_js
                .iter()
                .chain(meta.fastboot_js.iter())
                .find(|(_, local)| without_extension(local, self.extensions()) == relative);
            if let Some((in_app_name, _)) = placed {
                return Some((engine, in_app_name.clone()));
            }
        }
        None
    }

    /// Active addon called `name`, looking first in the engines `pkg` is part of
    fn locate_active_addon(&self, pkg: &Package, name: &str) -> Option<&ActiveAddon> {
        let in_engine = |engine: &&EngineConfig| {
            engine.root == pkg.root() || engine.active_addons.iter().any(|a| a.root == pkg.root())
        };
        let owning = self.options.engines.iter().filter(in_engine);
        let others = self.options.engines.iter().filter(|e| !in_engine(e));

        owning
            .chain(others)
            .flat_map(|engine| engine.active_addons.iter())
            .find(|addon| addon.name == name)
    }
}
