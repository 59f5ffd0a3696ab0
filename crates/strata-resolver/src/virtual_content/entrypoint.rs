//! Engine entrypoints
//!
//! An entrypoint `define`s every module of an engine under the engine's
//! module prefix. Files come from the engine's merged app tree and, for the
//! app, from a walk of the app directory; app files win over addon files of
//! the same name. Route files matching `splitAtRoutes` move out into route
//! entrypoints that the runtime loads on demand.

use std::collections::{BTreeMap, HashSet};

use camino::Utf8Path;
use strata_config::{EngineConfig, ResolverOptions};
use strata_core::utils::{to_posix, without_extension};
use strata_core::StrataError;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use super::{VirtualContent, VirtualResponse, ENTRYPOINT, IMPLICIT_MODULES, VIRTUAL_MARKER};
use crate::resolver::{MergeEntry, Resolver};
use crate::{ResolverResult, MACROS_SPECIFIER};

/// What a file defines at runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    Component,
    ComponentTemplate,
    Helper,
    Modifier,
    /// A route, controller or route template, with its dotted route name
    Route { name: String },
    Other,
}

/// One module an entrypoint defines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppFile {
    /// Module name under the engine prefix, without extension
    pub logical: String,
    /// Specifier the define imports, relative to the engine root
    pub buildtime: String,
    pub kind: FileKind,
    pub fastboot_only: bool,
}

pub fn render(resolver: &Resolver, engine_root: &Utf8Path, route: Option<&String>) -> ResolverResult<VirtualContent> {
    let engine = resolver
        .engine_by_root(engine_root)
        .ok_or_else(|| StrataError::UnknownVirtualModule {
            specifier: engine_root.join(ENTRYPOINT).to_string(),
        })?;
    let is_app = resolver.is_app_engine(engine);
    let options = resolver.options();
    let prefix = if is_app { options.module_prefix.as_str() } else { engine.package_name.as_str() };

    let files = collect_files(resolver, engine, is_app)?;
    let defined: Vec<&AppFile> = files.values().filter(|f| !is_static(f, options)).collect();

    let mut bundles: BTreeMap<String, Vec<&AppFile>> = BTreeMap::new();
    let mut main: Vec<&AppFile> = Vec::new();
    for file in defined {
        match bundle_for(file, options) {
            Some(bundle) => bundles.entry(bundle).or_default().push(file),
            None => main.push(file),
        }
    }

    let mut src = format!(
        "import {{ importSync as i, macroCondition, getGlobalConfig }} from '{}';\nlet w = window;\nlet d = w.define;\n",
        MACROS_SPECIFIER
    );

    match route {
        Some(route) => {
            let bundle = bundles.get(route.as_str()).map(Vec::as_slice).unwrap_or_default();
            debug!(engine = %engine.package_name, route, files = bundle.len(), "rendering route entrypoint");
            push_defines(&mut src, prefix, bundle);
        },
        None => {
            debug!(engine = %engine.package_name, files = main.len(), bundles = bundles.len(), "rendering entrypoint");
            src.push_str(&format!(
                "\nimport implicitModules from \"./{}\";\nfor (const [name, module] of Object.entries(implicitModules)) {{\n  d(name, function() {{ return module; }});\n}}\n",
                IMPLICIT_MODULES
            ));
            if is_app {
                push_engines(&mut src, resolver);
            }
            push_defines(&mut src, prefix, &main);
            push_route_bundles(&mut src, engine_root, &bundles);
        },
    }

    Ok(VirtualContent {
        src,
        watches: vec![engine_root.to_path_buf()],
    })
}

/// Every module the engine defines, keyed by logical name
pub(crate) fn collect_files(
    resolver: &Resolver,
    engine: &EngineConfig,
    is_app: bool,
) -> ResolverResult<BTreeMap<String, AppFile>> {
    let options = resolver.options();
    let extensions = resolver.extensions();
    let mut files: BTreeMap<String, AppFile> = BTreeMap::new();

    if let Some(map) = resolver.merge_map(&engine.root)? {
        for (key, entry) in map.iter() {
            let logical = key.trim_start_matches("./").to_string();
            let (buildtime, fastboot_only) = match entry {
                MergeEntry::FastbootOnly(entry) => (entry.in_engine_name.clone(), true),
                MergeEntry::AppOnly(entry) | MergeEntry::Both { app_js: entry, .. } => {
                    (entry.in_engine_name.clone(), false)
                },
            };
            let kind = classify(&logical, options);
            files.insert(logical.clone(), AppFile { logical, buildtime, kind, fastboot_only });
        }
    }

    if !is_app {
        return Ok(files);
    }

    for (name, file) in &engine.fastboot_files {
        let logical = without_extension(name.trim_start_matches("./"), extensions).to_string();
        let kind = classify(&logical, options);
        files.insert(
            logical.clone(),
            AppFile {
                logical,
                buildtime: name.clone(),
                kind,
                fastboot_only: file.shadowed_filename.is_none(),
            },
        );
    }

    let walked = walk_app(resolver, engine)?;
    let by_logical = group_by_logical(&walked, extensions);
    for (logical, paths) in by_logical {
        let template = paths.iter().find(|p| p.ends_with(".hbs"));
        let script = paths.iter().find(|p| !p.ends_with(".hbs"));
        let kind = classify(&logical, options);

        let buildtime = match (&kind, template, script) {
            // colocated template: the class and its template bind through a pair
            (FileKind::Component, Some(hbs), js) => pair_specifier(engine, &logical, hbs, js.map(String::as_str)),
            (_, _, Some(js)) => format!("./{}", js),
            (_, Some(hbs), None) => format!("./{}", hbs),
            (_, None, None) => continue,
        };
        files.insert(logical.clone(), AppFile { logical, buildtime, kind, fastboot_only: false });
    }

    bind_template_components(&mut files, engine, &walked, extensions);
    Ok(files)
}

/// Classic `templates/components/x.hbs` layouts: `components/x` becomes a
/// pair of the template and the class, or a template-only component
fn bind_template_components(
    files: &mut BTreeMap<String, AppFile>,
    engine: &EngineConfig,
    walked: &[String],
    extensions: &[String],
) {
    for hbs in walked.iter().filter(|p| p.starts_with("templates/components/") && p.ends_with(".hbs")) {
        let name = without_extension(&hbs["templates/components/".len()..], extensions).to_string();
        let logical = format!("components/{}", name);

        let js = match files.get(&logical) {
            Some(existing) if existing.buildtime.contains(VIRTUAL_MARKER) => continue,
            Some(existing) => Some(existing.buildtime.trim_start_matches("./").to_string()),
            None => None,
        };
        let fastboot_only = files.get(&logical).map(|f| f.fastboot_only).unwrap_or(false);
        files.insert(
            logical.clone(),
            AppFile {
                buildtime: pair_specifier(engine, &logical, hbs, js.as_deref()),
                logical,
                kind: FileKind::Component,
                fastboot_only,
            },
        );
    }
}

fn pair_specifier(engine: &EngineConfig, logical: &str, hbs: &str, js: Option<&str>) -> String {
    let response = VirtualResponse::ComponentPair {
        engine_root: engine.root.clone(),
        hbs: format!("./{}", hbs),
        js: js.map(|js| format!("./{}", js)),
        debug_name: logical.trim_start_matches("components/").to_string(),
    };
    let id = response.id();
    format!(".{}", &id[engine.root.as_str().len()..])
}

fn group_by_logical(paths: &[String], extensions: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for path in paths {
        let logical = without_extension(path, extensions).to_string();
        grouped.entry(logical).or_default().push(path.clone());
    }
    grouped
}

/// Resolvable files of the app directory, sorted, relative to the root
fn walk_app(resolver: &Resolver, engine: &EngineConfig) -> ResolverResult<Vec<String>> {
    let options = resolver.options();
    let root = engine.root.as_path();

    let mut skipped: HashSet<String> = HashSet::new();
    for file in engine.fastboot_files.values() {
        skipped.insert(file.local_filename.trim_start_matches("./").to_string());
        if let Some(shadowed) = &file.shadowed_filename {
            skipped.insert(shadowed.trim_start_matches("./").to_string());
        }
    }
    let static_paths: Vec<&str> = options
        .static_app_paths
        .iter()
        .map(|p| p.trim_start_matches("./").trim_end_matches('/'))
        .collect();

    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(keep_entry);

    for entry in walker {
        let entry = entry.map_err(|e| StrataError::io(format!("Failed to walk {}", root), e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(relative) = Utf8Path::from_path(entry.path()).and_then(|p| p.strip_prefix(root).ok()) else {
            continue;
        };
        let relative = to_posix(relative.as_str());

        let file_name = relative.rsplit('/').next().unwrap_or(&relative);
        let is_static = static_paths
            .iter()
            .any(|p| relative == *p || relative.starts_with(&format!("{}/", p)));
        if relative == "package.json"
            || file_name.starts_with(VIRTUAL_MARKER)
            || skipped.contains(&relative)
            || is_static
            || without_extension(&relative, resolver.extensions()) == relative
        {
            continue;
        }
        found.push(relative);
    }

    Ok(found)
}

fn keep_entry(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    if name == "node_modules" || name == "tests" || name.starts_with('.') {
        return false;
    }
    !entry.path().join("package.json").is_file()
}

/// Classify a logical name the way the runtime resolver would look it up
pub fn classify(logical: &str, options: &ResolverOptions) -> FileKind {
    if let Some(pod_root) = pod_root(options) {
        if let Some(rest) = logical.strip_prefix(&format!("{}/", pod_root)) {
            if let Some((route, leaf)) = rest.rsplit_once('/') {
                if matches!(leaf, "route" | "controller" | "template") {
                    return FileKind::Route { name: route.replace('/', ".") };
                }
            }
        }
    }

    if logical.starts_with("templates/components/") {
        return FileKind::ComponentTemplate;
    }
    if logical.starts_with("components/") {
        return FileKind::Component;
    }
    if logical.starts_with("helpers/") {
        return FileKind::Helper;
    }
    if logical.starts_with("modifiers/") {
        return FileKind::Modifier;
    }
    for dir in ["routes/", "controllers/", "templates/"] {
        if let Some(rest) = logical.strip_prefix(dir) {
            return FileKind::Route { name: rest.replace('/', ".") };
        }
    }
    FileKind::Other
}

/// Pod directory relative to the module prefix
fn pod_root(options: &ResolverOptions) -> Option<String> {
    let pod = options.pod_module_prefix.as_deref()?;
    let relative = pod
        .strip_prefix(&format!("{}/", options.module_prefix))
        .unwrap_or(pod);
    Some(relative.trim_matches('/').to_string())
}

fn is_static(file: &AppFile, options: &ResolverOptions) -> bool {
    match file.kind {
        FileKind::Component | FileKind::ComponentTemplate => options.static_components,
        FileKind::Helper => options.static_helpers,
        FileKind::Modifier => options.static_modifiers,
        _ => false,
    }
}

/// Route bundle a file belongs to: the shortest ancestor route (or the route
/// itself) matching a split pattern
fn bundle_for(file: &AppFile, options: &ResolverOptions) -> Option<String> {
    let FileKind::Route { name } = &file.kind else {
        return None;
    };
    if options.split_at_routes.is_empty() {
        return None;
    }
    let segments: Vec<&str> = name.split('.').collect();
    (1..=segments.len())
        .map(|n| segments[..n].join("."))
        .find(|candidate| options.split_at_routes.iter().any(|p| p.matches(candidate)))
}

fn push_defines(src: &mut String, prefix: &str, files: &[&AppFile]) {
    let (fastboot, browser): (Vec<&&AppFile>, Vec<&&AppFile>) = files.iter().partition(|f| f.fastboot_only);

    if !browser.is_empty() {
        src.push('\n');
    }
    for file in browser {
        src.push_str(&define(prefix, file));
    }

    if !fastboot.is_empty() {
        src.push_str("\nif (macroCondition(getGlobalConfig().fastboot?.isRunning)) {\n");
        for file in fastboot {
            src.push_str("  ");
            src.push_str(&define(prefix, file));
        }
        src.push_str("}\n");
    }
}

fn define(prefix: &str, file: &AppFile) -> String {
    format!(
        "d({:?}, function() {{ return i({:?}); }});\n",
        format!("{}/{}", prefix, file.logical),
        file.buildtime
    )
}

fn push_engines(src: &mut String, resolver: &Resolver) {
    let nested: Vec<&EngineConfig> = resolver
        .options()
        .engines
        .iter()
        .filter(|e| !resolver.is_app_engine(e))
        .collect();
    if nested.is_empty() {
        return;
    }

    src.push('\n');
    for engine in nested.iter().filter(|e| !e.is_lazy) {
        src.push_str(&format!("i({:?});\n", format!("{}/{}", engine.package_name, ENTRYPOINT)));
    }

    let lazy: Vec<&&EngineConfig> = nested.iter().filter(|e| e.is_lazy).collect();
    if lazy.is_empty() {
        return;
    }
    src.push_str("w._strataEngineBundles_ = [\n");
    for engine in lazy {
        src.push_str(&format!(
            "  {{ names: [{:?}], load: function() {{ return import({:?}); }} }},\n",
            engine.package_name,
            format!("{}/{}", engine.package_name, ENTRYPOINT)
        ));
    }
    src.push_str("];\n");
}

fn push_route_bundles(src: &mut String, engine_root: &Utf8Path, bundles: &BTreeMap<String, Vec<&AppFile>>) {
    if bundles.is_empty() {
        return;
    }
    src.push_str("\nw._strataRouteBundles_ = [\n");
    for (route, files) in bundles {
        let mut names: Vec<&str> = files
            .iter()
            .filter_map(|f| match &f.kind {
                FileKind::Route { name } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        names.sort_unstable();
        names.dedup();

        let id = VirtualResponse::RouteEntrypoint {
            engine_root: engine_root.to_path_buf(),
            route: route.clone(),
        }
        .id();
        let relative = format!(".{}", &id[engine_root.as_str().len()..]);

        src.push_str(&format!(
            "  {{ names: {:?}, load: function() {{ return import({:?}); }} }},\n",
            names, relative
        ));
    }
    src.push_str("];\n");
}
