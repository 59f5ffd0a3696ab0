//! Merged view of the app-js and fastboot-js trees an engine's addons
//! contribute into the engine's namespace

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use strata_config::EngineConfig;
use strata_core::utils::without_extension;
use strata_core::StrataError;
use strata_packages::PackageLookup;

use crate::ResolverResult;

/// A file an addon places into an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppJsEntry {
    /// Name inside the engine as declared, e.g. `./components/widget.js`
    pub in_engine_name: String,
    /// Path inside the addon, e.g. `./addon/components/widget.js`
    pub local_path: String,
    pub package_root: Utf8PathBuf,
    pub package_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeEntry {
    AppOnly(AppJsEntry),
    FastbootOnly(AppJsEntry),
    Both {
        app_js: AppJsEntry,
        fastboot_js: AppJsEntry,
    },
}

impl MergeEntry {
    /// The browser-side file, if any
    pub fn app_js(&self) -> Option<&AppJsEntry> {
        match self {
            MergeEntry::AppOnly(entry) | MergeEntry::Both { app_js: entry, .. } => Some(entry),
            MergeEntry::FastbootOnly(_) => None,
        }
    }

    /// Some file of the entry, preferring the browser side
    pub fn any(&self) -> &AppJsEntry {
        match self {
            MergeEntry::AppOnly(entry) | MergeEntry::FastbootOnly(entry) => entry,
            MergeEntry::Both { app_js, .. } => app_js,
        }
    }
}

/// Keys are in-engine names starting with `./`, extensions stripped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeMap {
    entries: IndexMap<String, MergeEntry>,
}

impl MergeMap {
    /// Build the map for `engine`.
    ///
    /// `own_root` is the engine's own package for nested engines; its files
    /// come first. Active addons follow in search order and the first package
    /// to provide a name wins.
    pub fn build(
        engine: &EngineConfig,
        own_root: Option<&Utf8Path>,
        packages: &dyn PackageLookup,
        extensions: &[String],
    ) -> ResolverResult<Self> {
        let mut map = MergeMap::default();
        let roots = own_root
            .into_iter()
            .chain(engine.active_addons.iter().map(|a| a.root.as_path()));

        for root in roots {
            let pkg = packages.get(root)?;
            let Some(meta) = pkg.meta() else {
                continue;
            };

            let mut own: IndexMap<String, MergeEntry> = IndexMap::new();
            for (in_engine, local) in &meta.app_js {
                let key = entry_key(in_engine, pkg.name(), extensions)?;
                own.insert(key, MergeEntry::AppOnly(entry(in_engine, local, pkg.root(), pkg.name())));
            }
            for (in_engine, local) in &meta.fastboot_js {
                let key = entry_key(in_engine, pkg.name(), extensions)?;
                let fastboot = entry(in_engine, local, pkg.root(), pkg.name());
                let merged = match own.shift_remove(&key) {
                    Some(MergeEntry::AppOnly(app_js)) => MergeEntry::Both {
                        app_js,
                        fastboot_js: fastboot,
                    },
                    Some(existing) => existing,
                    None => MergeEntry::FastbootOnly(fastboot),
                };
                own.insert(key, merged);
            }

            for (key, value) in own {
                map.entries.entry(key).or_insert(value);
            }
        }

        Ok(map)
    }

    /// Entry for an in-engine name, with or without extension
    pub fn get(&self, in_engine_name: &str, extensions: &[String]) -> Option<&MergeEntry> {
        self.entries
            .get(in_engine_name)
            .or_else(|| self.entries.get(without_extension(in_engine_name, extensions)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MergeEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entry(in_engine: &str, local: &str, root: &Utf8Path, name: &str) -> AppJsEntry {
    AppJsEntry {
        in_engine_name: in_engine.to_string(),
        local_path: local.to_string(),
        package_root: root.to_path_buf(),
        package_name: name.to_string(),
    }
}

fn entry_key(in_engine: &str, package: &str, extensions: &[String]) -> ResolverResult<String> {
    if !in_engine.starts_with("./") {
        return Err(StrataError::config(
            "app-js",
            format!("{} declares {:?}; app-js names must start with ./", package, in_engine),
        ));
    }
    Ok(without_extension(in_engine, extensions).to_string())
}
