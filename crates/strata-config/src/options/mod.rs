//! Resolver options file parsing and validation
//!
//! The build writes one JSON document describing the app, its engines and the
//! active addons of each engine. Everything the resolver needs at runtime
//! comes from here; the package graph is only consulted for metadata.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strata_core::utils::normalize_path;
use strata_core::StrataError;

use crate::ConfigResult;

/// Extensions tried, in order, when a specifier has none
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".mjs", ".gjs", ".js", ".mts", ".gts", ".ts", ".hbs", ".hbs.js", ".json",
];

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

/// Complete resolver options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverOptions {
    /// Module specifier to replacement specifier
    #[serde(default)]
    pub rename_modules: IndexMap<String, String>,

    /// Package name to replacement package name
    #[serde(default)]
    pub rename_packages: IndexMap<String, String>,

    #[serde(default = "default_extensions")]
    pub resolvable_extensions: Vec<String>,

    pub app_root: Utf8PathBuf,

    /// The app first, then every nested engine
    pub engines: Vec<EngineConfig>,

    pub module_prefix: String,

    #[serde(default)]
    pub split_at_routes: Vec<RoutePattern>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_module_prefix: Option<String>,

    /// App paths excluded from the entrypoint
    #[serde(default)]
    pub static_app_paths: Vec<String>,

    /// Version of ember-source in use
    pub ember_version: String,

    #[serde(default)]
    pub static_components: bool,

    #[serde(default)]
    pub static_helpers: bool,

    #[serde(default)]
    pub static_modifiers: bool,
}

/// One static resolution boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub package_name: String,
    pub root: Utf8PathBuf,
    /// Search order: earlier addons win
    #[serde(default)]
    pub active_addons: Vec<ActiveAddon>,
    /// App-relative name to fastboot replacement
    #[serde(default)]
    pub fastboot_files: IndexMap<String, FastbootFile>,
    #[serde(default)]
    pub is_lazy: bool,
}

/// An addon active within an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAddon {
    pub name: String,
    pub root: Utf8PathBuf,
    /// A file from which `name` resolves to `root`
    pub can_resolve_from_file: Utf8PathBuf,
}

/// Fastboot replacement for an app file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FastbootFile {
    pub local_filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadowed_filename: Option<String>,
}

/// Route name matcher for bundle splitting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RoutePatternRepr", into = "RoutePatternRepr")]
pub enum RoutePattern {
    Exact(String),
    Regex(Regex),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RoutePatternRepr {
    Exact(String),
    Regex { regex: String },
}

impl TryFrom<RoutePatternRepr> for RoutePattern {
    type Error = regex::Error;

    fn try_from(repr: RoutePatternRepr) -> Result<Self, Self::Error> {
        match repr {
            RoutePatternRepr::Exact(name) => Ok(RoutePattern::Exact(name)),
            RoutePatternRepr::Regex { regex } => Regex::new(&regex).map(RoutePattern::Regex),
        }
    }
}

impl From<RoutePattern> for RoutePatternRepr {
    fn from(pattern: RoutePattern) -> Self {
        match pattern {
            RoutePattern::Exact(name) => RoutePatternRepr::Exact(name),
            RoutePattern::Regex(re) => RoutePatternRepr::Regex {
                regex: re.as_str().to_string(),
            },
        }
    }
}

impl RoutePattern {
    /// Check if a dotted route name matches
    pub fn matches(&self, route: &str) -> bool {
        match self {
            RoutePattern::Exact(name) => name == route,
            RoutePattern::Regex(re) => re.is_match(route),
        }
    }
}

impl ResolverOptions {
    /// Options for an app with no renames, default extensions and no engines
    /// besides the app itself
    pub fn for_app(app_root: impl Into<Utf8PathBuf>, module_prefix: &str, ember_version: &str) -> Self {
        let app_root = app_root.into();
        Self {
            rename_modules: IndexMap::new(),
            rename_packages: IndexMap::new(),
            resolvable_extensions: default_extensions(),
            engines: vec![EngineConfig {
                package_name: module_prefix.to_string(),
                root: app_root.clone(),
                active_addons: Vec::new(),
                fastboot_files: IndexMap::new(),
                is_lazy: false,
            }],
            app_root,
            module_prefix: module_prefix.to_string(),
            split_at_routes: Vec::new(),
            pod_module_prefix: None,
            static_app_paths: Vec::new(),
            ember_version: ember_version.to_string(),
            static_components: false,
            static_helpers: false,
            static_modifiers: false,
        }
    }

    /// Parsed `emberVersion`
    pub fn ember_version(&self) -> ConfigResult<semver::Version> {
        semver::Version::parse(&self.ember_version)
            .map_err(|e| StrataError::config("emberVersion", e.to_string()))
    }

    /// The app engine
    pub fn app_engine(&self) -> Option<&EngineConfig> {
        self.engines.first()
    }

    /// Resolve relative roots against `base` and normalize every path
    pub fn absolutize(&mut self, base: &Utf8Path) {
        let fix = |p: &Utf8Path| -> Utf8PathBuf {
            if p.is_absolute() {
                normalize_path(p)
            } else {
                normalize_path(&base.join(p))
            }
        };

        self.app_root = fix(&self.app_root);
        for engine in &mut self.engines {
            engine.root = fix(&engine.root);
            for addon in &mut engine.active_addons {
                addon.root = fix(&addon.root);
                addon.can_resolve_from_file = fix(&addon.can_resolve_from_file);
            }
        }
    }

    /// Validate the options; every failure here is fatal
    pub fn validate(&self) -> ConfigResult<()> {
        let app_engine = self
            .app_engine()
            .ok_or_else(|| StrataError::config("engines", "at least one engine (the app) is required"))?;

        if normalize_path(&app_engine.root) != normalize_path(&self.app_root) {
            return Err(StrataError::config(
                "engines",
                format!(
                    "the first engine must be the app at {}, found {}",
                    self.app_root, app_engine.root
                ),
            ));
        }

        if self.module_prefix.is_empty() {
            return Err(StrataError::config("modulePrefix", "must not be empty"));
        }

        self.ember_version()?;

        for ext in &self.resolvable_extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(StrataError::config(
                    "resolvableExtensions",
                    format!("'{}' must start with a dot", ext),
                ));
            }
        }

        for (from, to) in self.rename_modules.iter().chain(self.rename_packages.iter()) {
            if from.is_empty() || to.is_empty() {
                return Err(StrataError::config(
                    "renameModules",
                    "rename entries must have non-empty names",
                ));
            }
        }

        for engine in &self.engines {
            if engine.package_name.is_empty() {
                return Err(StrataError::config(
                    "engines",
                    format!("engine at {} has no packageName", engine.root),
                ));
            }
        }

        Ok(())
    }
}

/// Parse and validate resolver options
pub fn parse_resolver_options(content: &str, path: &Utf8Path) -> ConfigResult<ResolverOptions> {
    let options: ResolverOptions = serde_json::from_str(content).map_err(|e| StrataError::JsonParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    options.validate()?;
    Ok(options)
}
