//! package.json parsing, including the `ember-addon` metadata block

use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strata_core::{DependencyKind, StrataError};

use crate::ConfigResult;

/// The subset of package.json the resolver cares about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageJson {
    /// Package name
    #[serde(default)]
    pub name: String,

    /// Package version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Keywords, used to recognise ember packages and engines
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Main entry point
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    /// Module type (commonjs or module)
    #[serde(skip_serializing_if = "Option::is_none", rename = "type")]
    pub module_type: Option<String>,

    /// ES module exports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<serde_json::Value>,

    /// Runtime dependencies
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,

    /// Development dependencies
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: IndexMap<String, String>,

    /// Peer dependencies
    #[serde(default, rename = "peerDependencies")]
    pub peer_dependencies: IndexMap<String, String>,

    /// Optional dependencies
    #[serde(default, rename = "optionalDependencies")]
    pub optional_dependencies: IndexMap<String, String>,

    /// Per-peer metadata
    #[serde(default, rename = "peerDependenciesMeta")]
    pub peer_dependencies_meta: IndexMap<String, PeerDependencyMeta>,

    /// Ember package metadata
    #[serde(skip_serializing_if = "Option::is_none", rename = "ember-addon")]
    pub ember_addon: Option<AddonMeta>,
}

/// Entry of `peerDependenciesMeta`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerDependencyMeta {
    #[serde(default)]
    pub optional: bool,
}

/// The `ember-addon` block.
///
/// Only meaningful when `version` is 2; v1 packages use the same key for a
/// handful of build-time settings, of which only `paths` and `main` are read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddonMeta {
    /// Format version, 2 for v2 packages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    /// `addon` or `app`
    #[serde(skip_serializing_if = "Option::is_none", rename = "type")]
    pub kind: Option<String>,

    /// Set when the package was mechanically converted from the v1 format
    #[serde(default)]
    pub auto_upgraded: bool,

    /// v1 build hook file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    /// In-repo addon directories, relative to the package root
    #[serde(default)]
    pub paths: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lazy_loading: Option<LazyLoading>,

    #[serde(default)]
    pub implicit_modules: Vec<String>,

    #[serde(default)]
    pub implicit_test_modules: Vec<String>,

    #[serde(default)]
    pub implicit_scripts: Vec<String>,

    #[serde(default)]
    pub implicit_test_scripts: Vec<String>,

    #[serde(default)]
    pub implicit_styles: Vec<String>,

    #[serde(default)]
    pub implicit_test_styles: Vec<String>,

    /// Package-relative file to public URL path
    #[serde(default)]
    pub public_assets: IndexMap<String, String>,

    /// App-relative name to package-relative file
    #[serde(default)]
    pub app_js: IndexMap<String, String>,

    /// Same as `app_js`, only loaded under fastboot
    #[serde(default)]
    pub fastboot_js: IndexMap<String, String>,

    /// Runtime module name to real module name
    #[serde(default)]
    pub renamed_modules: IndexMap<String, String>,

    /// Runtime package name to real package name
    #[serde(default)]
    pub renamed_packages: IndexMap<String, String>,

    /// Specifiers left to the runtime loader
    #[serde(default)]
    pub externals: Vec<String>,

    /// Explicit ordering override among sibling addons
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i64>,
}

/// `lazy-loading` settings of an engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LazyLoading {
    #[serde(default)]
    pub enabled: bool,
}

/// The implicit-* lists of the metadata block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImplicitKind {
    Modules,
    TestModules,
    Scripts,
    TestScripts,
    Styles,
    TestStyles,
}

impl ImplicitKind {
    /// The metadata key for this list
    pub fn key(&self) -> &'static str {
        match self {
            ImplicitKind::Modules => "implicit-modules",
            ImplicitKind::TestModules => "implicit-test-modules",
            ImplicitKind::Scripts => "implicit-scripts",
            ImplicitKind::TestScripts => "implicit-test-scripts",
            ImplicitKind::Styles => "implicit-styles",
            ImplicitKind::TestStyles => "implicit-test-styles",
        }
    }
}

impl AddonMeta {
    /// One of the implicit-* lists
    pub fn implicit(&self, kind: ImplicitKind) -> &[String] {
        match kind {
            ImplicitKind::Modules => &self.implicit_modules,
            ImplicitKind::TestModules => &self.implicit_test_modules,
            ImplicitKind::Scripts => &self.implicit_scripts,
            ImplicitKind::TestScripts => &self.implicit_test_scripts,
            ImplicitKind::Styles => &self.implicit_styles,
            ImplicitKind::TestStyles => &self.implicit_test_styles,
        }
    }

    /// Check if this is a v2 metadata block
    pub fn is_v2(&self) -> bool {
        self.version == Some(2)
    }

    /// Check if lazy loading is switched on
    pub fn is_lazy(&self) -> bool {
        self.lazy_loading.as_ref().map(|l| l.enabled).unwrap_or(false)
    }
}

impl PackageJson {
    /// Declared dependencies of one section, in declaration order
    pub fn section(&self, kind: DependencyKind) -> &IndexMap<String, String> {
        match kind {
            DependencyKind::Normal => &self.dependencies,
            DependencyKind::Dev => &self.dev_dependencies,
            DependencyKind::Peer => &self.peer_dependencies,
            DependencyKind::Optional => &self.optional_dependencies,
        }
    }

    /// Check if the keyword list contains `keyword`
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }

    /// Check if a peer dependency was marked optional
    pub fn is_optional_peer(&self, name: &str) -> bool {
        self.peer_dependencies_meta
            .get(name)
            .map(|m| m.optional)
            .unwrap_or(false)
    }
}

/// Parse package.json content
pub fn parse_package_json(content: &str, path: &Utf8Path) -> ConfigResult<PackageJson> {
    serde_json::from_str(content).map_err(|e| StrataError::JsonParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read and parse a package.json file
pub fn read_package_json(path: &Utf8Path) -> ConfigResult<PackageJson> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| StrataError::io(format!("Failed to read {}", path), e))?;
    parse_package_json(&content, path)
}

/// Load package.json from file asynchronously
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<PackageJson> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StrataError::io(format!("Failed to read {}", path), e))?;
    parse_package_json(&content, path)
}
