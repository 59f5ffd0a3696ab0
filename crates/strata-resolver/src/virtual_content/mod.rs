//! Virtual modules: ids, decoding and content generation
//!
//! Every [`VirtualResponse`] encodes to a path-shaped id under the package or
//! engine it belongs to, so relative imports inside generated code resolve
//! against that directory. Content is a pure function of the response and
//! the package graph; generating it twice yields the same bytes.

mod entrypoint;
mod implicit_modules;
mod shims;
mod vendor;

use camino::{Utf8Path, Utf8PathBuf};
use strata_core::StrataError;

use crate::resolver::Resolver;
use crate::ResolverResult;

pub use entrypoint::{AppFile, FileKind};
pub use shims::describe_exports;

/// Prefix shared by every virtual file name
pub const VIRTUAL_MARKER: &str = "-strata-";

/// Path prefix of externalized module shims
pub const EXTERNAL_PREFIX: &str = "/@strata/external/";

const ENTRYPOINT: &str = "-strata-entrypoint.js";
const ROUTE_ENTRYPOINT: &str = "-strata-route-entrypoint.js";
const IMPLICIT_MODULES: &str = "-strata-implicit-modules.js";
const IMPLICIT_TEST_MODULES: &str = "-strata-implicit-test-modules.js";
const VENDOR_JS: &str = "-strata-vendor.js";
const VENDOR_STYLES: &str = "-strata-vendor-styles.css";
const TEST_SUPPORT_JS: &str = "-strata-test-support.js";
const TEST_SUPPORT_STYLES: &str = "-strata-test-support-styles.css";
const FASTBOOT_SWITCH: &str = "-strata-fastboot-switch.js";
const COMPONENT_PAIR: &str = "-strata-component-pair.js";

/// The four concatenated asset bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VendorKind {
    Scripts,
    Styles,
    TestScripts,
    TestStyles,
}

impl VendorKind {
    fn file_name(&self) -> &'static str {
        match self {
            VendorKind::Scripts => VENDOR_JS,
            VendorKind::Styles => VENDOR_STYLES,
            VendorKind::TestScripts => TEST_SUPPORT_JS,
            VendorKind::TestStyles => TEST_SUPPORT_STYLES,
        }
    }
}

/// A module with no file on disk
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VirtualResponse {
    /// Defines every module of an engine
    Entrypoint { engine_root: Utf8PathBuf },
    /// Defines the modules of one split route bundle
    RouteEntrypoint {
        engine_root: Utf8PathBuf,
        route: String,
    },
    /// Aggregates the implicit modules of a package's dependencies
    ImplicitModules {
        package_root: Utf8PathBuf,
        test: bool,
    },
    /// Concatenated implicit scripts or styles of the app's addons
    Vendor {
        app_root: Utf8PathBuf,
        kind: VendorKind,
    },
    /// Picks the fastboot or browser flavour of a module at runtime
    FastbootSwitch {
        /// Logical module path, without extension
        target: Utf8PathBuf,
        names: Vec<String>,
        has_default: bool,
    },
    /// Binds a template to a component class
    ComponentPair {
        engine_root: Utf8PathBuf,
        hbs: String,
        js: Option<String>,
        debug_name: String,
    },
    /// A module left to the runtime loader
    External { specifier: String },
}

/// Generated source plus the files whose change invalidates it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualContent {
    pub src: String,
    pub watches: Vec<Utf8PathBuf>,
}

fn encode_query(pairs: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn query_value(query: &str, key: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn unknown(id: &str) -> StrataError {
    StrataError::UnknownVirtualModule {
        specifier: id.to_string(),
    }
}

impl VirtualResponse {
    /// Stable id of this response
    pub fn id(&self) -> String {
        match self {
            VirtualResponse::Entrypoint { engine_root } => engine_root.join(ENTRYPOINT).to_string(),
            VirtualResponse::RouteEntrypoint { engine_root, route } => format!(
                "{}?{}",
                engine_root.join(ROUTE_ENTRYPOINT),
                encode_query(&[("route", route.as_str())])
            ),
            VirtualResponse::ImplicitModules { package_root, test } => {
                let name = if *test { IMPLICIT_TEST_MODULES } else { IMPLICIT_MODULES };
                package_root.join(name).to_string()
            },
            VirtualResponse::Vendor { app_root, kind } => app_root.join(kind.file_name()).to_string(),
            VirtualResponse::FastbootSwitch {
                target,
                names,
                has_default,
            } => format!(
                "{}?{}",
                target.join(FASTBOOT_SWITCH),
                encode_query(&[
                    ("names", names.join(",").as_str()),
                    ("default", if *has_default { "true" } else { "false" }),
                ])
            ),
            VirtualResponse::ComponentPair {
                engine_root,
                hbs,
                js,
                debug_name,
            } => {
                let mut pairs = vec![("hbs", hbs.as_str())];
                if let Some(js) = js {
                    pairs.push(("js", js.as_str()));
                }
                pairs.push(("debugName", debug_name.as_str()));
                format!("{}?{}", engine_root.join(COMPONENT_PAIR), encode_query(&pairs))
            },
            VirtualResponse::External { specifier } => format!("{}{}", EXTERNAL_PREFIX, specifier),
        }
    }

    /// Check if an id or path looks like one of ours
    pub fn is_virtual_id(id: &str) -> bool {
        let path = id.split('?').next().unwrap_or(id);
        path.starts_with(EXTERNAL_PREFIX)
            || Utf8Path::new(path)
                .file_name()
                .map(|name| name.starts_with(VIRTUAL_MARKER))
                .unwrap_or(false)
    }

    /// Decode an absolute id.
    ///
    /// `Ok(None)` when the id is not virtual at all; an error when it carries
    /// the virtual marker but matches no generator.
    pub fn decode(id: &str) -> ResolverResult<Option<Self>> {
        if !Self::is_virtual_id(id) {
            return Ok(None);
        }

        if let Some(specifier) = id.strip_prefix(EXTERNAL_PREFIX) {
            if specifier.is_empty() {
                return Err(unknown(id));
            }
            return Ok(Some(VirtualResponse::External {
                specifier: specifier.to_string(),
            }));
        }

        let (path, query) = match id.split_once('?') {
            Some((path, query)) => (Utf8Path::new(path), query),
            None => (Utf8Path::new(id), ""),
        };
        let dir = path.parent().ok_or_else(|| unknown(id))?.to_path_buf();
        let file_name = path.file_name().ok_or_else(|| unknown(id))?;

        let response = match file_name {
            ENTRYPOINT => VirtualResponse::Entrypoint { engine_root: dir },
            ROUTE_ENTRYPOINT => VirtualResponse::RouteEntrypoint {
                engine_root: dir,
                route: query_value(query, "route").ok_or_else(|| unknown(id))?,
            },
            IMPLICIT_MODULES => VirtualResponse::ImplicitModules {
                package_root: dir,
                test: false,
            },
            IMPLICIT_TEST_MODULES => VirtualResponse::ImplicitModules {
                package_root: dir,
                test: true,
            },
            VENDOR_JS => VirtualResponse::Vendor {
                app_root: dir,
                kind: VendorKind::Scripts,
            },
            VENDOR_STYLES => VirtualResponse::Vendor {
                app_root: dir,
                kind: VendorKind::Styles,
            },
            TEST_SUPPORT_JS => VirtualResponse::Vendor {
                app_root: dir,
                kind: VendorKind::TestScripts,
            },
            TEST_SUPPORT_STYLES => VirtualResponse::Vendor {
                app_root: dir,
                kind: VendorKind::TestStyles,
            },
            FASTBOOT_SWITCH => {
                let names = query_value(query, "names").unwrap_or_default();
                VirtualResponse::FastbootSwitch {
                    target: dir,
                    names: names
                        .split(',')
                        .filter(|n| !n.is_empty())
                        .map(str::to_string)
                        .collect(),
                    has_default: query_value(query, "default").as_deref() != Some("false"),
                }
            },
            COMPONENT_PAIR => VirtualResponse::ComponentPair {
                engine_root: dir,
                hbs: query_value(query, "hbs").ok_or_else(|| unknown(id))?,
                js: query_value(query, "js"),
                debug_name: query_value(query, "debugName").unwrap_or_default(),
            },
            _ => return Err(unknown(id)),
        };

        Ok(Some(response))
    }

    /// Generate the module source
    pub fn content(&self, resolver: &Resolver) -> ResolverResult<VirtualContent> {
        match self {
            VirtualResponse::Entrypoint { engine_root } => entrypoint::render(resolver, engine_root, None),
            VirtualResponse::RouteEntrypoint { engine_root, route } => {
                entrypoint::render(resolver, engine_root, Some(route))
            },
            VirtualResponse::ImplicitModules { package_root, test } => {
                implicit_modules::render(resolver, package_root, *test)
            },
            VirtualResponse::Vendor { app_root, kind } => vendor::render(resolver, app_root, *kind),
            VirtualResponse::FastbootSwitch { names, has_default, .. } => {
                Ok(shims::fastboot_switch(names, *has_default))
            },
            VirtualResponse::ComponentPair {
                hbs, js, debug_name, ..
            } => Ok(shims::component_pair(hbs, js.as_deref(), debug_name)),
            VirtualResponse::External { specifier } => Ok(shims::external(specifier)),
        }
    }
}
