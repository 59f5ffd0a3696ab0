//! Concatenated implicit scripts and styles

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use strata_config::ImplicitKind;
use strata_core::utils::normalize_path;
use strata_core::StrataError;
use strata_packages::Package;
use tracing::debug;

use super::{VendorKind, VirtualContent};
use crate::resolver::Resolver;
use crate::ResolverResult;

impl VendorKind {
    fn implicit_kind(&self) -> ImplicitKind {
        match self {
            VendorKind::Scripts => ImplicitKind::Scripts,
            VendorKind::Styles => ImplicitKind::Styles,
            VendorKind::TestScripts => ImplicitKind::TestScripts,
            VendorKind::TestStyles => ImplicitKind::TestStyles,
        }
    }

    fn separator(&self) -> &'static str {
        match self {
            VendorKind::Scripts | VendorKind::TestScripts => ";\n",
            VendorKind::Styles | VendorKind::TestStyles => "\n",
        }
    }
}

/// loader.js defines `define` and ember-source needs it; both go first
fn priority(pkg: &Package) -> u8 {
    match pkg.name() {
        "loader.js" => 0,
        "ember-source" => 1,
        _ => 2,
    }
}

pub fn render(resolver: &Resolver, app_root: &Utf8Path, kind: VendorKind) -> ResolverResult<VirtualContent> {
    let packages = resolver.packages();
    let engine = resolver.app_engine()?;

    let mut sources: Vec<Arc<Package>> = engine
        .active_addons
        .iter()
        .rev()
        .map(|addon| packages.get(&addon.root))
        .collect::<ResolverResult<_>>()?;
    sources.sort_by_key(|pkg| priority(pkg));
    sources.push(packages.get(app_root)?);

    let files: Vec<Utf8PathBuf> = sources
        .iter()
        .filter_map(|pkg| pkg.meta().map(|meta| (pkg, meta)))
        .flat_map(|(pkg, meta)| {
            meta.implicit(kind.implicit_kind())
                .iter()
                .map(|entry| normalize_path(&pkg.root().join(entry)))
                .collect::<Vec<_>>()
        })
        .collect();
    debug!(?kind, files = files.len(), "concatenating vendor files");

    let contents: Vec<String> = files
        .par_iter()
        .map(|path| {
            std::fs::read_to_string(path).map_err(|e| StrataError::io(format!("Failed to read {}", path), e))
        })
        .collect::<ResolverResult<_>>()?;

    let mut src = contents.join(kind.separator());
    if kind == VendorKind::TestScripts {
        src = format!("var runningTests = true;\n{}", src);
    }

    Ok(VirtualContent { src, watches: files })
}
