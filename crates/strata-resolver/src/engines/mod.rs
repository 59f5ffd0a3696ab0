//! Partitioning the package graph into engines
//!
//! Starting from the app, every v2 addon reachable through normal or dev
//! dependencies is active in the engine that reaches it. Engines are
//! boundaries: an addon that is itself an engine is active in its parent but
//! its own dependencies belong to it alone, and each engine is discovered
//! once, breadth first.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use camino::Utf8PathBuf;
use indexmap::IndexMap;
use strata_config::{ActiveAddon, EngineConfig};
use strata_core::{DependencyKind, StrataResult};
use strata_packages::{Package, PackageLookup};
use tracing::{debug, info};

/// An addon active in an engine
#[derive(Debug, Clone)]
pub struct ActivePackage {
    pub package: Arc<Package>,
    /// A file from which the addon's name resolves to it
    pub can_resolve_from: Utf8PathBuf,
}

/// One engine and its active addons
#[derive(Debug, Clone)]
pub struct EngineSummary {
    pub package: Arc<Package>,
    /// Keyed by root, in apply order: dependencies before dependents, so
    /// later entries override earlier ones
    pub addons: IndexMap<Utf8PathBuf, ActivePackage>,
}

/// The app engine first, then every nested engine in discovery order
#[derive(Debug, Clone)]
pub struct EnginePartition {
    pub engines: Vec<EngineSummary>,
}

impl EnginePartition {
    /// Engine configurations with active addons in search order
    pub fn to_configs(&self) -> Vec<EngineConfig> {
        self.engines
            .iter()
            .map(|summary| EngineConfig {
                package_name: summary.package.name().to_string(),
                root: summary.package.root().to_path_buf(),
                active_addons: summary
                    .addons
                    .values()
                    .rev()
                    .map(|active| ActiveAddon {
                        name: active.package.name().to_string(),
                        root: active.package.root().to_path_buf(),
                        can_resolve_from_file: active.can_resolve_from.clone(),
                    })
                    .collect(),
                fastboot_files: IndexMap::new(),
                is_lazy: summary.package.is_lazy_engine(),
            })
            .collect()
    }

    pub fn app(&self) -> Option<&EngineSummary> {
        self.engines.first()
    }
}

/// Partition the package graph reachable from the app into engines
pub fn partition_engines(lookup: &dyn PackageLookup) -> StrataResult<EnginePartition> {
    let app = lookup.app_package()?;
    let mut queued: HashSet<Utf8PathBuf> = HashSet::from([app.root().to_path_buf()]);
    let mut queue: VecDeque<Arc<Package>> = VecDeque::from([app]);
    let mut engines = Vec::new();

    while let Some(package) = queue.pop_front() {
        let mut addons: IndexMap<Utf8PathBuf, ActivePackage> = IndexMap::new();
        let mut expanded: HashSet<Utf8PathBuf> = HashSet::new();
        find_active_addons(lookup, &package, &mut addons, &mut expanded)?;
        addons.sort_by(|_, a, _, b| a.package.order_index().cmp(&b.package.order_index()));

        for active in addons.values() {
            if active.package.is_engine() && queued.insert(active.package.root().to_path_buf()) {
                debug!(engine = %active.package.name(), parent = %package.name(), "found nested engine");
                queue.push_back(active.package.clone());
            }
        }

        debug!(engine = %package.name(), addons = addons.len(), "partitioned engine");
        engines.push(EngineSummary { package, addons });
    }

    info!(engines = engines.len(), "engine partition complete");
    Ok(EnginePartition { engines })
}

/// Depth-first: an addon's own active dependencies are placed before it
fn find_active_addons(
    lookup: &dyn PackageLookup,
    package: &Package,
    addons: &mut IndexMap<Utf8PathBuf, ActivePackage>,
    expanded: &mut HashSet<Utf8PathBuf>,
) -> StrataResult<()> {
    expanded.insert(package.root().to_path_buf());

    let children: Vec<Arc<Package>> = lookup
        .dependencies(package)?
        .iter()
        .filter(|dep| dep.is_v2_addon() && package.categorize_dependency(dep.name()) != Some(DependencyKind::Peer))
        .cloned()
        .collect();

    let can_resolve_from = package.root().join("package.json");
    for child in children {
        if !child.is_engine() && !expanded.contains(child.root()) {
            find_active_addons(lookup, &child, addons, expanded)?;
        }
        // Keeps the first position, takes the latest parent
        addons.insert(
            child.root().to_path_buf(),
            ActivePackage {
                package: child,
                can_resolve_from: can_resolve_from.clone(),
            },
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests;
