//! Process-wide resolver built from the options file, with hot reload
//!
//! The resolver is constructed on first use and kept until the options file
//! changes. Invalidation always drops the whole instance; the next caller
//! builds a fresh one from disk.

use std::path::Path;
use std::sync::{Arc, Weak};

use camino::{Utf8Path, Utf8PathBuf};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use strata_config::ConfigLoader;
use strata_core::StrataError;
use strata_packages::cache::canonical;
use tracing::{debug, info, warn};

use crate::resolver::Resolver;
use crate::ResolverResult;

/// Lazily built, invalidatable [`Resolver`]
pub struct ResolverLoader {
    config: ConfigLoader,
    resolver: RwLock<Option<Arc<Resolver>>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl std::fmt::Debug for ResolverLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverLoader")
            .field("config", &self.config)
            .field("loaded", &self.resolver.read().is_some())
            .field("watching", &self.watcher.lock().is_some())
            .finish()
    }
}

impl ResolverLoader {
    pub fn new(config: ConfigLoader) -> Self {
        Self {
            config,
            resolver: RwLock::new(None),
            watcher: Mutex::new(None),
        }
    }

    /// Options file the resolver is built from
    pub fn config_path(&self) -> Utf8PathBuf {
        self.config.resolve_config_path()
    }

    /// The loaded resolver, if any
    pub fn current(&self) -> Option<Arc<Resolver>> {
        self.resolver.read().clone()
    }

    /// The resolver, building it from the options file if needed
    pub fn resolver(&self) -> ResolverResult<Arc<Resolver>> {
        if let Some(resolver) = self.current() {
            return Ok(resolver);
        }

        let mut slot = self.resolver.write();
        if let Some(resolver) = slot.as_ref() {
            return Ok(resolver.clone());
        }
        let resolver = Arc::new(Resolver::new(self.config.load()?)?);
        info!(app_root = %resolver.options().app_root, "resolver loaded");
        *slot = Some(resolver.clone());
        Ok(resolver)
    }

    /// Like [`ResolverLoader::resolver`], reading the options file
    /// asynchronously. Concurrent loads may both build; the first to finish
    /// is kept.
    pub async fn resolver_async(&self) -> ResolverResult<Arc<Resolver>> {
        if let Some(resolver) = self.current() {
            return Ok(resolver);
        }

        let options = self.config.load_async().await?;
        let resolver = Arc::new(Resolver::new(options)?);
        let mut slot = self.resolver.write();
        if slot.is_none() {
            info!(app_root = %resolver.options().app_root, "resolver loaded");
        }
        Ok(slot.get_or_insert(resolver).clone())
    }

    /// Drop the loaded resolver. Returns whether one was loaded.
    pub fn invalidate(&self) -> bool {
        let dropped = self.resolver.write().take().is_some();
        if dropped {
            info!(path = %self.config_path(), "resolver options changed, dropping resolver");
        }
        dropped
    }

    /// Invalidate whenever the options file is created, changed or removed.
    ///
    /// The watcher holds only a weak reference to the loader and stops with
    /// [`ResolverLoader::unwatch`] or when the loader is dropped.
    pub fn watch(self: &Arc<Self>) -> ResolverResult<()> {
        let path = self.config_path();
        let (dir, watched) = watched_path(&path)
            .ok_or_else(|| StrataError::config("configPath", format!("{} has no parent directory", path)))?;

        let loader: Weak<Self> = Arc::downgrade(self);
        let watched_in_cb = watched.clone();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| match result {
            Ok(event) if is_config_change(&event, watched_in_cb.as_std_path()) => {
                if let Some(loader) = loader.upgrade() {
                    loader.invalidate();
                }
            },
            Ok(_) => {},
            Err(e) => warn!(error = %e, "resolver options watch error"),
        })
        .map_err(|e| StrataError::io(format!("Failed to watch {}", dir), std::io::Error::other(e)))?;

        watcher
            .watch(dir.as_std_path(), RecursiveMode::NonRecursive)
            .map_err(|e| StrataError::io(format!("Failed to watch {}", dir), std::io::Error::other(e)))?;
        debug!(path = %watched, "watching resolver options");

        *self.watcher.lock() = Some(watcher);
        Ok(())
    }

    /// Stop watching the options file
    pub fn unwatch(&self) {
        self.watcher.lock().take();
    }
}

/// The directory to watch and the options file inside it, with symlinks in
/// the directory resolved; events report resolved paths
fn watched_path(config: &Utf8Path) -> Option<(Utf8PathBuf, Utf8PathBuf)> {
    let dir = canonical(config.parent()?);
    let file = dir.join(config.file_name()?);
    Some((dir, file))
}

fn is_config_change(event: &Event, config: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| p == config)
}
