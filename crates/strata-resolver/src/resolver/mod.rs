//! The resolver and its step machine
//!
//! Resolution of one request runs `before_resolve`, asks the host to resolve
//! the result, and on a miss runs `fallback_resolve`, which may produce a new
//! request that goes around again. [`ResolveTask`] holds that loop as an
//! explicit state machine: [`ResolveTask::start`] and [`ResolveTask::resume`]
//! return a [`Step`] telling the driver either to ask the host for something
//! or that resolution is done. The sync and async drivers differ only in how
//! they call the host.

mod before;
mod ember;
mod fallback;
mod merge_map;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::OnceCell;
use strata_config::{EngineConfig, ResolverOptions};
use strata_core::utils::{is_within, normalize_path};
use strata_core::StrataError;
use strata_packages::{PackageLookup, RewrittenPackageCache};
use tracing::debug;

use crate::request::{ModuleRequest, Resolution};
use crate::virtual_content::{describe_exports, VirtualContent, VirtualResponse};
use crate::ResolverResult;

pub use ember::{is_ember_virtual_package, VIRTUAL_PEER_DEPS};
pub use merge_map::{AppJsEntry, MergeEntry, MergeMap};

/// Prefix of the named virtual modules, e.g. `@strata/virtual/vendor.js`
pub const VIRTUAL_NAMESPACE: &str = "@strata/virtual/";

/// Upper bound on fallback round trips for one request
pub const MAX_HOPS: usize = 32;

/// Meta key: the request was sent into a relocated package
pub(crate) const RESOLVED_WITHIN_MOVED: &str = "resolvedWithinMovedPackage";
/// Meta key: relocated location of a request rehomed to its original package
pub(crate) const WAS_MOVED_TO: &str = "wasMovedTo";

/// Resolution context: options, package lookups and derived tables
pub struct Resolver {
    options: ResolverOptions,
    packages: Arc<dyn PackageLookup>,
    ember_version: semver::Version,
    merge_maps: OnceCell<HashMap<Utf8PathBuf, MergeMap>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("app_root", &self.options.app_root)
            .field("engines", &self.options.engines.len())
            .field("ember_version", &self.ember_version)
            .finish()
    }
}

/// What the driver should do next
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Resolve this request with the host, then call [`ResolveTask::resume`]
    Resolve(ModuleRequest),
    /// Resolution finished
    Done(Resolution),
}

/// One resolution in progress
#[derive(Debug)]
pub struct ResolveTask<'r> {
    resolver: &'r Resolver,
    original: ModuleRequest,
    current: Option<ModuleRequest>,
    first_failure: Option<String>,
    hops: usize,
}

impl<'r> ResolveTask<'r> {
    pub fn new(resolver: &'r Resolver, request: ModuleRequest) -> Self {
        Self {
            resolver,
            original: request,
            current: None,
            first_failure: None,
            hops: 0,
        }
    }

    /// Run the pre-resolution rules on the original request
    pub fn start(&mut self) -> ResolverResult<Step> {
        let request = self.original.clone();
        self.enter(request)
    }

    /// Continue with the host's answer to the last [`Step::Resolve`]
    pub fn resume(&mut self, outcome: Resolution) -> ResolverResult<Step> {
        let Some(current) = self.current.take() else {
            return Ok(Step::Done(outcome));
        };

        let reason = match outcome {
            Resolution::Found { .. } => return Ok(Step::Done(outcome)),
            Resolution::NotFound { reason, .. } => reason,
        };
        if self.first_failure.is_none() {
            self.first_failure = reason;
        }

        let next = self.resolver.fallback_resolve(current.clone())?;
        if next == current {
            return Ok(Step::Done(self.original_not_found()));
        }
        if let Some(done) = self.settle(&next) {
            return Ok(Step::Done(done));
        }

        self.hops += 1;
        let stuck = next.specifier() == current.specifier() && next.from_file() == current.from_file();
        if stuck || self.hops > MAX_HOPS {
            return Err(StrataError::ResolutionLoop {
                specifier: self.original.specifier().to_string(),
                from: self.original.from_file().to_path_buf(),
                hops: self.hops,
            });
        }

        self.enter(next)
    }

    fn enter(&mut self, request: ModuleRequest) -> ResolverResult<Step> {
        let request = self.resolver.before_resolve(request)?;
        if let Some(done) = self.settle(&request) {
            return Ok(Step::Done(done));
        }
        self.current = Some(request.clone());
        Ok(Step::Resolve(request))
    }

    fn settle(&self, request: &ModuleRequest) -> Option<Resolution> {
        if let Some(response) = request.virtual_response() {
            return Some(Resolution::Found {
                id: response.id(),
                virtual_response: Some(response.clone()),
            });
        }
        if request.is_not_found() {
            return Some(self.original_not_found());
        }
        None
    }

    fn original_not_found(&self) -> Resolution {
        Resolution::not_found(&self.original, self.first_failure.clone())
    }
}

impl Resolver {
    /// Create a resolver over the shared package cache of the app, with the
    /// rewritten-package index applied
    pub fn new(options: ResolverOptions) -> ResolverResult<Self> {
        let packages = RewrittenPackageCache::load(&options.app_root)?;
        Self::with_packages(options, Arc::new(packages))
    }

    /// Create a resolver over explicit package lookups
    pub fn with_packages(options: ResolverOptions, packages: Arc<dyn PackageLookup>) -> ResolverResult<Self> {
        options.validate()?;
        let ember_version = options.ember_version()?;
        Ok(Self {
            options,
            packages,
            ember_version,
            merge_maps: OnceCell::new(),
        })
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    pub fn packages(&self) -> &dyn PackageLookup {
        self.packages.as_ref()
    }

    pub fn ember_version(&self) -> &semver::Version {
        &self.ember_version
    }

    pub(crate) fn extensions(&self) -> &[String] {
        &self.options.resolvable_extensions
    }

    /// Resolve synchronously; `default_resolve` is the host's own resolution
    pub fn resolve_sync<F>(&self, request: ModuleRequest, mut default_resolve: F) -> ResolverResult<Resolution>
    where
        F: FnMut(&ModuleRequest) -> Resolution,
    {
        let mut task = ResolveTask::new(self, request);
        let mut step = task.start()?;
        loop {
            step = match step {
                Step::Done(resolution) => return Ok(resolution),
                Step::Resolve(request) => task.resume(default_resolve(&request))?,
            };
        }
    }

    /// Resolve with an asynchronous host
    pub async fn resolve<F, Fut>(&self, request: ModuleRequest, mut default_resolve: F) -> ResolverResult<Resolution>
    where
        F: FnMut(ModuleRequest) -> Fut,
        Fut: Future<Output = Resolution>,
    {
        let mut task = ResolveTask::new(self, request);
        let mut step = task.start()?;
        loop {
            step = match step {
                Step::Done(resolution) => return Ok(resolution),
                Step::Resolve(request) => {
                    let outcome = default_resolve(request).await;
                    task.resume(outcome)?
                },
            };
        }
    }

    /// Generate the source of a virtual module
    pub fn virtual_content(&self, response: &VirtualResponse) -> ResolverResult<VirtualContent> {
        response.content(self)
    }

    /// Generate the source of a virtual module from its id
    pub fn virtual_content_for_id(&self, id: &str) -> ResolverResult<VirtualContent> {
        match VirtualResponse::decode(id)? {
            Some(response) => self.virtual_content(&response),
            None => Err(StrataError::UnknownVirtualModule {
                specifier: id.to_string(),
            }),
        }
    }

    pub(crate) fn app_engine(&self) -> ResolverResult<&EngineConfig> {
        self.options
            .app_engine()
            .ok_or_else(|| StrataError::config("engines", "at least one engine (the app) is required"))
    }

    pub(crate) fn is_app_engine(&self, engine: &EngineConfig) -> bool {
        engine.root == self.options.app_root
    }

    pub(crate) fn engine_by_name(&self, name: &str) -> Option<&EngineConfig> {
        self.options.engines.iter().find(|e| e.package_name == name)
    }

    pub(crate) fn engine_by_root(&self, root: &Utf8Path) -> Option<&EngineConfig> {
        self.options.engines.iter().find(|e| e.root == root)
    }

    /// Innermost engine whose directory contains `file`
    pub(crate) fn engine_for_file(&self, file: &Utf8Path) -> Option<&EngineConfig> {
        self.options
            .engines
            .iter()
            .filter(|e| is_within(file, &e.root))
            .max_by_key(|e| e.root.as_str().len())
    }

    /// App-js merge map of the engine at `engine_root`
    pub fn merge_map(&self, engine_root: &Utf8Path) -> ResolverResult<Option<&MergeMap>> {
        let maps = self.merge_maps.get_or_try_init(|| {
            self.options
                .engines
                .iter()
                .map(|engine| {
                    let own = if self.is_app_engine(engine) { None } else { Some(engine.root.as_path()) };
                    MergeMap::build(engine, own, self.packages(), self.extensions())
                        .map(|map| (engine.root.clone(), map))
                })
                .collect::<ResolverResult<HashMap<_, _>>>()
        })?;
        Ok(maps.get(engine_root))
    }

    /// Export names of the module at `path`, probing extensions
    pub(crate) fn read_exports(&self, path: &Utf8Path) -> ResolverResult<(Vec<String>, bool)> {
        let path = normalize_path(path);
        let candidate = std::iter::once(path.clone())
            .chain(self.extensions().iter().map(|ext| Utf8PathBuf::from(format!("{}{}", path, ext))))
            .find(|p| p.is_file())
            .unwrap_or(path);
        let src = std::fs::read_to_string(&candidate)
            .map_err(|e| StrataError::io(format!("Failed to read {}", candidate), e))?;
        Ok(describe_exports(&src))
    }
}

/// Log a pipeline transition and return the new request
pub(crate) fn log_transition(label: &str, before: &ModuleRequest, after: ModuleRequest) -> ModuleRequest {
    if before != &after {
        debug!(
            label,
            specifier = %before.specifier(),
            from = %before.from_file(),
            to_specifier = %after.specifier(),
            to_from = %after.from_file(),
            "resolver transition"
        );
    }
    after
}
