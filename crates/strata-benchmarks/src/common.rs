//! Common utilities for benchmarks

use camino::Utf8PathBuf;
use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};
use serde_json::json;
use strata_config::ResolverOptions;
use strata_core::StrataResult;
use strata_packages::fixture::Fixture;
use strata_packages::RewrittenPackageCache;
use strata_resolver::{partition_engines, Resolver};

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// A generated app with `addons` v2 addons, each contributing app-js, an
/// implicit module and a vendor script
pub struct AppTree {
    pub fixture: Fixture,
    pub addons: usize,
}

impl AppTree {
    pub fn new(addons: usize) -> Self {
        let fixture = Fixture::new();
        let dependencies: serde_json::Map<String, serde_json::Value> =
            (0..addons).map(|i| (addon_name(i), json!("*"))).collect();

        fixture.write_json("app/package.json", json!({ "name": "bench-app", "dependencies": dependencies }));
        fixture.write("app/app.js", "export default class App {}");
        fixture.write("app/components/hello.js", "export default class Hello {}");

        for i in 0..addons {
            let name = addon_name(i);
            let next: serde_json::Map<String, serde_json::Value> = if i + 1 < addons {
                std::iter::once((addon_name(i + 1), json!("*"))).collect()
            } else {
                serde_json::Map::new()
            };
            fixture.write_json(
                &format!("app/node_modules/{}/package.json", name),
                json!({
                    "name": name,
                    "keywords": ["ember-addon"],
                    "dependencies": next,
                    "ember-addon": {
                        "version": 2,
                        "type": "addon",
                        "app-js": { (format!("./components/{}.js", name)): format!("./_app_/components/{}.js", name) },
                        "implicit-modules": ["./index.js"],
                        "implicit-scripts": ["./vendor/setup.js"]
                    }
                }),
            );
            fixture.write(
                &format!("app/node_modules/{}/_app_/components/{}.js", name, name),
                &format!("export {{ default }} from '{}/components/{}';", name, name),
            );
            fixture.write(&format!("app/node_modules/{}/components/{}.js", name, name), "export default 1;");
            fixture.write(&format!("app/node_modules/{}/index.js", name), "export default {};");
            fixture.write(&format!("app/node_modules/{}/vendor/setup.js", name), "window.setup = true;");
        }

        Self { fixture, addons }
    }

    pub fn app_root(&self) -> Utf8PathBuf {
        self.fixture.path("app")
    }

    pub fn app_file(&self, relative: &str) -> Utf8PathBuf {
        self.fixture.path(&format!("app/{}", relative))
    }

    /// Options with engines derived from the package graph
    pub fn options(&self) -> StrataResult<ResolverOptions> {
        let mut options = ResolverOptions::for_app(self.app_root(), "bench-app", "5.4.0");
        let packages = RewrittenPackageCache::load(&self.app_root())?;
        options.engines = partition_engines(&packages)?.to_configs();
        Ok(options)
    }

    pub fn resolver(&self) -> StrataResult<Resolver> {
        Resolver::new(self.options()?)
    }
}

pub fn addon_name(i: usize) -> String {
    format!("addon-{}", i)
}
