use super::*;
use crate::fixture::Fixture;
use serde_json::json;
use strata_core::error::MODULE_NOT_FOUND;

fn app_fixture() -> Fixture {
    let fixture = Fixture::new();
    fixture.write_json(
        "app/package.json",
        json!({
            "name": "my-app",
            "dependencies": { "a": "*", "missing-normal": "*" },
            "devDependencies": { "dev-tool": "*" },
            "peerDependencies": { "missing-peer": "*" }
        }),
    );
    fixture.write_json(
        "app/node_modules/a/package.json",
        json!({ "name": "a", "dependencies": { "b": "*" } }),
    );
    fixture.write_json("app/node_modules/b/package.json", json!({ "name": "b" }));
    fixture.write_json(
        "app/node_modules/a/node_modules/b/package.json",
        json!({ "name": "b", "version": "2.0.0" }),
    );
    fixture.write_json("app/node_modules/dev-tool/package.json", json!({ "name": "dev-tool" }));
    fixture.write("app/app/components/x.js", "");
    fixture.write("app/node_modules/a/lib/deep/file.js", "");
    fixture
}

#[test]
fn test_get_is_memoized() {
    let fixture = app_fixture();
    let cache = PackageCache::new(&fixture.path("app"));

    let first = cache.get(&fixture.path("app")).unwrap();
    let second = cache.get(&fixture.path("app/./")).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(first.is_app());
    assert_eq!(cache.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_symlinks_collapse() {
    let fixture = app_fixture();
    std::os::unix::fs::symlink(fixture.path("app/node_modules/b"), fixture.path("linked-b")).unwrap();
    let cache = PackageCache::new(&fixture.path("app"));

    let direct = cache.get(&fixture.path("app/node_modules/b")).unwrap();
    let linked = cache.get(&fixture.path("linked-b")).unwrap();
    assert!(Arc::ptr_eq(&direct, &linked));
}

#[test]
fn test_resolve_nearest_node_modules() {
    let fixture = app_fixture();
    let cache = PackageCache::new(&fixture.path("app"));
    let app = cache.app_package().unwrap();

    let a = cache.resolve("a", &app).unwrap();
    assert_eq!(a.root(), fixture.path("app/node_modules/a"));

    let nested_b = cache.resolve("b", &a).unwrap();
    assert_eq!(nested_b.version(), Some("2.0.0"));

    let top_b = cache.resolve("b", &app).unwrap();
    assert_eq!(top_b.version(), None);
}

#[test]
fn test_resolve_miss_is_not_found() {
    let fixture = app_fixture();
    let cache = PackageCache::new(&fixture.path("app"));
    let app = cache.app_package().unwrap();

    let err = cache.resolve("nope", &app).unwrap_err();
    assert_eq!(err.code(), MODULE_NOT_FOUND);

    // the miss is cached, asking again gives the same answer
    let again = cache.resolve("nope", &app).unwrap_err();
    assert!(again.is_not_found());
}

#[test]
fn test_dependencies_drop_missing() {
    let fixture = app_fixture();
    let cache = PackageCache::new(&fixture.path("app"));
    let app = cache.app_package().unwrap();

    let deps = cache.dependencies(&app).unwrap();
    let names: Vec<_> = deps.iter().map(|d| d.name().to_string()).collect();
    assert_eq!(names, vec!["a", "dev-tool"]);

    let again = cache.dependencies(&app).unwrap();
    assert!(Arc::ptr_eq(&deps, &again));
}

#[test]
fn test_addon_dependencies_exclude_dev() {
    let fixture = app_fixture();
    fixture.write_json(
        "app/node_modules/c/package.json",
        json!({ "name": "c", "devDependencies": { "a": "*" } }),
    );
    let cache = PackageCache::new(&fixture.path("app"));
    let c = cache.get(&fixture.path("app/node_modules/c")).unwrap();
    assert!(cache.dependencies(&c).unwrap().is_empty());
}

#[test]
fn test_owning_package() {
    let fixture = app_fixture();
    let cache = PackageCache::new(&fixture.path("app"));

    let owner = cache.owning_package(&fixture.path("app/app/components/x.js")).unwrap();
    assert_eq!(owner.name(), "my-app");

    let owner = cache.owning_package(&fixture.path("app/node_modules/a/lib/deep/file.js")).unwrap();
    assert_eq!(owner.name(), "a");
}

#[test]
fn test_owning_package_stops_at_node_modules() {
    let fixture = app_fixture();
    fixture.write("app/node_modules/loose.js", "");
    let cache = PackageCache::new(&fixture.path("app"));
    assert!(cache.owning_package(&fixture.path("app/node_modules/loose.js")).is_none());
}

#[test]
fn test_shared_is_singleton() {
    let fixture = app_fixture();
    let one = PackageCache::shared(&fixture.path("app"));
    let two = PackageCache::shared(&fixture.path("app/"));
    assert!(Arc::ptr_eq(&one, &two));
}

#[test]
fn test_concurrent_lookups_agree() {
    let fixture = app_fixture();
    let cache = Arc::new(PackageCache::new(&fixture.path("app")));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                let app = cache.app_package().unwrap();
                cache.resolve("a", &app).unwrap().root().to_path_buf()
            })
        })
        .collect();

    let roots: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(roots.windows(2).all(|w| w[0] == w[1]));
}
