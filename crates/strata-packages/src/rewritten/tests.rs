use super::*;
use crate::fixture::Fixture;
use serde_json::json;

/// App depending on `v1-addon` (relocated into the workspace) and on
/// `helper`; the relocated addon depends on `helper` too.
fn moved_fixture() -> Fixture {
    let fixture = Fixture::new();
    fixture.write_json(
        "app/package.json",
        json!({ "name": "my-app", "dependencies": { "v1-addon": "*", "helper": "*" } }),
    );
    fixture.write_json(
        "app/node_modules/v1-addon/package.json",
        json!({ "name": "v1-addon", "keywords": ["ember-addon"], "dependencies": { "helper": "*" } }),
    );
    fixture.write_json("app/node_modules/helper/package.json", json!({ "name": "helper" }));
    fixture.write_json(
        "app/node_modules/.strata/rewritten-packages/v1-addon.abc/node_modules/v1-addon/package.json",
        json!({
            "name": "v1-addon",
            "keywords": ["ember-addon"],
            "dependencies": { "helper": "*" },
            "ember-addon": { "version": 2, "type": "addon", "auto-upgraded": true }
        }),
    );
    fixture.write_json(
        "app/node_modules/.strata/rewritten-packages/index.json",
        json!({
            "packages": {
                "../../v1-addon": "./v1-addon.abc/node_modules/v1-addon"
            },
            "extraResolutions": {}
        }),
    );
    fixture
}

fn cache_for(fixture: &Fixture) -> RewrittenPackageCache {
    let plain = Arc::new(PackageCache::new(&fixture.path("app")));
    let index = RewrittenIndex::load(&fixture.path("app")).unwrap();
    RewrittenPackageCache::new(plain, index)
}

fn moved_root(fixture: &Fixture) -> Utf8PathBuf {
    fixture.path("app/node_modules/.strata/rewritten-packages/v1-addon.abc/node_modules/v1-addon")
}

#[test]
fn test_index_paths_are_relative_to_index_dir() {
    let fixture = moved_fixture();
    let index = RewrittenIndex::load(&fixture.path("app")).unwrap();
    assert_eq!(
        index.packages.get(&fixture.path("app/node_modules/v1-addon")),
        Some(&moved_root(&fixture))
    );
}

#[test]
fn test_missing_index_means_nothing_moved() {
    let fixture = Fixture::new();
    fixture.write_json("app/package.json", json!({ "name": "my-app" }));
    let index = RewrittenIndex::load(&fixture.path("app")).unwrap();
    assert!(index.packages.is_empty());
    assert!(index.extra_resolutions.is_empty());
}

#[test]
fn test_resolve_lands_on_moved_package() {
    let fixture = moved_fixture();
    let cache = cache_for(&fixture);
    let app = cache.app_package().unwrap();

    let addon = cache.resolve("v1-addon", &app).unwrap();
    assert_eq!(addon.root(), moved_root(&fixture));
    assert!(addon.is_v2_addon());

    let original = cache.original(&addon).unwrap();
    assert_eq!(original.root(), fixture.path("app/node_modules/v1-addon"));
    assert_eq!(
        cache.moved_to(&fixture.path("app/node_modules/v1-addon")),
        Some(moved_root(&fixture))
    );
}

#[test]
fn test_moved_package_resolves_from_original_location() {
    let fixture = moved_fixture();
    let cache = cache_for(&fixture);
    let addon = cache.get(&moved_root(&fixture)).unwrap();

    // nothing named helper exists next to the relocated copy
    let helper = cache.resolve("helper", &addon).unwrap();
    assert_eq!(helper.root(), fixture.path("app/node_modules/helper"));
}

#[test]
fn test_translation_is_idempotent() {
    let fixture = moved_fixture();
    let cache = cache_for(&fixture);
    let app = cache.app_package().unwrap();

    let once = cache.resolve("v1-addon", &app).unwrap();
    let twice = cache.maybe_moved(once.clone()).unwrap();
    let via_get = cache.get(once.root()).unwrap();
    let via_original = cache.get(&fixture.path("app/node_modules/v1-addon")).unwrap();
    assert!(Arc::ptr_eq(&once, &twice));
    assert!(Arc::ptr_eq(&once, &via_get));
    assert!(Arc::ptr_eq(&once, &via_original));

    let root = cache.original_root(once.root());
    assert_eq!(cache.original_root(&root), root);
}

#[test]
fn test_extra_resolutions_take_precedence() {
    let fixture = moved_fixture();
    fixture.write_json("elsewhere/helper/package.json", json!({ "name": "helper", "version": "9.9.9" }));
    fixture.write_json(
        "app/node_modules/.strata/rewritten-packages/index.json",
        json!({
            "packages": {},
            "extraResolutions": {
                "../../..": ["../../../../elsewhere/helper"]
            }
        }),
    );
    let cache = cache_for(&fixture);
    let app = cache.app_package().unwrap();

    let helper = cache.resolve("helper", &app).unwrap();
    assert_eq!(helper.version(), Some("9.9.9"));
}

#[test]
fn test_owning_package_is_moved() {
    let fixture = moved_fixture();
    fixture.write("app/node_modules/v1-addon/index.js", "");
    let cache = cache_for(&fixture);

    let owner = cache
        .owning_package(&fixture.path("app/node_modules/v1-addon/index.js"))
        .unwrap();
    assert_eq!(owner.root(), moved_root(&fixture));
}

#[test]
fn test_app_is_never_moved() {
    let fixture = moved_fixture();
    let plain = Arc::new(PackageCache::new(&fixture.path("app")));
    let mut index = RewrittenIndex::default();
    index.packages.insert(fixture.path("app"), fixture.path("elsewhere"));
    let cache = RewrittenPackageCache::new(plain, index);

    assert_eq!(cache.app_package().unwrap().root(), fixture.path("app"));
}

#[test]
fn test_dependencies_of_app_are_rewritten() {
    let fixture = moved_fixture();
    let cache = cache_for(&fixture);
    let app = cache.app_package().unwrap();

    let roots: Vec<_> = cache
        .dependencies(&app)
        .unwrap()
        .iter()
        .map(|d| d.root().to_path_buf())
        .collect();
    assert_eq!(roots, vec![moved_root(&fixture), fixture.path("app/node_modules/helper")]);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    const APP: &str = "/strata-proptest/app";

    fn index_moving(names: &[String]) -> RewrittenIndex {
        RewrittenIndex {
            packages: names
                .iter()
                .map(|name| {
                    (
                        Utf8PathBuf::from(format!("{}/node_modules/{}", APP, name)),
                        Utf8PathBuf::from(format!("{}/node_modules/.strata/rewritten-packages/{}.x/node_modules/{}", APP, name, name)),
                    )
                })
                .collect(),
            extra_resolutions: IndexMap::new(),
        }
    }

    proptest! {
        #[test]
        fn original_root_is_idempotent(
            moved in prop::collection::btree_set("[a-z]{1,8}", 0..6),
            probe in "[a-z]{1,8}",
        ) {
            let moved: Vec<String> = moved.into_iter().collect();
            let index = index_moving(&moved);
            let cache = RewrittenPackageCache::new(Arc::new(PackageCache::new(Utf8Path::new(APP))), index.clone());

            let mut roots: Vec<Utf8PathBuf> = index.packages.iter().flat_map(|(old, new)| [old.clone(), new.clone()]).collect();
            roots.push(Utf8PathBuf::from(format!("{}/node_modules/{}", APP, probe)));

            for root in &roots {
                let once = cache.original_root(root);
                prop_assert_eq!(cache.original_root(&once), once.clone());
                prop_assert!(!index.packages.values().any(|new| new == &once));
            }
        }
    }
}
