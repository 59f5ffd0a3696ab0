use super::*;
use crate::fixture::Fixture;
use serde_json::json;

fn package(value: serde_json::Value, is_app: bool) -> Package {
    let package_json: PackageJson = serde_json::from_value(value).unwrap();
    Package::new(Utf8PathBuf::from("/work/pkg"), package_json, is_app)
}

#[test]
fn test_v2_classification() {
    let addon = package(
        json!({
            "name": "blog-widgets",
            "keywords": ["ember-addon"],
            "ember-addon": { "version": 2, "type": "addon" }
        }),
        false,
    );
    assert!(addon.is_ember_package());
    assert!(addon.is_v2_addon());
    assert!(!addon.is_v2_app());
    assert!(addon.is_native_v2());
    assert!(!addon.is_auto_upgraded());
    assert!(!addon.is_engine());

    let app = package(
        json!({ "name": "my-app", "ember-addon": { "version": 2, "type": "app" } }),
        true,
    );
    assert!(app.is_ember_package());
    assert!(app.is_v2_app());
}

#[test]
fn test_v1_meta_is_ignored() {
    let v1 = package(
        json!({
            "name": "old-addon",
            "keywords": ["ember-addon"],
            "ember-addon": { "main": "index.js", "order-index": 5 }
        }),
        false,
    );
    assert!(v1.is_ember_package());
    assert!(v1.meta().is_none());
    assert!(!v1.is_v2_addon());
    assert_eq!(v1.order_index(), 0);
}

#[test]
fn test_missing_keyword_is_not_v2() {
    let pkg = package(
        json!({ "name": "x", "ember-addon": { "version": 2, "type": "addon" } }),
        false,
    );
    assert!(!pkg.is_ember_package());
    assert!(!pkg.is_v2_addon());
}

#[test]
fn test_engine_classification() {
    let engine = package(
        json!({
            "name": "blog",
            "keywords": ["ember-addon", "ember-engine"],
            "ember-addon": { "version": 2, "type": "addon", "lazy-loading": { "enabled": true } }
        }),
        false,
    );
    assert!(engine.is_engine());
    assert!(engine.is_lazy_engine());
}

#[test]
fn test_dev_dependencies_only_for_app() {
    let value = json!({
        "name": "x",
        "dependencies": { "a": "*" },
        "devDependencies": { "dev-only": "*" },
        "peerDependencies": { "a": "*", "p": "*" }
    });

    let addon = package(value.clone(), false);
    assert!(!addon.has_dependency("dev-only"));
    assert_eq!(
        addon.dependency_names(),
        vec![
            ("a".to_string(), DependencyKind::Normal),
            ("p".to_string(), DependencyKind::Peer),
        ]
    );

    let app = package(value, true);
    assert!(app.has_dependency("dev-only"));
    assert_eq!(app.categorize_dependency("dev-only"), Some(DependencyKind::Dev));
    assert_eq!(app.categorize_dependency("p"), Some(DependencyKind::Peer));
}

#[test]
fn test_in_repo_addon_validation() {
    let fixture = Fixture::new();
    fixture.write_json(
        "app/package.json",
        json!({
            "name": "my-app",
            "ember-addon": { "paths": ["lib/good", "lib/no-main", "lib/broken", "lib/missing"] }
        }),
    );
    fixture.write_json("app/lib/good/package.json", json!({ "name": "good", "keywords": ["ember-addon"] }));
    fixture.write("app/lib/good/index.js", "module.exports = {};");
    fixture.write_json("app/lib/no-main/package.json", json!({ "name": "no-main", "main": "lib.js" }));
    fixture.write("app/lib/broken/package.json", "{ nope");
    fixture.write("app/lib/broken/index.js", "");

    let app = Package::load(&fixture.path("app"), true).unwrap();
    assert_eq!(app.in_repo_addon_roots(), vec![fixture.path("app/lib/good")]);
}
