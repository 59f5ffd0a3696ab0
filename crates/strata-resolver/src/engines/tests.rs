use super::*;
use crate::test_utils::InMemoryPackages;
use proptest::prelude::*;
use serde_json::{json, Value};

fn addon_json(name: &str, deps: &[String], order_index: i64, engine: bool) -> Value {
    let mut keywords = vec!["ember-addon"];
    if engine {
        keywords.push("ember-engine");
    }
    let dependencies: serde_json::Map<String, Value> = deps.iter().map(|d| (d.clone(), json!("*"))).collect();
    json!({
        "name": name,
        "keywords": keywords,
        "dependencies": dependencies,
        "ember-addon": { "version": 2, "type": "addon", "order-index": order_index }
    })
}

fn names(summary: &EngineSummary) -> Vec<String> {
    summary.addons.values().map(|a| a.package.name().to_string()).collect()
}

/// app -> blog (engine) -> blog-widgets; app -> shared, blog -> shared
fn engine_graph() -> InMemoryPackages {
    InMemoryPackages::new("/app")
        .package(
            "/app",
            json!({ "name": "my-app", "dependencies": { "blog": "*", "shared": "*" }, "devDependencies": { "tools": "*" } }),
        )
        .package("/app/node_modules/blog", json!({
            "name": "blog",
            "keywords": ["ember-addon", "ember-engine"],
            "dependencies": { "blog-widgets": "*", "shared": "*" },
            "ember-addon": { "version": 2, "type": "addon", "lazy-loading": { "enabled": true } }
        }))
        .package("/app/node_modules/blog-widgets", addon_json("blog-widgets", &[], 0, false))
        .package("/app/node_modules/shared", addon_json("shared", &[], 0, false))
        .package("/app/node_modules/tools", addon_json("tools", &[], 0, false))
}

#[test]
fn test_engines_are_boundaries() {
    let partition = partition_engines(&engine_graph()).unwrap();
    assert_eq!(partition.engines.len(), 2);

    let app = partition.app().unwrap();
    assert_eq!(app.package.name(), "my-app");
    assert_eq!(names(app), vec!["blog", "shared", "tools"]);

    let blog = &partition.engines[1];
    assert_eq!(blog.package.name(), "blog");
    assert_eq!(names(blog), vec!["blog-widgets", "shared"]);
}

#[test]
fn test_configs_are_in_search_order() {
    let partition = partition_engines(&engine_graph()).unwrap();
    let configs = partition.to_configs();

    assert_eq!(configs[0].root, Utf8PathBuf::from("/app"));
    let search: Vec<&str> = configs[0].active_addons.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(search, vec!["tools", "shared", "blog"]);
    assert!(!configs[0].is_lazy);
    assert!(configs[1].is_lazy);
    assert_eq!(
        configs[1].active_addons[0].can_resolve_from_file,
        Utf8PathBuf::from("/app/node_modules/blog/package.json")
    );
}

#[test]
fn test_peer_dependencies_are_not_active() {
    let packages = InMemoryPackages::new("/app")
        .package("/app", json!({ "name": "my-app", "dependencies": { "a": "*" } }))
        .package(
            "/app/node_modules/a",
            json!({
                "name": "a",
                "keywords": ["ember-addon"],
                "peerDependencies": { "b": "*" },
                "ember-addon": { "version": 2, "type": "addon" }
            }),
        )
        .package("/app/node_modules/b", addon_json("b", &[], 0, false));

    let partition = partition_engines(&packages).unwrap();
    assert_eq!(names(partition.app().unwrap()), vec!["a"]);
}

#[test]
fn test_order_index_moves_addons_later() {
    let packages = InMemoryPackages::new("/app")
        .package("/app", json!({ "name": "my-app", "dependencies": { "first": "*", "second": "*" } }))
        .package("/app/node_modules/first", addon_json("first", &[], 5, false))
        .package("/app/node_modules/second", addon_json("second", &[], 0, false));

    let partition = partition_engines(&packages).unwrap();
    assert_eq!(names(partition.app().unwrap()), vec!["second", "first"]);
}

#[test]
fn test_descendants_keep_traversal_order() {
    let packages = InMemoryPackages::new("/app")
        .package("/app", json!({ "name": "my-app", "dependencies": { "a": "*", "b": "*" } }))
        .package("/app/node_modules/a", addon_json("a", &["c".to_string()], 1, false))
        .package("/app/node_modules/b", addon_json("b", &[], 0, false))
        .package("/app/node_modules/c", addon_json("c", &[], 0, false));

    let partition = partition_engines(&packages).unwrap();
    assert_eq!(names(partition.app().unwrap()), vec!["c", "b", "a"]);
}

#[test]
fn test_shared_addon_resolves_from_last_parent() {
    let packages = InMemoryPackages::new("/app")
        .package("/app", json!({ "name": "my-app", "dependencies": { "a": "*", "b": "*" } }))
        .package("/app/node_modules/a", addon_json("a", &["shared".to_string()], 0, false))
        .package("/app/node_modules/b", addon_json("b", &["shared".to_string()], 0, false))
        .package("/app/node_modules/shared", addon_json("shared", &[], 0, false));

    let partition = partition_engines(&packages).unwrap();
    let app = partition.app().unwrap();
    assert_eq!(names(app), vec!["shared", "a", "b"]);
    assert_eq!(
        app.addons[&Utf8PathBuf::from("/app/node_modules/shared")].can_resolve_from,
        Utf8PathBuf::from("/app/node_modules/b/package.json")
    );
}

/// Addon `i` may depend on any addon `j > i`; the app depends on a subset
fn graph_strategy() -> impl Strategy<Value = (Vec<(Vec<usize>, i64)>, Vec<usize>)> {
    (1usize..7).prop_flat_map(|n| {
        let addons = (0..n)
            .map(|i| {
                let deps = proptest::collection::vec(any::<bool>(), n)
                    .prop_map(move |mask| (i + 1..mask.len()).filter(|j| mask[*j]).collect::<Vec<_>>());
                (deps, 0i64..2)
            })
            .collect::<Vec<_>>();
        let roots = proptest::collection::vec(any::<bool>(), n)
            .prop_map(|mask| (0..mask.len()).filter(|i| mask[*i]).collect::<Vec<_>>());
        (addons, roots)
    })
}

fn build(addons: &[(Vec<usize>, i64)], roots: &[usize]) -> InMemoryPackages {
    let name = |i: usize| format!("addon-{}", i);
    let app_deps: serde_json::Map<String, Value> = roots.iter().map(|i| (name(*i), json!("*"))).collect();
    let mut packages = InMemoryPackages::new("/app").package("/app", json!({ "name": "my-app", "dependencies": app_deps }));
    for (i, (deps, order)) in addons.iter().enumerate() {
        let deps: Vec<String> = deps.iter().map(|j| name(*j)).collect();
        packages = packages.package(
            &format!("/app/node_modules/{}", name(i)),
            addon_json(&name(i), &deps, *order, false),
        );
    }
    packages
}

proptest! {
    #[test]
    fn search_order_reverses_apply_order((addons, roots) in graph_strategy()) {
        let partition = partition_engines(&build(&addons, &roots)).unwrap();
        let mut apply = names(partition.app().unwrap());
        apply.reverse();
        let search: Vec<String> = partition.to_configs()[0].active_addons.iter().map(|a| a.name.clone()).collect();
        prop_assert_eq!(search, apply);
    }

    #[test]
    fn dependencies_apply_before_dependents((addons, roots) in graph_strategy()) {
        let partition = partition_engines(&build(&addons, &roots)).unwrap();
        let apply = names(partition.app().unwrap());
        let position = |name: &str| apply.iter().position(|n| n == name);

        for (i, (deps, order)) in addons.iter().enumerate() {
            let Some(dependent) = position(&format!("addon-{}", i)) else { continue };
            for j in deps {
                if addons[*j].1 != *order {
                    continue;
                }
                let dependency = position(&format!("addon-{}", j));
                prop_assert!(dependency.is_some());
                prop_assert!(dependency.unwrap() < dependent);
            }
        }
    }

    #[test]
    fn every_active_addon_is_reachable((addons, roots) in graph_strategy()) {
        let partition = partition_engines(&build(&addons, &roots)).unwrap();
        let mut reachable: Vec<usize> = roots.clone();
        let mut cursor = 0;
        while cursor < reachable.len() {
            let next = reachable[cursor];
            for dep in &addons[next].0 {
                if !reachable.contains(dep) {
                    reachable.push(*dep);
                }
            }
            cursor += 1;
        }

        let active = names(partition.app().unwrap());
        prop_assert_eq!(active.len(), reachable.len());
        for i in reachable {
            let addon = format!("addon-{}", i);
            prop_assert!(active.contains(&addon));
        }
    }
}
