//! Aggregation of the implicit modules a package's dependencies declare

use std::collections::HashMap;
use std::sync::Arc;

use camino::Utf8Path;
use strata_config::{AddonMeta, ImplicitKind};
use strata_core::utils::{to_posix, without_extension};
use strata_core::DependencyKind;
use strata_packages::Package;

use super::{VirtualContent, IMPLICIT_MODULES, IMPLICIT_TEST_MODULES};
use crate::resolver::Resolver;
use crate::ResolverResult;

pub fn render(resolver: &Resolver, package_root: &Utf8Path, test: bool) -> ResolverResult<VirtualContent> {
    let packages = resolver.packages();
    let pkg = packages.get(package_root)?;

    let mut deps: Vec<Arc<Package>> = packages.dependencies(&pkg)?.iter().cloned().collect();
    deps.sort_by_key(|dep| dep.order_index());

    let (kind, eager_file) = if test {
        (ImplicitKind::TestModules, IMPLICIT_TEST_MODULES)
    } else {
        (ImplicitKind::Modules, IMPLICIT_MODULES)
    };

    let mut lazy: Vec<(String, String)> = Vec::new();
    let mut eager: Vec<String> = Vec::new();
    let mut watches = vec![pkg.root().join("package.json")];

    for dep in deps {
        if !dep.is_v2_addon() || pkg.categorize_dependency(dep.name()) == Some(DependencyKind::Peer) {
            continue;
        }
        let Some(meta) = dep.meta() else {
            continue;
        };
        watches.push(dep.root().join("package.json"));

        let renamed = inverse_renamed_modules(meta, resolver.extensions());
        let runtime_package = runtime_package_name(meta, dep.name());
        for name in meta.implicit(kind) {
            let local = to_posix(name.trim_start_matches("./"));
            let subpath = without_extension(&local, resolver.extensions());
            let runtime = renamed
                .get(&format!("{}/{}", dep.name(), subpath))
                .cloned()
                .unwrap_or_else(|| format!("{}/{}", runtime_package, subpath));
            lazy.push((runtime, format!("{}/{}", dep.name(), local)));
        }

        if !dep.is_engine() {
            eager.push(format!("{}/{}", dep.name(), eager_file));
        }
    }

    Ok(VirtualContent {
        src: render_source(&lazy, &eager),
        watches,
    })
}

/// The name legacy consumers know `name` by, from its `renamed-packages`
fn runtime_package_name<'a>(meta: &'a AddonMeta, name: &'a str) -> &'a str {
    meta.renamed_packages
        .iter()
        .find(|(_, real)| real.as_str() == name)
        .map(|(legacy, _)| legacy.as_str())
        .unwrap_or(name)
}

/// Renamed module targets back to the names the runtime asks for, without
/// extensions
fn inverse_renamed_modules(meta: &AddonMeta, extensions: &[String]) -> HashMap<String, String> {
    meta.renamed_modules
        .iter()
        .map(|(runtime, local)| {
            (
                without_extension(local, extensions).to_string(),
                without_extension(runtime, extensions).to_string(),
            )
        })
        .collect()
}

fn render_source(lazy: &[(String, String)], eager: &[String]) -> String {
    let mut src = String::new();
    for (index, (_, buildtime)) in lazy.iter().enumerate() {
        src.push_str(&format!("import * as im{} from {:?};\n", index, buildtime));
    }
    for (index, path) in eager.iter().enumerate() {
        src.push_str(&format!("import * as ie{} from {:?};\n", index, path));
    }

    src.push_str("export default Object.assign({}");
    for index in 0..eager.len() {
        src.push_str(&format!(", ie{}.default", index));
    }
    src.push_str(", {\n");
    for (index, (runtime, _)) in lazy.iter().enumerate() {
        src.push_str(&format!("  {:?}: im{},\n", runtime, index));
    }
    src.push_str("});\n");
    src
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::InMemoryPackages;
    use serde_json::json;
    use strata_config::ResolverOptions;

    #[test]
    fn test_render_source() {
        let lazy = vec![("dep-a/x".to_string(), "dep-a/x.js".to_string())];
        let eager = vec!["dep-a/-strata-implicit-modules.js".to_string()];
        let src = render_source(&lazy, &eager);
        assert_eq!(
            src,
            "import * as im0 from \"dep-a/x.js\";\n\
             import * as ie0 from \"dep-a/-strata-implicit-modules.js\";\n\
             export default Object.assign({}, ie0.default, {\n  \"dep-a/x\": im0,\n});\n"
        );
    }

    #[test]
    fn test_renamed_packages_give_legacy_runtime_names() {
        let packages = InMemoryPackages::new("/app")
            .package("/app", json!({ "name": "my-app", "dependencies": { "real-name": "*" } }))
            .addon(
                "/app/node_modules/real-name",
                json!({
                    "renamed-packages": { "legacy-name": "real-name" },
                    "renamed-modules": { "legacy-name/y.js": "real-name/lib/y.js" },
                    "implicit-modules": ["./x.js", "./lib/y.js"]
                }),
            );
        let options = ResolverOptions::for_app("/app", "my-app", "5.4.0");
        let resolver = Resolver::with_packages(options, Arc::new(packages)).unwrap();

        let content = render(&resolver, Utf8Path::new("/app"), false).unwrap();
        assert!(content.src.contains("\"legacy-name/x\": im0"));
        assert!(content.src.contains("\"legacy-name/y\": im1"));
        assert!(content.src.contains("import * as im0 from \"real-name/x.js\""));
        assert!(!content.src.contains("\"real-name/x\":"));
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(render_source(&[], &[]), "export default Object.assign({}, {\n});\n");
    }
}
