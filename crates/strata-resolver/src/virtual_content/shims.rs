//! Small generated modules: fastboot switches, component pairs and
//! externals

use once_cell::sync::Lazy;
use regex::Regex;

use super::VirtualContent;

static DECLARED_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*export\s+(?:async\s+)?(?:function\s*\*?|class|const|let|var)\s*([A-Za-z_$][\w$]*)").unwrap()
});

static EXPORT_LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*export\s*\{([^}]*)\}").unwrap());

static DEFAULT_EXPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*export\s+default\b").unwrap());

/// Named exports of a module, in source order, and whether it has a default
/// export
pub fn describe_exports(src: &str) -> (Vec<String>, bool) {
    let mut names: Vec<(usize, String)> = DECLARED_EXPORT
        .captures_iter(src)
        .filter_map(|c| c.get(1).map(|m| (m.start(), m.as_str().to_string())))
        .collect();
    let mut has_default = DEFAULT_EXPORT.is_match(src);

    for list in EXPORT_LIST.captures_iter(src) {
        let Some(body) = list.get(1) else {
            continue;
        };
        for item in body.as_str().split(',') {
            let exported = match item.split_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => item.trim(),
            };
            if exported == "default" {
                has_default = true;
            } else if !exported.is_empty() {
                names.push((body.start(), exported.to_string()));
            }
        }
    }

    names.sort_by_key(|(position, _)| *position);
    let mut seen = std::collections::HashSet::new();
    let names = names
        .into_iter()
        .map(|(_, name)| name)
        .filter(|name| seen.insert(name.clone()))
        .collect();
    (names, has_default)
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

pub fn fastboot_switch(names: &[String], has_default: bool) -> VirtualContent {
    let mut src = String::from(
        "import { macroCondition, getGlobalConfig, importSync } from '@strata/macros';\n\
         let mod;\n\
         if (macroCondition(getGlobalConfig().fastboot?.isRunning)) {\n  mod = importSync(\"./fastboot\");\n} else {\n  mod = importSync(\"./browser\");\n}\n",
    );
    if has_default {
        src.push_str("export default mod.default;\n");
    }
    for name in names {
        src.push_str(&format!("export const {name} = mod.{name};\n"));
    }
    VirtualContent { src, watches: Vec::new() }
}

pub fn component_pair(hbs: &str, js: Option<&str>, debug_name: &str) -> VirtualContent {
    let mut src = String::from("import { setComponentTemplate } from \"@ember/component\";\n");
    src.push_str(&format!("import template from {};\n", quote(hbs)));

    if hbs.contains("/templates/components/") {
        let message = format!(
            "Components with separately resolved templates are deprecated. Migrate to either co-located js/ts + hbs files or to gjs/gts. Tried to lookup '{}'.",
            debug_name
        );
        src.push_str("import { deprecate } from \"@ember/debug\";\n");
        src.push_str(&format!(
            "deprecate({}, false, {{ id: 'component-template-resolving', url: 'https://deprecations.emberjs.com/id/component-template-resolving', until: '6.0.0', for: 'ember-source', since: {{ available: '5.10.0', enabled: '5.10.0' }} }});\n",
            quote(&message)
        ));
    }

    match js {
        Some(js) => {
            src.push_str(&format!("import owner from {};\n", quote(js)));
            src.push_str("export default setComponentTemplate(template, owner);\n");
        },
        None => {
            src.push_str("import templateOnlyComponent from \"@ember/component/template-only\";\n");
            src.push_str(&format!(
                "export default setComponentTemplate(template, templateOnlyComponent(undefined, {}));\n",
                quote(debug_name)
            ));
        },
    }
    VirtualContent { src, watches: Vec::new() }
}

/// A CommonJS module over the runtime loader, so the bundler's interop serves
/// both default and named imports
pub fn external(specifier: &str) -> VirtualContent {
    let src = if specifier == "require" {
        "module.exports = window.require;\n".to_string()
    } else {
        format!(
            "const m = window.require({});\n\
             if (m.default && !m.__esModule) {{\n  m.__esModule = true;\n}}\n\
             module.exports = m;\n",
            quote(specifier)
        )
    };
    VirtualContent { src, watches: Vec::new() }
}
