//! Package.json `exports` evaluation
//!
//! Handles the shapes build output actually uses:
//! - `exports: "./path"` string shorthand
//! - root and subpath keys (`"."`, `"./feature"`)
//! - `*` patterns, most specific key first
//! - condition objects, matched in declaration order
//! - fallback arrays, first resolvable entry wins

use serde_json::{Map, Value};

/// Conditions a browser build resolves with
pub const CONDITIONS: &[&str] = &["browser", "import", "default"];

/// Resolve `subpath` (`"."` or `"./..."`) against an `exports` value.
///
/// Returns the target path, starting with `./`.
pub fn resolve_exports(exports: &Value, subpath: &str, conditions: &[&str]) -> Option<String> {
    if subpath != "." && !subpath.starts_with("./") {
        return None;
    }

    let obj = match exports {
        Value::Object(obj) if has_subpath_keys(obj) => obj,
        // sugar: the whole value is the root export
        _ => {
            return if subpath == "." {
                resolve_target(exports, conditions, None)
            } else {
                None
            };
        },
    };

    if let Some(target) = obj.get(subpath) {
        return resolve_target(target, conditions, None);
    }

    let (target, star) = best_pattern(obj, subpath)?;
    resolve_target(target, conditions, Some(&star))
}

fn has_subpath_keys(obj: &Map<String, Value>) -> bool {
    obj.keys().any(|k| k.starts_with('.'))
}

/// Most specific `*` key matching `subpath`, with the matched text
fn best_pattern<'a>(obj: &'a Map<String, Value>, subpath: &str) -> Option<(&'a Value, String)> {
    obj.iter()
        .filter(|(key, _)| key.matches('*').count() == 1)
        .filter_map(|(key, value)| match_pattern(key, subpath).map(|star| (key, value, star)))
        .max_by(|a, b| {
            let (a_prefix, b_prefix) = (prefix_len(a.0), prefix_len(b.0));
            a_prefix.cmp(&b_prefix).then_with(|| a.0.len().cmp(&b.0.len()))
        })
        .map(|(_, value, star)| (value, star))
}

fn prefix_len(key: &str) -> usize {
    key.find('*').unwrap_or(key.len())
}

/// `"./features/*.js"` against `"./features/a/b.js"` yields `"a/b"`
fn match_pattern(pattern: &str, subpath: &str) -> Option<String> {
    let (prefix, suffix) = pattern.split_once('*')?;
    if subpath.len() < prefix.len() + suffix.len() {
        return None;
    }
    let star = subpath.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if star.is_empty() {
        return None;
    }
    Some(star.to_string())
}

fn resolve_target(target: &Value, conditions: &[&str], star: Option<&str>) -> Option<String> {
    match target {
        Value::String(path) => substitute(path, star),
        Value::Array(candidates) => candidates
            .iter()
            .find_map(|candidate| resolve_target(candidate, conditions, star)),
        Value::Object(map) => map
            .iter()
            .filter(|(condition, _)| conditions.contains(&condition.as_str()))
            .find_map(|(_, nested)| resolve_target(nested, conditions, star)),
        _ => None,
    }
}

fn substitute(path: &str, star: Option<&str>) -> Option<String> {
    let result = match star {
        Some(star) => path.replace('*', star),
        None => path.to_string(),
    };
    if !result.starts_with("./") || result.split('/').any(|segment| segment == "..") {
        return None;
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_shorthand() {
        let exports = json!("./dist/index.js");
        assert_eq!(resolve_exports(&exports, ".", CONDITIONS), Some("./dist/index.js".to_string()));
        assert_eq!(resolve_exports(&exports, "./other", CONDITIONS), None);
    }

    #[test]
    fn test_conditions_follow_declaration_order() {
        let exports = json!({
            ".": { "import": "./esm.js", "browser": "./browser.js", "default": "./d.js" }
        });
        assert_eq!(resolve_exports(&exports, ".", CONDITIONS), Some("./esm.js".to_string()));

        let exports = json!({ ".": { "node": "./node.js", "default": "./d.js" } });
        assert_eq!(resolve_exports(&exports, ".", CONDITIONS), Some("./d.js".to_string()));
    }

    #[test]
    fn test_root_conditions_without_dot() {
        let exports = json!({ "import": "./esm.js", "require": "./cjs.js" });
        assert_eq!(resolve_exports(&exports, ".", CONDITIONS), Some("./esm.js".to_string()));
    }

    #[test]
    fn test_patterns() {
        let exports = json!({
            "./*": "./dist/*.js",
            "./components/*": { "import": "./dist/_app_/components/*.js" }
        });
        assert_eq!(
            resolve_exports(&exports, "./components/card", CONDITIONS),
            Some("./dist/_app_/components/card.js".to_string())
        );
        assert_eq!(resolve_exports(&exports, "./x", CONDITIONS), Some("./dist/x.js".to_string()));
    }

    #[test]
    fn test_arrays_and_traversal() {
        let exports = json!({ ".": ["../escape.js", "./ok.js"] });
        assert_eq!(resolve_exports(&exports, ".", CONDITIONS), Some("./ok.js".to_string()));
    }

    #[test]
    fn test_exact_beats_pattern() {
        let exports = json!({ "./*": "./dist/*.js", "./special": "./special.js" });
        assert_eq!(resolve_exports(&exports, "./special", CONDITIONS), Some("./special.js".to_string()));
    }
}
