//! Path utilities for module resolution.
//!
//! All module-facing paths are reported with forward slashes regardless of
//! platform, since they end up inside generated JavaScript.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Normalize a path by resolving . and .. components lexically
pub fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut components: Vec<Utf8Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Utf8Component::CurDir => {},
            Utf8Component::ParentDir => match components.last() {
                Some(Utf8Component::Normal(_)) => {
                    components.pop();
                },
                Some(Utf8Component::RootDir) | Some(Utf8Component::Prefix(_)) => {
                    // `/..` is `/`
                },
                _ => components.push(component),
            },
            other => components.push(other),
        }
    }

    components.iter().map(|c| c.as_str()).collect()
}

/// Check if `path` is `dir` or lives underneath it
pub fn is_within(path: &Utf8Path, dir: &Utf8Path) -> bool {
    normalize_path(path).starts_with(normalize_path(dir))
}

/// Relative specifier from `from_dir` to `to`, always starting with `./` or `../`
pub fn explicit_relative(from_dir: &Utf8Path, to: &Utf8Path) -> String {
    let relative = pathdiff::diff_utf8_paths(normalize_path(to), normalize_path(from_dir))
        .map(|p| to_posix(p.as_str()))
        .unwrap_or_else(|| to_posix(to.as_str()));

    if relative.is_empty() {
        ".".to_string()
    } else if relative.starts_with("../") || relative == ".." {
        relative
    } else {
        format!("./{}", relative)
    }
}

/// Convert platform separators to forward slashes
pub fn to_posix(path: &str) -> String {
    path.replace('\\', "/")
}

/// Strip the longest matching extension from `extensions`
pub fn without_extension<'a>(path: &'a str, extensions: &[String]) -> &'a str {
    extensions
        .iter()
        .filter(|ext| path.len() > ext.len() && path.ends_with(ext.as_str()))
        .max_by_key(|ext| ext.len())
        .map(|ext| &path[..path.len() - ext.len()])
        .unwrap_or(path)
}

/// Get the file extension as a lowercase string
pub fn get_extension(path: &Utf8Path) -> Option<String> {
    path.extension().map(|ext| ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        let path = Utf8Path::new("./src/../lib/./file.js");
        assert_eq!(normalize_path(path), Utf8Path::new("lib/file.js"));

        let absolute = Utf8Path::new("/app/components/../helpers/x.js");
        assert_eq!(normalize_path(absolute), Utf8Path::new("/app/helpers/x.js"));

        assert_eq!(normalize_path(Utf8Path::new("/..")), Utf8Path::new("/"));
        assert_eq!(normalize_path(Utf8Path::new("../x")), Utf8Path::new("../x"));
    }

    #[test]
    fn test_is_within() {
        assert!(is_within(Utf8Path::new("/app/a/b.js"), Utf8Path::new("/app")));
        assert!(is_within(Utf8Path::new("/app"), Utf8Path::new("/app")));
        assert!(!is_within(Utf8Path::new("/application/x.js"), Utf8Path::new("/app")));
        assert!(!is_within(Utf8Path::new("/app/../other/x.js"), Utf8Path::new("/app")));
    }

    #[test]
    fn test_explicit_relative() {
        assert_eq!(
            explicit_relative(Utf8Path::new("/app"), Utf8Path::new("/app/components/x.js")),
            "./components/x.js"
        );
        assert_eq!(
            explicit_relative(Utf8Path::new("/app/lib"), Utf8Path::new("/app/x.js")),
            "../x.js"
        );
        assert_eq!(explicit_relative(Utf8Path::new("/app"), Utf8Path::new("/app")), ".");
    }

    #[test]
    fn test_without_extension() {
        let exts = vec![".js".to_string(), ".hbs".to_string(), ".hbs.js".to_string()];
        assert_eq!(without_extension("./components/x.js", &exts), "./components/x");
        assert_eq!(without_extension("./components/x.hbs.js", &exts), "./components/x");
        assert_eq!(without_extension("./components/x", &exts), "./components/x");
        assert_eq!(without_extension(".js", &exts), ".js");
    }

    #[test]
    fn test_get_extension() {
        assert_eq!(get_extension(Utf8Path::new("file.JS")), Some("js".to_string()));
        assert_eq!(get_extension(Utf8Path::new("no_extension")), None);
    }
}
