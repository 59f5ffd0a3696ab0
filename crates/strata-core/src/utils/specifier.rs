//! Module specifier helpers.

/// Check if a specifier is relative to the importing file
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Package name portion of a bare specifier.
///
/// Returns `None` for relative and absolute specifiers. Scoped names keep
/// their scope: `@scope/pkg/deep/file` yields `@scope/pkg`.
pub fn package_name(specifier: &str) -> Option<&str> {
    if specifier.is_empty() || specifier.starts_with('.') || specifier.starts_with('/') {
        return None;
    }

    if specifier.starts_with('@') {
        let mut slashes = specifier.match_indices('/');
        let (first, _) = slashes.next()?;
        return match slashes.next() {
            Some((second, _)) => Some(&specifier[..second]),
            None if first + 1 < specifier.len() => Some(specifier),
            None => None,
        };
    }

    match specifier.find('/') {
        Some(idx) => Some(&specifier[..idx]),
        None => Some(specifier),
    }
}

/// Rewrite `pkg/rest` into `./rest` (and `pkg` into `.`)
pub fn package_relative(specifier: &str, name: &str) -> Option<String> {
    let rest = specifier.strip_prefix(name)?;
    if rest.is_empty() {
        Some(".".to_string())
    } else if rest.starts_with('/') {
        Some(format!(".{}", rest))
    } else {
        None
    }
}
