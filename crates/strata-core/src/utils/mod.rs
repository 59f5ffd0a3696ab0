//! Utility functions and helpers.
//!
//! Common functionality used across multiple Strata crates.

pub mod path;
pub mod specifier;

// Re-export commonly used utilities
pub use path::{explicit_relative, is_within, normalize_path, to_posix, without_extension};
pub use specifier::{is_relative, package_name, package_relative};

#[cfg(test)]
mod tests {
    use crate::utils::{package_relative, to_posix};

    #[test]
    fn test_reexported_helpers() {
        assert_eq!(package_relative("my-addon/components/x", "my-addon").as_deref(), Some("./components/x"));
        assert_eq!(package_relative("my-addon", "my-addon").as_deref(), Some("."));
        assert_eq!(package_relative("my-addon-two", "my-addon"), None);
        assert_eq!(to_posix("components\\x.js"), "components/x.js");
    }
}
