//! On-disk package trees for tests

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// A temporary directory that packages and files are written into.
///
/// The root is canonicalized so paths handed out compare equal to the ones
/// the caches produce.
pub struct Fixture {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let canonical = std::fs::canonicalize(dir.path()).expect("canonicalize temp dir");
        let root = Utf8PathBuf::try_from(canonical).expect("temp dir is utf-8");
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Absolute path of `relative` inside the fixture
    pub fn path(&self, relative: &str) -> Utf8PathBuf {
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }

    /// Write a file, creating parent directories
    pub fn write(&self, relative: &str, content: &str) -> Utf8PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dirs");
        }
        std::fs::write(&path, content).expect("write fixture file");
        path
    }

    /// Write a pretty-printed JSON file
    pub fn write_json(&self, relative: &str, value: serde_json::Value) -> Utf8PathBuf {
        let content = serde_json::to_string_pretty(&value).expect("serialize fixture json");
        self.write(relative, &content)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
