//! Dependency section kinds.
//!
//! A package.json declares dependencies in several sections. Which sections
//! count toward a package's dependency set depends on whether the package is
//! the app itself.

use serde::{Deserialize, Serialize};

/// Type of dependency, named after the package.json section that declares it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    /// `dependencies`
    Normal,
    /// `devDependencies`
    Dev,
    /// `peerDependencies`
    Peer,
    /// `optionalDependencies`
    Optional,
}

impl DependencyKind {
    /// The package.json key for this section
    pub fn section(&self) -> &'static str {
        match self {
            DependencyKind::Normal => "dependencies",
            DependencyKind::Dev => "devDependencies",
            DependencyKind::Peer => "peerDependencies",
            DependencyKind::Optional => "optionalDependencies",
        }
    }

    /// Sections that make up a package's dependency set, in lookup order.
    ///
    /// Production packages never see their devDependencies; the app does.
    pub fn applicable(is_app: bool) -> &'static [DependencyKind] {
        if is_app {
            &[
                DependencyKind::Normal,
                DependencyKind::Dev,
                DependencyKind::Peer,
                DependencyKind::Optional,
            ]
        } else {
            &[
                DependencyKind::Normal,
                DependencyKind::Peer,
                DependencyKind::Optional,
            ]
        }
    }

    /// Check if a missing package of this kind is expected
    pub fn may_be_missing(&self) -> bool {
        matches!(self, DependencyKind::Peer | DependencyKind::Optional)
    }
}
