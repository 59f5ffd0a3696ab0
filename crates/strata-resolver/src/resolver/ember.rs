//! Packages provided by the ember runtime rather than by node_modules

/// Peer dependencies every ember addon may import without declaring them;
/// they resolve from the app.
pub const VIRTUAL_PEER_DEPS: &[&str] = &["@glimmer/component", "@glimmer/tracking"];

const EMBER_VIRTUAL_PACKAGES: &[&str] = &[
    "@ember/application",
    "@ember/array",
    "@ember/canary-features",
    "@ember/component",
    "@ember/controller",
    "@ember/debug",
    "@ember/destroyable",
    "@ember/engine",
    "@ember/enumerable",
    "@ember/error",
    "@ember/helper",
    "@ember/instrumentation",
    "@ember/modifier",
    "@ember/object",
    "@ember/owner",
    "@ember/polyfills",
    "@ember/renderer",
    "@ember/routing",
    "@ember/runloop",
    "@ember/service",
    "@ember/template",
    "@ember/template-compilation",
    "@ember/template-factory",
    "@ember/test",
    "@ember/utils",
    "@ember/version",
    "@glimmer/env",
    "ember",
    "ember-testing",
    "require",
    "rsvp",
];

/// Check if `name` is supplied by the ember runtime at `ember_version`
pub fn is_ember_virtual_package(name: &str, ember_version: &semver::Version) -> bool {
    if name == "@ember/string" {
        return ember_version.major < 5;
    }
    EMBER_VIRTUAL_PACKAGES.contains(&name)
}
