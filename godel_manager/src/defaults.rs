//! Plugins every project gets unless its configuration says otherwise.

use godel_core::{DefaultPlugin, DefaultPlugins, GodelResult, Locator, LocatorWithChecksums};

/// Maven Central layout used for the default plugins and their assets.
pub const DEFAULT_RESOLVER: &str =
    "https://repo1.maven.org/maven2/{{GroupPath}}/{{Product}}/{{Version}}/{{Product}}-{{Version}}-{{OS}}-{{Arch}}.tgz";

const DEFAULT_PLUGINS: &[(&str, &[&str])] = &[
    (
        "com.palantir.distgo:dist-plugin:1.59.0",
        &[],
    ),
    (
        "com.palantir.godel-format-plugin:format-plugin:1.10.0",
        &["com.palantir.godel-format-asset-ptimports:ptimports-asset:1.8.0"],
    ),
    (
        "com.palantir.godel-license-plugin:license-plugin:1.12.0",
        &[],
    ),
    (
        "com.palantir.godel-test-plugin:test-plugin:1.9.0",
        &[],
    ),
    (
        "com.palantir.okgo:check-plugin:1.41.0",
        &[
            "com.palantir.godel-okgo-asset-compiles:compiles-asset:1.20.0",
            "com.palantir.godel-okgo-asset-errcheck:errcheck-asset:1.20.0",
            "com.palantir.godel-okgo-asset-govet:govet-asset:1.14.0",
            "com.palantir.godel-okgo-asset-ineffassign:ineffassign-asset:1.12.0",
        ],
    ),
];

pub fn default_plugins() -> GodelResult<DefaultPlugins> {
    let mut plugins = Vec::with_capacity(DEFAULT_PLUGINS.len());
    for (id, assets) in DEFAULT_PLUGINS {
        let mut plugin = DefaultPlugin::new(LocatorWithChecksums::new(Locator::parse(id)?));
        for asset in *assets {
            plugin = plugin.with_asset(LocatorWithChecksums::new(Locator::parse(asset)?));
        }
        plugins.push(plugin);
    }
    Ok(DefaultPlugins {
        resolvers: vec![DEFAULT_RESOLVER.to_string()],
        plugins,
    })
}
