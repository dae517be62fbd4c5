//! Built-in default plugins and how a project adjusts them
//!
//! The launcher ships with a set of default plugins. A project can exclude a
//! default, point it at another resolver, trim or extend its assets, or
//! replace it outright with a plugin marked `override`.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::artifact::Downloader;
use crate::config::{template_resolver, template_resolvers, GodelConfig};
use crate::error::{GodelError, GodelResult};
use crate::locator::{Locator, LocatorWithChecksums};
use crate::param::{LocatorWithResolverParam, PluginParam, PluginsParam};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPlugin {
    pub locator: LocatorWithChecksums,
    pub assets: Vec<LocatorWithChecksums>,
}

impl DefaultPlugin {
    pub fn new(locator: LocatorWithChecksums) -> Self {
        Self {
            locator,
            assets: Vec::new(),
        }
    }

    pub fn with_asset(mut self, asset: LocatorWithChecksums) -> Self {
        self.assets.push(asset);
        self
    }
}

/// The default plugin set, passed in by whoever builds the launcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultPlugins {
    pub resolvers: Vec<String>,
    pub plugins: Vec<DefaultPlugin>,
}

impl DefaultPlugins {
    /// Parameters for the default plugins after applying the project's
    /// `default-tasks` settings and `override` plugins.
    pub fn plugins_param(&self, config: &GodelConfig, downloader: &Arc<dyn Downloader>) -> GodelResult<PluginsParam> {
        let known: BTreeSet<String> = self.plugins.iter().map(|p| p.locator.locator.key()).collect();
        if let Some(unknown) = config.default_tasks.tasks.keys().find(|k| !known.contains(*k)) {
            return Err(GodelError::config(format!(
                "default-tasks.tasks refers to {unknown:?}, which is not a default plugin"
            )));
        }

        let mut overridden = BTreeSet::new();
        for plugin in config.plugins.plugins.iter().filter(|p| p.override_default) {
            overridden.insert(Locator::parse(&plugin.locator.id)?.key());
        }

        let resolvers = if config.default_tasks.resolvers.is_empty() {
            &self.resolvers
        } else {
            &config.default_tasks.resolvers
        };

        let mut plugins = Vec::new();
        for default in &self.plugins {
            let key = default.locator.locator.key();
            let settings = config.default_tasks.tasks.get(&key);

            if settings.map_or(false, |s| s.exclude) {
                debug!("default plugin {} excluded by configuration", key);
                continue;
            }
            if overridden.contains(&key) {
                debug!("default plugin {} overridden by project plugin", key);
                continue;
            }

            let mut plugin = LocatorWithResolverParam::new(default.locator.clone());
            if let Some(template) = settings.and_then(|s| s.resolver.as_deref()) {
                plugin = plugin.with_resolver(template_resolver(template, downloader)?);
            }
            let mut param = PluginParam::new(plugin);

            let exclude_all = settings.map_or(false, |s| s.exclude_all_default_assets);
            let excluded: BTreeSet<&str> = settings
                .map(|s| s.default_assets_to_exclude.iter().map(String::as_str).collect())
                .unwrap_or_default();
            if !exclude_all {
                for asset in &default.assets {
                    if !excluded.contains(asset.locator.key().as_str()) {
                        param = param.with_asset(LocatorWithResolverParam::new(asset.clone()));
                    }
                }
            }
            for asset in settings.map(|s| s.assets.as_slice()).unwrap_or_default() {
                param = param.with_asset(asset.to_param(downloader)?);
            }
            plugins.push(param);
        }

        Ok(PluginsParam {
            default_resolvers: template_resolvers(resolvers, downloader)?,
            plugins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::no_downloads;
    use crate::config::{AssetConfig, DefaultTaskConfig, LocatorConfig, PluginConfig};

    fn checksums(id: &str) -> LocatorWithChecksums {
        LocatorWithChecksums::new(id.parse().unwrap())
    }

    fn defaults() -> DefaultPlugins {
        DefaultPlugins {
            resolvers: vec!["https://repo.example.com/{{GroupPath}}/{{Product}}-{{Version}}.tgz".to_string()],
            plugins: vec![
                DefaultPlugin::new(checksums("com.palantir.godel-format-plugin:format-plugin:1.0.0"))
                    .with_asset(checksums("com.palantir.godel-format-asset-ptimports:ptimports-asset:1.0.0"))
                    .with_asset(checksums("com.palantir.godel-format-asset-gofmt:gofmt-asset:1.0.0")),
                DefaultPlugin::new(checksums("com.palantir.godel-license-plugin:license-plugin:1.0.0")),
            ],
        }
    }

    fn ids(param: &PluginsParam) -> Vec<String> {
        param.plugins.iter().map(|p| p.plugin.id().to_string()).collect()
    }

    #[test]
    fn test_defaults_unchanged() {
        let param = defaults()
            .plugins_param(&GodelConfig::default(), &no_downloads())
            .unwrap();
        assert_eq!(param.default_resolvers.len(), 1);
        assert_eq!(param.plugins.len(), 2);
        assert_eq!(param.plugins[0].assets.len(), 2);
    }

    #[test]
    fn test_exclude_and_override() {
        let mut config = GodelConfig::default();
        config.default_tasks.tasks.insert(
            "com.palantir.godel-license-plugin:license-plugin".to_string(),
            DefaultTaskConfig {
                exclude: true,
                ..DefaultTaskConfig::default()
            },
        );
        config.plugins.plugins.push(PluginConfig {
            locator: LocatorConfig {
                id: "com.palantir.godel-format-plugin:format-plugin:2.0.0".to_string(),
                checksums: Default::default(),
            },
            resolver: None,
            override_default: true,
            assets: Vec::new(),
        });

        let param = defaults().plugins_param(&config, &no_downloads()).unwrap();
        assert!(ids(&param).is_empty());
    }

    #[test]
    fn test_asset_adjustments() {
        let mut config = GodelConfig::default();
        config.default_tasks.resolvers = vec!["file:///a/{{Product}}.tgz".to_string(), "file:///b/{{Product}}.tgz".to_string()];
        config.default_tasks.tasks.insert(
            "com.palantir.godel-format-plugin:format-plugin".to_string(),
            DefaultTaskConfig {
                resolver: Some("file:///override/{{Product}}.tgz".to_string()),
                default_assets_to_exclude: vec!["com.palantir.godel-format-asset-gofmt:gofmt-asset".to_string()],
                assets: vec![AssetConfig {
                    locator: LocatorConfig {
                        id: "org.custom:custom-asset:0.1.0".to_string(),
                        checksums: Default::default(),
                    },
                    resolver: None,
                }],
                ..DefaultTaskConfig::default()
            },
        );

        let param = defaults().plugins_param(&config, &no_downloads()).unwrap();
        assert_eq!(param.default_resolvers.len(), 2);

        let format = &param.plugins[0];
        assert!(format.plugin.resolver.is_some());
        let assets: Vec<String> = format.assets.iter().map(|a| a.id().to_string()).collect();
        assert_eq!(
            assets,
            vec![
                "com.palantir.godel-format-asset-ptimports:ptimports-asset:1.0.0",
                "org.custom:custom-asset:0.1.0",
            ]
        );

        config
            .default_tasks
            .tasks
            .get_mut("com.palantir.godel-format-plugin:format-plugin")
            .unwrap()
            .exclude_all_default_assets = true;
        let param = defaults().plugins_param(&config, &no_downloads()).unwrap();
        assert_eq!(param.plugins[0].assets.len(), 1);
    }

    #[test]
    fn test_unknown_default_task_key() {
        let mut config = GodelConfig::default();
        config
            .default_tasks
            .tasks
            .insert("org.nobody:nothing".to_string(), DefaultTaskConfig::default());
        assert!(matches!(
            defaults().plugins_param(&config, &no_downloads()),
            Err(GodelError::Config(_))
        ));
    }
}
