//! Project configuration (`godel/config/godel.yml`)
//!
//! The YAML model mirrors the file one-to-one. Conversion into
//! [`PluginsParam`] parses every locator, checksum key and resolver template,
//! so configuration mistakes surface before any download starts.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::artifact::Downloader;
use crate::error::{GodelError, GodelResult};
use crate::locator::LocatorWithChecksums;
use crate::param::{LocatorWithResolverParam, PluginParam, PluginsParam};
use crate::resolver::{Resolver, TemplateResolver};

pub mod defaults;
pub mod provider;

pub use defaults::{DefaultPlugin, DefaultPlugins};
pub use provider::{resolve_config_providers, ConfigProviderParam, ConfigProvidersParam, ProvidedConfig};

/// Path of the project configuration relative to the project directory.
pub const GODEL_CONFIG_PATH: &str = "godel/config/godel.yml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GodelConfig {
    pub plugins: PluginsConfig,
    pub default_tasks: DefaultTasksConfig,
    pub tasks_config_providers: ConfigProvidersConfig,
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    pub resolvers: Vec<String>,
    pub plugins: Vec<PluginConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub locator: LocatorConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,
    /// Replace the built-in default plugin with the same group and product.
    #[serde(default, rename = "override")]
    pub override_default: bool,
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorConfig {
    pub id: String,
    #[serde(default)]
    pub checksums: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub locator: LocatorConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultTasksConfig {
    pub resolvers: Vec<String>,
    /// Keyed by `group:product` of a default plugin.
    pub tasks: BTreeMap<String, DefaultTaskConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DefaultTaskConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,
    pub exclude: bool,
    pub exclude_all_default_assets: bool,
    pub default_assets_to_exclude: Vec<String>,
    pub assets: Vec<AssetConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigProvidersConfig {
    pub resolvers: Vec<String>,
    pub providers: Vec<ConfigProviderConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigProviderConfig {
    pub locator: ConfigProviderLocatorConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigProviderLocatorConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl GodelConfig {
    pub fn load(path: &Path) -> GodelResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| GodelError::io(format!("failed to read {}", path.display()), e))?;
        Self::from_yaml(&content)
            .map_err(|e| GodelError::config(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn from_yaml(content: &str) -> GodelResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        // A document holding only comments parses as null.
        match serde_yaml::from_str::<serde_yaml::Value>(content)? {
            serde_yaml::Value::Null => Ok(Self::default()),
            value => Ok(serde_yaml::from_value(value)?),
        }
    }

    /// Merge configuration fragments from providers, in order. Resolvers and
    /// plugins are appended; environment entries already set are kept.
    pub fn merge_provided(&mut self, provided: impl IntoIterator<Item = ProvidedConfig>) {
        for fragment in provided {
            self.plugins.resolvers.extend(fragment.plugins.resolvers);
            self.plugins.plugins.extend(fragment.plugins.plugins);
            for (key, value) in fragment.environment {
                self.environment.entry(key).or_insert(value);
            }
        }
    }
}

impl LocatorConfig {
    pub fn to_checksums(&self) -> GodelResult<LocatorWithChecksums> {
        LocatorWithChecksums::from_config(&self.id, &self.checksums)
    }
}

pub(crate) fn template_resolver(template: &str, downloader: &Arc<dyn Downloader>) -> GodelResult<Arc<dyn Resolver>> {
    Ok(Arc::new(TemplateResolver::new(template, downloader.clone())?))
}

pub(crate) fn template_resolvers(
    templates: &[String],
    downloader: &Arc<dyn Downloader>,
) -> GodelResult<Vec<Arc<dyn Resolver>>> {
    templates
        .iter()
        .map(|t| template_resolver(t, downloader))
        .collect()
}

fn locator_param(
    locator: &LocatorConfig,
    resolver: Option<&str>,
    downloader: &Arc<dyn Downloader>,
) -> GodelResult<LocatorWithResolverParam> {
    let mut param = LocatorWithResolverParam::new(locator.to_checksums()?);
    if let Some(template) = resolver {
        param = param.with_resolver(template_resolver(template, downloader)?);
    }
    Ok(param)
}

impl AssetConfig {
    pub fn to_param(&self, downloader: &Arc<dyn Downloader>) -> GodelResult<LocatorWithResolverParam> {
        locator_param(&self.locator, self.resolver.as_deref(), downloader)
    }
}

impl PluginConfig {
    pub fn to_param(&self, downloader: &Arc<dyn Downloader>) -> GodelResult<PluginParam> {
        let mut param = PluginParam::new(locator_param(&self.locator, self.resolver.as_deref(), downloader)?);
        for asset in &self.assets {
            param = param.with_asset(asset.to_param(downloader)?);
        }
        Ok(param)
    }
}

impl PluginsConfig {
    pub fn to_param(&self, downloader: &Arc<dyn Downloader>) -> GodelResult<PluginsParam> {
        Ok(PluginsParam {
            default_resolvers: template_resolvers(&self.resolvers, downloader)?,
            plugins: self
                .plugins
                .iter()
                .map(|p| p.to_param(downloader))
                .collect::<GodelResult<_>>()?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug)]
    pub(crate) struct NoDownloads;

    impl Downloader for NoDownloads {
        fn download(&self, url: &str, _out: &mut dyn Write) -> GodelResult<u64> {
            panic!("unexpected download of {url}");
        }
    }

    pub(crate) fn no_downloads() -> Arc<dyn Downloader> {
        Arc::new(NoDownloads)
    }

    const CONFIG: &str = r#"
plugins:
  resolvers:
    - https://example.com/{{GroupPath}}/{{Product}}/{{Version}}/{{Product}}-{{Version}}-{{OS}}-{{Arch}}.tgz
  plugins:
    - locator:
        id: com.palantir:tester:1.0.0
        checksums:
          darwin-amd64: ABC
      assets:
        - locator:
            id: com.palantir:tester-asset:1.0.0
          resolver: file:///tmp/{{Product}}.tgz
    - locator:
        id: com.palantir.godel-format-plugin:format-plugin:2.0.0
      override: true
default-tasks:
  tasks:
    com.palantir.godel-license-plugin:license-plugin:
      exclude: true
environment:
  GOFLAGS: -mod=vendor
"#;

    #[test]
    fn test_parse_config() {
        let config = GodelConfig::from_yaml(CONFIG).unwrap();
        assert_eq!(config.plugins.resolvers.len(), 1);
        assert_eq!(config.plugins.plugins.len(), 2);
        assert!(config.plugins.plugins[1].override_default);
        assert!(config.default_tasks.tasks["com.palantir.godel-license-plugin:license-plugin"].exclude);
        assert_eq!(config.environment["GOFLAGS"], "-mod=vendor");
    }

    #[test]
    fn test_empty_config() {
        assert_eq!(GodelConfig::from_yaml("").unwrap(), GodelConfig::default());
        assert_eq!(GodelConfig::from_yaml("\n# nothing\n").unwrap(), GodelConfig::default());
    }

    #[test]
    fn test_to_param() {
        let config = GodelConfig::from_yaml(CONFIG).unwrap();
        let param = config.plugins.to_param(&no_downloads()).unwrap();
        assert_eq!(param.default_resolvers.len(), 1);

        let tester = &param.plugins[0];
        assert_eq!(tester.plugin.id().to_string(), "com.palantir:tester:1.0.0");
        assert!(tester.plugin.resolver.is_none());
        assert_eq!(
            tester.plugin.locator.checksum_for(&"darwin-amd64".parse().unwrap()),
            Some("abc")
        );
        assert_eq!(tester.assets.len(), 1);
        assert!(tester.assets[0].resolver.is_some());
    }

    #[test]
    fn test_to_param_rejects_bad_entries() {
        let mut config = GodelConfig::from_yaml(CONFIG).unwrap();
        config.plugins.resolvers = vec!["{{Nope}}".to_string()];
        assert!(matches!(
            config.plugins.to_param(&no_downloads()),
            Err(GodelError::InvalidTemplate { .. })
        ));

        let mut config = GodelConfig::from_yaml(CONFIG).unwrap();
        config.plugins.plugins[0].locator.id = "missing-parts".to_string();
        assert!(matches!(
            config.plugins.to_param(&no_downloads()),
            Err(GodelError::MalformedLocator { .. })
        ));

        let mut config = GodelConfig::from_yaml(CONFIG).unwrap();
        config.plugins.plugins[0]
            .locator
            .checksums
            .insert("plan9-z80".to_string(), "00".to_string());
        assert!(matches!(
            config.plugins.to_param(&no_downloads()),
            Err(GodelError::InvalidOsArch { .. })
        ));
    }

    #[test]
    fn test_merge_provided() {
        let mut config = GodelConfig::from_yaml(CONFIG).unwrap();
        let fragment: ProvidedConfig = serde_yaml::from_str(
            r#"
plugins:
  resolvers: [ "file:///mirror/{{Product}}.tgz" ]
  plugins:
    - locator: { id: "org.extra:extra:0.1.0" }
environment:
  GOFLAGS: ignored
  EXTRA: "1"
"#,
        )
        .unwrap();
        config.merge_provided(vec![fragment]);

        assert_eq!(config.plugins.resolvers.len(), 2);
        assert_eq!(config.plugins.plugins.len(), 3);
        assert_eq!(config.plugins.plugins[2].locator.id, "org.extra:extra:0.1.0");
        assert_eq!(config.environment["GOFLAGS"], "-mod=vendor");
        assert_eq!(config.environment["EXTRA"], "1");
    }
}
