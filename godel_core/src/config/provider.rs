//! Task configuration providers
//!
//! A provider is a plain YAML fragment published like any other artifact.
//! It is fetched with the same resolver fallback chain as plugins, cached in
//! `configs/`, and merged into the project configuration.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::artifact::{self, Downloader};
use crate::config::{template_resolver, template_resolvers, ConfigProvidersConfig, PluginsConfig};
use crate::error::{GodelError, GodelResult, LocatorFailure};
use crate::layout::CacheLayout;
use crate::locator::{Locator, LocatorWithChecksums, OsArch};
use crate::param::LocatorWithResolverParam;
use crate::resolver::{FetchTarget, Packaging, Resolver};

#[derive(Debug, Clone)]
pub struct ConfigProviderParam {
    pub locator: Locator,
    pub checksum: Option<String>,
    pub resolver: Option<Arc<dyn Resolver>>,
}

impl ConfigProviderParam {
    /// A provider has one checksum for every platform.
    fn to_locator_param(&self, os_arch: &OsArch) -> LocatorWithResolverParam {
        let mut locator = LocatorWithChecksums::new(self.locator.clone());
        if let Some(sum) = &self.checksum {
            locator = locator.with_checksum(os_arch.clone(), sum.as_str());
        }
        LocatorWithResolverParam {
            locator,
            resolver: self.resolver.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigProvidersParam {
    pub default_resolvers: Vec<Arc<dyn Resolver>>,
    pub providers: Vec<ConfigProviderParam>,
}

impl ConfigProvidersConfig {
    pub fn to_param(&self, downloader: &Arc<dyn Downloader>) -> GodelResult<ConfigProvidersParam> {
        let mut providers = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let resolver = match provider.resolver.as_deref() {
                Some(template) => Some(template_resolver(template, downloader)?),
                None => None,
            };
            providers.push(ConfigProviderParam {
                locator: Locator::parse(&provider.locator.id)?,
                checksum: provider.locator.checksum.clone(),
                resolver,
            });
        }
        Ok(ConfigProvidersParam {
            default_resolvers: template_resolvers(&self.resolvers, downloader)?,
            providers,
        })
    }
}

/// The part of godel.yml a provider may contribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProvidedConfig {
    pub plugins: PluginsConfig,
    pub environment: BTreeMap<String, String>,
}

/// Fetch (or reuse) every provider and parse it. Fragments come back in
/// provider order; failures are reported together in locator order.
pub fn resolve_config_providers(
    param: &ConfigProvidersParam,
    layout: &CacheLayout,
    os_arch: &OsArch,
) -> GodelResult<Vec<ProvidedConfig>> {
    let mut provided = Vec::with_capacity(param.providers.len());
    let mut failures = Vec::new();
    for provider in &param.providers {
        match resolve_provider(provider, &param.default_resolvers, layout, os_arch) {
            Ok(fragment) => provided.push(fragment),
            Err(error) => failures.push(LocatorFailure {
                locator: provider.locator.clone(),
                error,
            }),
        }
    }
    if !failures.is_empty() {
        failures.sort_by(|a, b| a.locator.cmp(&b.locator));
        return Err(GodelError::Resolution(failures));
    }
    Ok(provided)
}

fn resolve_provider(
    provider: &ConfigProviderParam,
    defaults: &[Arc<dyn Resolver>],
    layout: &CacheLayout,
    os_arch: &OsArch,
) -> GodelResult<ProvidedConfig> {
    let dest = layout.config_path(&provider.locator);
    if dest.exists() {
        debug!("config provider {} already cached at {}", provider.locator, dest.display());
    } else {
        let downloads_dir = layout.downloads_dir();
        let target = FetchTarget {
            dest: &dest,
            downloads_dir: &downloads_dir,
            packaging: Packaging::PlainFile,
        };
        artifact::resolve_artifact(&provider.to_locator_param(os_arch), defaults, os_arch, &target)?;
    }

    let content = fs::read_to_string(&dest)
        .map_err(|e| GodelError::io(format!("failed to read {}", dest.display()), e))?;
    if content.trim().is_empty() {
        return Ok(ProvidedConfig::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}
