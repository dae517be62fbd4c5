//! Plugin resolution
//!
//! Every plugin in a [`PluginsParam`] is fetched into the cache (unless it is
//! already there), asked for its [`PluginInfo`], and then has its assets
//! fetched. Each plugin yields its own result; the results are reduced into a
//! single aggregate error at the end so one broken entry never hides another.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::artifact;
use crate::error::{GodelError, GodelResult, LocatorFailure};
use crate::layout::CacheLayout;
use crate::locator::{Locator, OsArch};
use crate::param::{LocatorWithResolverParam, PluginParam, PluginsParam};
use crate::plugin::info::PluginInfo;
use crate::plugin::protocol::PluginInfoProtocol;
use crate::resolver::{FetchTarget, Packaging, Resolver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub locator: Locator,
    pub path: PathBuf,
}

/// A plugin that is on disk and has described itself.
#[derive(Debug, Clone)]
pub struct PluginInfoWithAssets {
    pub info: PluginInfo,
    pub executable: PathBuf,
    pub assets: Vec<ResolvedAsset>,
}

impl PluginInfoWithAssets {
    pub fn locator(&self) -> &Locator {
        &self.info.locator
    }

    pub fn asset_paths(&self) -> Vec<PathBuf> {
        self.assets.iter().map(|a| a.path.clone()).collect()
    }
}

pub type ResolvedPlugins = BTreeMap<Locator, PluginInfoWithAssets>;

/// Result of resolving one plugin entry. A plugin whose assets fail carries
/// one failure per asset.
pub type PluginOutcome = Result<PluginInfoWithAssets, Vec<LocatorFailure>>;

pub struct PluginResolver<'a> {
    layout: &'a CacheLayout,
    os_arch: &'a OsArch,
    protocol: &'a dyn PluginInfoProtocol,
}

impl<'a> PluginResolver<'a> {
    pub fn new(layout: &'a CacheLayout, os_arch: &'a OsArch, protocol: &'a dyn PluginInfoProtocol) -> Self {
        Self {
            layout,
            os_arch,
            protocol,
        }
    }

    /// Resolve every plugin of every set in one pass, in locator order. Each
    /// plugin falls back to the default resolvers of the set it came from.
    pub fn resolve_each(&self, params: &[PluginsParam]) -> Vec<PluginOutcome> {
        let mut plugins: Vec<(&PluginParam, &[Arc<dyn Resolver>])> = params
            .iter()
            .flat_map(|param| {
                param
                    .plugins
                    .iter()
                    .map(move |plugin| (plugin, param.default_resolvers.as_slice()))
            })
            .collect();
        plugins.sort_by(|a, b| a.0.plugin.id().cmp(b.0.plugin.id()));
        plugins
            .into_iter()
            .map(|(plugin, defaults)| self.resolve_plugin(plugin, defaults))
            .collect()
    }

    fn resolve_plugin(&self, plugin: &PluginParam, defaults: &[Arc<dyn Resolver>]) -> PluginOutcome {
        let locator = plugin.plugin.id();
        let executable = self.layout.plugin_path(locator);

        let info = self
            .install_plugin(&plugin.plugin, defaults, &executable)
            .map_err(|error| {
                vec![LocatorFailure {
                    locator: locator.clone(),
                    error,
                }]
            })?;

        let mut assets = Vec::with_capacity(plugin.assets.len());
        let mut failures = Vec::new();
        for asset in &plugin.assets {
            let path = self.layout.asset_path(asset.id());
            match self.ensure_artifact(asset, defaults, &path) {
                Ok(_) => assets.push(ResolvedAsset {
                    locator: asset.id().clone(),
                    path,
                }),
                Err(error) => failures.push(LocatorFailure {
                    locator: asset.id().clone(),
                    error,
                }),
            }
        }
        if !failures.is_empty() {
            return Err(failures);
        }

        Ok(PluginInfoWithAssets {
            info,
            executable,
            assets,
        })
    }

    fn install_plugin(
        &self,
        param: &LocatorWithResolverParam,
        defaults: &[Arc<dyn Resolver>],
        executable: &Path,
    ) -> GodelResult<PluginInfo> {
        self.ensure_artifact(param, defaults, executable)?;
        let info = self.protocol.query(executable)?;
        info.validate(param.id())?;
        Ok(info)
    }

    /// Place the artifact at `dest` unless it is already there.
    fn ensure_artifact(
        &self,
        param: &LocatorWithResolverParam,
        defaults: &[Arc<dyn Resolver>],
        dest: &Path,
    ) -> GodelResult<()> {
        if dest.exists() {
            debug!("{} already cached at {}", param.id(), dest.display());
            return Ok(());
        }
        let downloads_dir = self.layout.downloads_dir();
        let target = FetchTarget {
            dest,
            downloads_dir: &downloads_dir,
            packaging: Packaging::SingleFileArchive,
        };
        artifact::resolve_artifact(param, defaults, self.os_arch, &target)
    }
}

/// Reduce per-plugin outcomes into the resolved set, or one error listing
/// every failure in locator order.
pub fn collect_resolved(outcomes: impl IntoIterator<Item = PluginOutcome>) -> GodelResult<ResolvedPlugins> {
    let mut resolved = ResolvedPlugins::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(plugin) => {
                resolved.insert(plugin.locator().clone(), plugin);
            }
            Err(errs) => failures.extend(errs),
        }
    }
    if !failures.is_empty() {
        failures.sort_by(|a, b| a.locator.cmp(&b.locator));
        return Err(GodelError::Resolution(failures));
    }
    Ok(resolved)
}

/// Resolve several plugin sets (for example the defaults and the project's
/// own plugins) into one map.
pub fn resolve_plugins(
    layout: &CacheLayout,
    os_arch: &OsArch,
    protocol: &dyn PluginInfoProtocol,
    params: &[PluginsParam],
) -> GodelResult<ResolvedPlugins> {
    let resolver = PluginResolver::new(layout, os_arch, protocol);
    collect_resolved(resolver.resolve_each(params))
}
