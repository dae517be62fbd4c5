//! Resolution parameters
//!
//! These are the validated, in-memory form of the `plugins` configuration
//! block. Resolver templates are already parsed here, so a bad template or
//! checksum key is reported before anything is downloaded.

use std::sync::Arc;

use crate::locator::{Locator, LocatorWithChecksums};
use crate::resolver::Resolver;

/// A locator with an optional resolver that replaces the default list.
#[derive(Debug, Clone)]
pub struct LocatorWithResolverParam {
    pub locator: LocatorWithChecksums,
    pub resolver: Option<Arc<dyn Resolver>>,
}

impl LocatorWithResolverParam {
    pub fn new(locator: LocatorWithChecksums) -> Self {
        Self {
            locator,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn id(&self) -> &Locator {
        &self.locator.locator
    }

    /// The resolvers to try, in order. An explicit resolver is used alone.
    pub fn resolvers<'a>(&'a self, defaults: &'a [Arc<dyn Resolver>]) -> Vec<&'a dyn Resolver> {
        match &self.resolver {
            Some(resolver) => vec![resolver.as_ref()],
            None => defaults.iter().map(|r| r.as_ref()).collect(),
        }
    }
}

/// A plugin and the assets handed to it as extra file paths.
#[derive(Debug, Clone)]
pub struct PluginParam {
    pub plugin: LocatorWithResolverParam,
    pub assets: Vec<LocatorWithResolverParam>,
}

impl PluginParam {
    pub fn new(plugin: LocatorWithResolverParam) -> Self {
        Self {
            plugin,
            assets: Vec::new(),
        }
    }

    pub fn with_asset(mut self, asset: LocatorWithResolverParam) -> Self {
        self.assets.push(asset);
        self
    }
}

/// A set of plugins sharing one ordered list of default resolvers.
#[derive(Debug, Clone, Default)]
pub struct PluginsParam {
    pub default_resolvers: Vec<Arc<dyn Resolver>>,
    pub plugins: Vec<PluginParam>,
}

impl PluginsParam {
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
