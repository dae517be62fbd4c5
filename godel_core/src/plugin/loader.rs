//! Turning plugin parameters into runnable tasks.

use std::sync::Arc;

use tracing::debug;

use crate::error::GodelResult;
use crate::layout::CacheLayout;
use crate::locator::OsArch;
use crate::param::PluginsParam;
use crate::plugin::compat::verify_compatibility;
use crate::plugin::protocol::{ExecInfoProtocol, PluginInfoProtocol};
use crate::plugin::resolve::{resolve_plugins, ResolvedPlugins};
use crate::task::{Task, UpgradeConfigTask};

/// Tasks in plugin locator order, then in the order each plugin lists them.
#[derive(Debug, Clone, Default)]
pub struct LoadedTasks {
    pub tasks: Vec<Task>,
    pub upgrade_tasks: Vec<UpgradeConfigTask>,
}

impl LoadedTasks {
    pub fn from_resolved(plugins: &ResolvedPlugins) -> Self {
        let mut loaded = LoadedTasks::default();
        for plugin in plugins.values() {
            loaded
                .tasks
                .extend(plugin.info.tasks.iter().map(|info| Task::from_plugin(plugin, info)));
            if let Some(upgrade) = &plugin.info.upgrade_config_task {
                loaded.upgrade_tasks.push(UpgradeConfigTask::from_plugin(plugin, upgrade));
            }
        }
        loaded
    }

    pub fn find(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct PluginLoader {
    layout: CacheLayout,
    os_arch: OsArch,
    protocol: Arc<dyn PluginInfoProtocol>,
}

impl PluginLoader {
    pub fn new(layout: CacheLayout) -> Self {
        Self {
            layout,
            os_arch: OsArch::current(),
            protocol: Arc::new(ExecInfoProtocol),
        }
    }

    pub fn with_os_arch(mut self, os_arch: OsArch) -> Self {
        self.os_arch = os_arch;
        self
    }

    pub fn with_protocol(mut self, protocol: Arc<dyn PluginInfoProtocol>) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn os_arch(&self) -> &OsArch {
        &self.os_arch
    }

    /// Resolve every plugin set and check the combined result for conflicts.
    pub fn resolve(&self, params: &[PluginsParam]) -> GodelResult<ResolvedPlugins> {
        let plugins = resolve_plugins(&self.layout, &self.os_arch, self.protocol.as_ref(), params)?;
        verify_compatibility(&plugins)?;
        debug!("resolved {} plugin(s)", plugins.len());
        Ok(plugins)
    }

    pub fn load_plugins_tasks(&self, params: &[PluginsParam]) -> GodelResult<LoadedTasks> {
        let plugins = self.resolve(params)?;
        Ok(LoadedTasks::from_resolved(&plugins))
    }
}
