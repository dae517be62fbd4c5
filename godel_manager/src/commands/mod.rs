//! Command implementations for the godel CLI
//!
//! Every command except `version` needs the project's plugins resolved;
//! [`Launcher::load`] does that once and hands out the tasks.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use godel_core::config::resolve_config_providers;
use godel_core::plugin::ResolvedPlugins;
use godel_core::{
    CacheLayout, Downloader, GlobalFlags, HttpDownloader, LoadedTasks, PluginLoader, TaskContext,
};
use tracing::debug;

use crate::defaults::default_plugins;
use crate::progress;
use crate::project::Project;

pub mod info;
pub mod run;
pub mod tasks;
pub mod upgrade_config;
pub mod verify;

/// Flags accepted before any command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub debug: bool,
    pub project_dir: Option<PathBuf>,
    pub godel_config: Option<PathBuf>,
}

/// A project with its plugins resolved.
#[derive(Debug)]
pub struct Launcher {
    pub project: Project,
    pub plugins: ResolvedPlugins,
    pub loaded: LoadedTasks,
    pub ctx: TaskContext,
}

impl Launcher {
    pub fn load(opts: &GlobalOptions) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        let mut project = Project::discover(&cwd, opts.project_dir.as_deref(), opts.godel_config.as_deref())?;
        debug!("project {} using {}", project.dir.display(), project.config_file.display());

        let layout = CacheLayout::from_env()?;
        layout.ensure_dirs()?;
        let downloader: Arc<dyn Downloader> = Arc::new(HttpDownloader::from_env()?);
        let loader = PluginLoader::new(layout);

        let pb = progress::spinner("Resolving plugins...");
        let plugins = (|| -> Result<ResolvedPlugins> {
            let providers = project.config.tasks_config_providers.to_param(&downloader)?;
            if !providers.providers.is_empty() {
                let provided = resolve_config_providers(&providers, loader.layout(), loader.os_arch())?;
                project.config.merge_provided(provided);
            }

            let params = vec![
                default_plugins()?.plugins_param(&project.config, &downloader)?,
                project.config.plugins.to_param(&downloader)?,
            ];
            Ok(loader.resolve(&params)?)
        })();
        match &plugins {
            Ok(resolved) => progress::finish_success(&pb, &format!("Resolved {} plugin(s)", resolved.len())),
            Err(_) => progress::finish_error(&pb, "Failed to resolve plugins"),
        }
        let plugins = plugins?;

        let ctx = TaskContext {
            flags: GlobalFlags {
                debug: opts.debug,
                project_dir: Some(project.dir.clone()),
                godel_config: opts.godel_config.clone().map(|_| project.config_file.clone()),
                config_dir: Some(project.config_dir()),
            },
            environment: project.config.environment.clone(),
        };

        Ok(Self {
            loaded: LoadedTasks::from_resolved(&plugins),
            project,
            plugins,
            ctx,
        })
    }
}
