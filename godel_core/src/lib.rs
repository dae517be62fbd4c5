//! # godel_core
//!
//! Plugin resolution and task loading for the godel build-tool launcher.
//!
//! Configuration names plugins by locator (`group:product:version`). Each
//! plugin is fetched through an ordered list of URL-template resolvers as a
//! single-file `.tgz`, cached, checksum-verified, and asked to describe its
//! tasks. The resolved set is checked for conflicts before the tasks are
//! handed to the caller.
//!
//! ```text
//! GodelConfig -> PluginsParam -> PluginResolver -> verify_compatibility -> LoadedTasks
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod layout;
pub mod locator;
pub mod param;
pub mod plugin;
pub mod resolver;
pub mod task;

pub use artifact::{Downloader, HttpDownloader};
pub use config::{DefaultPlugin, DefaultPlugins, GodelConfig};
pub use error::{GodelError, GodelResult};
pub use layout::CacheLayout;
pub use locator::{Locator, LocatorWithChecksums, OsArch};
pub use param::{LocatorWithResolverParam, PluginParam, PluginsParam};
pub use plugin::{LoadedTasks, PluginInfo, PluginLoader};
pub use resolver::{Resolver, TemplateResolver, UrlTemplate};
pub use task::{GlobalFlags, Task, TaskContext, UpgradeConfigTask, VerifyRequest};
