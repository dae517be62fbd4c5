//! Plugin resolution, description and loading
//!
//! - `info`: the canonical plugin description and its wire schemas
//! - `protocol`: querying a plugin executable for its description
//! - `resolve`: fetching plugins and assets into the cache
//! - `compat`: conflict detection across the resolved set
//! - `loader`: resolution plus compatibility, producing tasks

pub mod compat;
pub mod info;
pub mod loader;
pub mod protocol;
pub mod resolve;

pub use compat::{find_conflicts, verify_compatibility};
pub use info::{GlobalFlagOptions, PluginInfo, TaskInfo, VerifyFlag, VerifyFlagType, VerifyOptions};
pub use loader::{LoadedTasks, PluginLoader};
pub use protocol::{ExecInfoProtocol, PluginInfoProtocol, PLUGIN_INFO_COMMAND};
pub use resolve::{
    collect_resolved, resolve_plugins, PluginInfoWithAssets, PluginOutcome, PluginResolver, ResolvedAsset,
    ResolvedPlugins,
};
