//! How a resolved plugin is asked to describe itself.

use std::fmt;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{GodelError, GodelResult};
use crate::plugin::info::PluginInfo;

/// Reserved argument that makes a plugin print its [`PluginInfo`] as JSON.
pub const PLUGIN_INFO_COMMAND: &str = "_godelPluginInfo";

pub trait PluginInfoProtocol: fmt::Debug + Send + Sync {
    fn query(&self, executable: &Path) -> GodelResult<PluginInfo>;
}

/// Runs `<executable> _godelPluginInfo` and decodes its stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecInfoProtocol;

impl PluginInfoProtocol for ExecInfoProtocol {
    fn query(&self, executable: &Path) -> GodelResult<PluginInfo> {
        let failed = |reason: String| GodelError::PluginInfo {
            executable: executable.to_path_buf(),
            reason,
        };

        debug!("querying {} {}", executable.display(), PLUGIN_INFO_COMMAND);
        let output = Command::new(executable)
            .arg(PLUGIN_INFO_COMMAND)
            .output()
            .map_err(|e| failed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!("command failed with {}: {}", output.status, stderr.trim())));
        }

        PluginInfo::from_json(&output.stdout).map_err(|e| failed(format!("invalid output: {e}")))
    }
}
