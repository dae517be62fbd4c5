//! Plugin self-description
//!
//! A plugin answers the info command with a JSON document tagged by
//! `pluginSchemaVersion`. Every supported schema is converted to the one
//! canonical [`PluginInfo`] as soon as it is decoded.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{GodelError, GodelResult};
use crate::locator::Locator;

/// Which global launcher flags a task wants forwarded, and under what names.
/// An empty name means the flag is not forwarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalFlagOptions {
    pub debug_flag: String,
    pub project_dir_flag: String,
    pub godel_config_flag: String,
    pub config_flag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyFlagType {
    Bool,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyFlag {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub flag_type: VerifyFlagType,
}

/// How a task takes part in `verify`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyOptions {
    pub verify_task_flags: Vec<VerifyFlag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<i32>,
    pub apply_true_args: Vec<String>,
    pub apply_false_args: Vec<String>,
}

impl VerifyOptions {
    pub fn flag(&self, name: &str) -> Option<&VerifyFlag> {
        self.verify_task_flags.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Arguments placed before the caller's arguments.
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_flag_options: Option<GlobalFlagOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_options: Option<VerifyOptions>,
}

/// Canonical plugin description, independent of the wire schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub locator: Locator,
    pub uses_config: bool,
    pub tasks: Vec<TaskInfo>,
    pub upgrade_config_task: Option<TaskInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "pluginSchemaVersion")]
enum WirePluginInfo {
    #[serde(rename = "1")]
    V1(WireV1),
    #[serde(rename = "2")]
    V2(WireV2),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireV1 {
    id: String,
    #[serde(default)]
    config_file_name: String,
    #[serde(default)]
    tasks: Vec<TaskInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireV2 {
    group: String,
    product: String,
    version: String,
    #[serde(default)]
    uses_config: bool,
    #[serde(default)]
    tasks: Vec<TaskInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upgrade_config_task: Option<TaskInfo>,
}

impl PluginInfo {
    /// Decode any supported schema version.
    pub fn from_json(bytes: &[u8]) -> GodelResult<Self> {
        let wire: WirePluginInfo = serde_json::from_slice(bytes)?;
        let info = match wire {
            WirePluginInfo::V1(v1) => PluginInfo {
                locator: Locator::parse(&v1.id)?,
                // The v1 schema named its config file explicitly; any name means the plugin reads one.
                uses_config: !v1.config_file_name.is_empty(),
                tasks: v1.tasks,
                upgrade_config_task: None,
            },
            WirePluginInfo::V2(v2) => PluginInfo {
                locator: Locator::new(v2.group, v2.product, v2.version)?,
                uses_config: v2.uses_config,
                tasks: v2.tasks,
                upgrade_config_task: v2.upgrade_config_task,
            },
        };
        Ok(info)
    }

    /// Encode as the current schema.
    pub fn to_json(&self) -> GodelResult<String> {
        let wire = WirePluginInfo::V2(WireV2 {
            group: self.locator.group().to_string(),
            product: self.locator.product().to_string(),
            version: self.locator.version().to_string(),
            uses_config: self.uses_config,
            tasks: self.tasks.clone(),
            upgrade_config_task: self.upgrade_config_task.clone(),
        });
        Ok(serde_json::to_string_pretty(&wire)?)
    }

    /// Check the description against the locator it was resolved for.
    pub fn validate(&self, expected: &Locator) -> GodelResult<()> {
        let invalid = |reason: String| GodelError::InvalidPluginInfo {
            locator: expected.to_string(),
            reason,
        };

        if &self.locator != expected {
            return Err(invalid(format!("plugin reported its identity as {}", self.locator)));
        }

        let mut seen = BTreeSet::new();
        for task in self.tasks.iter().chain(self.upgrade_config_task.iter()) {
            if task.name.is_empty() {
                return Err(invalid("task name must be non-empty".to_string()));
            }
            if task.name.chars().any(char::is_whitespace) {
                return Err(invalid(format!("task name {:?} contains whitespace", task.name)));
            }
        }
        for task in &self.tasks {
            if !seen.insert(task.name.as_str()) {
                return Err(invalid(format!("task {:?} is declared more than once", task.name)));
            }
        }
        Ok(())
    }

    pub fn task_names(&self) -> BTreeSet<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }

    /// Name of the plugin's configuration file inside the config directory.
    pub fn config_file_name(&self) -> String {
        format!("{}-plugin.yml", self.locator.product())
    }
}
