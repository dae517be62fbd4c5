//! Pairwise compatibility of a resolved plugin set.

use crate::error::{Conflict, ConflictKind, GodelError, GodelResult};
use crate::plugin::info::PluginInfo;
use crate::plugin::resolve::ResolvedPlugins;

/// Every directed conflict, ordered by plugin then by the conflicting plugin.
pub fn find_conflicts(plugins: &ResolvedPlugins) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for (locator, plugin) in plugins {
        for (other_locator, other) in plugins {
            if locator == other_locator {
                continue;
            }
            if let Some(kind) = conflict_between(&plugin.info, &other.info) {
                conflicts.push(Conflict {
                    plugin: locator.clone(),
                    other: other_locator.clone(),
                    kind,
                });
            }
        }
    }
    conflicts
}

fn conflict_between(a: &PluginInfo, b: &PluginInfo) -> Option<ConflictKind> {
    if a.locator.group() == b.locator.group() && a.locator.product() == b.locator.product() {
        return Some(ConflictKind::DifferentVersion);
    }
    if a.locator.product() == b.locator.product() && a.uses_config && b.uses_config {
        return Some(ConflictKind::ConfigFileCollision {
            product: a.locator.product().to_string(),
        });
    }
    let b_tasks = b.task_names();
    let common: Vec<String> = a
        .task_names()
        .intersection(&b_tasks)
        .map(|name| name.to_string())
        .collect();
    if common.is_empty() {
        None
    } else {
        Some(ConflictKind::ConflictingTasks(common))
    }
}

pub fn verify_compatibility(plugins: &ResolvedPlugins) -> GodelResult<()> {
    let conflicts = find_conflicts(plugins);
    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(GodelError::Incompatible(conflicts))
    }
}
