//! `godel upgrade-config`: rewrite plugin configuration files in place.

use anyhow::{Context, Result};
use colored::*;
use std::fs;

use crate::commands::Launcher;

pub fn upgrade_config(launcher: &Launcher) -> Result<()> {
    let config_dir = launcher.project.config_dir();
    let mut upgraded = 0usize;

    for upgrade in &launcher.loaded.upgrade_tasks {
        let path = config_dir.join(upgrade.config_file_name());
        if !path.is_file() {
            continue;
        }
        let current = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let output = upgrade.run(&launcher.ctx, &current)?;
        if output.is_empty() || output == current {
            continue;
        }
        fs::write(&path, &output).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} {} ({})", "Upgraded".green().bold(), path.display(), upgrade.plugin);
        upgraded += 1;
    }

    if upgraded == 0 {
        println!("{}", "All plugin configuration is up to date.".dimmed());
    }
    Ok(())
}
