//! `godel info`: what was resolved and where it lives.

use anyhow::Result;
use colored::*;

use crate::commands::Launcher;

pub fn show_info(launcher: &Launcher) -> Result<()> {
    println!("{} {}", "Project:".bold(), launcher.project.dir.display());
    println!("{} {}", "Config:".bold(), launcher.project.config_file.display());
    println!();

    for (locator, plugin) in &launcher.plugins {
        println!("{}", locator.to_string().cyan().bold());
        println!("  executable: {}", plugin.executable.display());
        if plugin.info.uses_config {
            let config = launcher.project.config_dir().join(plugin.info.config_file_name());
            let state = if config.is_file() { "" } else { " (not present)" };
            println!("  config:     {}{}", config.display(), state.dimmed());
        }
        let tasks: Vec<&str> = plugin.info.tasks.iter().map(|t| t.name.as_str()).collect();
        println!("  tasks:      {}", tasks.join(", "));
        if let Some(upgrade) = &plugin.info.upgrade_config_task {
            println!("  upgrade:    {}", upgrade.name);
        }
        for asset in &plugin.assets {
            println!("  asset:      {} {}", asset.locator, asset.path.display().to_string().dimmed());
        }
    }
    Ok(())
}
