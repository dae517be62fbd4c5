//! `godel tasks`

use anyhow::Result;
use colored::*;

use crate::commands::Launcher;

pub fn list_tasks(launcher: &Launcher) -> Result<()> {
    if launcher.loaded.tasks.is_empty() {
        println!("{}", "No tasks are provided by the configured plugins.".yellow());
        return Ok(());
    }

    let width = launcher
        .loaded
        .tasks
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(0);
    for task in &launcher.loaded.tasks {
        let marker = if task.verify.is_some() { " [verify]" } else { "" };
        let name = format!("{:<width$}", task.name, width = width);
        println!(
            "  {}  {}{}  {}",
            name.cyan().bold(),
            task.description,
            marker.green(),
            task.plugin.to_string().dimmed()
        );
    }
    Ok(())
}
