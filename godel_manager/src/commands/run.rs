//! Dispatching a plugin task by name.

use anyhow::{bail, Result};
use std::ffi::OsString;

use godel_core::GodelError;

use crate::commands::Launcher;

/// `args[0]` is the task name; the rest go to the plugin.
pub fn run_task(launcher: &Launcher, args: &[OsString]) -> Result<()> {
    let Some((name, rest)) = args.split_first() else {
        bail!("no task given");
    };
    let name = name.to_string_lossy();
    let task = launcher
        .loaded
        .find(&name)
        .ok_or_else(|| GodelError::UnknownTask(name.to_string()))?;
    task.run(&launcher.ctx, rest)?;
    Ok(())
}
