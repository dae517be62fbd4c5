//! Runnable tasks backed by plugin executables
//!
//! A task's argument vector is built in a fixed order: forwarded global flags,
//! `--assets` when the plugin has assets, the task's command prefix, then the
//! caller's arguments. The plugin owns its diagnostics; a nonzero exit is
//! reported only as [`GodelError::TaskFailed`].

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::thread;

use tracing::{debug, info};

use crate::error::{GodelError, GodelResult};
use crate::locator::Locator;
use crate::plugin::info::{GlobalFlagOptions, TaskInfo, VerifyFlagType, VerifyOptions};
use crate::plugin::resolve::PluginInfoWithAssets;

/// Flag name used to hand asset paths to a plugin.
pub const ASSETS_FLAG: &str = "--assets";

/// Launcher flags that tasks may ask to have forwarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalFlags {
    pub debug: bool,
    pub project_dir: Option<PathBuf>,
    pub godel_config: Option<PathBuf>,
    /// Directory holding `<product>-plugin.yml` files.
    pub config_dir: Option<PathBuf>,
}

/// Everything a task invocation needs from the launcher.
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    pub flags: GlobalFlags,
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub description: String,
    pub plugin: Locator,
    pub verify: Option<VerifyOptions>,
    executable: PathBuf,
    command: Vec<String>,
    global_flag_options: Option<GlobalFlagOptions>,
    config_file_name: Option<String>,
    assets: Vec<PathBuf>,
}

impl Task {
    pub fn from_plugin(plugin: &PluginInfoWithAssets, info: &TaskInfo) -> Self {
        Self {
            name: info.name.clone(),
            description: info.description.clone(),
            plugin: plugin.locator().clone(),
            verify: info.verify_options.clone(),
            executable: plugin.executable.clone(),
            command: info.command.clone(),
            global_flag_options: info.global_flag_options.clone(),
            config_file_name: plugin.info.uses_config.then(|| plugin.info.config_file_name()),
            assets: plugin.asset_paths(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// The plugin's config file, if the plugin reads one and it exists.
    pub fn config_file(&self, ctx: &TaskContext) -> Option<PathBuf> {
        let name = self.config_file_name.as_ref()?;
        let path = ctx.flags.config_dir.as_ref()?.join(name);
        path.is_file().then_some(path)
    }

    /// Arguments passed to the executable. Pure apart from the config file
    /// existence check.
    pub fn command_line(&self, ctx: &TaskContext, args: &[OsString]) -> Vec<OsString> {
        self.argv(ctx, args, true)
    }

    fn argv(&self, ctx: &TaskContext, args: &[OsString], forward_config: bool) -> Vec<OsString> {
        let mut argv: Vec<OsString> = Vec::new();

        if let Some(opts) = &self.global_flag_options {
            if ctx.flags.debug && !opts.debug_flag.is_empty() {
                argv.push(opts.debug_flag.clone().into());
            }
            if let (false, Some(dir)) = (opts.project_dir_flag.is_empty(), &ctx.flags.project_dir) {
                argv.push(opts.project_dir_flag.clone().into());
                argv.push(dir.clone().into_os_string());
            }
            if let (false, Some(file)) = (opts.godel_config_flag.is_empty(), &ctx.flags.godel_config) {
                argv.push(opts.godel_config_flag.clone().into());
                argv.push(file.clone().into_os_string());
            }
            if forward_config && !opts.config_flag.is_empty() {
                if let Some(config) = self.config_file(ctx) {
                    argv.push(opts.config_flag.clone().into());
                    argv.push(config.into_os_string());
                }
            }
        }

        if !self.assets.is_empty() {
            let joined = self
                .assets
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(",");
            argv.push(ASSETS_FLAG.into());
            argv.push(joined.into());
        }

        argv.extend(self.command.iter().map(OsString::from));
        argv.extend(args.iter().cloned());
        argv
    }

    fn process(&self, ctx: &TaskContext, argv: &[OsString]) -> Command {
        debug!("running {} {:?}", self.executable.display(), argv);
        let mut cmd = Command::new(&self.executable);
        cmd.args(argv).envs(&ctx.environment);
        cmd
    }

    /// Run with inherited stdio.
    pub fn run(&self, ctx: &TaskContext, args: &[OsString]) -> GodelResult<()> {
        let argv = self.command_line(ctx, args);
        let status = self
            .process(ctx, &argv)
            .status()
            .map_err(|e| GodelError::io(format!("failed to run task {}", self.name), e))?;
        if status.success() {
            Ok(())
        } else {
            Err(GodelError::TaskFailed {
                task: self.name.clone(),
                code: status.code(),
            })
        }
    }

    /// Arguments appended when this task runs as part of `verify`.
    pub fn verify_args(&self, apply: bool, flags: &[VerifyFlagValue]) -> GodelResult<Vec<OsString>> {
        let opts = self
            .verify
            .as_ref()
            .ok_or_else(|| GodelError::config(format!("task {} does not support verify", self.name)))?;

        let mode_args = if apply { &opts.apply_true_args } else { &opts.apply_false_args };
        let mut args: Vec<OsString> = mode_args.iter().map(OsString::from).collect();

        for value in flags.iter().filter(|v| v.task == self.name) {
            let declared = opts.flag(&value.flag).ok_or_else(|| {
                GodelError::config(format!("task {} has no verify flag {:?}", self.name, value.flag))
            })?;
            let arg = match (declared.flag_type, &value.value) {
                (VerifyFlagType::Bool, None) => format!("--{}", declared.name),
                (_, Some(v)) => format!("--{}={}", declared.name, v),
                (VerifyFlagType::String, None) => {
                    return Err(GodelError::config(format!(
                        "verify flag {}:{} requires a value",
                        self.name, declared.name
                    )))
                }
            };
            args.push(arg.into());
        }
        Ok(args)
    }
}

/// A `task:flag[=value]` request forwarded to one verify task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyFlagValue {
    pub task: String,
    pub flag: String,
    pub value: Option<String>,
}

impl FromStr for VerifyFlagValue {
    type Err = GodelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (task, rest) = s
            .split_once(':')
            .filter(|(task, flag)| !task.is_empty() && !flag.is_empty())
            .ok_or_else(|| GodelError::config(format!("verify flag {s:?} must have the form <task>:<flag>[=<value>]")))?;
        let (flag, value) = match rest.split_once('=') {
            Some((flag, value)) => (flag, Some(value.to_string())),
            None => (rest, None),
        };
        Ok(Self {
            task: task.to_string(),
            flag: flag.to_string(),
            value,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct VerifyRequest {
    pub apply: bool,
    pub skip: BTreeSet<String>,
    pub flags: Vec<VerifyFlagValue>,
}

/// Tasks taking part in `verify`, by ascending ordering. Tasks without an
/// ordering run last; ties keep their listing order.
pub fn verify_order(tasks: &[Task]) -> Vec<&Task> {
    let mut verify: Vec<&Task> = tasks.iter().filter(|t| t.verify.is_some()).collect();
    verify.sort_by_key(|t| {
        let ordering = t.verify.as_ref().and_then(|v| v.ordering);
        (ordering.is_none(), ordering.unwrap_or_default())
    });
    verify
}

/// Run every verify task. All tasks run even after a failure; failed task
/// names are reported together.
pub fn run_verify(
    tasks: &[Task],
    ctx: &TaskContext,
    request: &VerifyRequest,
    mut before_each: impl FnMut(&Task),
) -> GodelResult<()> {
    let ordered = verify_order(tasks);
    let known: BTreeSet<&str> = ordered.iter().map(|t| t.name.as_str()).collect();
    for name in request
        .skip
        .iter()
        .map(String::as_str)
        .chain(request.flags.iter().map(|f| f.task.as_str()))
    {
        if !known.contains(name) {
            return Err(GodelError::UnknownTask(name.to_string()));
        }
    }

    // Reject bad flags before anything runs.
    let mut planned = Vec::with_capacity(ordered.len());
    for task in ordered {
        if request.skip.contains(&task.name) {
            debug!("skipping verify task {}", task.name);
            continue;
        }
        let args = task.verify_args(request.apply, &request.flags)?;
        planned.push((task, args));
    }

    let mut failed = Vec::new();
    for (task, args) in planned {
        before_each(task);
        if let Err(err) = task.run(ctx, &args) {
            info!("verify task {} failed: {}", task.name, err);
            failed.push(task.name.clone());
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(GodelError::VerifyFailed(failed))
    }
}

/// Rewrites a plugin's configuration file to its latest format.
#[derive(Debug, Clone)]
pub struct UpgradeConfigTask {
    pub plugin: Locator,
    task: Task,
    config_file_name: String,
}

impl UpgradeConfigTask {
    pub fn from_plugin(plugin: &PluginInfoWithAssets, info: &TaskInfo) -> Self {
        Self {
            plugin: plugin.locator().clone(),
            task: Task::from_plugin(plugin, info),
            config_file_name: plugin.info.config_file_name(),
        }
    }

    pub fn config_file_name(&self) -> &str {
        &self.config_file_name
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Feed `current` on stdin and return what the plugin prints on stdout.
    pub fn run(&self, ctx: &TaskContext, current: &[u8]) -> GodelResult<Vec<u8>> {
        let argv = self.task.argv(ctx, &[], false);
        let mut child = self
            .task
            .process(ctx, &argv)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| GodelError::io(format!("failed to run task {}", self.task.name), e))?;

        let writer = child.stdin.take().map(|mut stdin| {
            let input = current.to_vec();
            thread::spawn(move || stdin.write_all(&input))
        });
        let output = child
            .wait_with_output()
            .map_err(|e| GodelError::io(format!("failed to wait for task {}", self.task.name), e))?;
        if let Some(handle) = writer {
            // A plugin that exits without reading all of stdin is judged by its exit status.
            let _ = handle.join();
        }

        if !output.status.success() {
            return Err(GodelError::TaskFailed {
                task: self.task.name.clone(),
                code: output.status.code(),
            });
        }
        Ok(output.stdout)
    }
}
