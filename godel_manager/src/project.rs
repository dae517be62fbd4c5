//! Locating the project and its godel.yml.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use godel_core::config::{GodelConfig, GODEL_CONFIG_PATH};

#[derive(Debug, Clone)]
pub struct Project {
    pub dir: PathBuf,
    pub config_file: PathBuf,
    pub config: GodelConfig,
}

impl Project {
    /// Resolve the project from the `--project-dir` and `--godel-config`
    /// flags, searching upwards from `cwd` when neither names the project.
    pub fn discover(cwd: &Path, project_dir: Option<&Path>, godel_config: Option<&Path>) -> Result<Self> {
        let dir = match project_dir {
            Some(dir) => absolute(cwd, dir),
            None if godel_config.is_some() => cwd.to_path_buf(),
            None => match find_project_dir(cwd) {
                Some(dir) => dir,
                None => bail!(
                    "no {} found in {} or any parent directory",
                    GODEL_CONFIG_PATH,
                    cwd.display()
                ),
            },
        };

        let config_file = match godel_config {
            Some(file) => absolute(cwd, file),
            None => dir.join(GODEL_CONFIG_PATH),
        };
        if !config_file.is_file() {
            bail!("configuration file {} does not exist", config_file.display());
        }

        let config = GodelConfig::load(&config_file)
            .with_context(|| format!("Failed to load {}", config_file.display()))?;

        Ok(Self {
            dir,
            config_file,
            config,
        })
    }

    /// Directory holding godel.yml and the `<product>-plugin.yml` files.
    pub fn config_dir(&self) -> PathBuf {
        self.config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.dir.clone())
    }
}

/// First of `start` and its ancestors that contains `godel/config/godel.yml`.
pub fn find_project_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(GODEL_CONFIG_PATH).is_file())
        .map(Path::to_path_buf)
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
