//! On-disk cache layout
//!
//! ```text
//! <home>/
//!   plugins/    extracted plugin executables
//!   assets/     extracted plugin assets
//!   downloads/  downloaded .tgz archives
//!   configs/    downloaded configuration fragments
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GodelError, GodelResult};
use crate::locator::Locator;

/// Environment variable overriding the cache home.
pub const GODEL_HOME_ENV: &str = "GODEL_HOME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    home: PathBuf,
}

impl CacheLayout {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// `$GODEL_HOME`, else `~/.godel`.
    pub fn from_env() -> GodelResult<Self> {
        if let Some(home) = std::env::var_os(GODEL_HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(home));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| GodelError::config(format!("could not determine home directory; set {GODEL_HOME_ENV}")))?;
        Ok(Self::new(home.join(".godel")))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.home.join("plugins")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.home.join("assets")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.home.join("downloads")
    }

    pub fn configs_dir(&self) -> PathBuf {
        self.home.join("configs")
    }

    pub fn plugin_path(&self, locator: &Locator) -> PathBuf {
        self.plugins_dir().join(locator.file_stem())
    }

    pub fn asset_path(&self, locator: &Locator) -> PathBuf {
        self.assets_dir().join(locator.file_stem())
    }

    pub fn config_path(&self, locator: &Locator) -> PathBuf {
        self.configs_dir().join(format!("{}.yml", locator.file_stem()))
    }

    pub fn ensure_dirs(&self) -> GodelResult<()> {
        for dir in [
            self.plugins_dir(),
            self.assets_dir(),
            self.downloads_dir(),
            self.configs_dir(),
        ] {
            fs::create_dir_all(&dir)
                .map_err(|e| GodelError::io(format!("failed to create {}", dir.display()), e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_derive_from_locator() {
        let layout = CacheLayout::new("/cache");
        let loc = Locator::parse("com.palantir:tester:1.0.0").unwrap();
        assert_eq!(
            layout.plugin_path(&loc),
            PathBuf::from("/cache/plugins/com.palantir-tester-1.0.0")
        );
        assert_eq!(
            layout.asset_path(&loc),
            PathBuf::from("/cache/assets/com.palantir-tester-1.0.0")
        );
        assert_eq!(
            layout.config_path(&loc),
            PathBuf::from("/cache/configs/com.palantir-tester-1.0.0.yml")
        );
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(dir.path().join("home"));
        layout.ensure_dirs().unwrap();
        assert!(layout.plugins_dir().is_dir());
        assert!(layout.downloads_dir().is_dir());
        assert!(layout.configs_dir().is_dir());
    }
}
