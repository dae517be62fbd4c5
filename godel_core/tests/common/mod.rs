//! Shared fixtures for godel_core integration tests.
#![allow(dead_code)]

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use flate2::write::GzEncoder;
use flate2::Compression;
use godel_core::error::{GodelError, GodelResult};
use godel_core::plugin::{PluginInfo, PluginInfoProtocol};
use godel_core::resolver::FetchTarget;
use godel_core::{Locator, OsArch, Resolver};

/// Write a `.tgz` holding a single file named `name`.
pub fn write_single_file_tgz(path: &Path, name: &str, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(contents.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append_data(&mut header, name, contents).unwrap();
    builder.into_inner().unwrap().finish().unwrap();
}

/// Schema 2 plugin description declaring the given task names.
pub fn plugin_info_json(id: &str, uses_config: bool, tasks: &[&str]) -> String {
    let locator: Locator = id.parse().unwrap();
    let tasks: Vec<String> = tasks
        .iter()
        .map(|name| format!(r#"{{"name":"{name}","description":"","command":["{name}"]}}"#))
        .collect();
    format!(
        r#"{{"pluginSchemaVersion":"2","group":"{}","product":"{}","version":"{}","usesConfig":{},"tasks":[{}]}}"#,
        locator.group(),
        locator.product(),
        locator.version(),
        uses_config,
        tasks.join(",")
    )
}

/// Reads the plugin description from the "executable" file itself, so tests
/// need no real subprocess.
#[derive(Debug, Default)]
pub struct FileInfoProtocol;

impl PluginInfoProtocol for FileInfoProtocol {
    fn query(&self, executable: &Path) -> GodelResult<PluginInfo> {
        let bytes = fs::read(executable)?;
        PluginInfo::from_json(&bytes)
    }
}

/// Fails the test if it is ever asked to resolve anything.
#[derive(Debug)]
pub struct PanickingResolver;

impl Resolver for PanickingResolver {
    fn describe(&self) -> String {
        "panicking resolver".to_string()
    }

    fn resolve(&self, locator: &Locator, _: &OsArch, _: &FetchTarget<'_>) -> GodelResult<()> {
        panic!("resolver invoked for {locator}");
    }
}

/// Always fails with a download error naming the locator.
#[derive(Debug)]
pub struct FailingResolver(pub &'static str);

impl Resolver for FailingResolver {
    fn describe(&self) -> String {
        self.0.to_string()
    }

    fn resolve(&self, locator: &Locator, _: &OsArch, _: &FetchTarget<'_>) -> GodelResult<()> {
        Err(GodelError::Download {
            url: format!("{}/{}", self.0, locator.file_stem()),
            reason: "not found".to_string(),
        })
    }
}

/// Writes fixed bytes to the destination.
#[derive(Debug)]
pub struct StaticResolver(pub Vec<u8>);

impl Resolver for StaticResolver {
    fn describe(&self) -> String {
        "static resolver".to_string()
    }

    fn resolve(&self, _: &Locator, _: &OsArch, target: &FetchTarget<'_>) -> GodelResult<()> {
        if let Some(parent) = target.dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target.dest, &self.0).map_err(|e: io::Error| GodelError::io("static resolver", e))
    }
}

/// Logs `"<label> <locator>"` for every request, then writes a description
/// of the requested plugin declaring one task named after its product.
#[derive(Debug)]
pub struct RecordingResolver {
    pub label: &'static str,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl Resolver for RecordingResolver {
    fn describe(&self) -> String {
        self.label.to_string()
    }

    fn resolve(&self, locator: &Locator, _: &OsArch, target: &FetchTarget<'_>) -> GodelResult<()> {
        self.log.lock().unwrap().push(format!("{} {}", self.label, locator));
        if let Some(parent) = target.dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let info = plugin_info_json(&locator.to_string(), false, &[locator.product()]);
        fs::write(target.dest, info).map_err(|e: io::Error| GodelError::io("recording resolver", e))
    }
}
