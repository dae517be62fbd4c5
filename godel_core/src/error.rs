//! Error types for godel
//!
//! Lower layers (fetching, checksums, templating) return a single structured
//! error. Orchestration layers collect per-locator or per-pair failures and
//! reduce them into one of the aggregate variants so that every problem in a
//! configuration is reported in a single run.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::locator::Locator;

pub type GodelResult<T> = Result<T, GodelError>;

#[derive(Debug, Error)]
pub enum GodelError {
    #[error("malformed locator {id:?}: {reason}")]
    MalformedLocator { id: String, reason: String },

    #[error("invalid resolver template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("invalid OS/architecture {value:?}: {reason}")]
    InvalidOsArch { value: String, reason: String },

    #[error("invalid archive {}: {reason}", .archive.display())]
    ArchiveFormat { archive: PathBuf, reason: String },

    #[error("checksum mismatch for {}: want {want}, got {got}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        want: String,
        got: String,
    },

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("failed to resolve artifact {locator}: no resolvers configured")]
    NoResolvers { locator: Locator },

    #[error("{}", resolver_failures(.locator, .failures))]
    ResolversFailed {
        locator: Locator,
        failures: Vec<ResolverFailure>,
    },

    #[error("failed to query plugin info from {}: {reason}", .executable.display())]
    PluginInfo { executable: PathBuf, reason: String },

    #[error("invalid plugin info for {locator}: {reason}")]
    InvalidPluginInfo { locator: String, reason: String },

    #[error("{}", locator_failures(.0))]
    Resolution(Vec<LocatorFailure>),

    #[error("{}", conflicts(.0))]
    Incompatible(Vec<Conflict>),

    #[error("configuration error: {0}")]
    Config(String),

    /// Plugins print their own diagnostics, so this carries only the status.
    #[error("{}", exit_status(.code))]
    TaskFailed { task: String, code: Option<i32> },

    #[error("unknown task {0:?}")]
    UnknownTask(String),

    #[error("failed tasks: {}", .0.join(", "))]
    VerifyFailed(Vec<String>),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GodelError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        GodelError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        GodelError::Config(message.into())
    }

    /// Exit code a CLI should use for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            GodelError::TaskFailed { code: Some(code), .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for GodelError {
    fn from(source: std::io::Error) -> Self {
        GodelError::io("I/O error", source)
    }
}

/// A single failed attempt within a resolver fallback chain.
#[derive(Debug)]
pub struct ResolverFailure {
    pub resolver: String,
    pub error: Box<GodelError>,
}

/// A failure attributed to one plugin, asset or config provider locator.
#[derive(Debug)]
pub struct LocatorFailure {
    pub locator: Locator,
    pub error: GodelError,
}

/// Why two resolved plugins cannot be loaded together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    DifferentVersion,
    ConfigFileCollision { product: String },
    ConflictingTasks(Vec<String>),
}

/// One directed incompatibility: `plugin` conflicts with `other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub plugin: Locator,
    pub other: Locator,
    pub kind: ConflictKind,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::DifferentVersion => write!(f, "different version of the same plugin"),
            ConflictKind::ConfigFileCollision { product } => write!(
                f,
                "both plugins use configuration file {product}-plugin.yml (plugins with the same product name that use configuration are not supported)"
            ),
            ConflictKind::ConflictingTasks(names) => {
                write!(f, "provides conflicting tasks: [{}]", names.join(", "))
            }
        }
    }
}

fn resolver_failures(locator: &Locator, failures: &[ResolverFailure]) -> String {
    let mut out = format!(
        "{} resolver(s) failed: failed to resolve artifact {} using resolvers:",
        failures.len(),
        locator
    );
    for failure in failures {
        out.push_str(&format!(
            "\n  {}: {}",
            failure.resolver,
            indent(&failure.error.to_string(), "    ")
        ));
    }
    out
}

fn locator_failures(failures: &[LocatorFailure]) -> String {
    let mut out = format!("failed to resolve {} artifact(s):", failures.len());
    for failure in failures {
        out.push_str(&format!(
            "\n  {}: {}",
            failure.locator,
            indent(&failure.error.to_string(), "    ")
        ));
    }
    out
}

fn conflicts(conflicts: &[Conflict]) -> String {
    let mut out = format!("plugins were incompatible ({} conflict(s)):", conflicts.len());
    let mut current: Option<&Locator> = None;
    for conflict in conflicts {
        if current != Some(&conflict.plugin) {
            out.push_str(&format!("\n  {}:", conflict.plugin));
            current = Some(&conflict.plugin);
        }
        out.push_str(&format!("\n    {} {}", conflict.other, conflict.kind));
    }
    out
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Indent every line after the first so nested multi-line errors stay readable.
pub(crate) fn indent(text: &str, prefix: &str) -> String {
    text.replace('\n', &format!("\n{prefix}"))
}
