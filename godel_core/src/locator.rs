//! Artifact identity
//!
//! A [`Locator`] is the `group:product:version` triple that names a plugin,
//! an asset or a config provider. Locators order by their rendered string so
//! that every listing and every aggregated error is sorted the same way the
//! user sees the ids.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::iter;
use std::str::FromStr;

use crate::error::{GodelError, GodelResult};

/// Fields are private so every instance goes through [`Locator::new`] or
/// [`Locator::parse`]; no part contains `:`, which keeps the string ordering
/// consistent with equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    group: String,
    product: String,
    version: String,
}

impl Locator {
    pub fn new(
        group: impl Into<String>,
        product: impl Into<String>,
        version: impl Into<String>,
    ) -> GodelResult<Self> {
        let locator = Self {
            group: group.into(),
            product: product.into(),
            version: version.into(),
        };
        for (field, value) in [
            ("group", &locator.group),
            ("product", &locator.product),
            ("version", &locator.version),
        ] {
            if value.is_empty() {
                return Err(GodelError::MalformedLocator {
                    id: locator.to_string(),
                    reason: format!("{field} must be non-empty"),
                });
            }
            if value.contains(':') {
                return Err(GodelError::MalformedLocator {
                    id: locator.to_string(),
                    reason: format!("{field} must not contain ':'"),
                });
            }
        }
        Ok(locator)
    }

    /// Parse `group:product:version`.
    pub fn parse(id: &str) -> GodelResult<Self> {
        let parts: Vec<&str> = id.split(':').collect();
        if parts.len() != 3 {
            return Err(GodelError::MalformedLocator {
                id: id.to_string(),
                reason: format!("expected 3 colon-delimited parts, found {}", parts.len()),
            });
        }
        if let Some(pos) = parts.iter().position(|part| part.is_empty()) {
            let field = ["group", "product", "version"][pos];
            return Err(GodelError::MalformedLocator {
                id: id.to_string(),
                reason: format!("{field} must be non-empty"),
            });
        }
        Ok(Self {
            group: parts[0].to_string(),
            product: parts[1].to_string(),
            version: parts[2].to_string(),
        })
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Group with `.` replaced by `/`, as used in repository paths.
    pub fn group_path(&self) -> String {
        self.group.replace('.', "/")
    }

    /// `group:product`, the identity of a plugin across versions.
    pub fn key(&self) -> String {
        format!("{}:{}", self.group, self.product)
    }

    /// Deterministic file name used for cached artifacts.
    pub fn file_stem(&self) -> String {
        format!("{}-{}-{}", self.group, self.product, self.version)
    }

    fn sort_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.group
            .bytes()
            .chain(iter::once(b':'))
            .chain(self.product.bytes())
            .chain(iter::once(b':'))
            .chain(self.version.bytes())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.product, self.version)
    }
}

impl FromStr for Locator {
    type Err = GodelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

impl Ord for Locator {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_bytes().cmp(other.sort_bytes())
    }
}

impl PartialOrd for Locator {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "illumos", "ios", "js", "linux",
    "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "arm", "arm64", "loong64", "mips", "mips64", "mips64le", "mipsle", "ppc64",
    "ppc64le", "riscv64", "s390x", "wasm",
];

/// Operating system and architecture pair, rendered as `os-arch`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OsArch {
    pub os: String,
    pub arch: String,
}

impl OsArch {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> GodelResult<Self> {
        let os_arch = Self {
            os: os.into(),
            arch: arch.into(),
        };
        if !KNOWN_OS.contains(&os_arch.os.as_str()) {
            return Err(GodelError::InvalidOsArch {
                value: os_arch.to_string(),
                reason: format!("unknown operating system {:?}", os_arch.os),
            });
        }
        if !KNOWN_ARCH.contains(&os_arch.arch.as_str()) {
            return Err(GodelError::InvalidOsArch {
                value: os_arch.to_string(),
                reason: format!("unknown architecture {:?}", os_arch.arch),
            });
        }
        Ok(os_arch)
    }

    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "x86" => "386",
            "aarch64" => "arm64",
            "powerpc64" => "ppc64",
            "s390x" => "s390x",
            "riscv64" => "riscv64",
            other => other,
        };
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }
}

impl fmt::Display for OsArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

impl FromStr for OsArch {
    type Err = GodelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((os, arch)) if !os.is_empty() && !arch.is_empty() => OsArch::new(os, arch),
            _ => Err(GodelError::InvalidOsArch {
                value: s.to_string(),
                reason: "expected <os>-<arch>".to_string(),
            }),
        }
    }
}

/// A locator plus the expected SHA-256 of the extracted file per platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorWithChecksums {
    pub locator: Locator,
    pub checksums: BTreeMap<OsArch, String>,
}

impl LocatorWithChecksums {
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            checksums: BTreeMap::new(),
        }
    }

    pub fn with_checksum(mut self, os_arch: OsArch, sha256: impl Into<String>) -> Self {
        self.checksums.insert(os_arch, sha256.into().to_lowercase());
        self
    }

    /// Parse checksum keys from configuration; invalid keys are fatal.
    pub fn from_config(id: &str, checksums: &BTreeMap<String, String>) -> GodelResult<Self> {
        let mut out = Self::new(Locator::parse(id)?);
        for (key, sum) in checksums {
            out = out.with_checksum(key.parse()?, sum.as_str());
        }
        Ok(out)
    }

    pub fn checksum_for(&self, os_arch: &OsArch) -> Option<&str> {
        self.checksums.get(os_arch).map(String::as_str)
    }
}
