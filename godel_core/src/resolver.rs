//! Resolver URL templates
//!
//! A resolver turns a locator and a platform into a download location and
//! places the artifact on disk. Templates recognise exactly these
//! placeholders: `{{Group}}`, `{{GroupPath}}`, `{{Product}}`, `{{Version}}`,
//! `{{OS}}` and `{{Arch}}`. Anything else between braces is rejected when the
//! template is parsed, never when it is rendered.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::artifact::{self, Downloader};
use crate::error::{GodelError, GodelResult};
use crate::locator::{Locator, OsArch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Group,
    GroupPath,
    Product,
    Version,
    Os,
    Arch,
}

impl Placeholder {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Group" => Some(Placeholder::Group),
            "GroupPath" => Some(Placeholder::GroupPath),
            "Product" => Some(Placeholder::Product),
            "Version" => Some(Placeholder::Version),
            "OS" => Some(Placeholder::Os),
            "Arch" => Some(Placeholder::Arch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(Placeholder),
}

/// A parsed resolver template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl UrlTemplate {
    pub fn parse(template: &str) -> GodelResult<Self> {
        let invalid = |reason: String| GodelError::InvalidTemplate {
            template: template.to_string(),
            reason,
        };

        if template.trim().is_empty() {
            return Err(invalid("template is empty".to_string()));
        }

        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after_open = &rest[open + 2..];
            let close = after_open
                .find("}}")
                .ok_or_else(|| invalid(format!("unclosed action at byte {}", template.len() - rest.len() + open)))?;
            let name = after_open[..close].trim();
            if name.is_empty() {
                return Err(invalid("empty action {{}}".to_string()));
            }
            let placeholder = Placeholder::from_name(name).ok_or_else(|| {
                invalid(format!(
                    "unknown placeholder {name:?} (expected one of Group, GroupPath, Product, Version, OS, Arch)"
                ))
            })?;
            segments.push(Segment::Var(placeholder));
            rest = &after_open[close + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Substitute the placeholders. Pure and deterministic.
    pub fn render(&self, locator: &Locator, os_arch: &OsArch) -> String {
        let mut out = String::with_capacity(self.source.len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Var(Placeholder::Group) => out.push_str(locator.group()),
                Segment::Var(Placeholder::GroupPath) => out.push_str(&locator.group_path()),
                Segment::Var(Placeholder::Product) => out.push_str(locator.product()),
                Segment::Var(Placeholder::Version) => out.push_str(locator.version()),
                Segment::Var(Placeholder::Os) => out.push_str(&os_arch.os),
                Segment::Var(Placeholder::Arch) => out.push_str(&os_arch.arch),
            }
        }
        out
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// How the downloaded bytes map onto the destination file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packaging {
    /// A `.tgz` holding exactly one regular file; the archive is kept in the
    /// downloads directory and the file is extracted to the destination.
    SingleFileArchive,
    /// The downloaded bytes are the artifact.
    PlainFile,
}

/// Where a resolver should place an artifact.
#[derive(Debug, Clone, Copy)]
pub struct FetchTarget<'a> {
    pub dest: &'a Path,
    pub downloads_dir: &'a Path,
    pub packaging: Packaging,
}

/// Something that can place the artifact for a locator on disk.
pub trait Resolver: fmt::Debug + Send + Sync {
    /// Short description used when listing failed attempts.
    fn describe(&self) -> String;

    fn resolve(&self, locator: &Locator, os_arch: &OsArch, target: &FetchTarget<'_>) -> GodelResult<()>;
}

/// Resolver backed by a URL template and a downloader.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    template: UrlTemplate,
    downloader: Arc<dyn Downloader>,
}

impl TemplateResolver {
    pub fn new(template: &str, downloader: Arc<dyn Downloader>) -> GodelResult<Self> {
        Ok(Self {
            template: UrlTemplate::parse(template)?,
            downloader,
        })
    }

    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }

    pub fn url(&self, locator: &Locator, os_arch: &OsArch) -> String {
        self.template.render(locator, os_arch)
    }
}

impl Resolver for TemplateResolver {
    fn describe(&self) -> String {
        self.template.to_string()
    }

    fn resolve(&self, locator: &Locator, os_arch: &OsArch, target: &FetchTarget<'_>) -> GodelResult<()> {
        let url = self.url(locator, os_arch);
        match target.packaging {
            Packaging::SingleFileArchive => {
                let archive = target
                    .downloads_dir
                    .join(format!("{}.tgz", locator.file_stem()));
                artifact::fetch_single_file_archive(self.downloader.as_ref(), &url, &archive, target.dest)
            }
            Packaging::PlainFile => artifact::fetch_file(self.downloader.as_ref(), &url, target.dest),
        }
    }
}
