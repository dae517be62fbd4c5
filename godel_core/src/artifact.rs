//! Artifact download, single-file archive extraction and checksums
//!
//! Artifacts are distributed as gzip-compressed tar archives holding exactly
//! one regular file. Directory entries are allowed and ignored. Files are
//! written through a temporary sibling and renamed into place, so a failed
//! extraction never leaves a truncated destination behind. Extracted files
//! are plugin executables or assets that plugins run, so they land with mode
//! 0755.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use tar::Archive;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{GodelError, GodelResult, ResolverFailure};
use crate::locator::OsArch;
use crate::param::LocatorWithResolverParam;
use crate::resolver::{FetchTarget, Resolver};

/// Environment variable holding an optional download deadline in seconds.
pub const DOWNLOAD_TIMEOUT_ENV: &str = "GODEL_DOWNLOAD_TIMEOUT_SECS";

/// Writes the content behind a URL to a sink.
pub trait Downloader: fmt::Debug + Send + Sync {
    fn download(&self, url: &str, out: &mut dyn Write) -> GodelResult<u64>;
}

/// Downloads `http(s)://` URLs with a blocking client and reads `file://`
/// URLs straight from disk.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
}

impl HttpDownloader {
    pub fn new(timeout: Option<Duration>) -> GodelResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("godel/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Build a downloader honouring [`DOWNLOAD_TIMEOUT_ENV`].
    pub fn from_env() -> GodelResult<Self> {
        let timeout = match std::env::var(DOWNLOAD_TIMEOUT_ENV) {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    GodelError::config(format!(
                        "{DOWNLOAD_TIMEOUT_ENV} must be a whole number of seconds, got {raw:?}"
                    ))
                })?;
                Some(Duration::from_secs(secs))
            }
            Err(_) => None,
        };
        Self::new(timeout)
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, out: &mut dyn Write) -> GodelResult<u64> {
        let download_err = |reason: String| GodelError::Download {
            url: url.to_string(),
            reason,
        };

        if let Some(path) = url.strip_prefix("file://") {
            let mut file = File::open(path).map_err(|e| download_err(e.to_string()))?;
            return io::copy(&mut file, out).map_err(|e| download_err(e.to_string()));
        }

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| download_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(download_err(format!("server returned {status}")));
        }
        io::copy(&mut response, out).map_err(|e| download_err(e.to_string()))
    }
}

/// Download `url` as-is to `dest`.
pub fn fetch_file(downloader: &dyn Downloader, url: &str, dest: &Path) -> GodelResult<()> {
    let mut tmp = temp_sibling(dest)?;
    let bytes = downloader.download(url, tmp.as_file_mut())?;
    persist(tmp, dest)?;
    info!("downloaded {} ({} bytes) to {}", url, bytes, dest.display());
    Ok(())
}

/// Download the archive at `url` to `archive_path`, then extract its single
/// regular file to `dest`.
pub fn fetch_single_file_archive(
    downloader: &dyn Downloader,
    url: &str,
    archive_path: &Path,
    dest: &Path,
) -> GodelResult<()> {
    fetch_file(downloader, url, archive_path)?;
    extract_single_file(archive_path, dest)
}

/// Extract the only regular file in a `.tgz` archive to `dest`.
pub fn extract_single_file(archive_path: &Path, dest: &Path) -> GodelResult<()> {
    let format_err = |reason: String| GodelError::ArchiveFormat {
        archive: archive_path.to_path_buf(),
        reason,
    };

    let file = File::open(archive_path)
        .map_err(|e| GodelError::io(format!("failed to open {}", archive_path.display()), e))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut tmp = temp_sibling(dest)?;
    let mut regular_files = 0usize;
    let entries = archive.entries().map_err(|e| format_err(e.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| format_err(e.to_string()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        regular_files += 1;
        if regular_files == 1 {
            let path = entry
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            debug!("extracting {} from {}", path, archive_path.display());
            io::copy(&mut entry, tmp.as_file_mut()).map_err(|e| format_err(e.to_string()))?;
        }
    }

    if regular_files != 1 {
        return Err(format_err(format!(
            "archive must contain exactly one regular file, found {regular_files}"
        )));
    }
    make_executable(tmp.as_file(), dest)?;
    persist(tmp, dest)
}

#[cfg(unix)]
fn make_executable(file: &File, dest: &Path) -> GodelResult<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o755))
        .map_err(|e| GodelError::io(format!("failed to make {} executable", dest.display()), e))
}

#[cfg(not(unix))]
fn make_executable(_file: &File, _dest: &Path) -> GodelResult<()> {
    Ok(())
}

/// Lowercase hex SHA-256 of a file's bytes.
pub fn sha256_file(path: &Path) -> GodelResult<String> {
    let mut file = File::open(path)
        .map_err(|e| GodelError::io(format!("failed to open {}", path.display()), e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| GodelError::io(format!("failed to read {}", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn verify_checksum(path: &Path, want: &str) -> GodelResult<()> {
    let got = sha256_file(path)?;
    let want = want.to_lowercase();
    if got != want {
        return Err(GodelError::ChecksumMismatch {
            path: path.to_path_buf(),
            want,
            got,
        });
    }
    Ok(())
}

/// Try each resolver in order until one places the artifact, then verify the
/// checksum declared for `os_arch` (if any).
///
/// A checksum failure leaves the placed file where it is.
pub fn resolve_artifact(
    param: &LocatorWithResolverParam,
    default_resolvers: &[std::sync::Arc<dyn Resolver>],
    os_arch: &OsArch,
    target: &FetchTarget<'_>,
) -> GodelResult<()> {
    let locator = param.id();
    let resolvers = param.resolvers(default_resolvers);
    if resolvers.is_empty() {
        return Err(GodelError::NoResolvers {
            locator: locator.clone(),
        });
    }

    let mut failures = Vec::new();
    let mut resolved = false;
    for resolver in resolvers {
        debug!("resolving {} using {}", locator, resolver.describe());
        match resolver.resolve(locator, os_arch, target) {
            Ok(()) => {
                resolved = true;
                break;
            }
            Err(err) => {
                warn!("resolver {} failed for {}: {}", resolver.describe(), locator, err);
                failures.push(ResolverFailure {
                    resolver: resolver.describe(),
                    error: Box::new(err),
                });
            }
        }
    }
    if !resolved {
        return Err(GodelError::ResolversFailed {
            locator: locator.clone(),
            failures,
        });
    }

    match param.locator.checksum_for(os_arch) {
        Some(want) => verify_checksum(target.dest, want),
        None => {
            debug!("no checksum declared for {} on {}", locator, os_arch);
            Ok(())
        }
    }
}

fn temp_sibling(dest: &Path) -> GodelResult<NamedTempFile> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .map_err(|e| GodelError::io(format!("failed to create {}", parent.display()), e))?;
    NamedTempFile::new_in(parent)
        .map_err(|e| GodelError::io(format!("failed to create temporary file in {}", parent.display()), e))
}

fn persist(tmp: NamedTempFile, dest: &Path) -> GodelResult<()> {
    tmp.persist(dest)
        .map_err(|e| GodelError::io(format!("failed to write {}", dest.display()), e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    use crate::locator::{Locator, LocatorWithChecksums};
    use crate::resolver::Packaging;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    enum Entry<'a> {
        File(&'a str, &'a [u8]),
        Dir(&'a str),
    }

    fn write_tgz(path: &Path, entries: &[Entry<'_>]) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for entry in entries {
            let mut header = tar::Header::new_gnu();
            match entry {
                Entry::File(name, data) => {
                    header.set_entry_type(tar::EntryType::Regular);
                    header.set_size(data.len() as u64);
                    header.set_mode(0o755);
                    header.set_cksum();
                    builder.append_data(&mut header, name, *data).unwrap();
                }
                Entry::Dir(name) => {
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_size(0);
                    header.set_mode(0o755);
                    header.set_cksum();
                    builder.append_data(&mut header, name, io::empty()).unwrap();
                }
            }
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_extract_exactly_one_file() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("a.tgz");
        write_tgz(&archive, &[Entry::File("bin/tool", b"hello")]);

        let dest = dir.path().join("out/tool");
        extract_single_file(&archive, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_extracted_file_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("a.tgz");
        write_tgz(&archive, &[Entry::File("asset", b"#!/bin/sh\nexit 0\n")]);

        let dest = dir.path().join("asset");
        extract_single_file(&archive, &dest).unwrap();
        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[test]
    fn test_extract_ignores_directories() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("a.tgz");
        write_tgz(
            &archive,
            &[Entry::Dir("bin/"), Entry::Dir("bin/x/"), Entry::File("bin/x/tool", b"payload")],
        );

        let dest = dir.path().join("tool");
        extract_single_file(&archive, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    fn test_extract_rejects_empty_archive() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("a.tgz");
        write_tgz(&archive, &[Entry::Dir("bin/")]);

        let dest = dir.path().join("tool");
        let err = extract_single_file(&archive, &dest).unwrap_err();
        assert!(matches!(err, GodelError::ArchiveFormat { .. }));
        assert!(err.to_string().contains("found 0"));
        assert!(!dest.exists());
    }

    #[test]
    fn test_extract_rejects_two_files() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("a.tgz");
        write_tgz(&archive, &[Entry::File("a", b"1"), Entry::File("b", b"2")]);

        let dest = dir.path().join("tool");
        fs::write(&dest, b"previous").unwrap();
        let err = extract_single_file(&archive, &dest).unwrap_err();
        assert!(err.to_string().contains("found 2"));
        assert_eq!(fs::read(&dest).unwrap(), b"previous");
    }

    #[test]
    fn test_extract_rejects_non_gzip() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("a.tgz");
        fs::write(&archive, b"definitely not gzip").unwrap();
        let err = extract_single_file(&archive, &dir.path().join("tool")).unwrap_err();
        assert!(matches!(err, GodelError::ArchiveFormat { .. }));
    }

    #[test]
    fn test_verify_checksum() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"hello").unwrap();

        verify_checksum(&path, HELLO_SHA256).unwrap();
        verify_checksum(&path, &HELLO_SHA256.to_uppercase()).unwrap();

        match verify_checksum(&path, "00").unwrap_err() {
            GodelError::ChecksumMismatch { want, got, .. } => {
                assert_eq!(want, "00");
                assert_eq!(got, HELLO_SHA256);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_file_url_download() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        fs::write(&src, b"content").unwrap();

        let downloader = HttpDownloader::new(None).unwrap();
        let dest = dir.path().join("nested/dest.txt");
        fetch_file(&downloader, &format!("file://{}", src.display()), &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"content");

        let missing = fetch_file(&downloader, "file:///does/not/exist", &dest).unwrap_err();
        assert!(matches!(missing, GodelError::Download { .. }));
    }

    /// Writes fixed content and records every invocation.
    #[derive(Debug)]
    struct RecordingResolver {
        name: &'static str,
        result: Result<&'static [u8], &'static str>,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Resolver for RecordingResolver {
        fn describe(&self) -> String {
            self.name.to_string()
        }

        fn resolve(&self, _: &Locator, _: &OsArch, target: &FetchTarget<'_>) -> GodelResult<()> {
            self.calls.lock().unwrap().push(self.name);
            match self.result {
                Ok(bytes) => {
                    fs::write(target.dest, bytes)?;
                    Ok(())
                }
                Err(reason) => Err(GodelError::Download {
                    url: self.name.to_string(),
                    reason: reason.to_string(),
                }),
            }
        }
    }

    fn resolver(
        name: &'static str,
        result: Result<&'static [u8], &'static str>,
        calls: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn Resolver> {
        Arc::new(RecordingResolver {
            name,
            result,
            calls: calls.clone(),
        })
    }

    fn param(checksum: Option<&str>) -> LocatorWithResolverParam {
        let mut locator = LocatorWithChecksums::new(Locator::parse("com.palantir:tester:1.0.0").unwrap());
        if let Some(sum) = checksum {
            locator = locator.with_checksum(OsArch::new("linux", "amd64").unwrap(), sum);
        }
        LocatorWithResolverParam::new(locator)
    }

    #[test]
    fn test_fallback_stops_at_first_success() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("tool");
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolvers = vec![
            resolver("r1", Err("boom"), &calls),
            resolver("r2", Ok(b"from r2"), &calls),
            resolver("r3", Ok(b"from r3"), &calls),
        ];
        let target = FetchTarget {
            dest: &dest,
            downloads_dir: dir.path(),
            packaging: Packaging::SingleFileArchive,
        };

        resolve_artifact(&param(None), &resolvers, &OsArch::new("linux", "amd64").unwrap(), &target).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"from r2");
        assert_eq!(*calls.lock().unwrap(), vec!["r1", "r2"]);
    }

    #[test]
    fn test_explicit_resolver_skips_defaults() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("tool");
        let calls = Arc::new(Mutex::new(Vec::new()));
        let defaults = vec![resolver("default", Ok(b"default"), &calls)];
        let explicit = param(None).with_resolver(resolver("explicit", Err("offline"), &calls));
        let target = FetchTarget {
            dest: &dest,
            downloads_dir: dir.path(),
            packaging: Packaging::SingleFileArchive,
        };

        let err = resolve_artifact(&explicit, &defaults, &OsArch::current(), &target).unwrap_err();
        assert_eq!(*calls.lock().unwrap(), vec!["explicit"]);
        assert!(err
            .to_string()
            .starts_with("1 resolver(s) failed: failed to resolve artifact com.palantir:tester:1.0.0 using resolvers:"));
    }

    #[test]
    fn test_all_resolvers_fail() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("tool");
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolvers = vec![resolver("r1", Err("a"), &calls), resolver("r2", Err("b"), &calls)];
        let target = FetchTarget {
            dest: &dest,
            downloads_dir: dir.path(),
            packaging: Packaging::SingleFileArchive,
        };

        match resolve_artifact(&param(None), &resolvers, &OsArch::current(), &target).unwrap_err() {
            GodelError::ResolversFailed { failures, .. } => {
                let names: Vec<_> = failures.iter().map(|f| f.resolver.as_str()).collect();
                assert_eq!(names, vec!["r1", "r2"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let none: Vec<Arc<dyn Resolver>> = Vec::new();
        assert!(matches!(
            resolve_artifact(&param(None), &none, &OsArch::current(), &target),
            Err(GodelError::NoResolvers { .. })
        ));
    }

    #[test]
    fn test_checksum_checked_after_fetch() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("tool");
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolvers = vec![resolver("r1", Ok(b"hello"), &calls)];
        let linux = OsArch::new("linux", "amd64").unwrap();
        let target = FetchTarget {
            dest: &dest,
            downloads_dir: dir.path(),
            packaging: Packaging::SingleFileArchive,
        };

        resolve_artifact(&param(Some(HELLO_SHA256)), &resolvers, &linux, &target).unwrap();

        let err = resolve_artifact(&param(Some("deadbeef")), &resolvers, &linux, &target).unwrap_err();
        assert!(matches!(err, GodelError::ChecksumMismatch { .. }));
        // The mismatching file is left in place.
        assert_eq!(fs::read(&dest).unwrap(), b"hello");

        // No checksum for this platform: verification is skipped.
        let darwin = OsArch::new("darwin", "amd64").unwrap();
        resolve_artifact(&param(Some("deadbeef")), &resolvers, &darwin, &target).unwrap();
    }
}
