//! Archive production: one gzip-compressed tarball per backup
//!
//! Archives are named `<YYYY-MM-DD_HH-MM-SS>-<source basename>.tar.gz` and
//! rooted at the source basename, so extracting one recreates the original
//! top-level folder.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Timestamp format of the artifact name prefix
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const TIMESTAMP_LEN: usize = "YYYY-MM-DD_HH-MM-SS".len();

/// Artifact name for a backup of `source` taken at `now`
pub fn archive_name<Tz: TimeZone>(now: &DateTime<Tz>, source: &Path) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}-{}.tar.gz",
        now.format(TIMESTAMP_FORMAT),
        source_basename(source)
    )
}

fn source_basename(source: &Path) -> String {
    source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "backup".to_string())
}

/// Timestamp encoded in an artifact name, interpreted in local time
pub fn parse_artifact_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let prefix = name.get(..TIMESTAMP_LEN)?;
    if name.as_bytes().get(TIMESTAMP_LEN) != Some(&b'-') {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(prefix, TIMESTAMP_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

/// A finished archive on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHandle {
    pub path: PathBuf,
    pub size: u64,
}

impl ArchiveHandle {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Write a `.tar.gz` of `source` to `output`
///
/// The archive is written to `<output>.partial` and renamed into place once
/// complete, so `output` either holds a whole archive or does not exist.
pub fn produce_archive(source: &Path, output: &Path) -> io::Result<ArchiveHandle> {
    let partial = partial_path(output);

    let result = write_archive(source, &partial).and_then(|_| fs::rename(&partial, output));
    if let Err(e) = result {
        if let Err(cleanup) = fs::remove_file(&partial) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove partial archive {:?}: {}", partial, cleanup);
            }
        }
        return Err(e);
    }

    let size = fs::metadata(output)?.len();
    debug!("Created archive {:?} ({} bytes)", output, size);

    Ok(ArchiveHandle {
        path: output.to_path_buf(),
        size,
    })
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

fn write_archive(source: &Path, target: &Path) -> io::Result<()> {
    let root = PathBuf::from(source_basename(source));
    let file = File::create(target)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(true);

    // Sorted walk keeps entry order stable between runs
    for entry in WalkDir::new(source).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        // A file source is its own root entry
        let name = if relative.as_os_str().is_empty() {
            root.clone()
        } else {
            root.join(relative)
        };

        if entry.file_type().is_dir() {
            builder.append_dir(&name, entry.path())?;
        } else if entry.file_type().is_file() {
            builder.append_path_with_name(entry.path(), &name)?;
        }
    }

    let writer = builder.into_inner()?.finish()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

/// An archive staged locally before delivery
///
/// The staged file is removed on drop if it is still present, whether or not
/// delivery succeeded.
#[derive(Debug)]
pub struct StagedArchive {
    handle: ArchiveHandle,
}

impl StagedArchive {
    pub fn new(handle: ArchiveHandle) -> Self {
        Self { handle }
    }

    pub fn path(&self) -> &Path {
        &self.handle.path
    }

    pub fn handle(&self) -> &ArchiveHandle {
        &self.handle
    }
}

impl Drop for StagedArchive {
    fn drop(&mut self) {
        match fs::remove_file(&self.handle.path) {
            Ok(()) => debug!("Removed staging file {:?}", self.handle.path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staging file {:?}: {}", self.handle.path, e),
        }
    }
}
