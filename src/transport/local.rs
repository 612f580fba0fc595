//! Local filesystem destination

use super::{
    artifact_basename, is_artifact_name, partial_name, sort_oldest_first, ArtifactMetadata,
    Result, Transport, TransportError, TransportKind,
};
use crate::utils::archive::parse_artifact_timestamp;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Destination directory on a locally mounted filesystem
#[derive(Debug)]
pub struct LocalTransport {
    directory: PathBuf,
}

impl LocalTransport {
    /// Open the destination, creating the directory if it does not exist yet
    pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        if !directory.exists() {
            debug!("Creating destination directory {:?}", directory);
            fs::create_dir_all(&directory)?;
        }
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Copy across filesystems, then drop the source
    fn copy_into_place(&self, source: &Path, name: &str) -> std::io::Result<()> {
        let target = self.directory.join(name);
        let partial = self.directory.join(partial_name(name));
        let result = fs::copy(source, &partial).and_then(|_| {
            let modified = fs::metadata(source)?.modified()?;
            File::options().write(true).open(&partial)?.set_modified(modified)?;
            fs::rename(&partial, &target)
        });

        if let Err(e) = result {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        fs::remove_file(source)
    }
}

impl Transport for LocalTransport {
    fn upload(&mut self, local_artifact: &Path) -> Result<()> {
        let name = artifact_basename(local_artifact)?;
        let target = self.directory.join(&name);

        if let Err(e) = fs::rename(local_artifact, &target) {
            debug!("Rename into {:?} failed ({}), copying instead", target, e);
            self.copy_into_place(local_artifact, &name)
                .map_err(|e| TransportError::Upload {
                    name,
                    reason: e.to_string(),
                })?;
        }

        Ok(())
    }

    /// Artifacts in name order; the timestamp prefix makes this time order
    fn list(&mut self) -> Result<Vec<ArtifactMetadata>> {
        let entries = fs::read_dir(&self.directory).map_err(|e| {
            TransportError::List(format!("{}: {}", self.directory.display(), e))
        })?;

        let mut artifacts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TransportError::List(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_artifact_name(&name) {
                continue;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| TransportError::List(format!("{}: {}", name, e)))?;
            if !metadata.is_file() {
                continue;
            }

            let modified = match parse_artifact_timestamp(&name) {
                Some(timestamp) => timestamp,
                None => {
                    warn!("Backup <{}> has no timestamp prefix, using its mtime", name);
                    metadata
                        .modified()
                        .map(DateTime::<Utc>::from)
                        .map_err(|e| TransportError::List(format!("{}: {}", name, e)))?
                }
            };

            artifacts.push(ArtifactMetadata::new(name, modified));
        }

        artifacts.sort_by(|a, b| a.name.cmp(&b.name));
        // Names without a timestamp prefix are placed by mtime
        if artifacts.iter().any(|a| parse_artifact_timestamp(&a.name).is_none()) {
            sort_oldest_first(&mut artifacts);
        }

        Ok(artifacts)
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        let path = self.directory.join(name);
        fs::remove_file(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TransportError::NotFound(name.to_string()),
            _ => TransportError::Delete {
                name: name.to_string(),
                reason: e.to_string(),
            },
        })
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Local
    }
}
