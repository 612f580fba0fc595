//! Destination transports
//!
//! Every destination, local or remote, is driven through the same
//! [`Transport`] capability set: upload an artifact, list existing artifacts
//! with their modification time, delete an artifact by name. A transport is
//! opened once per job, already positioned at the destination directory, and
//! releases its connection when dropped.

pub mod ftp;
pub mod local;
pub mod sftp;

use crate::config::{BackupJob, GlobalConfig, Protocol};
use crate::utils::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub use ftp::FtpTransport;
pub use local::LocalTransport;
pub use sftp::SftpTransport;

/// Suffix every artifact produced by bcupper carries
pub const ARTIFACT_SUFFIX: &str = ".tar.gz";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    #[error("Authentication failed for {user}@{host}: {reason}")]
    Auth {
        user: String,
        host: String,
        reason: String,
    },

    #[error("Host key verification failed for {host}: {reason}")]
    HostKey { host: String, reason: String },

    #[error("Failed to upload {name}: {reason}")]
    Upload { name: String, reason: String },

    #[error("Failed to list destination: {0}")]
    List(String),

    #[error("Backup <{0}> does not exist at destination")]
    NotFound(String),

    #[error("Failed to delete {name}: {reason}")]
    Delete { name: String, reason: String },

    #[error("Cannot use remote directory {path}: {reason}")]
    Directory { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether retrying the operation could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Metadata of one artifact found at a destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    pub name: String,
    pub modified: DateTime<Utc>,
}

impl ArtifactMetadata {
    pub fn new(name: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            modified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Local,
    Ftp,
    Sftp,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Local => write!(f, "local"),
            TransportKind::Ftp => write!(f, "ftp"),
            TransportKind::Sftp => write!(f, "sftp"),
        }
    }
}

/// Capability set shared by all destinations
pub trait Transport {
    /// Place the artifact at the destination under its own basename
    fn upload(&mut self, local_artifact: &Path) -> Result<()>;

    /// Existing artifacts, oldest first
    fn list(&mut self) -> Result<Vec<ArtifactMetadata>>;

    /// Remove the named artifact; `NotFound` if it does not exist
    fn delete(&mut self, name: &str) -> Result<()>;

    fn kind(&self) -> TransportKind;
}

/// Opens a connected transport for a job
pub trait TransportFactory {
    fn open(&self, job: &BackupJob) -> Result<Box<dyn Transport>>;
}

/// Builds real transports from the job's remote settings
#[derive(Debug, Clone)]
pub struct DefaultTransportFactory {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl DefaultTransportFactory {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }

    pub fn from_global(global: &GlobalConfig) -> Self {
        Self::new(
            global.transport_timeout(),
            RetryPolicy::exponential(
                global.retry_attempts,
                Duration::from_millis(global.retry_base_delay_ms),
            ),
        )
    }
}

impl TransportFactory for DefaultTransportFactory {
    fn open(&self, job: &BackupJob) -> Result<Box<dyn Transport>> {
        match &job.remote {
            None => Ok(Box::new(LocalTransport::open(&job.destination)?)),
            Some(remote) => match remote.protocol {
                Protocol::Ftp => {
                    let transport = self.retry.run("ftp connect", TransportError::is_transient, || {
                        FtpTransport::connect(remote, &job.destination, self.timeout)
                    })?;
                    Ok(Box::new(transport))
                }
                Protocol::Sftp => {
                    let transport = self.retry.run("sftp connect", TransportError::is_transient, || {
                        SftpTransport::connect(remote, &job.destination, self.timeout)
                    })?;
                    Ok(Box::new(transport))
                }
            },
        }
    }
}

/// Whether a listed name looks like one of our artifacts
pub(crate) fn is_artifact_name(name: &str) -> bool {
    name.ends_with(ARTIFACT_SUFFIX) && !name.starts_with('.')
}

/// Sort a listing oldest first; equal timestamps keep name order
pub(crate) fn sort_oldest_first(artifacts: &mut [ArtifactMetadata]) {
    artifacts.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));
}

/// Hidden name an upload is written under until it is complete
///
/// The leading dot keeps it out of every listing.
pub(crate) fn partial_name(name: &str) -> String {
    format!(".{}.partial", name)
}

/// Write an upload under its partial name, then rename it to `name`
///
/// When writing or renaming fails the partial file is removed on a best
/// effort basis, so an interrupted upload never leaves an artifact-named
/// file at the destination.
pub(crate) fn upload_via_partial<C>(
    conn: &mut C,
    name: &str,
    write: impl FnOnce(&mut C, &str) -> Result<()>,
    rename: impl FnOnce(&mut C, &str, &str) -> Result<()>,
    remove: impl FnOnce(&mut C, &str) -> Result<()>,
) -> Result<()> {
    let partial = partial_name(name);

    let result = match write(conn, &partial) {
        Ok(()) => rename(conn, &partial, name),
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        if let Err(cleanup) = remove(conn, &partial) {
            debug!("Could not remove partial upload {}: {}", partial, cleanup);
        }
        return Err(e);
    }

    Ok(())
}

/// Basename of a local artifact as a UTF-8 string
pub(crate) fn artifact_basename(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| TransportError::Upload {
            name: path.display().to_string(),
            reason: "artifact path has no UTF-8 file name".to_string(),
        })
}

/// Mock implementation for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Recorded operation call
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum TransportCall {
        Open,
        Upload { name: String },
        List,
        Delete { name: String },
        Close,
    }

    /// In-memory destination shared between the factory and the transports it opens
    #[derive(Clone, Default)]
    pub struct MockTransport {
        /// Recorded operation calls
        pub calls: Arc<Mutex<Vec<TransportCall>>>,
        /// Artifacts currently "stored" at the destination, in listing order
        pub artifacts: Arc<Mutex<Vec<ArtifactMetadata>>>,
        /// Whether open should fail
        pub should_fail_open: Arc<Mutex<bool>>,
        /// Whether upload should fail
        pub should_fail_upload: Arc<Mutex<bool>>,
        /// Whether list should fail
        pub should_fail_list: Arc<Mutex<bool>>,
        /// Whether delete should fail
        pub should_fail_delete: Arc<Mutex<bool>>,
        /// Timestamp given to uploaded artifacts
        pub upload_time: Arc<Mutex<Option<DateTime<Utc>>>>,
        /// Local paths handed to upload
        pub uploaded_paths: Arc<Mutex<Vec<std::path::PathBuf>>>,
        kind: Option<TransportKind>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        fn with_kind(mut self, kind: TransportKind) -> Self {
            self.kind = Some(kind);
            self
        }

        /// Configure pre-existing artifacts
        pub fn with_artifacts(self, artifacts: Vec<ArtifactMetadata>) -> Self {
            *self.artifacts.lock().unwrap() = artifacts;
            self
        }

        pub fn with_failing_open(self) -> Self {
            *self.should_fail_open.lock().unwrap() = true;
            self
        }

        pub fn with_failing_upload(self) -> Self {
            *self.should_fail_upload.lock().unwrap() = true;
            self
        }

        pub fn with_failing_list(self) -> Self {
            *self.should_fail_list.lock().unwrap() = true;
            self
        }

        pub fn with_failing_delete(self) -> Self {
            *self.should_fail_delete.lock().unwrap() = true;
            self
        }

        pub fn with_upload_time(self, time: DateTime<Utc>) -> Self {
            *self.upload_time.lock().unwrap() = Some(time);
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<TransportCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Names of all delete calls, in order
        pub fn deleted(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|c| match c {
                    TransportCall::Delete { name } => Some(name.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn close_count(&self) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| matches!(c, TransportCall::Close))
                .count()
        }

        pub fn artifact_names(&self) -> Vec<String> {
            self.artifacts
                .lock()
                .unwrap()
                .iter()
                .map(|a| a.name.clone())
                .collect()
        }

        fn record(&self, call: TransportCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Transport for MockTransport {
        fn upload(&mut self, local_artifact: &Path) -> Result<()> {
            let name = artifact_basename(local_artifact)?;
            self.record(TransportCall::Upload { name: name.clone() });
            self.uploaded_paths
                .lock()
                .unwrap()
                .push(local_artifact.to_path_buf());

            if *self.should_fail_upload.lock().unwrap() {
                return Err(TransportError::Upload {
                    name,
                    reason: "mock upload failure".to_string(),
                });
            }

            let modified = self.upload_time.lock().unwrap().unwrap_or_else(Utc::now);
            self.artifacts
                .lock()
                .unwrap()
                .push(ArtifactMetadata::new(name, modified));
            Ok(())
        }

        fn list(&mut self) -> Result<Vec<ArtifactMetadata>> {
            self.record(TransportCall::List);
            if *self.should_fail_list.lock().unwrap() {
                return Err(TransportError::List("mock list failure".to_string()));
            }
            Ok(self.artifacts.lock().unwrap().clone())
        }

        fn delete(&mut self, name: &str) -> Result<()> {
            self.record(TransportCall::Delete {
                name: name.to_string(),
            });
            if *self.should_fail_delete.lock().unwrap() {
                return Err(TransportError::Delete {
                    name: name.to_string(),
                    reason: "mock delete failure".to_string(),
                });
            }

            let mut artifacts = self.artifacts.lock().unwrap();
            let before = artifacts.len();
            artifacts.retain(|a| a.name != name);
            if artifacts.len() == before {
                return Err(TransportError::NotFound(name.to_string()));
            }
            Ok(())
        }

        fn kind(&self) -> TransportKind {
            self.kind.unwrap_or(TransportKind::Sftp)
        }
    }

    impl Drop for MockTransport {
        fn drop(&mut self) {
            // Only the handle given out by the factory records a close
            if self.kind.is_some() {
                self.record(TransportCall::Close);
            }
        }
    }

    /// Factory handing out handles onto one shared [`MockTransport`]
    #[derive(Clone)]
    pub struct MockTransportFactory {
        pub transport: MockTransport,
        kind: TransportKind,
    }

    impl MockTransportFactory {
        pub fn new(transport: MockTransport, kind: TransportKind) -> Self {
            Self { transport, kind }
        }
    }

    impl TransportFactory for MockTransportFactory {
        fn open(&self, _job: &BackupJob) -> Result<Box<dyn Transport>> {
            self.transport.record(TransportCall::Open);
            if *self.transport.should_fail_open.lock().unwrap() {
                return Err(TransportError::Connect {
                    host: "mock".to_string(),
                    reason: "mock connect failure".to_string(),
                });
            }
            Ok(Box::new(self.transport.clone().with_kind(self.kind)))
        }
    }
}
