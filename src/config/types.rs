use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    pub directories: Vec<DirectoryConfig>,
}

/// Global configuration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Logging configuration
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,

    /// Where archives are written before delivery
    #[serde(default = "default_staging_directory")]
    pub staging_directory: PathBuf,

    /// Where per-destination lock files live
    #[serde(default = "default_lock_directory")]
    pub lock_directory: PathBuf,

    /// Timeout applied to every remote connect/read/write
    #[serde(default = "default_transport_timeout")]
    pub transport_timeout_seconds: u64,

    /// Retry settings for transient transport failures
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default)]
    pub retention_mode: RetentionMode,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_directory: default_log_directory(),
            log_level: default_log_level(),
            log_max_files: default_log_max_files(),
            staging_directory: default_staging_directory(),
            lock_directory: default_lock_directory(),
            transport_timeout_seconds: default_transport_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retention_mode: RetentionMode::default(),
        }
    }
}

/// How many artifacts one retention pass may remove
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetentionMode {
    /// At most one eviction per pass
    #[default]
    SingleEviction,
    /// Evict until the artifact count is back at the limit
    DrainToLimit,
}

/// One configured directory (raw, as written in the config file)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryConfig {
    pub source: PathBuf,
    pub destination: String,

    /// Missing means unlimited retention
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backups: Option<usize>,

    /// Remote transport settings; the key is `ftp` in deployed configs
    #[serde(default, alias = "remote", skip_serializing_if = "Option::is_none")]
    pub ftp: Option<RemoteConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RemoteConfig {
    pub protocol: Protocol,
    pub host: String,
    pub user: String,
    pub password: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// known_hosts file used to verify the SFTP server key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_hosts: Option<PathBuf>,

    /// Explicit opt-in to skip SFTP host key verification
    #[serde(default)]
    pub insecure_skip_host_key: bool,
}

impl RemoteConfig {
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(match self.protocol {
            Protocol::Ftp => 21,
            Protocol::Sftp => 22,
        })
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Ftp,
    Sftp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Ftp => write!(f, "ftp"),
            Protocol::Sftp => write!(f, "sftp"),
        }
    }
}

/// Resolved, immutable backup job (one per configured directory)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupJob {
    pub source: PathBuf,
    pub destination: String,
    pub max_backups: Option<NonZeroUsize>,
    pub remote: Option<RemoteConfig>,
}

impl BackupJob {
    /// Local destinations are the only ones the free-space preflight applies to
    pub fn is_local(&self) -> bool {
        self.remote.is_none()
    }

    /// Human readable destination, `proto://user@host/dir` for remotes
    pub fn destination_label(&self) -> String {
        match &self.remote {
            Some(remote) => format!(
                "{}://{}@{}:{}/{}",
                remote.protocol,
                remote.user,
                remote.host,
                remote.effective_port(),
                self.destination.trim_start_matches('/')
            ),
            None => self.destination.clone(),
        }
    }
}

// Default value functions

fn default_log_directory() -> PathBuf { PathBuf::from("~/logs") }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
fn default_staging_directory() -> PathBuf { std::env::temp_dir().join("bcupper") }
fn default_lock_directory() -> PathBuf { std::env::temp_dir() }
fn default_transport_timeout() -> u64 { 60 }
fn default_retry_attempts() -> u32 { 3 }
fn default_retry_base_delay_ms() -> u64 { 500 }
