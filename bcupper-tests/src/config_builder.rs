//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.

use bcupper::config::{Config, DirectoryConfig, GlobalConfig, Protocol, RemoteConfig, RetentionMode};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    global: GlobalConfig,
    directories: Vec<DirectoryConfig>,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder whose log, staging and lock dirs live in a temp dir
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let log_directory = temp_dir.path().join("logs");
        fs::create_dir_all(&log_directory).expect("Failed to create log_directory");

        let global = GlobalConfig {
            log_directory,
            log_level: "info".to_string(),
            log_max_files: 5,
            staging_directory: temp_dir.path().join("staging"),
            lock_directory: temp_dir.path().join("locks"),
            transport_timeout_seconds: 5,
            retry_attempts: 0,
            retry_base_delay_ms: 1,
            retention_mode: RetentionMode::SingleEviction,
        };

        Self {
            temp_dir,
            global,
            directories: Vec::new(),
        }
    }

    /// Create a config with one populated local source backed up to a local destination
    pub fn minimal() -> Self {
        Self::new().add_local_directory("photos", Some(3))
    }

    /// Get the temp directory path (before build)
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Source directory path for a name
    pub fn source_path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join("sources").join(name)
    }

    /// Local destination path for a name
    pub fn destination_path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join("backups").join(name)
    }

    /// Add a populated source backed up to a local destination of the same name
    pub fn add_local_directory(mut self, name: &str, max_backups: Option<usize>) -> Self {
        let source = self.source_path(name);
        crate::fixtures::sample_tree(&source);

        let destination = self.destination_path(name);
        self.directories.push(DirectoryConfig {
            source,
            destination: destination.display().to_string(),
            max_backups,
            ftp: None,
        });
        self
    }

    /// Add a directory whose source does not exist
    pub fn add_missing_directory(mut self, name: &str) -> Self {
        let destination = self.destination_path(name);
        self.directories.push(DirectoryConfig {
            source: self.temp_dir.path().join("does-not-exist").join(name),
            destination: destination.display().to_string(),
            max_backups: None,
            ftp: None,
        });
        self
    }

    /// Add a populated source backed up to a remote destination
    pub fn add_remote_directory(
        mut self,
        name: &str,
        protocol: Protocol,
        max_backups: Option<usize>,
    ) -> Self {
        let source = self.source_path(name);
        crate::fixtures::sample_tree(&source);

        self.directories.push(DirectoryConfig {
            source,
            destination: format!("/backups/{}", name),
            max_backups,
            ftp: Some(RemoteConfig {
                protocol,
                host: "backup.test".to_string(),
                user: "backup".to_string(),
                password: "secret".to_string(),
                port: None,
                known_hosts: None,
                insecure_skip_host_key: protocol == Protocol::Sftp,
            }),
        });
        self
    }

    /// Add a raw directory entry
    pub fn add_directory(mut self, directory: DirectoryConfig) -> Self {
        self.directories.push(directory);
        self
    }

    pub fn with_retention_mode(mut self, mode: RetentionMode) -> Self {
        self.global.retention_mode = mode;
        self
    }

    pub fn with_global(mut self, global: GlobalConfig) -> Self {
        self.global = global;
        self
    }

    /// Build the configuration (consumes the builder, temp dir is dropped)
    pub fn build(self) -> Config {
        Config {
            global: self.global,
            directories: self.directories,
        }
    }

    /// Build and keep the temp dir alive
    pub fn persist(self) -> (Config, TempDir) {
        let config = Config {
            global: self.global,
            directories: self.directories,
        };
        (config, self.temp_dir)
    }

    /// Write the configuration as `config.json` and keep the temp dir alive
    pub fn write_json(self) -> (PathBuf, TempDir) {
        let path = self.temp_dir.path().join("config.json");
        let (config, temp_dir) = self.persist();
        let contents = serde_json::to_string_pretty(&config).expect("Failed to serialize config");
        fs::write(&path, contents).expect("Failed to write config");
        (path, temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
