use super::types::*;
use super::expand_tilde;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to parse config file: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a JSON or TOML file
///
/// Files ending in `.json` are parsed as JSON, everything else as TOML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config = parse_config(&contents, is_json(path))?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse configuration text without validating it
pub fn parse_config(contents: &str, json: bool) -> Result<Config> {
    let config: Config = if json {
        serde_json::from_str(contents)?
    } else {
        toml::from_str(contents)?
    };
    Ok(config)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.directories.is_empty() {
        return Err(ConfigError::ValidationError(
            "No directories defined".to_string(),
        ));
    }

    if config.global.transport_timeout_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "transport_timeout_seconds must be greater than zero".to_string(),
        ));
    }

    for (index, directory) in config.directories.iter().enumerate() {
        validate_directory(index, directory)?;
    }

    Ok(())
}

fn validate_directory(index: usize, directory: &DirectoryConfig) -> Result<()> {
    if directory.source.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "Directory #{}: source must not be empty",
            index
        )));
    }

    if directory.source.file_name().is_none() {
        return Err(ConfigError::ValidationError(format!(
            "Directory #{}: source {:?} has no basename to name archives after",
            index, directory.source
        )));
    }

    if directory.destination.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "Directory #{}: destination must not be empty",
            index
        )));
    }

    if directory.max_backups == Some(0) {
        return Err(ConfigError::ValidationError(format!(
            "Directory #{}: max_backups must be at least 1",
            index
        )));
    }

    if let Some(ref remote) = directory.ftp {
        if remote.host.trim().is_empty() || remote.user.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Directory #{}: remote host and user must not be empty",
                index
            )));
        }

        if remote.protocol == Protocol::Sftp
            && remote.known_hosts.is_none()
            && !remote.insecure_skip_host_key
        {
            return Err(ConfigError::ValidationError(format!(
                "Directory #{}: sftp requires known_hosts, or insecure_skip_host_key = true",
                index
            )));
        }
    }

    Ok(())
}

/// Resolve one directory entry into an immutable job
pub fn resolve_job(directory: &DirectoryConfig) -> BackupJob {
    let remote = directory.ftp.clone().map(|mut remote| {
        remote.known_hosts = remote.known_hosts.map(|p| expand_tilde(&p));
        remote
    });

    // Remote destinations are paths on the server, never tilde-expanded locally
    let destination = if remote.is_some() {
        directory.destination.clone()
    } else {
        expand_tilde(&PathBuf::from(&directory.destination))
            .display()
            .to_string()
    };

    BackupJob {
        source: expand_tilde(&directory.source),
        destination,
        max_backups: directory.max_backups.and_then(NonZeroUsize::new),
        remote,
    }
}

/// Resolve all configured directories, preserving their order
pub fn resolve_jobs(config: &Config) -> Vec<BackupJob> {
    config.directories.iter().map(resolve_job).collect()
}
