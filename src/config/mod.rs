//! Configuration module for bcupper
//!
//! This module handles loading, validating, and resolving the list of
//! directories to back up from a JSON or TOML file.
//!
//! ## Example Usage
//!
//! ```no_run
//! use bcupper::config;
//!
//! let config = config::load_config("config.json")?;
//! for job in config::resolve_jobs(&config) {
//!     println!("{:?} -> {}", job.source, job.destination_label());
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{
    load_config, parse_config, resolve_job, resolve_jobs, validate_config, ConfigError, Result,
};
pub use types::*;

use std::time::Duration;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

impl GlobalConfig {
    pub fn transport_timeout(&self) -> Duration {
        Duration::from_secs(self.transport_timeout_seconds)
    }
}
