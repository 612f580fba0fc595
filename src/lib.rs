//! bcupper library
//!
//! Space-aware directory backups to local disk, FTP or SFTP with a
//! count-based retention limit.

pub mod config;
pub mod error;
pub mod managers;
pub mod strategies;
pub mod transport;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, resolve_jobs, BackupJob, Config};
pub use error::BackupError;
pub use managers::backup::{BackupManager, BatchSummary, JobOutcome, JobReport};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use transport::{ArtifactMetadata, Transport, TransportError};
