//! Error taxonomy for a single backup job

use crate::managers::backup::JobStage;
use crate::transport::TransportError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Source <{0}> was not found")]
    SourceNotFound(PathBuf),

    #[error("Not enough space: {required} bytes needed, {available} available")]
    InsufficientSpace { required: u64, available: u64 },

    #[error("I/O error during {stage}: {source}")]
    Io {
        stage: JobStage,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport error during {stage}: {source}")]
    Transport {
        stage: JobStage,
        #[source]
        source: TransportError,
    },

    #[error("Failed to list existing backups: {0}")]
    RetentionList(#[source] TransportError),

    #[error("Destination <{0}> is locked by another run")]
    Locked(String),
}

impl BackupError {
    pub fn io(stage: JobStage, source: std::io::Error) -> Self {
        Self::Io { stage, source }
    }

    pub fn transport(stage: JobStage, source: TransportError) -> Self {
        Self::Transport { stage, source }
    }

    /// Stage the job was in when the error occurred
    pub fn stage(&self) -> Option<JobStage> {
        match self {
            Self::Io { stage, .. } | Self::Transport { stage, .. } => Some(*stage),
            Self::SourceNotFound(_) => Some(JobStage::CheckSource),
            Self::InsufficientSpace { .. } => Some(JobStage::PreflightSpace),
            Self::RetentionList(_) => Some(JobStage::PostflightRetention),
            Self::Locked(_) => Some(JobStage::EnsureDestination),
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
