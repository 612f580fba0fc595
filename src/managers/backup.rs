//! Backup manager - runs each configured job through its stages
//!
//! A job moves through `CheckSource -> EnsureDestination -> PreflightSpace ->
//! Produce -> Deliver -> PostflightRetention`. A missing source ends
//! the job with a warning; any other error fails only that job and the batch
//! moves on to the next one.

use crate::config::{expand_tilde, BackupJob, Config, GlobalConfig, RetentionMode};
use crate::error::{BackupError, Result};
use crate::strategies::retention;
use crate::transport::{
    ArtifactMetadata, DefaultTransportFactory, Transport, TransportError, TransportFactory,
};
use crate::utils::archive::{archive_name, produce_archive, StagedArchive};
use crate::utils::locker::DestinationLock;
use crate::utils::retry::RetryPolicy;
use crate::utils::size::{RealSpaceProbe, SpaceProbe};
use chrono::Local;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Stages of a single backup job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    CheckSource,
    EnsureDestination,
    PreflightSpace,
    Produce,
    Deliver,
    PostflightRetention,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::CheckSource => "source check",
            JobStage::EnsureDestination => "destination setup",
            JobStage::PreflightSpace => "free space check",
            JobStage::Produce => "archive creation",
            JobStage::Deliver => "delivery",
            JobStage::PostflightRetention => "retention",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobWarning {
    SourceMissing(PathBuf),
}

/// Terminal outcome of a job
#[derive(Debug)]
pub enum JobOutcome {
    Success { artifact: String },
    Warning(JobWarning),
    Failed(BackupError),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, JobOutcome::Warning(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, JobOutcome::Failed(_))
    }
}

/// Everything that happened while running one job
#[derive(Debug)]
pub struct JobReport {
    pub source: PathBuf,
    pub destination: String,
    pub outcome: JobOutcome,
    /// Artifacts removed by preflight or retention, in order
    pub evicted: Vec<String>,
    /// Evictions that were attempted but failed (logged, not fatal)
    pub eviction_errors: Vec<String>,
    /// Listing failure that blocked the post-upload retention decision
    pub retention_error: Option<String>,
}

impl JobReport {
    fn new(job: &BackupJob) -> Self {
        Self {
            source: job.source.clone(),
            destination: job.destination_label(),
            outcome: JobOutcome::Warning(JobWarning::SourceMissing(job.source.clone())),
            evicted: Vec::new(),
            eviction_errors: Vec::new(),
            retention_error: None,
        }
    }
}

/// Reports for a whole run, in job order
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<JobReport>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn warned(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_warning()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_failed()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

/// Settings the manager needs from the global config
#[derive(Debug, Clone)]
pub struct BackupSettings {
    pub staging_directory: PathBuf,
    pub lock_directory: PathBuf,
    pub retention_mode: RetentionMode,
    pub retry: RetryPolicy,
}

impl BackupSettings {
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            staging_directory: expand_tilde(&global.staging_directory),
            lock_directory: expand_tilde(&global.lock_directory),
            retention_mode: global.retention_mode,
            retry: RetryPolicy::exponential(
                global.retry_attempts,
                std::time::Duration::from_millis(global.retry_base_delay_ms),
            ),
        }
    }
}

pub struct BackupManager {
    settings: BackupSettings,
    jobs: Vec<BackupJob>,
    transports: Box<dyn TransportFactory>,
    probe: Box<dyn SpaceProbe>,
}

impl BackupManager {
    /// Create new backup manager using the real transports and filesystem
    pub fn new(config: &Config, jobs: Vec<BackupJob>) -> Self {
        Self::with_components(
            BackupSettings::from_global(&config.global),
            jobs,
            Box::new(DefaultTransportFactory::from_global(&config.global)),
            Box::new(RealSpaceProbe),
        )
    }

    /// Create backup manager with specific transport factory and space probe
    pub fn with_components(
        settings: BackupSettings,
        jobs: Vec<BackupJob>,
        transports: Box<dyn TransportFactory>,
        probe: Box<dyn SpaceProbe>,
    ) -> Self {
        Self {
            settings,
            jobs,
            transports,
            probe,
        }
    }

    pub fn jobs(&self) -> &[BackupJob] {
        &self.jobs
    }

    /// Run every job in order; one job's failure never stops the next
    pub fn backup_all(&self) -> BatchSummary {
        info!("Starting backup of {} directories", self.jobs.len());

        let mut summary = BatchSummary::default();
        for job in &self.jobs {
            summary.reports.push(self.backup_job(job));
        }

        info!(
            "Backup summary: {} succeeded, {} skipped, {} failed",
            summary.succeeded(),
            summary.warned(),
            summary.failed()
        );

        summary
    }

    /// Run a single job to a terminal outcome
    pub fn backup_job(&self, job: &BackupJob) -> JobReport {
        let start_time = Instant::now();
        let mut report = JobReport::new(job);

        info!("Backup <{}>", job.source.display());

        report.outcome = match self.execute(job, &mut report) {
            Ok(artifact) => {
                info!(
                    "Backup of <{}> to <{}> completed in {:.2}s as `{}`",
                    job.source.display(),
                    report.destination,
                    start_time.elapsed().as_secs_f64(),
                    artifact
                );
                JobOutcome::Success { artifact }
            }
            Err(BackupError::SourceNotFound(source)) => {
                warn!("<{}> was not found, skipping", source.display());
                JobOutcome::Warning(JobWarning::SourceMissing(source))
            }
            Err(e) => {
                error!("Backup of <{}> failed: {}", job.source.display(), e);
                JobOutcome::Failed(e)
            }
        };

        report
    }

    /// List the artifacts at a job's destination, oldest first
    ///
    /// A local destination that does not exist yet lists as empty and is
    /// left uncreated.
    pub fn list_destination(&self, job: &BackupJob) -> Result<Vec<ArtifactMetadata>> {
        if job.is_local() && !Path::new(&job.destination).exists() {
            return Ok(Vec::new());
        }

        let mut transport = self
            .transports
            .open(job)
            .map_err(|e| BackupError::transport(JobStage::EnsureDestination, e))?;
        transport.list().map_err(BackupError::RetentionList)
    }

    fn execute(&self, job: &BackupJob, report: &mut JobReport) -> Result<String> {
        // CheckSource
        if !job.source.exists() {
            return Err(BackupError::SourceNotFound(job.source.clone()));
        }

        // EnsureDestination
        let label = job.destination_label();
        let mut lock = DestinationLock::open(&self.settings.lock_directory, &label)
            .map_err(|e| BackupError::io(JobStage::EnsureDestination, e))?;
        let _guard = lock
            .try_acquire()
            .map_err(|_| BackupError::Locked(label.clone()))?;

        let mut transport = self
            .transports
            .open(job)
            .map_err(|e| BackupError::transport(JobStage::EnsureDestination, e))?;
        debug!("Opened {} destination <{}>", transport.kind(), label);

        // PreflightSpace
        if job.is_local() {
            self.preflight_space(job, transport.as_mut(), report)?;
        }

        // Produce
        fs::create_dir_all(&self.settings.staging_directory)
            .map_err(|e| BackupError::io(JobStage::Produce, e))?;
        let name = archive_name(&Local::now(), &job.source);
        let staging_path = self.settings.staging_directory.join(&name);
        let staged = StagedArchive::new(
            produce_archive(&job.source, &staging_path)
                .map_err(|e| BackupError::io(JobStage::Produce, e))?,
        );
        info!(
            "Created archive `{}` ({} bytes)",
            name,
            staged.handle().size
        );

        // Deliver: the staged copy is removed on every path out of here
        transport
            .upload(staged.path())
            .map_err(|e| BackupError::transport(JobStage::Deliver, e))?;
        drop(staged);

        // PostflightRetention
        self.apply_retention(job, transport.as_mut(), report);

        Ok(name)
    }

    /// Evict one backup up front when the source will not fit
    fn preflight_space(
        &self,
        job: &BackupJob,
        transport: &mut dyn Transport,
        report: &mut JobReport,
    ) -> Result<()> {
        let required = self
            .probe
            .folder_size(&job.source)
            .map_err(|e| BackupError::io(JobStage::PreflightSpace, e))?;
        let available = self
            .probe
            .free_space(Path::new(&job.destination))
            .map_err(|e| BackupError::io(JobStage::PreflightSpace, e))?;

        if available >= required {
            return Ok(());
        }

        warn!("{}", BackupError::InsufficientSpace { required, available });

        // A single eviction only lowers the risk; the write proceeds regardless
        match transport.list() {
            Ok(existing) => match retention::oldest(&existing) {
                Some(victim) => self.evict(transport, victim, report),
                None => warn!("No existing backups at <{}> to make room", report.destination),
            },
            Err(e) => warn!("Cannot make room at <{}>: {}", report.destination, e),
        }

        Ok(())
    }

    fn apply_retention(&self, job: &BackupJob, transport: &mut dyn Transport, report: &mut JobReport) {
        let existing = match transport.list() {
            Ok(existing) => existing,
            Err(e) => {
                let e = BackupError::RetentionList(e);
                warn!("{}", e);
                report.retention_error = Some(e.to_string());
                return;
            }
        };

        for victim in retention::plan(&existing, job.max_backups, self.settings.retention_mode) {
            self.evict(transport, &victim, report);
        }
    }

    /// Delete one artifact; failures are logged and recorded, never fatal
    fn evict(&self, transport: &mut dyn Transport, victim: &ArtifactMetadata, report: &mut JobReport) {
        let result = self.settings.retry.run(
            "delete",
            TransportError::is_transient,
            || transport.delete(&victim.name),
        );

        match result {
            Ok(()) => {
                info!("Removed oldest backup <{}>", victim.name);
                report.evicted.push(victim.name.clone());
            }
            Err(e) => {
                warn!("Failed to remove backup <{}>: {}", victim.name, e);
                report.eviction_errors.push(e.to_string());
            }
        }
    }
}
