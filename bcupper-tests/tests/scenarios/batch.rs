//! Multi-directory runs

use super::mock_manager;
use bcupper::config::{resolve_jobs, RetentionMode};
use bcupper::error::BackupError;
use bcupper::utils::locker::DestinationLock;
use test_utils::{
    sample_artifacts, ConfigBuilder, JobOutcome, JobWarning, MockSpaceProbe, MockTransport,
    TransportCall, TransportKind,
};

#[test]
fn test_missing_source_warns_and_batch_continues() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .add_missing_directory("gone")
        .add_local_directory("photos", Some(3))
        .persist();
    let transport = MockTransport::new();

    let manager = mock_manager(&config, &transport, TransportKind::Local, MockSpaceProbe::roomy());
    let summary = manager.backup_all();

    assert_eq!(summary.reports.len(), 2);
    assert!(matches!(
        summary.reports[0].outcome,
        JobOutcome::Warning(JobWarning::SourceMissing(_))
    ));
    assert!(summary.reports[1].outcome.is_success());
    assert!(!summary.has_failures());

    // The missing source never opened a transport
    let opens = transport
        .get_calls()
        .iter()
        .filter(|c| matches!(c, TransportCall::Open))
        .count();
    assert_eq!(opens, 1);
}

#[test]
fn test_failed_job_does_not_stop_the_next() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .add_local_directory("photos", Some(3))
        .add_local_directory("docs", Some(3))
        .persist();
    let transport = MockTransport::new().with_failing_upload();

    let manager = mock_manager(&config, &transport, TransportKind::Local, MockSpaceProbe::roomy());
    let summary = manager.backup_all();

    assert_eq!(summary.failed(), 2);
    assert_eq!(transport.close_count(), 2);
}

#[test]
fn test_locked_destination_fails_job() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .add_local_directory("photos", Some(3))
        .persist();
    let job = &resolve_jobs(&config)[0];
    let mut held = DestinationLock::open(&config.global.lock_directory, &job.destination_label())
        .unwrap();
    let _guard = held.try_acquire().unwrap();

    let transport = MockTransport::new();
    let manager = mock_manager(&config, &transport, TransportKind::Local, MockSpaceProbe::roomy());
    let report = manager.backup_all().reports.remove(0);

    assert!(matches!(report.outcome, JobOutcome::Failed(BackupError::Locked(_))));
    assert!(transport.get_calls().is_empty());
}

#[test]
fn test_drain_mode_catches_up_in_one_run() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .add_local_directory("photos", Some(2))
        .with_retention_mode(RetentionMode::DrainToLimit)
        .persist();
    let existing = sample_artifacts(4, "photos");
    let transport = MockTransport::new().with_artifacts(existing.clone());

    let manager = mock_manager(&config, &transport, TransportKind::Local, MockSpaceProbe::roomy());
    let report = manager.backup_all().reports.remove(0);

    let expected: Vec<_> = existing[..3].iter().map(|a| a.name.clone()).collect();
    assert_eq!(report.evicted, expected);
    assert_eq!(transport.artifact_names().len(), 2);
}
