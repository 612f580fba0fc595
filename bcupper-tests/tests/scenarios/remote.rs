//! Remote (FTP/SFTP) jobs against the in-memory transport

use super::mock_manager;
use bcupper::config::Protocol;
use rstest::rstest;
use test_utils::{
    sample_artifacts, ConfigBuilder, JobOutcome, MockSpaceProbe, MockTransport, TestContext,
    TransportCall, TransportKind,
};

#[rstest]
#[case(Protocol::Ftp, TransportKind::Ftp)]
#[case(Protocol::Sftp, TransportKind::Sftp)]
fn test_remote_rotation_call_sequence(#[case] protocol: Protocol, #[case] kind: TransportKind) {
    let (config, _temp_dir) = ConfigBuilder::new()
        .add_remote_directory("site", protocol, Some(2))
        .persist();
    let existing = sample_artifacts(2, "site");
    let transport = MockTransport::new().with_artifacts(existing.clone());

    // Remote jobs never consult the space probe
    let manager = mock_manager(&config, &transport, kind, MockSpaceProbe::new(1_000, 0));
    let report = manager.backup_all().reports.remove(0);

    let artifact = match &report.outcome {
        JobOutcome::Success { artifact } => artifact.clone(),
        other => panic!("Expected success, got {:?}", other),
    };
    assert_eq!(
        transport.get_calls(),
        vec![
            TransportCall::Open,
            TransportCall::Upload {
                name: artifact.clone()
            },
            TransportCall::List,
            TransportCall::Delete {
                name: existing[0].name.clone()
            },
            TransportCall::Close,
        ]
    );
    assert_eq!(transport.artifact_names(), vec![existing[1].name.clone(), artifact]);
    assert!(report.destination.starts_with(&format!("{}://backup@backup.test", protocol)));
}

#[test]
fn test_upload_failure_cleans_staging_and_closes_once() {
    let builder = ConfigBuilder::new().add_remote_directory("site", Protocol::Sftp, Some(2));
    let ctx = TestContext::from_builder(builder);
    let transport = MockTransport::new().with_failing_upload();

    let manager = mock_manager(
        ctx.config().unwrap(),
        &transport,
        TransportKind::Sftp,
        MockSpaceProbe::roomy(),
    );
    let summary = manager.backup_all();

    assert_eq!(summary.failed(), 1);
    assert!(ctx.staging_is_empty());
    assert_eq!(transport.close_count(), 1);
    assert!(!transport
        .get_calls()
        .iter()
        .any(|c| matches!(c, TransportCall::List)));
}

#[test]
fn test_connect_failure_fails_job_without_upload() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .add_remote_directory("site", Protocol::Ftp, Some(2))
        .persist();
    let transport = MockTransport::new().with_failing_open();

    let manager = mock_manager(&config, &transport, TransportKind::Ftp, MockSpaceProbe::roomy());
    let report = manager.backup_all().reports.remove(0);

    match &report.outcome {
        JobOutcome::Failed(e) => assert!(e.to_string().contains("mock connect failure")),
        other => panic!("Expected failure, got {:?}", other),
    }
    assert_eq!(transport.get_calls(), vec![TransportCall::Open]);
}

#[test]
fn test_retention_list_failure_keeps_success() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .add_remote_directory("site", Protocol::Sftp, Some(1))
        .persist();
    let transport = MockTransport::new()
        .with_artifacts(sample_artifacts(3, "site"))
        .with_failing_list();

    let manager = mock_manager(&config, &transport, TransportKind::Sftp, MockSpaceProbe::roomy());
    let report = manager.backup_all().reports.remove(0);

    assert!(report.outcome.is_success());
    assert!(report.retention_error.is_some());
    assert!(transport.deleted().is_empty());
}

#[test]
fn test_delete_failure_is_recorded_not_fatal() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .add_remote_directory("site", Protocol::Sftp, Some(1))
        .persist();
    let transport = MockTransport::new()
        .with_artifacts(sample_artifacts(1, "site"))
        .with_failing_delete();

    let manager = mock_manager(&config, &transport, TransportKind::Sftp, MockSpaceProbe::roomy());
    let report = manager.backup_all().reports.remove(0);

    assert!(report.outcome.is_success());
    assert!(report.evicted.is_empty());
    assert_eq!(report.eviction_errors.len(), 1);
    assert_eq!(transport.close_count(), 1);
}
