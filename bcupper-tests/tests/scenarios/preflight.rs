//! Free space preflight for local destinations

use super::mock_manager;
use test_utils::{
    sample_artifacts, ConfigBuilder, MockSpaceProbe, MockTransport, TransportCall, TransportKind,
};

#[test]
fn test_insufficient_space_evicts_one_before_upload() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .add_local_directory("photos", Some(3))
        .persist();
    let existing = sample_artifacts(3, "photos");
    let transport = MockTransport::new().with_artifacts(existing.clone());

    let manager = mock_manager(&config, &transport, TransportKind::Local, MockSpaceProbe::new(1_000, 10));
    let summary = manager.backup_all();

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.reports[0].evicted, vec![existing[0].name.clone()]);

    let calls = transport.get_calls();
    assert_eq!(calls[0], TransportCall::Open);
    assert_eq!(calls[1], TransportCall::List);
    assert_eq!(
        calls[2],
        TransportCall::Delete {
            name: existing[0].name.clone()
        }
    );
    assert!(matches!(calls[3], TransportCall::Upload { .. }));
    // Back at the limit after the upload, so retention evicts nothing more
    assert_eq!(transport.deleted().len(), 1);
}

#[test]
fn test_enough_space_skips_preflight_listing() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .add_local_directory("photos", Some(3))
        .persist();
    let transport = MockTransport::new().with_artifacts(sample_artifacts(1, "photos"));

    let manager = mock_manager(&config, &transport, TransportKind::Local, MockSpaceProbe::roomy());
    manager.backup_all();

    let calls = transport.get_calls();
    assert_eq!(calls[0], TransportCall::Open);
    assert!(matches!(calls[1], TransportCall::Upload { .. }));
    assert!(transport.deleted().is_empty());
}

#[test]
fn test_insufficient_space_with_empty_destination_still_writes() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .add_local_directory("photos", Some(3))
        .persist();
    let transport = MockTransport::new();

    let manager = mock_manager(&config, &transport, TransportKind::Local, MockSpaceProbe::new(1_000, 0));
    let summary = manager.backup_all();

    assert_eq!(summary.succeeded(), 1);
    assert_eq!(transport.artifact_names().len(), 1);
    assert!(transport.deleted().is_empty());
}

#[test]
fn test_preflight_list_failure_is_not_fatal() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .add_local_directory("photos", Some(3))
        .persist();
    let transport = MockTransport::new().with_failing_list();

    let manager = mock_manager(&config, &transport, TransportKind::Local, MockSpaceProbe::new(1_000, 0));
    let report = manager.backup_all().reports.remove(0);

    assert!(report.outcome.is_success());
    assert!(report.retention_error.is_some());
}
